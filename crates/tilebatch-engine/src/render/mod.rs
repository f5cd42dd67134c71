//! Host-side rendering of tile batches.
//!
//! The shader only holds a program and its binding locations. The types here
//! are the caller that performs the per-draw contract: upload uniforms, bind
//! the atlas and the strip, activate the program and draw.
//!
//! Convention:
//! - CPU geometry is in world units (top-left origin, +Y down).
//! - The vertex stage converts to clip space using the viewport.

mod atlas;
mod ctx;
mod tile_batch;

pub use atlas::TileAtlas;
pub use ctx::{RenderCtx, RenderTarget};
pub use tile_batch::TileBatchRenderer;
