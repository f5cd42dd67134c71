//! Coordinate and geometry types shared by the shader and its callers.
//!
//! Canonical CPU space:
//! - World units (logical pixels for a screen-space batch)
//! - Origin top-left
//! - +X right, +Y down
//!
//! The tile vertex stage converts to clip space using a resolution uniform.

mod rect;
mod transform;
mod vec2;
mod viewport;

pub use rect::Rect;
pub use transform::WorldTransform;
pub use vec2::Vec2;
pub use viewport::Viewport;
