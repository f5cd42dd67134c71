//! Tile-batch engine crate.
//!
//! Draws a batch of atlas tiles in one call: a WGSL program over a
//! triangle-strip vertex stream, its binding locations, and the host-side
//! renderer that feeds it.

pub mod coords;
pub mod device;
pub mod logging;
pub mod render;
pub mod shader;
