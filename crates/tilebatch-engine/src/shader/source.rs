//! Fixed WGSL text for both program stages.
//!
//! The sources are embedded at compile time and never templated.

pub const VERTEX_SOURCE: &str = include_str!("shaders/tile_batch.vert.wgsl");
pub const FRAGMENT_SOURCE: &str = include_str!("shaders/tile_batch.frag.wgsl");

// Names the linker resolves. The comments carry the historical binding names.
pub(crate) const ATTR_POSITION: &str = "a_position"; // aPosition
pub(crate) const UNIFORM_BLOCK: &str = "u";
pub(crate) const ATLAS_TEXTURE: &str = "atlas"; // uImageSampler
pub(crate) const ATLAS_SAMPLER: &str = "atlas_sampler";
