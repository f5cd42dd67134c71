//! Tile-batch shader program.
//!
//! Pipeline:
//! - `compile`: parse + validate each WGSL stage (naga), no device needed
//! - `link`: check the stage interface and reflect binding locations
//! - `tile_batch`: the GPU-backed program object and its lifecycle
//! - `reference`: CPU mirror of the stage math, used by tests and tools
//!
//! Coordinates follow the engine convention: world units with a top-left
//! origin and +Y down; the vertex stage maps them to clip space.

mod compile;
mod error;
mod id;
mod link;
mod locations;
pub mod reference;
mod source;
mod tile_batch;
mod uniforms;
mod vertex;

pub use compile::{compile_stage, CompiledStage, Stage};
pub use error::ShaderError;
pub use id::ShaderId;
pub use link::{link, BindingKind, LinkedProgram, ProgramBinding};
pub use locations::{AttributeLocation, BindingSlot, ProgramLocations, UniformLocation, UniformName};
pub use source::{FRAGMENT_SOURCE, VERTEX_SOURCE};
pub use tile_batch::{Lifecycle, TileBatchShader, TileShaderConfig};
pub use uniforms::{BatchAdjust, TileDrawParams, TileUniforms, TransformMode};
pub use vertex::TileVertex;
