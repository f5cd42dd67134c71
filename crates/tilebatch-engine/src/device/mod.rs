//! GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue (headless, no surface)
//! - handing out a cloneable [`GpuContext`] that renderers and shaders hold
//! - tracking device loss so later GPU work fails instead of drawing garbage

mod context;
mod gpu;
mod init;

pub use context::GpuContext;
pub use gpu::Gpu;
pub use init::GpuInit;
