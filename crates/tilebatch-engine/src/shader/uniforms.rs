use bytemuck::{Pod, Zeroable};

use crate::coords::{Vec2, Viewport, WorldTransform};

/// How the world transform's `y` output is computed.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum TransformMode {
    /// `y` is computed from the already-transformed `x`.
    ///
    /// This is the historical behavior of the tile program and the default.
    #[default]
    Sequential,
    /// Both outputs read the original position (a true affine transform).
    Affine,
}

impl TransformMode {
    #[inline]
    pub const fn as_u32(self) -> u32 {
        match self {
            TransformMode::Sequential => 0,
            TransformMode::Affine => 1,
        }
    }
}

/// Reserved batch-level adjustments.
///
/// Uploaded into the `centre_offset` / `scale` block members. The current
/// transform does not read them.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BatchAdjust {
    pub centre_offset: Vec2,
    pub scale: f32,
}

impl Default for BatchAdjust {
    fn default() -> Self {
        Self {
            centre_offset: Vec2::zero(),
            scale: 1.0,
        }
    }
}

/// Values supplied by the caller for one batch draw.
///
/// Nothing here is stored by the shader.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TileDrawParams {
    pub world: WorldTransform,
    pub alpha: f32,
    pub mode: TransformMode,
    pub adjust: BatchAdjust,
    /// Distinct texture units the current batch touches.
    ///
    /// Owned by the batching caller, which starts it at zero and increments it;
    /// the shader only reads it.
    pub texture_count: u32,
}

impl Default for TileDrawParams {
    fn default() -> Self {
        Self {
            world: WorldTransform::IDENTITY,
            alpha: 1.0,
            mode: TransformMode::Sequential,
            adjust: BatchAdjust::default(),
            texture_count: 0,
        }
    }
}

/// CPU mirror of the WGSL `TileUniforms` block (64 bytes).
///
///  offset  0  matrix_scale        [f32; 4]
///  offset 16  resolution          [f32; 2]
///  offset 24  sampler_resolution  [f32; 2]
///  offset 32  matrix_pos          [f32; 2]
///  offset 40  centre_offset       [f32; 2]
///  offset 48  alpha               f32
///  offset 52  scale               f32
///  offset 56  transform_mode      u32
///  offset 60  _pad                u32
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TileUniforms {
    pub matrix_scale: [f32; 4],
    pub resolution: [f32; 2],
    pub sampler_resolution: [f32; 2],
    pub matrix_pos: [f32; 2],
    pub centre_offset: [f32; 2],
    pub alpha: f32,
    pub scale: f32,
    pub transform_mode: u32,
    pub _pad: u32,
}

impl TileUniforms {
    /// Packs per-draw values as-is.
    ///
    /// The vertex stage divides by `viewport` and `atlas_size`; callers reject
    /// zero sizes before packing (see `TileBatchRenderer::render`).
    pub fn new(params: &TileDrawParams, viewport: Viewport, atlas_size: (u32, u32)) -> Self {
        Self {
            matrix_scale: params.world.matrix_scale(),
            resolution: [viewport.width, viewport.height],
            sampler_resolution: [atlas_size.0 as f32, atlas_size.1 as f32],
            matrix_pos: params.world.matrix_pos(),
            centre_offset: [params.adjust.centre_offset.x, params.adjust.centre_offset.y],
            alpha: params.alpha,
            scale: params.adjust.scale,
            transform_mode: params.mode.as_u32(),
            _pad: 0,
        }
    }
}
