//! CPU reference of the tile program.
//!
//! Mirrors `tile_batch.vert.wgsl` / `tile_batch.frag.wgsl` operation for
//! operation so the math can be checked without a device. Keep both sides
//! in sync.

use super::{TileUniforms, TileVertex, TransformMode};

/// Output of the vertex stage for one vertex.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectedVertex {
    pub clip: [f32; 4],
    pub uv: [f32; 2],
}

/// Applies the world transform to a local position.
pub fn world_position(
    pos: [f32; 2],
    matrix_scale: [f32; 4],
    matrix_pos: [f32; 2],
    mode: TransformMode,
) -> [f32; 2] {
    let [sx, kx, ky, sw] = matrix_scale;
    let [mut x, mut y] = pos;
    match mode {
        TransformMode::Sequential => {
            x = sx * x + ky * y + matrix_pos[0];
            y = kx * x + sw * y + matrix_pos[1];
        }
        TransformMode::Affine => {
            let (ox, oy) = (x, y);
            x = sx * ox + ky * oy + matrix_pos[0];
            y = kx * ox + sw * oy + matrix_pos[1];
        }
    }
    [x, y]
}

/// Maps a world position to clip space (top-left origin → centre origin, +Y up).
#[inline]
pub fn normalize_to_clip(pos: [f32; 2], resolution: [f32; 2]) -> [f32; 2] {
    let x = pos[0] / resolution[0] * 2.0;
    let y = pos[1] / resolution[1] * 2.0;
    [x - 1.0, 1.0 - y]
}

/// Texel offset → normalized atlas coordinate.
#[inline]
pub fn texel_to_uv(texel: [f32; 2], sampler_resolution: [f32; 2]) -> [f32; 2] {
    [texel[0] / sampler_resolution[0], texel[1] / sampler_resolution[1]]
}

/// Runs the vertex stage for one vertex.
pub fn project_vertex(vertex: &TileVertex, uniforms: &TileUniforms) -> ProjectedVertex {
    let mode = if uniforms.transform_mode == TransformMode::Sequential.as_u32() {
        TransformMode::Sequential
    } else {
        TransformMode::Affine
    };
    let world = world_position(vertex.position, uniforms.matrix_scale, uniforms.matrix_pos, mode);
    let [x, y] = normalize_to_clip(world, uniforms.resolution);

    ProjectedVertex {
        clip: [x, y, 1.0, 1.0],
        uv: texel_to_uv(vertex.texel, uniforms.sampler_resolution),
    }
}

/// Runs the fragment stage on an already-sampled atlas texel.
#[inline]
pub fn shade_fragment(sample: [f32; 4], uniforms: &TileUniforms) -> [f32; 4] {
    sample.map(|c| c * uniforms.alpha)
}
