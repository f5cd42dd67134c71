use bytemuck::{Pod, Zeroable};

use crate::coords::Rect;

use super::AttributeLocation;

/// One tile-corner vertex of the strip (`a_position`).
///
///  offset 0  position  [f32; 2]   corner in world units
///  offset 8  texel     [f32; 2]   texel offset into the atlas
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct TileVertex {
    pub position: [f32; 2],
    pub texel: [f32; 2],
}

impl TileVertex {
    pub const STRIDE: u64 = std::mem::size_of::<TileVertex>() as u64;

    #[inline]
    pub const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y],
            texel: [u, v],
        }
    }

    /// Vertex attribute for `a_position` at a resolved location.
    #[inline]
    pub fn attribute(location: AttributeLocation) -> wgpu::VertexAttribute {
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x4,
            offset: 0,
            shader_location: location.0,
        }
    }

    /// Buffer layout over `attributes` (normally the single `a_position` attribute).
    pub fn layout(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: Self::STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }

    /// Four strip-ordered corners of one tile.
    ///
    /// Order is top-left, bottom-left, top-right, bottom-right so a lone quad
    /// draws as two triangles of a strip.
    pub fn quad(local: Rect, texel: Rect) -> [TileVertex; 4] {
        let (l0, l1) = (local.min(), local.max());
        let (t0, t1) = (texel.min(), texel.max());
        [
            TileVertex::new(l0.x, l0.y, t0.x, t0.y),
            TileVertex::new(l0.x, l1.y, t0.x, t1.y),
            TileVertex::new(l1.x, l0.y, t1.x, t0.y),
            TileVertex::new(l1.x, l1.y, t1.x, t1.y),
        ]
    }
}
