use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{ensure, Result};

use crate::device::GpuContext;

static NEXT_ATLAS_ID: AtomicU64 = AtomicU64::new(1);

/// Sampled RGBA8 texture holding packed tile images.
///
/// Pixels arrive already decoded; this type only uploads them and remembers
/// the texel size for the `sampler_resolution` uniform.
#[derive(Debug)]
pub struct TileAtlas {
    id: u64,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl TileAtlas {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// Uploads `pixels` (tightly packed, row-major RGBA8).
    pub fn from_rgba8(
        gpu: &GpuContext,
        label: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Self> {
        ensure!(width > 0 && height > 0, "atlas `{label}` has zero size");
        let expected = width as usize * height as usize * 4;
        ensure!(
            pixels.len() == expected,
            "atlas `{label}`: expected {expected} bytes for {width}x{height}, got {}",
            pixels.len()
        );
        ensure!(!gpu.is_lost(), "atlas `{label}`: GPU context was lost");

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        gpu.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = NEXT_ATLAS_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!("atlas `{label}` #{id} uploaded ({width}x{height})");

        Ok(Self {
            id,
            texture,
            view,
            width,
            height,
        })
    }

    /// Process-unique id; renderers key cached bind groups on it.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Size in texels.
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }
}
