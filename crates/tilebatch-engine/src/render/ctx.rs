use crate::coords::Viewport;
use crate::device::GpuContext;

/// Renderer-facing context (device/queue + target format + viewport).
///
/// This is intentionally small and stable.
pub struct RenderCtx<'a> {
    pub gpu: &'a GpuContext,
    pub target_format: wgpu::TextureFormat,
    pub viewport: Viewport, // world units
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(gpu: &'a GpuContext, target_format: wgpu::TextureFormat, viewport: Viewport) -> Self {
        Self {
            gpu,
            target_format,
            viewport,
        }
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        self.gpu.device()
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        self.gpu.queue()
    }
}

/// Target for drawing (encoder + color view).
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(encoder: &'a mut wgpu::CommandEncoder, color_view: &'a wgpu::TextureView) -> Self {
        Self { encoder, color_view }
    }
}
