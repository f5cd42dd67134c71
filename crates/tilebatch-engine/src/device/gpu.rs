use anyhow::{Context, Result};

use super::{GpuContext, GpuInit};

/// Owns the wgpu instance and adapter together with the device context.
///
/// Tile batches draw into caller-provided texture views, so no surface is
/// created here.
pub struct Gpu {
    /// wgpu instance used to create the adapter.
    instance: wgpu::Instance,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Device + queue handle shared with shaders and renderers.
    context: GpuContext,
}

impl Gpu {
    /// Acquires an adapter and a device without a presentation surface.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu; drive it with
    /// `pollster::block_on` from synchronous code.
    pub async fn headless(init: GpuInit) -> Result<Self> {
        let GpuInit {
            power_preference,
            force_fallback_adapter,
            backends,
            required_features,
            required_limits,
            label,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("using adapter `{}` ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok(Self {
            instance,
            adapter,
            context: GpuContext::new(device, queue),
        })
    }

    /// Returns the shared device context.
    #[inline]
    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    #[inline]
    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    #[inline]
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }
}
