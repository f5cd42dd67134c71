use crate::device::GpuContext;

use super::compile::{compile_stage, Stage};
use super::link::{link, BindingKind, LinkedProgram};
use super::source::{FRAGMENT_SOURCE, VERTEX_SOURCE};
use super::{
    AttributeLocation, ProgramLocations, ShaderError, ShaderId, TileVertex, UniformLocation,
    UniformName,
};

/// Pipeline state fixed at construction.
#[derive(Debug, Clone)]
pub struct TileShaderConfig {
    /// Format of the color target the program draws into.
    pub target_format: wgpu::TextureFormat,

    /// Blend state of the color target. Blending is not decided by the shader.
    pub blend: Option<wgpu::BlendState>,
}

impl TileShaderConfig {
    /// Premultiplied-alpha blending into `target_format`.
    pub fn new(target_format: wgpu::TextureFormat) -> Self {
        Self {
            target_format,
            blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
        }
    }
}

/// Lifecycle of a shader's GPU program.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    /// No linked program (never initialized, or the last init failed).
    Unlinked,
    Ready,
    /// Terminal.
    Destroyed,
}

impl Lifecycle {
    /// Fails unless the program may be used for drawing.
    #[inline]
    pub fn require_ready(self) -> Result<(), ShaderError> {
        match self {
            Lifecycle::Ready => Ok(()),
            Lifecycle::Unlinked => Err(ShaderError::NotInitialized),
            Lifecycle::Destroyed => Err(ShaderError::Destroyed),
        }
    }
}

#[derive(Debug)]
struct GpuProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    vertex_attributes: [wgpu::VertexAttribute; 1],
}

/// Tile-batch shader program.
///
/// Owns the linked program and the binding locations a caller needs to draw
/// a tile strip. It does not draw: callers activate it on a render pass, bind
/// the atlas and uniform block at the resolved slots, and issue the draw
/// themselves (see `render::TileBatchRenderer`).
///
/// Lifecycle: `new` runs `init`; `destroy` releases the program. Every
/// draw-phase accessor fails with [`ShaderError::NotInitialized`] or
/// [`ShaderError::Destroyed`] outside the ready state.
#[derive(Debug)]
pub struct TileBatchShader {
    id: ShaderId,
    ctx: Option<GpuContext>,
    config: TileShaderConfig,
    state: Lifecycle,

    program: Option<GpuProgram>,
    locations: Option<ProgramLocations>,

    // Convenience lists for generic enumeration; cleared on destroy.
    attribute_locations: Vec<AttributeLocation>,
    uniform_locations: Vec<(UniformName, Option<UniformLocation>)>,
}

impl TileBatchShader {
    /// Creates the shader against `ctx` and initializes it synchronously.
    pub fn new(ctx: &GpuContext, config: TileShaderConfig) -> Result<Self, ShaderError> {
        let mut shader = Self {
            id: ShaderId::next(),
            ctx: Some(ctx.clone()),
            config,
            state: Lifecycle::Unlinked,
            program: None,
            locations: None,
            attribute_locations: Vec::new(),
            uniform_locations: Vec::new(),
        };
        shader.init()?;
        Ok(shader)
    }

    /// Compiles both stages, links them, resolves locations and builds the pipeline.
    ///
    /// On failure the program is left unset. Calling this again on a ready
    /// shader rebuilds the program.
    pub fn init(&mut self) -> Result<(), ShaderError> {
        if self.state == Lifecycle::Destroyed {
            log::error!("{}: init after destroy", self.id);
            return Err(ShaderError::Destroyed);
        }
        self.clear_program();

        let ctx = self.ctx.as_ref().ok_or(ShaderError::ContextMissing)?;
        if ctx.is_lost() {
            return Err(ShaderError::ContextLost);
        }

        let vertex = compile_stage(Stage::Vertex, VERTEX_SOURCE)?;
        let fragment = compile_stage(Stage::Fragment, FRAGMENT_SOURCE)?;
        let linked = link(vertex, fragment)?;

        let program = build_program(ctx.device(), &linked, &self.config, self.id)?;
        let locations = linked.locations().clone();

        self.attribute_locations = locations.attributes();
        self.uniform_locations = locations.select_uniforms();
        self.locations = Some(locations);
        self.program = Some(program);
        self.state = Lifecycle::Ready;

        log::debug!("{}: program ready ({:?})", self.id, self.config.target_format);
        Ok(())
    }

    /// Releases the program and drops the context handle.
    ///
    /// A second call fails with [`ShaderError::Destroyed`].
    pub fn destroy(&mut self) -> Result<(), ShaderError> {
        if self.state == Lifecycle::Destroyed {
            log::error!("{}: destroy called twice", self.id);
            return Err(ShaderError::Destroyed);
        }

        self.clear_program();
        self.ctx = None;
        self.state = Lifecycle::Destroyed;

        log::debug!("{}: destroyed", self.id);
        Ok(())
    }

    /// Sets this program on `pass`.
    ///
    /// wgpu has no sticky "current program"; call this before every batch draw.
    pub fn activate(&self, pass: &mut wgpu::RenderPass<'_>) -> Result<(), ShaderError> {
        let program = self.program()?;
        pass.set_pipeline(&program.pipeline);
        Ok(())
    }

    #[inline]
    pub fn id(&self) -> ShaderId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> Lifecycle {
        self.state
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == Lifecycle::Ready
    }

    #[inline]
    pub fn config(&self) -> &TileShaderConfig {
        &self.config
    }

    pub fn context(&self) -> Result<&GpuContext, ShaderError> {
        self.state.require_ready()?;
        let ctx = self.ctx.as_ref().ok_or(ShaderError::ContextMissing)?;
        if ctx.is_lost() {
            return Err(ShaderError::ContextLost);
        }
        Ok(ctx)
    }

    pub fn locations(&self) -> Result<&ProgramLocations, ShaderError> {
        self.state.require_ready()?;
        self.locations.as_ref().ok_or(ShaderError::NotInitialized)
    }

    /// Every attribute location of the program.
    pub fn attribute_locations(&self) -> Result<&[AttributeLocation], ShaderError> {
        self.state.require_ready()?;
        Ok(&self.attribute_locations)
    }

    /// `(name, location)` for [`UniformName::SELECT`].
    pub fn uniform_locations(&self) -> Result<&[(UniformName, Option<UniformLocation>)], ShaderError> {
        self.state.require_ready()?;
        Ok(&self.uniform_locations)
    }

    pub fn pipeline(&self) -> Result<&wgpu::RenderPipeline, ShaderError> {
        Ok(&self.program()?.pipeline)
    }

    /// Layout of bind group 0 (uniform block, atlas, sampler).
    pub fn bind_group_layout(&self) -> Result<&wgpu::BindGroupLayout, ShaderError> {
        Ok(&self.program()?.bind_group_layout)
    }

    /// Vertex buffer layout matching the resolved `a_position` location.
    pub fn vertex_layout(&self) -> Result<wgpu::VertexBufferLayout<'_>, ShaderError> {
        Ok(TileVertex::layout(&self.program()?.vertex_attributes))
    }

    fn program(&self) -> Result<&GpuProgram, ShaderError> {
        self.state.require_ready()?;
        self.program.as_ref().ok_or(ShaderError::NotInitialized)
    }

    fn clear_program(&mut self) {
        self.program = None;
        self.locations = None;
        self.attribute_locations.clear();
        self.uniform_locations.clear();
        if self.state == Lifecycle::Ready {
            self.state = Lifecycle::Unlinked;
        }
    }
}

fn build_program(
    device: &wgpu::Device,
    linked: &LinkedProgram,
    config: &TileShaderConfig,
    id: ShaderId,
) -> Result<GpuProgram, ShaderError> {
    let vs_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("tilebatch vertex stage"),
        source: wgpu::ShaderSource::Wgsl(linked.vertex().source().into()),
    });
    check_module(&vs_module, Stage::Vertex)?;
    let fs_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("tilebatch fragment stage"),
        source: wgpu::ShaderSource::Wgsl(linked.fragment().source().into()),
    });
    check_module(&fs_module, Stage::Fragment)?;

    let entries: Vec<wgpu::BindGroupLayoutEntry> = linked
        .bindings()
        .iter()
        .map(|b| wgpu::BindGroupLayoutEntry {
            binding: b.slot.binding,
            visibility: b.visibility,
            ty: match &b.kind {
                // One block slot per batch of a frame, selected by dynamic offset.
                BindingKind::UniformBuffer { size, .. } => wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: std::num::NonZeroU64::new(u64::from(*size)),
                },
                BindingKind::Texture => wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                BindingKind::Sampler => {
                    wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
                }
            },
            count: None,
        })
        .collect();

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("tilebatch bgl"),
        entries: &entries,
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("tilebatch pipeline layout"),
        bind_group_layouts: &[&bind_group_layout],
        immediate_size: 0,
    });

    let vertex_attributes = [TileVertex::attribute(linked.locations().position)];

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("tilebatch pipeline"),
        layout: Some(&pipeline_layout),

        vertex: wgpu::VertexState {
            module: &vs_module,
            entry_point: Some(Stage::Vertex.entry_point()),
            compilation_options: Default::default(),
            buffers: &[TileVertex::layout(&vertex_attributes)],
        },

        fragment: Some(wgpu::FragmentState {
            module: &fs_module,
            entry_point: Some(Stage::Fragment.entry_point()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: config.target_format,
                blend: config.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        // Rows of tiles arrive as one strip; the batch builder joins them with
        // degenerate triangles.
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    });

    log::trace!("{id}: built pipeline with {} bindings", entries.len());

    Ok(GpuProgram {
        pipeline,
        bind_group_layout,
        vertex_attributes,
    })
}

/// Surfaces errors the device's own shader compiler reports for `module`.
fn check_module(module: &wgpu::ShaderModule, stage: Stage) -> Result<(), ShaderError> {
    let info = pollster::block_on(module.get_compilation_info());
    let errors: Vec<String> = info
        .messages
        .iter()
        .filter(|m| matches!(m.message_type, wgpu::CompilationMessageType::Error))
        .map(|m| m.message.clone())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ShaderError::Compile {
            stage,
            message: errors.join("\n"),
        })
    }
}
