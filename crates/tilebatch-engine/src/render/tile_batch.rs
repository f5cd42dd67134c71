use std::num::NonZeroU64;

use crate::coords::Viewport;
use crate::render::{RenderCtx, RenderTarget, TileAtlas};
use crate::shader::{ShaderError, ShaderId, TileBatchShader, TileDrawParams, TileUniforms, TileVertex};

const UNIFORM_SIZE: u64 = std::mem::size_of::<TileUniforms>() as u64;

/// Uniform block slots for one (shader, atlas) pair.
///
/// Each batch of a frame writes its own slot and binds it with a dynamic offset.
struct UniformSlots {
    key: (ShaderId, u64),
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    slots: u64,
}

/// Vertex buffer shared by every strip of a frame.
struct StripBuffer {
    buffer: wgpu::Buffer,
    capacity: u64, // vertices
}

/// Draws tile strips with a [`TileBatchShader`].
///
/// One call to [`render`](Self::render) is one batch: one render pass, one
/// draw over the whole strip. The strip is expected to be pre-built (rows
/// joined by degenerate triangles).
///
/// `queue.write_buffer` only lands at the next submit, so every batch of a
/// frame gets its own uniform slot and its own vertex range. Call
/// [`begin_frame`](Self::begin_frame) once per command encoder, before its
/// first batch; all batches recorded between two calls must be submitted
/// together.
///
/// GPU resources are created lazily and reused; the bind group is rebuilt
/// whenever the shader or the atlas changes or the slots run out.
#[derive(Default)]
pub struct TileBatchRenderer {
    sampler: Option<wgpu::Sampler>,
    uniforms: Option<UniformSlots>,
    strip: Option<StripBuffer>,

    // Next free uniform slot / strip vertex of the current frame.
    uniform_cursor: u64,
    vertex_cursor: u64,
}

impl TileBatchRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new frame; the next batch writes from the start of the buffers again.
    pub fn begin_frame(&mut self) {
        self.uniform_cursor = 0;
        self.vertex_cursor = 0;
    }

    /// Renders `vertices` as one triangle strip into `target`.
    ///
    /// Fails if `shader` is not ready (never initialized, or destroyed), or if
    /// the viewport or draw parameters are degenerate. An empty strip draws
    /// nothing.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        shader: &TileBatchShader,
        atlas: &TileAtlas,
        vertices: &[TileVertex],
        params: &TileDrawParams,
    ) -> Result<(), ShaderError> {
        // Resolve first so misuse after destroy surfaces even for empty batches.
        let block_group = shader.locations()?.uniform_block.group;
        if ctx.gpu.is_lost() {
            return Err(ShaderError::ContextLost);
        }
        validate_draw(ctx.viewport, params)?;

        if vertices.is_empty() {
            return Ok(());
        }

        log::trace!(
            "{}: {} strip vertices, {} texture unit(s)",
            shader.id(),
            vertices.len(),
            params.texture_count
        );

        let slot = self.uniform_cursor;
        let first_vertex = self.vertex_cursor;
        let count = vertices.len() as u64;

        let sampler = ensure_sampler(&mut self.sampler, ctx);
        let uniforms = ensure_uniform_slots(&mut self.uniforms, ctx, shader, atlas, sampler, slot + 1)?;
        let strip = ensure_strip(&mut self.strip, ctx, first_vertex + count);

        let uniform_offset = slot * uniforms.stride;
        let u = TileUniforms::new(params, ctx.viewport, atlas.size());
        ctx.queue().write_buffer(&uniforms.buffer, uniform_offset, bytemuck::bytes_of(&u));

        let start = first_vertex * TileVertex::STRIDE;
        let end = start + count * TileVertex::STRIDE;
        ctx.queue().write_buffer(&strip.buffer, start, bytemuck::cast_slice(vertices));

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tilebatch pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        // Another program may have been set on this encoder; re-activate.
        shader.activate(&mut rpass)?;
        rpass.set_bind_group(block_group, &uniforms.bind_group, &[uniform_offset as u32]);
        rpass.set_vertex_buffer(0, strip.buffer.slice(start..end));
        rpass.draw(0..count as u32, 0..1);

        self.uniform_cursor = slot + 1;
        self.vertex_cursor = first_vertex + count;
        Ok(())
    }
}

/// Rejects draws the vertex stage cannot map to clip space.
fn validate_draw(viewport: Viewport, params: &TileDrawParams) -> Result<(), ShaderError> {
    if !viewport.is_valid() {
        return Err(ShaderError::InvalidDraw(format!(
            "viewport {}x{} must be positive and finite",
            viewport.width, viewport.height
        )));
    }
    if !params.world.is_finite() {
        return Err(ShaderError::InvalidDraw("world transform is not finite".into()));
    }
    if !params.alpha.is_finite() {
        return Err(ShaderError::InvalidDraw(format!("alpha {} is not finite", params.alpha)));
    }
    Ok(())
}

fn ensure_sampler<'a>(cached: &'a mut Option<wgpu::Sampler>, ctx: &RenderCtx<'_>) -> &'a wgpu::Sampler {
    // Tiles are pixel art; nearest keeps neighbouring atlas cells from bleeding.
    cached.get_or_insert_with(|| {
        ctx.device().create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tilebatch atlas sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        })
    })
}

fn ensure_uniform_slots<'a>(
    cached: &'a mut Option<UniformSlots>,
    ctx: &RenderCtx<'_>,
    shader: &TileBatchShader,
    atlas: &TileAtlas,
    sampler: &wgpu::Sampler,
    required: u64,
) -> Result<&'a UniformSlots, ShaderError> {
    let key = (shader.id(), atlas.id());
    let current = cached.take().filter(|s| s.key == key && s.slots >= required);
    let slots = match current {
        Some(slots) => slots,
        None => UniformSlots::new(ctx, shader, atlas, sampler, key, required)?,
    };
    let slots: &'a UniformSlots = cached.insert(slots);
    Ok(slots)
}

fn ensure_strip<'a>(cached: &'a mut Option<StripBuffer>, ctx: &RenderCtx<'_>, required: u64) -> &'a StripBuffer {
    let current = cached.take().filter(|s| s.capacity >= required);
    let strip = current.unwrap_or_else(|| StripBuffer::new(ctx, required));
    cached.insert(strip)
}

impl UniformSlots {
    fn new(
        ctx: &RenderCtx<'_>,
        shader: &TileBatchShader,
        atlas: &TileAtlas,
        sampler: &wgpu::Sampler,
        key: (ShaderId, u64),
        required: u64,
    ) -> Result<Self, ShaderError> {
        let locations = shader.locations()?;
        let bgl = shader.bind_group_layout()?;

        debug_assert_eq!(u64::from(locations.uniform_block_size), UNIFORM_SIZE);

        let align = u64::from(ctx.device().limits().min_uniform_buffer_offset_alignment).max(1);
        let stride = UNIFORM_SIZE.div_ceil(align) * align;
        let slots = required.next_power_of_two().max(16);

        let buffer = ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("tilebatch uniform ubo"),
            size: stride * slots,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tilebatch bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: locations.uniform_block.binding,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &buffer,
                        offset: 0,
                        size: NonZeroU64::new(UNIFORM_SIZE),
                    }),
                },
                wgpu::BindGroupEntry {
                    binding: locations.image_sampler.slot().binding,
                    resource: wgpu::BindingResource::TextureView(atlas.view()),
                },
                wgpu::BindGroupEntry {
                    binding: locations.atlas_sampler.binding,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        log::debug!("{}: bound atlas #{} with {slots} uniform slots", key.0, key.1);

        Ok(Self {
            key,
            buffer,
            bind_group,
            stride,
            slots,
        })
    }
}

impl StripBuffer {
    fn new(ctx: &RenderCtx<'_>, required: u64) -> Self {
        let capacity = required.next_power_of_two().max(256);
        log::debug!("tilebatch strip buffer grows to {capacity} vertices");

        let buffer = ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("tilebatch strip vbo"),
            size: capacity * TileVertex::STRIDE,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { buffer, capacity }
    }
}
