//! Lifecycle and rendering tests against a real device.
//!
//! Each test returns early when the machine has no usable adapter.

use tilebatch_engine::coords::{Rect, Vec2, Viewport, WorldTransform};
use tilebatch_engine::device::{Gpu, GpuInit};
use tilebatch_engine::render::{RenderCtx, RenderTarget, TileAtlas, TileBatchRenderer};
use tilebatch_engine::shader::reference::{project_vertex, shade_fragment};
use tilebatch_engine::shader::{
    AttributeLocation, Lifecycle, ShaderError, TileBatchShader, TileDrawParams, TileShaderConfig,
    TileUniforms, TileVertex, TransformMode, UniformName,
};

// Linear target so read-back bytes equal the fragment output.
const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const VIEW_W: u32 = 800;
const VIEW_H: u32 = 600;
const ATLAS: u32 = 256;

const MAGENTA: [f32; 4] = [1.0, 0.0, 1.0, 1.0];
const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];

fn try_gpu() -> Option<Gpu> {
    let init = GpuInit {
        power_preference: wgpu::PowerPreference::LowPower,
        ..GpuInit::default()
    };
    match pollster::block_on(Gpu::headless(init)) {
        Ok(gpu) => Some(gpu),
        Err(err) => {
            eprintln!("skipping GPU test: {err:#}");
            None
        }
    }
}

fn shader(gpu: &Gpu) -> TileBatchShader {
    TileBatchShader::new(gpu.context(), TileShaderConfig::new(TARGET_FORMAT)).unwrap()
}

/// Atlas whose first 32x32 cell is magenta and everything else green.
fn two_colour_atlas(gpu: &Gpu) -> TileAtlas {
    let mut pixels: Vec<u8> = Vec::with_capacity((ATLAS * ATLAS * 4) as usize);
    for y in 0..ATLAS {
        for x in 0..ATLAS {
            let px: [u8; 4] = if x < 32 && y < 32 { [255, 0, 255, 255] } else { [0, 255, 0, 255] };
            pixels.extend_from_slice(&px);
        }
    }
    TileAtlas::from_rgba8(gpu.context(), "test atlas", ATLAS, ATLAS, &pixels).unwrap()
}

fn offscreen(gpu: &Gpu) -> wgpu::Texture {
    gpu.context().device().create_texture(&wgpu::TextureDescriptor {
        label: Some("test target"),
        size: wgpu::Extent3d {
            width: VIEW_W,
            height: VIEW_H,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

fn clear(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
    let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("test clear"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
}

/// Pixels of `texture` after `encoder` runs, row-major RGBA8.
fn submit_and_read(gpu: &Gpu, mut encoder: wgpu::CommandEncoder, texture: &wgpu::Texture) -> Pixels {
    let device = gpu.context().device();
    let padded_row = (VIEW_W * 4).div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("test readback"),
        size: u64::from(padded_row * VIEW_H),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &readback,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(VIEW_H),
            },
        },
        wgpu::Extent3d {
            width: VIEW_W,
            height: VIEW_H,
            depth_or_array_layers: 1,
        },
    );
    gpu.context().queue().submit(std::iter::once(encoder.finish()));

    let slice = readback.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |res| {
        let _ = tx.send(res);
    });
    device.poll(wgpu::PollType::wait_indefinitely()).unwrap();
    rx.recv().unwrap().unwrap();

    let mut data = Vec::with_capacity((VIEW_W * VIEW_H * 4) as usize);
    {
        let mapped = slice.get_mapped_range();
        for row in mapped.chunks(padded_row as usize).take(VIEW_H as usize) {
            data.extend_from_slice(&row[..(VIEW_W * 4) as usize]);
        }
    }
    readback.unmap();
    Pixels(data)
}

struct Pixels(Vec<u8>);

impl Pixels {
    fn at(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * VIEW_W + x) * 4) as usize;
        [self.0[i], self.0[i + 1], self.0[i + 2], self.0[i + 3]]
    }

    fn assert_colour(&self, (x, y): (u32, u32), expected: [f32; 4]) {
        let got = self.at(x, y);
        for (c, (&g, e)) in got.iter().zip(expected).enumerate() {
            let e = (e * 255.0).round() as i32;
            assert!(
                (i32::from(g) - e).abs() <= 1,
                "pixel ({x}, {y}) channel {c}: got {got:?}, expected {expected:?}"
            );
        }
    }
}

/// Framebuffer coordinate of a clip-space position, rounded to the nearest
/// pixel corner.
fn clip_to_pixel(clip: [f32; 4]) -> (u32, u32) {
    let x = (clip[0] + 1.0) * 0.5 * VIEW_W as f32;
    let y = (1.0 - clip[1]) * 0.5 * VIEW_H as f32;
    (x.round() as u32, y.round() as u32)
}

fn uniforms(params: &TileDrawParams, atlas: &TileAtlas) -> TileUniforms {
    TileUniforms::new(params, Viewport::from_extent(VIEW_W, VIEW_H), atlas.size())
}

/// Pixel at the centre of `quad` as the vertex stage places it.
fn quad_centre(quad: &[TileVertex; 4], u: &TileUniforms) -> (u32, u32) {
    let clips: Vec<[f32; 4]> = quad.iter().map(|v| project_vertex(v, u).clip).collect();
    let cx = clips.iter().map(|c| c[0]).sum::<f32>() / 4.0;
    let cy = clips.iter().map(|c| c[1]).sum::<f32>() / 4.0;
    clip_to_pixel([cx, cy, 1.0, 1.0])
}

#[test]
fn construction_links_and_resolves() {
    let Some(gpu) = try_gpu() else { return };
    let shader = shader(&gpu);

    assert_eq!(shader.state(), Lifecycle::Ready);
    assert_eq!(shader.attribute_locations().unwrap(), &[AttributeLocation(0)]);

    let names: Vec<UniformName> = shader
        .uniform_locations()
        .unwrap()
        .iter()
        .map(|(name, _)| *name)
        .collect();
    assert_eq!(names, UniformName::SELECT.to_vec());
    assert!(shader.vertex_layout().is_ok());
}

#[test]
fn instances_get_increasing_ids() {
    let Some(gpu) = try_gpu() else { return };
    let a = shader(&gpu);
    let b = shader(&gpu);
    assert!(b.id() > a.id());
}

#[test]
fn destroy_invalidates_everything() {
    let Some(gpu) = try_gpu() else { return };
    let mut shader = shader(&gpu);

    shader.destroy().unwrap();

    assert_eq!(shader.state(), Lifecycle::Destroyed);
    assert_eq!(shader.locations().unwrap_err(), ShaderError::Destroyed);
    assert_eq!(shader.attribute_locations().unwrap_err(), ShaderError::Destroyed);
    assert_eq!(shader.pipeline().unwrap_err(), ShaderError::Destroyed);
    assert_eq!(shader.context().unwrap_err(), ShaderError::Destroyed);
    assert_eq!(shader.destroy().unwrap_err(), ShaderError::Destroyed);
    assert_eq!(shader.init().unwrap_err(), ShaderError::Destroyed);
}

#[test]
fn reinit_keeps_the_program_usable() {
    let Some(gpu) = try_gpu() else { return };
    let mut shader = shader(&gpu);
    let before = shader.locations().unwrap().clone();
    shader.init().unwrap();
    assert_eq!(shader.locations().unwrap(), &before);
}

#[test]
fn single_tile_matches_reference() {
    let Some(gpu) = try_gpu() else { return };
    let shader = shader(&gpu);
    let atlas = two_colour_atlas(&gpu);
    let texture = offscreen(&gpu);
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let ctx = RenderCtx::new(gpu.context(), TARGET_FORMAT, Viewport::from_extent(VIEW_W, VIEW_H));
    let mut encoder = ctx
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("test encoder") });
    clear(&mut encoder, &view);

    let quad = TileVertex::quad(Rect::new(0.0, 0.0, 32.0, 32.0), Rect::new(0.0, 0.0, 32.0, 32.0));
    let params = TileDrawParams {
        alpha: 0.5,
        ..TileDrawParams::default()
    };

    let mut renderer = TileBatchRenderer::new();
    renderer.begin_frame();
    {
        let mut target = RenderTarget::new(&mut encoder, &view);
        renderer
            .render(&ctx, &mut target, &shader, &atlas, &quad, &params)
            .unwrap();
        renderer
            .render(&ctx, &mut target, &shader, &atlas, &[], &params)
            .unwrap();
    }
    let pixels = submit_and_read(&gpu, encoder, &texture);

    let u = uniforms(&params, &atlas);
    let expected = shade_fragment(MAGENTA, &u);
    let top_left = clip_to_pixel(project_vertex(&quad[0], &u).clip);
    let bottom_right = clip_to_pixel(project_vertex(&quad[3], &u).clip);
    assert_eq!((top_left, bottom_right), ((0, 0), (32, 32)));

    let (x1, y1) = bottom_right;
    pixels.assert_colour(top_left, expected);
    pixels.assert_colour(quad_centre(&quad, &u), expected);
    pixels.assert_colour((x1 - 1, y1 - 1), expected);
    pixels.assert_colour((x1, y1 / 2), [0.0; 4]);
    pixels.assert_colour((x1 / 2, y1), [0.0; 4]);
}

#[test]
fn batches_in_one_encoder_keep_their_own_data() {
    let Some(gpu) = try_gpu() else { return };
    let shader = shader(&gpu);
    let atlas = two_colour_atlas(&gpu);
    let texture = offscreen(&gpu);
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let ctx = RenderCtx::new(gpu.context(), TARGET_FORMAT, Viewport::from_extent(VIEW_W, VIEW_H));
    let mut encoder = ctx
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("test encoder") });
    clear(&mut encoder, &view);

    let cell = Vec2::new(32.0, 32.0);
    let first = TileVertex::quad(Rect::new(0.0, 0.0, 32.0, 32.0), Rect::grid_cell(0, 0, cell));
    let first_params = TileDrawParams {
        alpha: 0.5,
        ..TileDrawParams::default()
    };
    let second = TileVertex::quad(Rect::new(0.0, 0.0, 32.0, 32.0), Rect::grid_cell(1, 0, cell));
    let second_params = TileDrawParams {
        world: WorldTransform::translation(64.0, 0.0),
        alpha: 1.0,
        ..TileDrawParams::default()
    };

    let mut renderer = TileBatchRenderer::new();
    renderer.begin_frame();
    {
        let mut target = RenderTarget::new(&mut encoder, &view);
        renderer
            .render(&ctx, &mut target, &shader, &atlas, &first, &first_params)
            .unwrap();
        renderer
            .render(&ctx, &mut target, &shader, &atlas, &second, &second_params)
            .unwrap();
    }
    let pixels = submit_and_read(&gpu, encoder, &texture);

    let u1 = uniforms(&first_params, &atlas);
    let u2 = uniforms(&second_params, &atlas);
    pixels.assert_colour(quad_centre(&first, &u1), shade_fragment(MAGENTA, &u1));
    pixels.assert_colour(quad_centre(&second, &u2), shade_fragment(GREEN, &u2));
    pixels.assert_colour((48, 16), [0.0; 4]);
}

#[test]
fn sequential_skew_lands_where_reference_says() {
    let Some(gpu) = try_gpu() else { return };
    let shader = shader(&gpu);
    let atlas = two_colour_atlas(&gpu);
    let texture = offscreen(&gpu);
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let ctx = RenderCtx::new(gpu.context(), TARGET_FORMAT, Viewport::from_extent(VIEW_W, VIEW_H));
    let mut encoder = ctx
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("test encoder") });
    clear(&mut encoder, &view);

    // y' = x' + y: the sequential and affine placements are ~100px apart.
    let world = WorldTransform {
        skew_x: 1.0,
        ..WorldTransform::translation(100.0, 0.0)
    };
    let params = TileDrawParams {
        world,
        mode: TransformMode::Sequential,
        ..TileDrawParams::default()
    };
    let quad = TileVertex::quad(Rect::new(0.0, 0.0, 16.0, 16.0), Rect::new(0.0, 0.0, 16.0, 16.0));

    let mut renderer = TileBatchRenderer::new();
    renderer.begin_frame();
    {
        let mut target = RenderTarget::new(&mut encoder, &view);
        renderer
            .render(&ctx, &mut target, &shader, &atlas, &quad, &params)
            .unwrap();
    }
    let pixels = submit_and_read(&gpu, encoder, &texture);

    let sequential = uniforms(&params, &atlas);
    let affine = uniforms(
        &TileDrawParams {
            mode: TransformMode::Affine,
            ..params
        },
        &atlas,
    );
    let drawn_at = quad_centre(&quad, &sequential);
    let affine_at = quad_centre(&quad, &affine);
    assert_eq!(drawn_at, (108, 116));
    assert_eq!(affine_at, (108, 16));

    pixels.assert_colour(drawn_at, shade_fragment(MAGENTA, &sequential));
    pixels.assert_colour(affine_at, [0.0; 4]);
}

#[test]
fn renderer_rejects_destroyed_shader() {
    let Some(gpu) = try_gpu() else { return };
    let mut shader = shader(&gpu);
    let atlas = two_colour_atlas(&gpu);
    let texture = offscreen(&gpu);
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    shader.destroy().unwrap();

    let ctx = RenderCtx::new(gpu.context(), TARGET_FORMAT, Viewport::from_extent(VIEW_W, VIEW_H));
    let mut encoder = ctx
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    let mut target = RenderTarget::new(&mut encoder, &view);

    let err = TileBatchRenderer::new()
        .render(&ctx, &mut target, &shader, &atlas, &[], &TileDrawParams::default())
        .unwrap_err();
    assert_eq!(err, ShaderError::Destroyed);
}

#[test]
fn renderer_rejects_empty_viewport() {
    let Some(gpu) = try_gpu() else { return };
    let shader = shader(&gpu);
    let atlas = two_colour_atlas(&gpu);
    let texture = offscreen(&gpu);
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let ctx = RenderCtx::new(gpu.context(), TARGET_FORMAT, Viewport::new(0.0, 0.0));
    let mut encoder = ctx
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    let mut target = RenderTarget::new(&mut encoder, &view);

    let quad = TileVertex::quad(Rect::new(0.0, 0.0, 32.0, 32.0), Rect::new(0.0, 0.0, 32.0, 32.0));
    let err = TileBatchRenderer::new()
        .render(&ctx, &mut target, &shader, &atlas, &quad, &TileDrawParams::default())
        .unwrap_err();
    assert!(matches!(err, ShaderError::InvalidDraw(_)));
}

#[test]
fn atlas_rejects_short_pixel_buffer() {
    let Some(gpu) = try_gpu() else { return };
    let err = TileAtlas::from_rgba8(gpu.context(), "short", 4, 4, &[0u8; 10]).unwrap_err();
    assert!(err.to_string().contains("expected 64 bytes"));
}
