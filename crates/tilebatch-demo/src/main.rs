use anyhow::{Context, Result};

use tilebatch_engine::coords::{Rect, Vec2, Viewport, WorldTransform};
use tilebatch_engine::device::{Gpu, GpuInit};
use tilebatch_engine::logging::{init_logging, LoggingConfig};
use tilebatch_engine::render::{RenderCtx, RenderTarget, TileAtlas, TileBatchRenderer};
use tilebatch_engine::shader::reference::project_vertex;
use tilebatch_engine::shader::{TileBatchShader, TileDrawParams, TileShaderConfig, TileUniforms, TileVertex};

const VIEW_W: u32 = 800;
const VIEW_H: u32 = 600;
const ATLAS: u32 = 256;
const CELL: f32 = 32.0;
const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let gpu = pollster::block_on(Gpu::headless(GpuInit::default()))
        .context("GPU initialization failed")?;
    let ctx = gpu.context();

    let mut shader = TileBatchShader::new(ctx, TileShaderConfig::new(TARGET_FORMAT))
        .context("tile shader setup failed")?;
    log::info!("{} ready", shader.id());

    let atlas = TileAtlas::from_rgba8(ctx, "demo atlas", ATLAS, ATLAS, &palette_atlas())?;

    let target = ctx.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("demo offscreen target"),
        size: wgpu::Extent3d {
            width: VIEW_W,
            height: VIEW_H,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    // One row of tiles: atlas cells 0..5 of the first atlas row.
    let tiles: Vec<(Rect, Rect)> = (0..5)
        .map(|i| {
            let cell = Vec2::new(CELL, CELL);
            (Rect::grid_cell(i, 0, cell), Rect::grid_cell(i, 0, cell))
        })
        .collect();
    let strip = row_strip(&tiles);

    let params = TileDrawParams {
        world: WorldTransform::translation(64.0, 64.0),
        alpha: 0.5,
        ..TileDrawParams::default()
    };

    let rctx = RenderCtx::new(ctx, TARGET_FORMAT, Viewport::from_extent(VIEW_W, VIEW_H));
    let uniforms = TileUniforms::new(&params, rctx.viewport, atlas.size());
    for v in strip.iter().take(4) {
        let p = project_vertex(v, &uniforms);
        log::info!("corner {:?} -> clip {:?}, uv {:?}", v.position, p.clip, p.uv);
    }

    let mut encoder = ctx
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("demo encoder"),
        });

    // Clear pass; the tile pass loads on top of it.
    {
        let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("demo clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
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

    let mut renderer = TileBatchRenderer::new();
    renderer.begin_frame();
    {
        let mut rtarget = RenderTarget::new(&mut encoder, &view);
        renderer.render(&rctx, &mut rtarget, &shader, &atlas, &strip, &params)?;
    }
    ctx.queue().submit(std::iter::once(encoder.finish()));
    log::info!("submitted {} strip vertices", strip.len());

    shader.destroy()?;
    Ok(())
}

/// Joins tile quads into one strip with degenerate triangles between them.
fn row_strip(tiles: &[(Rect, Rect)]) -> Vec<TileVertex> {
    let mut strip = Vec::with_capacity(tiles.len() * 6);
    for (i, &(local, texel)) in tiles.iter().enumerate() {
        let quad = TileVertex::quad(local, texel);
        if i > 0 {
            // Repeat the previous last vertex and this first vertex.
            if let Some(&last) = strip.last() {
                strip.push(last);
            }
            strip.push(quad[0]);
        }
        strip.extend_from_slice(&quad);
    }
    strip
}

/// 8x8 grid of flat-coloured 32px cells.
fn palette_atlas() -> Vec<u8> {
    let mut pixels = Vec::with_capacity((ATLAS * ATLAS * 4) as usize);
    for y in 0..ATLAS {
        for x in 0..ATLAS {
            let (cx, cy) = (x / CELL as u32, y / CELL as u32);
            pixels.extend_from_slice(&[(cx * 32) as u8, (cy * 32) as u8, 160, 255]);
        }
    }
    pixels
}
