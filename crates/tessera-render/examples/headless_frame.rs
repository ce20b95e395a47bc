//! Renders a few frames of sprites through a grayscale post effect into an
//! offscreen back buffer. No window is needed.
//!
//! Run with `cargo run -p tessera-render --example headless_frame`. Set
//! `TESSERA_PROFILE=http` to serve puffin scopes to `puffin_viewer`.

use glam::{Vec2, Vec4};
use tessera_core::{config::Config, geometry::Size, logging, profiling::new_frame};
use tessera_render::{
    BlendMode, DepthMode, FramePipeline, GraphicsContext, PostEffect, PostEffectChain,
    RenderConfig, RenderContext, Shader, Sprite, SpriteScene, Texture, TextureSprite, Vertex,
    WgpuCommandRecorder,
};
use tessera_test_utils::{GpuBindGroupLayout, GpuRenderPipeline};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

const SPRITE_SHADER: &str = r#"
struct Camera {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> camera: Camera;
@group(1) @binding(0) var sprite_texture: texture_2d<f32>;
@group(1) @binding(1) var sprite_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) tex_coords: vec2<f32>,
    @location(2) alpha: f32,
};

@vertex
fn vs_main(
    @location(0) position: vec2<f32>,
    @location(1) color: vec4<f32>,
    @location(2) tex_coords: vec2<f32>,
    @location(3) alpha: f32,
) -> VertexOutput {
    var out: VertexOutput;
    out.position = camera.projection * camera.view * vec4<f32>(position, 0.0, 1.0);
    out.color = color;
    out.tex_coords = tex_coords;
    out.alpha = alpha;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(sprite_texture, sprite_sampler, in.tex_coords) * in.color;
    return vec4<f32>(texel.rgb, texel.a * in.alpha);
}
"#;

const FULLSCREEN_SHADER: &str = r#"
@group(0) @binding(0) var source_texture: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv * vec2<f32>(2.0, -2.0) + vec2<f32>(-1.0, 1.0), 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_copy(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(source_texture, source_sampler, in.uv);
}

@fragment
fn fs_grayscale(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(source_texture, source_sampler, in.uv);
    let luma = dot(color.rgb, vec3<f32>(0.2126, 0.7152, 0.0722));
    return vec4<f32>(vec3<f32>(luma), color.a);
}
"#;

struct PipelineFactory<'a> {
    ctx: &'a GraphicsContext,
    format: wgpu::TextureFormat,
}

impl PipelineFactory<'_> {
    fn build(
        &self,
        label: &str,
        source: &str,
        fragment: &str,
        layouts: &[&GpuBindGroupLayout],
        buffers: &[wgpu::VertexBufferLayout<'static>],
        blend: BlendMode,
    ) -> GpuRenderPipeline {
        let device = &self.ctx.device;
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let bind_group_layouts: Vec<_> = layouts.iter().map(|layout| layout.as_wgpu()).collect();
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some(fragment),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: blend.blend_state(),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: DepthMode::Disabled.depth_stencil(),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        GpuRenderPipeline::from_wgpu(pipeline)
    }
}

fn white_texture(ctx: &GraphicsContext, layout: &GpuBindGroupLayout) -> Texture {
    let texture = ctx.create_texture(&wgpu::TextureDescriptor {
        label: Some("White"),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    ctx.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: texture.as_wgpu(),
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &[255; 4],
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: None,
        },
        wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
    );
    let sampler = ctx.create_sampler(&wgpu::SamplerDescriptor::default());
    let binding = ctx.create_texture_binding(Some("White Binding"), layout, &texture, &sampler);
    Texture::new("white", Size::new(1, 1), binding)
}

fn main() {
    logging::init();
    Config::from_env().apply();

    let ctx = match GraphicsContext::new_owned_sync() {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::error!("{}", err);
            return;
        }
    };

    let config = RenderConfig::default();
    let factory = PipelineFactory {
        ctx: &ctx,
        format: config.target_format,
    };
    let mut scene = SpriteScene::new(config.clone());
    let mut pipeline = FramePipeline::new(ctx.as_ref(), config.clone(), WIDTH, HEIGHT);

    let source_layout = pipeline.pool().binding_layout().clone();
    let camera_layout = pipeline.renderer().state().camera_layout().clone();
    let sprite_shader = Shader::with_pipeline(
        "sprite",
        BlendMode::Alpha,
        DepthMode::Disabled,
        factory.build(
            "Sprite Pipeline",
            SPRITE_SHADER,
            "fs_main",
            &[&camera_layout, &source_layout],
            &[Vertex::layout()],
            BlendMode::Alpha,
        ),
    );
    let fullscreen = |label: &str, fragment: &str| {
        Shader::with_pipeline(
            label,
            BlendMode::Opaque,
            DepthMode::Disabled,
            factory.build(
                label,
                FULLSCREEN_SHADER,
                fragment,
                &[&source_layout],
                &[],
                BlendMode::Opaque,
            ),
        )
    };
    pipeline.set_post_effects(Some(
        PostEffectChain::new(fullscreen("composite", "fs_copy"))
            .with_step(PostEffect::new("grayscale", fullscreen("grayscale", "fs_grayscale"), 1)),
    ));

    let layer = scene.create_layer(ctx.as_ref(), "world", BlendMode::Alpha, DepthMode::Disabled);
    let white = white_texture(&ctx, &source_layout);
    let mut ids = Vec::new();
    for i in 0..64 {
        let sprite = Sprite::texture_quad(
            TextureSprite::new(Vec2::splat(24.0)),
            white.clone(),
            sprite_shader.clone(),
        )
        .with_origin(Vec2::new(40.0 + (i % 8) as f32 * 70.0, 40.0 + (i / 8) as f32 * 55.0))
        .with_color(Vec4::new(i as f32 / 64.0, 0.4, 1.0 - i as f32 / 64.0, 1.0));
        let id = scene.spawn(sprite);
        if let Err(err) = scene.add_sprite(layer, id) {
            tracing::error!("{}", err);
            return;
        }
        ids.push(id);
    }

    let back_buffer = ctx.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Back Buffer"),
        size: wgpu::Extent3d {
            width: WIDTH,
            height: HEIGHT,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: config.target_format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    for frame in 0..3 {
        new_frame();
        for id in &ids {
            let angle = scene.sprite(*id).angle();
            scene.sprite_mut(*id).set_angle(angle + 0.1);
        }

        let mut recorder = WgpuCommandRecorder::new(&ctx, Some("Frame Encoder"));
        match pipeline.render(ctx.as_ref(), &mut recorder, &mut scene, &back_buffer) {
            Ok(stats) => {
                recorder.submit(&ctx);
                tracing::info!(
                    "Frame {}: {} draw calls, {} passes, {} state changes",
                    frame,
                    stats.draw_calls,
                    stats.passes,
                    stats.state_changes
                );
            }
            Err(err) => {
                tracing::error!("Frame {} failed: {}", frame, err);
                return;
            }
        }
    }
}
