//! Whole-frame behaviour: layer passes, post-effect chains and compositing.

use glam::{Mat4, Vec2};
use tessera_core::geometry::Size;
use tessera_render::{
    BlendMode, DepthMode, FramePipeline, LayerId, PostEffect, PostEffectChain, RenderConfig,
    RenderError, Shader, Sprite, SpriteScene, Texture, TextureSprite,
};
use tessera_test_utils::{
    GpuBindGroup, GpuRenderPipeline, GpuTexture, MockCommandRecorder, MockRenderContext, PassCall,
};

const BACK_BUFFER: usize = 7000;

fn back_buffer() -> GpuTexture {
    GpuTexture::mock(BACK_BUFFER, 320, 240, wgpu::TextureFormat::Bgra8UnormSrgb)
}

fn sprite_shader() -> Shader {
    Shader::builder("sprite")
        .pipeline(BlendMode::Alpha, DepthMode::Disabled, GpuRenderPipeline::mock(7001))
        .pipeline(BlendMode::Alpha, DepthMode::TestAndWrite, GpuRenderPipeline::mock(7002))
        .build()
}

fn effect_shader(label: &str) -> Shader {
    Shader::with_pipeline(
        label,
        BlendMode::Opaque,
        DepthMode::Disabled,
        GpuRenderPipeline::mock(7003),
    )
}

fn blur_chain() -> PostEffectChain {
    PostEffectChain::blur(
        effect_shader("downsample"),
        effect_shader("blur h"),
        effect_shader("blur v"),
        effect_shader("composite"),
        1,
    )
}

fn populate(scene: &mut SpriteScene, layer: LayerId, count: usize) {
    let texture = Texture::new("atlas", Size::new(32, 32), GpuBindGroup::mock(7004));
    let shader = sprite_shader();
    for i in 0..count {
        let sprite = Sprite::texture_quad(
            TextureSprite::new(Vec2::splat(4.0)),
            texture.clone(),
            shader.clone(),
        )
        .with_origin(Vec2::new(i as f32 * 8.0, 16.0));
        let id = scene.spawn(sprite);
        scene.add_sprite(layer, id).unwrap();
    }
}

fn scene_with_sprites(ctx: &MockRenderContext, count: usize) -> SpriteScene {
    let mut scene = SpriteScene::new(RenderConfig::default());
    let layer = scene.create_layer(ctx, "world", BlendMode::Alpha, DepthMode::Disabled);
    populate(&mut scene, layer, count);
    scene
}

#[test]
fn without_effects_layers_draw_into_back_buffer() {
    let ctx = MockRenderContext::new();
    let mut scene = scene_with_sprites(&ctx, 3);
    let mut pipeline = FramePipeline::new(&ctx, RenderConfig::default(), 320, 240);
    let mut recorder = MockCommandRecorder::new();

    let stats = pipeline
        .render(&ctx, &mut recorder, &mut scene, &back_buffer())
        .unwrap();

    assert_eq!(stats.passes, 1);
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.layers_rebuilt, 1);
    assert_eq!(stats.batches.indices, 18);
    assert_eq!(stats.targets_in_use, 0);
    assert_eq!(pipeline.pool().total_targets(), 0);
    assert!(matches!(
        recorder.calls()[0],
        PassCall::BeginPass {
            target: Some(BACK_BUFFER),
            depth: None,
            clear: Some(_),
            ..
        }
    ));
    assert!(!recorder.is_in_pass());
}

#[test]
fn blur_chain_returns_every_target() {
    let ctx = MockRenderContext::new();
    let mut scene = scene_with_sprites(&ctx, 5);
    let mut pipeline = FramePipeline::new(&ctx, RenderConfig::default(), 320, 240);
    pipeline.set_post_effects(Some(blur_chain()));
    let mut recorder = MockCommandRecorder::new();

    let stats = pipeline
        .render(&ctx, &mut recorder, &mut scene, &back_buffer())
        .unwrap();

    assert_eq!(stats.targets_in_use, 0);
    assert_eq!(stats.passes, 5);
    assert_eq!(stats.draw_calls, 5);
    assert_eq!(recorder.count_indexed_draws(), 1);
    assert_eq!(recorder.count_draws(), 5);
    assert_eq!(pipeline.pool().total_targets(), 3);
    assert_eq!(pipeline.pool().available_count(0), 1);
    assert_eq!(pipeline.pool().available_count(1), 2);

    let last_pass = recorder
        .calls()
        .iter()
        .rev()
        .find_map(|call| match call {
            PassCall::BeginPass { target, .. } => Some(*target),
            _ => None,
        });
    assert_eq!(last_pass, Some(Some(BACK_BUFFER)));
}

#[test]
fn second_frame_reuses_pooled_targets() {
    let ctx = MockRenderContext::new();
    let mut scene = scene_with_sprites(&ctx, 2);
    let mut pipeline = FramePipeline::new(&ctx, RenderConfig::default(), 320, 240);
    pipeline.set_post_effects(Some(blur_chain()));
    let mut recorder = MockCommandRecorder::new();
    pipeline
        .render(&ctx, &mut recorder, &mut scene, &back_buffer())
        .unwrap();
    let textures = ctx.count_texture_creates();

    let stats = pipeline
        .render(&ctx, &mut recorder, &mut scene, &back_buffer())
        .unwrap();

    assert_eq!(ctx.count_texture_creates(), textures);
    assert_eq!(stats.layers_rebuilt, 0);
    assert_eq!(stats.targets_in_use, 0);
}

#[test]
fn empty_layers_only_clear() {
    let ctx = MockRenderContext::new();
    let mut scene = SpriteScene::new(RenderConfig::default());
    scene.create_layer(&ctx, "background", BlendMode::Alpha, DepthMode::Disabled);
    scene.create_layer(&ctx, "foreground", BlendMode::Additive, DepthMode::TestAndWrite);
    let mut pipeline = FramePipeline::new(&ctx, RenderConfig::default(), 320, 240);
    let mut recorder = MockCommandRecorder::new();

    let stats = pipeline
        .render(&ctx, &mut recorder, &mut scene, &back_buffer())
        .unwrap();

    assert_eq!(stats.draw_calls, 0);
    assert_eq!(stats.passes, 1);
    assert_eq!(recorder.count_draws(), 0);
    assert_eq!(recorder.count_vertex_buffer_binds(), 0);
    assert_eq!(ctx.count_texture_creates(), 0);
}

#[test]
fn depth_layers_get_their_own_attachment() {
    let ctx = MockRenderContext::new();
    let mut scene = SpriteScene::new(RenderConfig::default());
    let world = scene.create_layer(&ctx, "world", BlendMode::Alpha, DepthMode::TestAndWrite);
    let hud = scene.create_layer(&ctx, "hud", BlendMode::Alpha, DepthMode::Disabled);
    populate(&mut scene, world, 2);
    populate(&mut scene, hud, 2);
    let mut pipeline = FramePipeline::new(&ctx, RenderConfig::default(), 320, 240);
    let mut recorder = MockCommandRecorder::new();

    let stats = pipeline
        .render(&ctx, &mut recorder, &mut scene, &back_buffer())
        .unwrap();

    let passes: Vec<_> = recorder
        .calls()
        .iter()
        .filter_map(|call| match call {
            PassCall::BeginPass { depth, clear, .. } => Some((depth.is_some(), clear.is_some())),
            _ => None,
        })
        .collect();
    assert_eq!(passes, vec![(true, true), (false, false)]);
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(ctx.count_texture_creates(), 1);
}

#[test]
fn effect_without_opaque_pipeline_fails_cleanly() {
    let ctx = MockRenderContext::new();
    let mut scene = scene_with_sprites(&ctx, 1);
    let mut pipeline = FramePipeline::new(&ctx, RenderConfig::default(), 320, 240);
    let broken = Shader::with_pipeline(
        "broken",
        BlendMode::Additive,
        DepthMode::Disabled,
        GpuRenderPipeline::mock(7005),
    );
    pipeline.set_post_effects(Some(
        PostEffectChain::new(effect_shader("composite")).with_step(PostEffect::new(
            "broken",
            broken,
            0,
        )),
    ));
    let mut recorder = MockCommandRecorder::new();

    let result = pipeline.render(&ctx, &mut recorder, &mut scene, &back_buffer());

    assert!(matches!(result, Err(RenderError::MissingPipeline { .. })));
    assert_eq!(pipeline.pool().total_in_use(), 0);
    assert!(!recorder.is_in_pass());
}

#[test]
fn resize_updates_projection_and_targets() {
    let ctx = MockRenderContext::new();
    let mut scene = scene_with_sprites(&ctx, 1);
    let mut pipeline = FramePipeline::new(&ctx, RenderConfig::default(), 320, 240);
    pipeline.set_post_effects(Some(blur_chain()));
    let mut recorder = MockCommandRecorder::new();
    pipeline
        .render(&ctx, &mut recorder, &mut scene, &back_buffer())
        .unwrap();
    let projection = pipeline.projection();

    pipeline.resize(&ctx, 640, 480);

    assert_ne!(pipeline.projection(), projection);
    assert_eq!(pipeline.size(), Size::new(640, 480));
    assert_eq!(pipeline.pool().size(), Size::new(640, 480));
    assert_eq!(ctx.count_texture_creates(), 6);

    pipeline.set_view(Mat4::from_translation(glam::Vec3::new(-10.0, 0.0, 0.0)));
    let stats = pipeline
        .render(&ctx, &mut recorder, &mut scene, &back_buffer())
        .unwrap();
    assert_eq!(stats.targets_in_use, 0);
    assert_eq!(ctx.count_texture_creates(), 6);
}
