//! Per-frame orchestration.
//!
//! A frame runs in a fixed order: update layers, batch-draw them, run the
//! post-processing chain through pooled targets, then composite to the back
//! buffer. Without a chain, layers draw straight into the back buffer.

use glam::Mat4;
use tessera_core::{
    geometry::Size,
    math::screen_projection,
    profiling::{profile_function, profile_scope},
};
use tessera_test_utils::{CommandRecorder, GpuTexture, RenderContext};

use crate::{
    batch::{BatchRenderer, BatchStats},
    config::RenderConfig,
    error::RenderResult,
    resource::ResourceId,
    scene::SpriteScene,
    sprite::{DepthMode, Shader},
    target_pool::{RenderTargetHandle, RenderTargetPool},
};

/// One full-screen pass reading the previous target.
#[derive(Debug, Clone)]
pub struct PostEffect {
    pub label: String,
    pub shader: Shader,
    /// Size class of the target this pass writes.
    pub size_class: u32,
}

impl PostEffect {
    pub fn new(label: impl Into<String>, shader: Shader, size_class: u32) -> Self {
        Self {
            label: label.into(),
            shader,
            size_class,
        }
    }
}

/// Ordered effect passes followed by a composite into the back buffer.
#[derive(Debug, Clone)]
pub struct PostEffectChain {
    steps: Vec<PostEffect>,
    composite: Shader,
}

impl PostEffectChain {
    pub fn new(composite: Shader) -> Self {
        Self {
            steps: Vec::new(),
            composite,
        }
    }

    pub fn with_step(mut self, step: PostEffect) -> Self {
        self.steps.push(step);
        self
    }

    /// Separable blur: downsample into `size_class`, then a horizontal and a
    /// vertical pass at the same class.
    pub fn blur(
        downsample: Shader,
        horizontal: Shader,
        vertical: Shader,
        composite: Shader,
        size_class: u32,
    ) -> Self {
        Self::new(composite)
            .with_step(PostEffect::new("blur downsample", downsample, size_class))
            .with_step(PostEffect::new("blur horizontal", horizontal, size_class))
            .with_step(PostEffect::new("blur vertical", vertical, size_class))
    }

    pub fn steps(&self) -> &[PostEffect] {
        &self.steps
    }

    pub fn composite(&self) -> &Shader {
        &self.composite
    }
}

/// Summary of one rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draw_calls: u32,
    pub passes: u32,
    pub state_changes: u32,
    /// Pooled targets still held when the frame ended.
    pub targets_in_use: usize,
    pub layers_rebuilt: usize,
    pub batches: BatchStats,
}

struct DepthTarget {
    size: Size<u32>,
    texture: GpuTexture,
}

pub struct FramePipeline {
    config: RenderConfig,
    size: Size<u32>,
    view: Mat4,
    projection: Mat4,
    pool: RenderTargetPool,
    renderer: BatchRenderer,
    effects: Option<PostEffectChain>,
    depth: Option<DepthTarget>,
}

impl FramePipeline {
    pub fn new(ctx: &dyn RenderContext, config: RenderConfig, width: u32, height: u32) -> Self {
        let size = Size::new(width, height);
        Self {
            pool: RenderTargetPool::new(ctx, &config, size),
            renderer: BatchRenderer::new(ctx),
            config,
            size,
            view: Mat4::IDENTITY,
            projection: screen_projection(width, height),
            effects: None,
            depth: None,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn size(&self) -> Size<u32> {
        self.size
    }

    pub fn pool(&self) -> &RenderTargetPool {
        &self.pool
    }

    pub fn renderer(&self) -> &BatchRenderer {
        &self.renderer
    }

    pub fn set_view(&mut self, view: Mat4) {
        self.view = view;
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn set_post_effects(&mut self, effects: Option<PostEffectChain>) {
        self.effects = effects;
    }

    /// Rebuild pooled targets and the projection for a new back-buffer size.
    pub fn resize(&mut self, ctx: &dyn RenderContext, width: u32, height: u32) {
        if !self.pool.resize(ctx, width, height) {
            return;
        }
        self.size = Size::new(width, height);
        self.projection = screen_projection(width, height);
        self.depth = None;
    }

    fn depth_texture(&mut self, ctx: &dyn RenderContext) -> GpuTexture {
        if let Some(depth) = &self.depth
            && depth.size == self.size
        {
            return depth.texture.clone();
        }

        let texture = ctx.create_texture(&wgpu::TextureDescriptor {
            label: Some("Sprite Depth"),
            size: wgpu::Extent3d {
                width: self.size.width.max(1),
                height: self.size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DepthMode::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        self.depth = Some(DepthTarget {
            size: self.size,
            texture: texture.clone(),
        });
        texture
    }

    /// Render one frame of `scene` into `back_buffer`.
    pub fn render(
        &mut self,
        ctx: &dyn RenderContext,
        recorder: &mut dyn CommandRecorder,
        scene: &mut SpriteScene,
        back_buffer: &GpuTexture,
    ) -> RenderResult<FrameStats> {
        profile_function!();

        self.renderer.begin_frame();
        let layers_rebuilt = scene.update(ctx)?;
        self.renderer.set_camera(ctx, self.view, self.projection);

        let back_buffer_id = ResourceId::next();
        let (target_id, target_texture, scene_target) = match &self.effects {
            Some(_) => {
                let handle = self.pool.allocate(ctx, 0)?;
                let target = self.pool.target(handle);
                (target.id(), target.texture().clone(), Some(handle))
            }
            None => (back_buffer_id, back_buffer.clone(), None),
        };
        let result = self
            .draw_layers(ctx, recorder, scene, target_id, &target_texture)
            .and_then(|()| match scene_target {
                Some(source) => self.run_effects(ctx, recorder, source, back_buffer_id, back_buffer),
                None => Ok(()),
            });
        self.renderer.end_target(recorder);
        if let Err(err) = result {
            tracing::error!("Frame aborted: {}", err);
            self.pool.release_all();
            return Err(err);
        }

        let batches = self.renderer.stats();
        Ok(FrameStats {
            draw_calls: batches.draw_calls,
            passes: self.renderer.state().passes(),
            state_changes: batches.state_changes,
            targets_in_use: self.pool.total_in_use(),
            layers_rebuilt,
            batches,
        })
    }

    /// Draw every layer into one target.
    ///
    /// Depth-tested layers need a depth attachment and the others must not
    /// have one, so the pass is restarted (loading color, clearing depth)
    /// whenever consecutive layers disagree.
    fn draw_layers(
        &mut self,
        ctx: &dyn RenderContext,
        recorder: &mut dyn CommandRecorder,
        scene: &SpriteScene,
        target_id: ResourceId,
        target: &GpuTexture,
    ) -> RenderResult<()> {
        profile_scope!("draw_layers");

        let mut depth_bound = scene
            .layers()
            .iter()
            .find(|layer| !layer.is_empty())
            .is_some_and(|layer| layer.depth_mode().is_enabled());
        let depth = depth_bound.then(|| self.depth_texture(ctx));
        self.renderer.begin_target(
            recorder,
            target_id,
            target,
            depth.as_ref(),
            Some(self.config.clear_color),
        );

        for layer in scene.layers().iter().filter(|layer| !layer.is_empty()) {
            let wants_depth = layer.depth_mode().is_enabled();
            if wants_depth != depth_bound {
                let depth = wants_depth.then(|| self.depth_texture(ctx));
                self.renderer.end_target(recorder);
                self.renderer
                    .begin_target(recorder, target_id, target, depth.as_ref(), None);
                depth_bound = wants_depth;
            }
            self.renderer.draw_layer(recorder, layer)?;
        }
        Ok(())
    }

    fn run_effects(
        &mut self,
        ctx: &dyn RenderContext,
        recorder: &mut dyn CommandRecorder,
        mut source: RenderTargetHandle,
        back_buffer_id: ResourceId,
        back_buffer: &GpuTexture,
    ) -> RenderResult<()> {
        profile_function!();

        let Some(effects) = &self.effects else {
            return Ok(());
        };
        let clear = Some(self.config.clear_color);

        for step in &effects.steps {
            let output = self.pool.allocate(ctx, step.size_class)?;
            let target = self.pool.target(output);
            self.renderer
                .begin_target(recorder, target.id(), target.texture(), None, clear);

            let input = self.pool.target(source);
            self.renderer
                .draw_fullscreen(recorder, &step.shader, input.id(), input.binding())?;
            self.pool.release(source)?;
            source = output;
        }

        self.renderer
            .begin_target(recorder, back_buffer_id, back_buffer, None, clear);
        let input = self.pool.target(source);
        self.renderer
            .draw_fullscreen(recorder, &effects.composite, input.id(), input.binding())?;
        self.pool.release(source)?;
        Ok(())
    }
}
