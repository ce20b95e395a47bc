//! Greedy sprite batching.
//!
//! A layer's draw spans are already in render order. Adjacent spans sharing a
//! texture and shader are merged into one `draw_indexed` call, so the number of
//! draw calls equals the number of maximal same-(texture, shader) runs.

use glam::Mat4;
use tessera_core::profiling::{profile_function, profile_scope};
use tessera_test_utils::{CommandRecorder, GpuBindGroup, GpuTexture, RenderContext};

use crate::{
    error::RenderResult,
    layer::{DrawSpan, SpriteLayer},
    resource::ResourceId,
    sprite::{BlendMode, DepthMode, Shader},
    state::{FrameRenderState, SOURCE_GROUP},
};

/// Per-frame batching statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Number of GPU draw calls issued.
    pub draw_calls: u32,
    pub vertices: u32,
    pub indices: u32,
    /// Triangles submitted.
    pub primitives: u32,
    /// GPU state transitions actually applied.
    pub state_changes: u32,
    /// Layers that issued at least one draw.
    pub layers_drawn: u32,
}

/// One run of adjacent spans drawn with a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Batch {
    first_span: usize,
    vertex_start: u32,
    vertex_count: u32,
    index_start: u32,
    index_count: u32,
    primitive_count: u32,
}

impl Batch {
    fn start(first_span: usize, span: &DrawSpan, vertex_start: u32, index_start: u32) -> Self {
        Self {
            first_span,
            vertex_start,
            vertex_count: span.vertex_count,
            index_start,
            index_count: span.index_count,
            primitive_count: span.index_count / 3,
        }
    }

    fn extend(&mut self, span: &DrawSpan) {
        self.vertex_count += span.vertex_count;
        self.index_count += span.index_count;
        self.primitive_count += span.index_count / 3;
    }
}

/// Split spans into maximal runs of equal texture and shader.
fn batches(spans: &[DrawSpan]) -> impl Iterator<Item = Batch> + '_ {
    let mut next = 0;
    let (mut vertex_start, mut index_start) = (0u32, 0u32);
    std::iter::from_fn(move || {
        let first = spans.get(next)?;
        let mut batch = Batch::start(next, first, vertex_start, index_start);
        next += 1;
        while let Some(span) = spans.get(next).filter(|span| span.batches_with(first)) {
            batch.extend(span);
            next += 1;
        }
        vertex_start += batch.vertex_count;
        index_start += batch.index_count;
        Some(batch)
    })
}

pub struct BatchRenderer {
    state: FrameRenderState,
    stats: BatchStats,
}

impl BatchRenderer {
    pub fn new(ctx: &dyn RenderContext) -> Self {
        Self {
            state: FrameRenderState::new(ctx),
            stats: BatchStats::default(),
        }
    }

    pub fn state(&self) -> &FrameRenderState {
        &self.state
    }

    /// Reset counters and forget cached GPU state.
    pub fn begin_frame(&mut self) {
        self.stats = BatchStats::default();
        self.state.reset();
    }

    pub fn draw_call_count(&self) -> u32 {
        self.stats.draw_calls
    }

    pub fn stats(&self) -> BatchStats {
        BatchStats {
            state_changes: self.state.state_changes(),
            ..self.stats
        }
    }

    pub fn set_camera(&mut self, ctx: &dyn RenderContext, view: Mat4, projection: Mat4) {
        self.state.set_view(ctx, view);
        self.state.set_projection(ctx, projection);
    }

    /// Make `texture` the output of subsequent draws.
    pub fn begin_target(
        &mut self,
        recorder: &mut dyn CommandRecorder,
        id: ResourceId,
        texture: &GpuTexture,
        depth: Option<&GpuTexture>,
        clear: Option<wgpu::Color>,
    ) -> bool {
        self.state
            .set_render_target(recorder, id, texture, depth, clear)
    }

    pub fn end_target(&mut self, recorder: &mut dyn CommandRecorder) {
        self.state.end_pass(recorder);
    }

    /// Issue one draw call per batch of the layer's last rebuild.
    ///
    /// A render target must already be bound. Empty layers record nothing.
    pub fn draw_layer(
        &mut self,
        recorder: &mut dyn CommandRecorder,
        layer: &SpriteLayer,
    ) -> RenderResult<()> {
        profile_function!();

        let spans = layer.spans();
        if layer.is_empty() || spans.is_empty() {
            return Ok(());
        }

        self.state.set_vertex_buffer(recorder, layer.vertex_buffer());
        self.state.set_index_buffer(recorder, layer.index_buffer());
        self.state.bind_camera(recorder);

        profile_scope!("batches");
        for batch in batches(spans) {
            debug_assert!(batch.vertex_start + batch.vertex_count <= layer.vertex_count() as u32);
            let first = &spans[batch.first_span];
            self.state
                .set_pipeline(recorder, &first.shader, layer.blend_mode(), layer.depth_mode())?;
            self.state.set_texture(recorder, &first.texture);

            recorder.draw_indexed(batch.index_start..batch.index_start + batch.index_count, 0);
            self.stats.draw_calls += 1;
            self.stats.vertices += batch.vertex_count;
            self.stats.indices += batch.index_count;
            self.stats.primitives += batch.primitive_count;
        }
        self.stats.layers_drawn += 1;

        tracing::trace!(
            "Layer '{}' drew {} sprites",
            layer.label(),
            spans.len()
        );
        Ok(())
    }

    /// Draw a full-screen triangle with `shader` sampling `source`.
    ///
    /// Effect shaders need a pipeline for opaque blending without depth and
    /// read their input from [`SOURCE_GROUP`].
    pub fn draw_fullscreen(
        &mut self,
        recorder: &mut dyn CommandRecorder,
        shader: &Shader,
        source_id: ResourceId,
        source: &GpuBindGroup,
    ) -> RenderResult<()> {
        self.state
            .set_pipeline(recorder, shader, BlendMode::Opaque, DepthMode::Disabled)?;
        self.state
            .set_bind_group(recorder, SOURCE_GROUP, source_id, source);
        recorder.draw(0..3);
        self.stats.draw_calls += 1;
        self.stats.vertices += 3;
        self.stats.primitives += 1;
        Ok(())
    }
}
