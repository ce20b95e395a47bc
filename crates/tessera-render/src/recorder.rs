//! [`CommandRecorder`] over a `wgpu::CommandEncoder`.

use std::ops::Range;

use tessera_core::profiling::profile_function;
use tessera_test_utils::{
    CommandRecorder, GpuBindGroup, GpuBuffer, GpuRenderPipeline, GpuTexture,
};

use crate::context::GraphicsContext;

/// Records one frame's passes into a command encoder.
///
/// At most one render pass is open at a time. Commands issued with no pass
/// open are logged and dropped.
pub struct WgpuCommandRecorder {
    encoder: wgpu::CommandEncoder,
    pass: Option<wgpu::RenderPass<'static>>,
}

impl WgpuCommandRecorder {
    pub fn new(ctx: &GraphicsContext, label: Option<&str>) -> Self {
        Self {
            encoder: ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor { label }),
            pass: None,
        }
    }

    /// End any open pass and finish the encoder.
    pub fn finish(mut self) -> wgpu::CommandBuffer {
        self.end_pass();
        self.encoder.finish()
    }

    pub fn submit(self, ctx: &GraphicsContext) {
        profile_function!();
        ctx.queue.submit(std::iter::once(self.finish()));
    }

    fn pass(&mut self, command: &str) -> Option<&mut wgpu::RenderPass<'static>> {
        if self.pass.is_none() {
            tracing::error!("{} recorded outside of a render pass", command);
        }
        self.pass.as_mut()
    }
}

impl CommandRecorder for WgpuCommandRecorder {
    fn begin_pass(
        &mut self,
        label: Option<&str>,
        target: &GpuTexture,
        depth: Option<&GpuTexture>,
        clear: Option<wgpu::Color>,
    ) {
        self.end_pass();

        let view = target
            .as_wgpu()
            .create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth.map(|depth| {
            depth
                .as_wgpu()
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        let load = match clear {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };
        let descriptor = wgpu::RenderPassDescriptor {
            label,
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: depth_view.as_ref().map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        };

        self.pass = Some(self.encoder.begin_render_pass(&descriptor).forget_lifetime());
    }

    fn end_pass(&mut self) {
        drop(self.pass.take());
    }

    fn set_pipeline(&mut self, pipeline: &GpuRenderPipeline) {
        if let Some(pass) = self.pass("set_pipeline") {
            pass.set_pipeline(pipeline.as_wgpu());
        }
    }

    fn set_bind_group(&mut self, index: u32, group: &GpuBindGroup) {
        if let Some(pass) = self.pass("set_bind_group") {
            pass.set_bind_group(index, group.as_wgpu(), &[]);
        }
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer) {
        if let Some(pass) = self.pass("set_vertex_buffer") {
            pass.set_vertex_buffer(slot, buffer.as_wgpu().slice(..));
        }
    }

    fn set_index_buffer(&mut self, buffer: &GpuBuffer, format: wgpu::IndexFormat) {
        if let Some(pass) = self.pass("set_index_buffer") {
            pass.set_index_buffer(buffer.as_wgpu().slice(..), format);
        }
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32) {
        if let Some(pass) = self.pass("draw_indexed") {
            pass.draw_indexed(indices, base_vertex, 0..1);
        }
    }

    fn draw(&mut self, vertices: Range<u32>) {
        if let Some(pass) = self.pass("draw") {
            pass.draw(vertices, 0..1);
        }
    }
}
