//! Trait abstracting render pass recording.

use std::ops::Range;

use crate::gpu_types::*;

/// Records render passes and draw commands for one frame.
///
/// At most one pass is open at a time. Beginning a pass while another is open
/// ends the previous one first. Bindings made inside a pass do not survive it.
///
/// Unlike [`RenderContext`](crate::RenderContext) this is not `Send`: a
/// recorder belongs to the frame loop that drives it.
pub trait CommandRecorder {
    /// Begin a render pass writing to `target`.
    ///
    /// `clear` of `None` loads the existing contents. A `depth` texture is
    /// attached and cleared to 1.0 when given.
    fn begin_pass(
        &mut self,
        label: Option<&str>,
        target: &GpuTexture,
        depth: Option<&GpuTexture>,
        clear: Option<wgpu::Color>,
    );

    /// End the open pass, if any.
    fn end_pass(&mut self);

    fn set_pipeline(&mut self, pipeline: &GpuRenderPipeline);

    fn set_bind_group(&mut self, index: u32, group: &GpuBindGroup);

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer);

    fn set_index_buffer(&mut self, buffer: &GpuBuffer, format: wgpu::IndexFormat);

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32);

    fn draw(&mut self, vertices: Range<u32>);
}
