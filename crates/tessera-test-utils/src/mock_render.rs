//! Recording mocks for [`RenderContext`] and [`CommandRecorder`].
//!
//! Neither mock touches a GPU. Every call is appended to a log that tests can
//! inspect or count.

use std::{collections::HashMap, ops::Range};

use crate::{command_recorder::CommandRecorder, gpu_types::*, render_context::RenderContext};
use parking_lot::Mutex;
use wgpu::*;

/// A resource creation or queue write seen by [`MockRenderContext`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    CreateBuffer {
        id: usize,
        size: u64,
        usage: BufferUsages,
    },
    WriteBuffer {
        buffer_id: usize,
        offset: u64,
        size: usize,
    },
    CreateTexture {
        id: usize,
        width: u32,
        height: u32,
        format: TextureFormat,
    },
    CreateSampler {
        label: Option<String>,
    },
    CreateBindGroupLayout {
        label: Option<String>,
    },
    CreateBindGroup {
        label: Option<String>,
    },
}

/// Mock GPU context.
///
/// Interior mutability goes through `parking_lot::Mutex` since
/// [`RenderContext`] requires `Send + Sync`.
///
/// ```rust
/// use tessera_test_utils::{MockRenderContext, RenderContext};
/// use wgpu::*;
///
/// let mock = MockRenderContext::new();
/// let buffer = mock.create_buffer(&BufferDescriptor {
///     label: None,
///     size: 1024,
///     usage: BufferUsages::VERTEX,
///     mapped_at_creation: false,
/// });
///
/// assert!(buffer.is_mock());
/// assert_eq!(mock.count_buffer_creates(), 1);
/// ```
#[derive(Default)]
pub struct MockRenderContext {
    calls: Mutex<Vec<RenderCall>>,
    /// Last bytes written per buffer id, laid out at their write offset.
    contents: Mutex<HashMap<usize, Vec<u8>>>,
    next_id: Mutex<usize>,
}

impl MockRenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> usize {
        let mut next = self.next_id.lock();
        let id = *next;
        *next += 1;
        id
    }

    /// Get a copy of all recorded calls.
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().clone()
    }

    fn count(&self, predicate: impl Fn(&RenderCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    pub fn count_buffer_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateBuffer { .. }))
    }

    pub fn count_buffer_writes(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::WriteBuffer { .. }))
    }

    /// Count writes that targeted one particular buffer.
    pub fn count_writes_to(&self, buffer: &GpuBuffer) -> usize {
        let Some(target) = buffer.mock_id() else {
            return 0;
        };
        self.count(|call| matches!(call, RenderCall::WriteBuffer { buffer_id, .. } if *buffer_id == target))
    }

    pub fn count_texture_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateTexture { .. }))
    }

    pub fn count_bind_group_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateBindGroup { .. }))
    }

    /// Bytes most recently written to `buffer`, or `None` if it was never written.
    pub fn buffer_contents(&self, buffer: &GpuBuffer) -> Option<Vec<u8>> {
        let id = buffer.mock_id()?;
        self.contents.lock().get(&id).cloned()
    }

    /// Clear recorded calls (useful between test steps).
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn record_bind_group(&self, label: Option<&str>) -> GpuBindGroup {
        let id = self.allocate_id();
        self.calls.lock().push(RenderCall::CreateBindGroup {
            label: label.map(str::to_owned),
        });
        GpuBindGroup::mock(id)
    }
}

impl RenderContext for MockRenderContext {
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        let id = self.allocate_id();
        self.calls.lock().push(RenderCall::CreateBuffer {
            id,
            size: desc.size,
            usage: desc.usage,
        });
        GpuBuffer::mock(id, desc.size)
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        let Some(buffer_id) = buffer.mock_id() else {
            return;
        };
        assert!(
            offset + data.len() as u64 <= buffer.size(),
            "mock write of {} bytes at offset {} overflows buffer of {} bytes",
            data.len(),
            offset,
            buffer.size()
        );

        {
            let mut contents = self.contents.lock();
            let bytes = contents.entry(buffer_id).or_default();
            let start = offset as usize;
            let end = start + data.len();
            if bytes.len() < end {
                bytes.resize(end, 0);
            }
            bytes[start..end].copy_from_slice(data);
        }

        self.calls.lock().push(RenderCall::WriteBuffer {
            buffer_id,
            offset,
            size: data.len(),
        });
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> GpuTexture {
        let id = self.allocate_id();
        self.calls.lock().push(RenderCall::CreateTexture {
            id,
            width: desc.size.width,
            height: desc.size.height,
            format: desc.format,
        });
        GpuTexture::mock(id, desc.size.width, desc.size.height, desc.format)
    }

    fn create_sampler(&self, desc: &SamplerDescriptor) -> GpuSampler {
        let id = self.allocate_id();
        self.calls.lock().push(RenderCall::CreateSampler {
            label: desc.label.map(str::to_owned),
        });
        GpuSampler::mock(id)
    }

    fn create_bind_group_layout(&self, desc: &BindGroupLayoutDescriptor) -> GpuBindGroupLayout {
        let id = self.allocate_id();
        self.calls.lock().push(RenderCall::CreateBindGroupLayout {
            label: desc.label.map(str::to_owned),
        });
        GpuBindGroupLayout::mock(id)
    }

    fn create_texture_binding(
        &self,
        label: Option<&str>,
        _layout: &GpuBindGroupLayout,
        _texture: &GpuTexture,
        _sampler: &GpuSampler,
    ) -> GpuBindGroup {
        self.record_bind_group(label)
    }

    fn create_uniform_binding(
        &self,
        label: Option<&str>,
        _layout: &GpuBindGroupLayout,
        _buffer: &GpuBuffer,
    ) -> GpuBindGroup {
        self.record_bind_group(label)
    }
}

/// A command seen by [`MockCommandRecorder`]. Resources are identified by mock id.
#[derive(Debug, Clone, PartialEq)]
pub enum PassCall {
    BeginPass {
        label: Option<String>,
        target: Option<usize>,
        depth: Option<usize>,
        clear: Option<Color>,
    },
    EndPass,
    SetPipeline(Option<usize>),
    SetBindGroup {
        index: u32,
        group: Option<usize>,
    },
    SetVertexBuffer {
        slot: u32,
        buffer: Option<usize>,
    },
    SetIndexBuffer {
        buffer: Option<usize>,
        format: IndexFormat,
    },
    DrawIndexed {
        indices: Range<u32>,
        base_vertex: i32,
    },
    Draw {
        vertices: Range<u32>,
    },
}

/// Mock command recorder that logs every command.
///
/// Commands outside an open pass are a usage error and panic, matching the
/// validation a real device would perform.
#[derive(Debug, Default)]
pub struct MockCommandRecorder {
    calls: Vec<PassCall>,
    in_pass: bool,
}

impl MockCommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[PassCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn is_in_pass(&self) -> bool {
        self.in_pass
    }

    fn count(&self, predicate: impl Fn(&PassCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn count_passes(&self) -> usize {
        self.count(|call| matches!(call, PassCall::BeginPass { .. }))
    }

    /// Count indexed and non-indexed draws.
    pub fn count_draws(&self) -> usize {
        self.count(|call| matches!(call, PassCall::DrawIndexed { .. } | PassCall::Draw { .. }))
    }

    pub fn count_indexed_draws(&self) -> usize {
        self.count(|call| matches!(call, PassCall::DrawIndexed { .. }))
    }

    pub fn count_pipeline_binds(&self) -> usize {
        self.count(|call| matches!(call, PassCall::SetPipeline(_)))
    }

    pub fn count_bind_group_binds(&self, index: u32) -> usize {
        self.count(|call| matches!(call, PassCall::SetBindGroup { index: i, .. } if *i == index))
    }

    pub fn count_vertex_buffer_binds(&self) -> usize {
        self.count(|call| matches!(call, PassCall::SetVertexBuffer { .. }))
    }

    /// Every indexed draw range, in submission order.
    pub fn indexed_ranges(&self) -> Vec<Range<u32>> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                PassCall::DrawIndexed { indices, .. } => Some(indices.clone()),
                _ => None,
            })
            .collect()
    }

    /// Sum of indices submitted through indexed draws.
    pub fn total_indices(&self) -> u32 {
        self.indexed_ranges().iter().map(|range| range.end - range.start).sum()
    }

    fn push_in_pass(&mut self, call: PassCall) {
        assert!(self.in_pass, "{call:?} recorded outside of a render pass");
        self.calls.push(call);
    }
}

impl CommandRecorder for MockCommandRecorder {
    fn begin_pass(
        &mut self,
        label: Option<&str>,
        target: &GpuTexture,
        depth: Option<&GpuTexture>,
        clear: Option<Color>,
    ) {
        if self.in_pass {
            self.end_pass();
        }
        self.in_pass = true;
        self.calls.push(PassCall::BeginPass {
            label: label.map(str::to_owned),
            target: target.mock_id(),
            depth: depth.and_then(GpuTexture::mock_id),
            clear,
        });
    }

    fn end_pass(&mut self) {
        if self.in_pass {
            self.in_pass = false;
            self.calls.push(PassCall::EndPass);
        }
    }

    fn set_pipeline(&mut self, pipeline: &GpuRenderPipeline) {
        self.push_in_pass(PassCall::SetPipeline(pipeline.mock_id()));
    }

    fn set_bind_group(&mut self, index: u32, group: &GpuBindGroup) {
        self.push_in_pass(PassCall::SetBindGroup {
            index,
            group: group.mock_id(),
        });
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer) {
        self.push_in_pass(PassCall::SetVertexBuffer {
            slot,
            buffer: buffer.mock_id(),
        });
    }

    fn set_index_buffer(&mut self, buffer: &GpuBuffer, format: IndexFormat) {
        self.push_in_pass(PassCall::SetIndexBuffer {
            buffer: buffer.mock_id(),
            format,
        });
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32) {
        self.push_in_pass(PassCall::DrawIndexed {
            indices,
            base_vertex,
        });
    }

    fn draw(&mut self, vertices: Range<u32>) {
        self.push_in_pass(PassCall::Draw { vertices });
    }
}
