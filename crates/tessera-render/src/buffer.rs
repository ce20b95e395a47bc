//! Growable GPU arrays with discard-and-rewrite uploads.
//!
//! A [`DynamicBuffer`] is rewritten from scratch every time its owner
//! rebuilds, so there is no partial update path. When the data outgrows the
//! buffer the GPU resource is recreated at the next chunk multiple and the old
//! contents are discarded.

use std::marker::PhantomData;

use bytemuck::Pod;
use tessera_core::profiling::profile_function;
use tessera_test_utils::{GpuBuffer, RenderContext};

use crate::{
    error::{RenderError, RenderResult},
    resource::ResourceId,
};

/// Round `required` up to a multiple of `chunk`, never below one chunk.
pub(crate) fn chunk_aligned(required: usize, chunk: usize) -> usize {
    let chunk = chunk.max(1);
    required.div_ceil(chunk).max(1) * chunk
}

/// A fixed-capacity GPU buffer of `T` that can be regrown.
///
/// Capacity only changes through [`grow`](Self::grow) and
/// [`shrink_to`](Self::shrink_to). Every reconstruction assigns a new
/// [`ResourceId`] so a state cache holding the old id rebinds.
pub struct DynamicBuffer<T: Pod> {
    label: &'static str,
    buffer: GpuBuffer,
    id: ResourceId,
    usage: wgpu::BufferUsages,
    capacity: usize,
    len: usize,
    chunk: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod> DynamicBuffer<T> {
    /// Create a buffer holding one chunk of elements.
    pub fn new(
        ctx: &dyn RenderContext,
        label: &'static str,
        usage: wgpu::BufferUsages,
        chunk: usize,
    ) -> Self {
        let chunk = chunk.max(1);
        let usage = usage | wgpu::BufferUsages::COPY_DST;
        Self {
            label,
            buffer: Self::allocate(ctx, label, usage, chunk),
            id: ResourceId::next(),
            usage,
            capacity: chunk,
            len: 0,
            chunk,
            _marker: PhantomData,
        }
    }

    pub fn vertex(ctx: &dyn RenderContext, label: &'static str, chunk: usize) -> Self {
        Self::new(ctx, label, wgpu::BufferUsages::VERTEX, chunk)
    }

    pub fn index(ctx: &dyn RenderContext, label: &'static str, chunk: usize) -> Self {
        Self::new(ctx, label, wgpu::BufferUsages::INDEX, chunk)
    }

    fn allocate(
        ctx: &dyn RenderContext,
        label: &'static str,
        usage: wgpu::BufferUsages,
        capacity: usize,
    ) -> GpuBuffer {
        tracing::trace!(
            "Allocating {} with capacity for {} elements",
            label,
            capacity
        );
        ctx.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity * std::mem::size_of::<T>()) as u64,
            usage,
            mapped_at_creation: false,
        })
    }

    fn reconstruct(&mut self, ctx: &dyn RenderContext, capacity: usize) {
        self.buffer = Self::allocate(ctx, self.label, self.usage, capacity);
        self.id = ResourceId::next();
        self.capacity = capacity;
        self.len = 0;
    }

    /// Number of elements the GPU resource can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of elements written by the last [`set_data`](Self::set_data).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk(&self) -> usize {
        self.chunk
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn buffer(&self) -> &GpuBuffer {
        &self.buffer
    }

    /// Replace the buffer contents with `data`.
    pub fn set_data(&mut self, ctx: &dyn RenderContext, data: &[T]) -> RenderResult<()> {
        profile_function!();

        if data.len() > self.capacity {
            return Err(RenderError::BufferOverflow {
                requested: data.len(),
                capacity: self.capacity,
            });
        }

        if !data.is_empty() {
            ctx.write_buffer(&self.buffer, 0, bytemuck::cast_slice(data));
        }
        self.len = data.len();
        tracing::trace!("Uploaded {} elements to {}", data.len(), self.label);
        Ok(())
    }

    /// Make room for at least `required` elements.
    ///
    /// Recreates the GPU resource at the next chunk multiple, discarding its
    /// contents. Returns `false` when the buffer was already large enough.
    pub fn grow(&mut self, ctx: &dyn RenderContext, required: usize) -> bool {
        if required <= self.capacity {
            return false;
        }

        let capacity = chunk_aligned(required, self.chunk);
        tracing::warn!(
            "{} too small for {} elements, growing {} -> {}",
            self.label,
            required,
            self.capacity,
            capacity
        );
        self.reconstruct(ctx, capacity);
        true
    }

    /// Shrink to the smallest chunk multiple holding `required` elements.
    ///
    /// Only called at compaction time. Returns `false` when no smaller
    /// capacity is possible.
    pub fn shrink_to(&mut self, ctx: &dyn RenderContext, required: usize) -> bool {
        let capacity = chunk_aligned(required, self.chunk);
        if capacity >= self.capacity {
            return false;
        }

        tracing::debug!(
            "Shrinking {} from {} to {} elements",
            self.label,
            self.capacity,
            capacity
        );
        self.reconstruct(ctx, capacity);
        true
    }
}

impl<T: Pod> std::fmt::Debug for DynamicBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicBuffer")
            .field("label", &self.label)
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("len", &self.len)
            .field("chunk", &self.chunk)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_test_utils::MockRenderContext;

    #[test]
    fn chunk_alignment() {
        assert_eq!(chunk_aligned(0, 16), 16);
        assert_eq!(chunk_aligned(1, 16), 16);
        assert_eq!(chunk_aligned(16, 16), 16);
        assert_eq!(chunk_aligned(17, 16), 32);
    }

    #[test]
    fn set_data_within_capacity() {
        let ctx = MockRenderContext::new();
        let mut buffer = DynamicBuffer::<u32>::index(&ctx, "indices", 8);

        buffer.set_data(&ctx, &[0, 1, 2, 2, 3, 0]).unwrap();

        assert_eq!(buffer.len(), 6);
        assert_eq!(ctx.count_writes_to(buffer.buffer()), 1);
        let bytes = ctx.buffer_contents(buffer.buffer()).unwrap();
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[8..12], &2u32.to_le_bytes());
    }

    #[test]
    fn set_data_overflow_is_an_error() {
        let ctx = MockRenderContext::new();
        let mut buffer = DynamicBuffer::<u32>::index(&ctx, "indices", 4);

        let err = buffer.set_data(&ctx, &[0; 5]).unwrap_err();

        assert_eq!(
            err,
            RenderError::BufferOverflow {
                requested: 5,
                capacity: 4
            }
        );
        assert_eq!(ctx.count_buffer_writes(), 0);
    }

    #[test]
    fn grow_reconstructs_with_new_id() {
        let ctx = MockRenderContext::new();
        let mut buffer = DynamicBuffer::<u32>::index(&ctx, "indices", 4);
        let old_id = buffer.id();

        assert!(!buffer.grow(&ctx, 4));
        assert!(buffer.grow(&ctx, 9));

        assert_eq!(buffer.capacity(), 12);
        assert_ne!(buffer.id(), old_id);
        assert_eq!(buffer.buffer().size(), 48);
        assert_eq!(ctx.count_buffer_creates(), 2);
    }

    #[test]
    fn shrink_only_goes_down() {
        let ctx = MockRenderContext::new();
        let mut buffer = DynamicBuffer::<u32>::index(&ctx, "indices", 4);
        buffer.grow(&ctx, 20);

        assert!(!buffer.shrink_to(&ctx, 20));
        assert!(buffer.shrink_to(&ctx, 5));
        assert_eq!(buffer.capacity(), 8);
        assert!(buffer.shrink_to(&ctx, 0));
        assert_eq!(buffer.capacity(), 4);
    }
}
