//! Trait abstracting GPU resource creation.
//!
//! Everything the batching core allocates goes through [`RenderContext`], so a
//! headless mock can stand in for a device in tests.

use crate::gpu_types::*;
use wgpu::{BindGroupLayoutDescriptor, BufferDescriptor, SamplerDescriptor, TextureDescriptor};

/// GPU resource creation and queue writes.
///
/// Methods take `&self` and return owned wrappers. `wgpu` resources are
/// reference counted, so nothing borrows from the device and the trait stays
/// object safe.
///
/// # Example
///
/// ```rust,no_run
/// use tessera_test_utils::RenderContext;
/// use wgpu::{BufferDescriptor, BufferUsages};
///
/// fn upload(ctx: &dyn RenderContext, bytes: &[u8]) {
///     let buffer = ctx.create_buffer(&BufferDescriptor {
///         label: Some("upload"),
///         size: bytes.len() as u64,
///         usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
///         mapped_at_creation: false,
///     });
///     ctx.write_buffer(&buffer, 0, bytes);
/// }
/// ```
pub trait RenderContext: Send + Sync {
    /// Create a GPU buffer.
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer;

    /// Write data to a buffer through the queue.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]);

    fn create_texture(&self, desc: &TextureDescriptor) -> GpuTexture;

    fn create_sampler(&self, desc: &SamplerDescriptor) -> GpuSampler;

    fn create_bind_group_layout(&self, desc: &BindGroupLayoutDescriptor) -> GpuBindGroupLayout;

    /// Bind a texture (binding 0) and sampler (binding 1) against `layout`.
    ///
    /// `wgpu::BindGroupDescriptor` borrows concrete `wgpu` types, which a mock
    /// cannot provide, so bind groups are created from wrappers instead.
    fn create_texture_binding(
        &self,
        label: Option<&str>,
        layout: &GpuBindGroupLayout,
        texture: &GpuTexture,
        sampler: &GpuSampler,
    ) -> GpuBindGroup;

    /// Bind a whole buffer as a uniform at binding 0 against `layout`.
    fn create_uniform_binding(
        &self,
        label: Option<&str>,
        layout: &GpuBindGroupLayout,
        buffer: &GpuBuffer,
    ) -> GpuBindGroup;
}
