//! [`RenderContext`] backed by a real device.

use tessera_test_utils::{
    GpuBindGroup, GpuBindGroupLayout, GpuBuffer, GpuSampler, GpuTexture, RenderContext,
};
use wgpu::{BindGroupLayoutDescriptor, BufferDescriptor, SamplerDescriptor, TextureDescriptor};

use crate::context::GraphicsContext;

impl RenderContext for GraphicsContext {
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        GpuBuffer::from_wgpu(self.device.create_buffer(desc))
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer.as_wgpu(), offset, data);
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> GpuTexture {
        GpuTexture::from_wgpu(self.device.create_texture(desc))
    }

    fn create_sampler(&self, desc: &SamplerDescriptor) -> GpuSampler {
        GpuSampler::from_wgpu(self.device.create_sampler(desc))
    }

    fn create_bind_group_layout(&self, desc: &BindGroupLayoutDescriptor) -> GpuBindGroupLayout {
        GpuBindGroupLayout::from_wgpu(self.device.create_bind_group_layout(desc))
    }

    fn create_texture_binding(
        &self,
        label: Option<&str>,
        layout: &GpuBindGroupLayout,
        texture: &GpuTexture,
        sampler: &GpuSampler,
    ) -> GpuBindGroup {
        let view = texture
            .as_wgpu()
            .create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label,
            layout: layout.as_wgpu(),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler.as_wgpu()),
                },
            ],
        });
        GpuBindGroup::from_wgpu(bind_group)
    }

    fn create_uniform_binding(
        &self,
        label: Option<&str>,
        layout: &GpuBindGroupLayout,
        buffer: &GpuBuffer,
    ) -> GpuBindGroup {
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label,
            layout: layout.as_wgpu(),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_wgpu().as_entire_binding(),
            }],
        });
        GpuBindGroup::from_wgpu(bind_group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_test_utils::{MockRenderContext, RenderCall};

    fn uses_render_context(ctx: &dyn RenderContext) -> GpuBindGroup {
        let buffer = ctx.create_buffer(&BufferDescriptor {
            label: Some("Test Buffer"),
            size: 256,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        ctx.write_buffer(&buffer, 0, &[0u8; 256]);

        let layout = ctx.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Test Layout"),
            entries: &[],
        });
        ctx.create_uniform_binding(Some("Test Binding"), &layout, &buffer)
    }

    #[test]
    fn render_context_trait_object() {
        let ctx = MockRenderContext::new();

        let binding = uses_render_context(&ctx);

        assert!(binding.is_mock());
        let calls = ctx.calls();
        assert_eq!(calls.len(), 4);
        assert!(matches!(calls[1], RenderCall::WriteBuffer { size: 256, .. }));
    }
}
