//! Size-classed pool of offscreen render targets.
//!
//! Size class 0 is the full back-buffer resolution; class `k` halves each
//! dimension `k` times. Targets are built lazily on the first allocation that
//! finds no free target of its class, and live until the pool is dropped.
//! Nothing is ever evicted: a resize rebuilds every target in place.

use tessera_core::{geometry::Size, profiling::profile_function};
use tessera_test_utils::{GpuBindGroup, GpuBindGroupLayout, GpuSampler, GpuTexture, RenderContext};

use crate::{
    config::RenderConfig,
    error::{RenderError, RenderResult},
    resource::ResourceId,
};

/// Stable reference to a pooled target.
///
/// Stays valid across [`RenderTargetPool::resize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetHandle {
    size_class: u32,
    index: usize,
}

impl RenderTargetHandle {
    pub fn size_class(&self) -> u32 {
        self.size_class
    }
}

/// An offscreen color target plus the binding that samples it.
#[derive(Debug)]
pub struct RenderTarget {
    size_class: u32,
    size: Size<u32>,
    texture: GpuTexture,
    binding: GpuBindGroup,
    id: ResourceId,
}

impl RenderTarget {
    pub fn size_class(&self) -> u32 {
        self.size_class
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn size(&self) -> Size<u32> {
        self.size
    }

    pub fn texture(&self) -> &GpuTexture {
        &self.texture
    }

    /// Texture and sampler bound against [`RenderTargetPool::binding_layout`].
    pub fn binding(&self) -> &GpuBindGroup {
        &self.binding
    }

    /// Changes whenever the target is rebuilt.
    pub fn id(&self) -> ResourceId {
        self.id
    }
}

#[derive(Debug, Default)]
struct SizeClassBucket {
    targets: Vec<RenderTarget>,
    available: Vec<usize>,
    in_use: Vec<usize>,
}

pub struct RenderTargetPool {
    size: Size<u32>,
    format: wgpu::TextureFormat,
    buckets: Vec<SizeClassBucket>,
    binding_layout: GpuBindGroupLayout,
    sampler: GpuSampler,
}

impl RenderTargetPool {
    pub fn new(ctx: &dyn RenderContext, config: &RenderConfig, size: Size<u32>) -> Self {
        let binding_layout = ctx.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Render Target Binding Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = ctx.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Render Target Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let buckets = (0..=config.max_size_class)
            .map(|_| SizeClassBucket::default())
            .collect();

        Self {
            size,
            format: config.target_format,
            buckets,
            binding_layout,
            sampler,
        }
    }

    /// Layout effect shaders must use to sample a pooled target.
    pub fn binding_layout(&self) -> &GpuBindGroupLayout {
        &self.binding_layout
    }

    pub fn size(&self) -> Size<u32> {
        self.size
    }

    pub fn max_size_class(&self) -> u32 {
        (self.buckets.len() - 1) as u32
    }

    fn bucket_mut(&mut self, size_class: u32) -> RenderResult<&mut SizeClassBucket> {
        let max = self.max_size_class();
        self.buckets
            .get_mut(size_class as usize)
            .ok_or(RenderError::InvalidSizeClass { size_class, max })
    }

    fn construct(
        ctx: &dyn RenderContext,
        format: wgpu::TextureFormat,
        layout: &GpuBindGroupLayout,
        sampler: &GpuSampler,
        base: Size<u32>,
        size_class: u32,
    ) -> RenderTarget {
        let size = base.halved(size_class);
        let texture = ctx.create_texture(&wgpu::TextureDescriptor {
            label: Some("Pooled Render Target"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let binding =
            ctx.create_texture_binding(Some("Pooled Render Target Binding"), layout, &texture, sampler);

        RenderTarget {
            size_class,
            size,
            texture,
            binding,
            id: ResourceId::next(),
        }
    }

    /// Take a target of `size_class`, constructing one if none is free.
    pub fn allocate(
        &mut self,
        ctx: &dyn RenderContext,
        size_class: u32,
    ) -> RenderResult<RenderTargetHandle> {
        profile_function!();

        let max = self.max_size_class();
        let bucket = self
            .buckets
            .get_mut(size_class as usize)
            .ok_or(RenderError::InvalidSizeClass { size_class, max })?;

        let index = match bucket.available.pop() {
            Some(index) => index,
            None => {
                let target = Self::construct(
                    ctx,
                    self.format,
                    &self.binding_layout,
                    &self.sampler,
                    self.size,
                    size_class,
                );
                tracing::debug!(
                    "Constructed render target {} of size class {} ({}x{})",
                    bucket.targets.len(),
                    size_class,
                    target.size.width,
                    target.size.height
                );
                bucket.targets.push(target);
                bucket.targets.len() - 1
            }
        };
        bucket.in_use.push(index);

        Ok(RenderTargetHandle { size_class, index })
    }

    /// Return a target to the pool. Its contents are left untouched.
    pub fn release(&mut self, handle: RenderTargetHandle) -> RenderResult<()> {
        let RenderTargetHandle { size_class, index } = handle;
        let bucket = self.bucket_mut(size_class)?;
        let position = bucket
            .in_use
            .iter()
            .position(|&i| i == index)
            .ok_or(RenderError::TargetNotInUse { size_class, index })?;

        bucket.in_use.swap_remove(position);
        bucket.available.push(index);
        Ok(())
    }

    /// Return every in-use target. Used to recover after an aborted frame.
    pub fn release_all(&mut self) {
        for bucket in &mut self.buckets {
            let SizeClassBucket {
                available, in_use, ..
            } = bucket;
            available.append(in_use);
        }
    }

    /// # Panics
    /// Panics if `handle` came from a different pool.
    pub fn target(&self, handle: RenderTargetHandle) -> &RenderTarget {
        &self.buckets[handle.size_class as usize].targets[handle.index]
    }

    /// Rebuild every pooled target for a new back-buffer size.
    ///
    /// Handles, counts and in-use membership are preserved. Returns `false`
    /// when the size did not change.
    pub fn resize(&mut self, ctx: &dyn RenderContext, width: u32, height: u32) -> bool {
        profile_function!();

        let size = Size::new(width, height);
        if size == self.size {
            return false;
        }

        tracing::debug!(
            "Resizing render target pool {}x{} -> {}x{}",
            self.size.width,
            self.size.height,
            width,
            height
        );
        self.size = size;
        for bucket in &mut self.buckets {
            for target in &mut bucket.targets {
                *target = Self::construct(
                    ctx,
                    self.format,
                    &self.binding_layout,
                    &self.sampler,
                    size,
                    target.size_class,
                );
            }
        }
        true
    }

    pub fn available_count(&self, size_class: u32) -> usize {
        self.buckets
            .get(size_class as usize)
            .map_or(0, |bucket| bucket.available.len())
    }

    pub fn in_use_count(&self, size_class: u32) -> usize {
        self.buckets
            .get(size_class as usize)
            .map_or(0, |bucket| bucket.in_use.len())
    }

    /// Targets currently in use across every size class.
    pub fn total_in_use(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.in_use.len()).sum()
    }

    pub fn total_targets(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.targets.len()).sum()
    }
}
