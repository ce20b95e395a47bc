//! Textures, shaders and the fixed-function modes a layer draws with.
//!
//! Both [`Texture`] and [`Shader`] arrive fully built: a texture is a bind
//! group, a shader is a set of ready render pipelines. They compare by
//! identity, never by content.

use std::sync::Arc;

use tessera_core::{alloc::HashMap, geometry::Size};
use tessera_test_utils::{GpuBindGroup, GpuRenderPipeline};

use crate::{
    error::{RenderError, RenderResult},
    resource::ResourceId,
};

/// Color blending applied by a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Alpha,
    Additive,
    Multiply,
    /// No blending. Used by full-screen effect passes.
    Opaque,
}

impl BlendMode {
    /// Blend state a pipeline built for this mode should use.
    pub fn blend_state(self) -> Option<wgpu::BlendState> {
        match self {
            BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendMode::Additive => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent::OVER,
            }),
            BlendMode::Multiply => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::Dst,
                    dst_factor: wgpu::BlendFactor::Zero,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent::OVER,
            }),
            BlendMode::Opaque => None,
        }
    }
}

/// Depth testing applied by a layer.
///
/// Sprites are already drawn back to front, so depth testing is only needed
/// when a layer wants later sprites clipped by earlier opaque ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthMode {
    #[default]
    Disabled,
    TestAndWrite,
}

impl DepthMode {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Depth-stencil state a pipeline built for this mode should use.
    pub fn depth_stencil(self) -> Option<wgpu::DepthStencilState> {
        match self {
            DepthMode::Disabled => None,
            DepthMode::TestAndWrite => Some(wgpu::DepthStencilState {
                format: Self::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
        }
    }

    pub fn is_enabled(self) -> bool {
        self != DepthMode::Disabled
    }
}

struct TextureInner {
    id: ResourceId,
    label: String,
    size: Size<u32>,
    binding: GpuBindGroup,
}

/// A sampled texture, already bound with its sampler.
///
/// Cloning is cheap and clones compare equal.
#[derive(Clone)]
pub struct Texture(Arc<TextureInner>);

impl Texture {
    pub fn new(label: impl Into<String>, size: Size<u32>, binding: GpuBindGroup) -> Self {
        Self(Arc::new(TextureInner {
            id: ResourceId::next(),
            label: label.into(),
            size,
            binding,
        }))
    }

    pub fn id(&self) -> ResourceId {
        self.0.id
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    pub fn size(&self) -> Size<u32> {
        self.0.size
    }

    pub fn binding(&self) -> &GpuBindGroup {
        &self.0.binding
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Texture {}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.0.id)
            .field("label", &self.0.label)
            .finish()
    }
}

struct ShaderInner {
    id: ResourceId,
    label: String,
    pipelines: HashMap<(BlendMode, DepthMode), GpuRenderPipeline>,
}

/// A set of prebuilt render pipelines, one per blend/depth combination.
///
/// ```rust
/// use tessera_render::{BlendMode, DepthMode, Shader};
/// use tessera_test_utils::GpuRenderPipeline;
///
/// let shader = Shader::builder("sprite")
///     .pipeline(BlendMode::Alpha, DepthMode::Disabled, GpuRenderPipeline::mock(0))
///     .pipeline(BlendMode::Additive, DepthMode::Disabled, GpuRenderPipeline::mock(1))
///     .build();
/// assert!(shader.pipeline(BlendMode::Additive, DepthMode::Disabled).is_ok());
/// assert!(shader.pipeline(BlendMode::Opaque, DepthMode::Disabled).is_err());
/// ```
#[derive(Clone)]
pub struct Shader(Arc<ShaderInner>);

impl Shader {
    pub fn builder(label: impl Into<String>) -> ShaderBuilder {
        ShaderBuilder {
            label: label.into(),
            pipelines: HashMap::new(),
        }
    }

    /// Shader with a single pipeline for the given modes.
    pub fn with_pipeline(
        label: impl Into<String>,
        blend: BlendMode,
        depth: DepthMode,
        pipeline: GpuRenderPipeline,
    ) -> Self {
        Self::builder(label).pipeline(blend, depth, pipeline).build()
    }

    pub fn id(&self) -> ResourceId {
        self.0.id
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    pub fn supports(&self, blend: BlendMode, depth: DepthMode) -> bool {
        self.0.pipelines.contains_key(&(blend, depth))
    }

    pub fn pipeline(&self, blend: BlendMode, depth: DepthMode) -> RenderResult<&GpuRenderPipeline> {
        self.0
            .pipelines
            .get(&(blend, depth))
            .ok_or_else(|| RenderError::MissingPipeline {
                shader: self.0.label.clone(),
                blend,
                depth,
            })
    }
}

impl PartialEq for Shader {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Shader {}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("id", &self.0.id)
            .field("label", &self.0.label)
            .field("pipelines", &self.0.pipelines.len())
            .finish()
    }
}

pub struct ShaderBuilder {
    label: String,
    pipelines: HashMap<(BlendMode, DepthMode), GpuRenderPipeline>,
}

impl ShaderBuilder {
    pub fn pipeline(
        mut self,
        blend: BlendMode,
        depth: DepthMode,
        pipeline: GpuRenderPipeline,
    ) -> Self {
        self.pipelines.insert((blend, depth), pipeline);
        self
    }

    pub fn build(self) -> Shader {
        if self.pipelines.is_empty() {
            tracing::warn!("Shader '{}' built without any pipelines", self.label);
        }
        Shader(Arc::new(ShaderInner {
            id: ResourceId::next(),
            label: self.label,
            pipelines: self.pipelines,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textures_compare_by_identity() {
        let a = Texture::new("a", Size::new(8, 8), GpuBindGroup::mock(0));
        let b = Texture::new("a", Size::new(8, 8), GpuBindGroup::mock(0));

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn missing_pipeline_is_an_error() {
        let shader = Shader::with_pipeline(
            "sprite",
            BlendMode::Alpha,
            DepthMode::Disabled,
            GpuRenderPipeline::mock(0),
        );

        assert!(shader.pipeline(BlendMode::Alpha, DepthMode::Disabled).is_ok());
        assert_eq!(
            shader.pipeline(BlendMode::Alpha, DepthMode::TestAndWrite).unwrap_err(),
            RenderError::MissingPipeline {
                shader: "sprite".to_string(),
                blend: BlendMode::Alpha,
                depth: DepthMode::TestAndWrite,
            }
        );
    }

    #[test]
    fn opaque_has_no_blend_state() {
        assert!(BlendMode::Opaque.blend_state().is_none());
        assert!(DepthMode::Disabled.depth_stencil().is_none());
        assert!(DepthMode::TestAndWrite.depth_stencil().is_some());
    }
}
