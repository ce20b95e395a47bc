use crate::{
    layer::LayerId,
    sprite::{BlendMode, DepthMode},
};

/// Errors raised by the batching core.
///
/// All of these are contract violations by the caller. GPU device errors are
/// not represented here: wgpu treats them as fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// `DynamicBuffer::set_data` was handed more elements than it can hold.
    BufferOverflow { requested: usize, capacity: usize },
    /// A render target was released while not in use.
    TargetNotInUse { size_class: u32, index: usize },
    /// A size class above the configured maximum was requested.
    InvalidSizeClass { size_class: u32, max: u32 },
    /// A shader has no pipeline for the requested blend/depth combination.
    MissingPipeline {
        shader: String,
        blend: BlendMode,
        depth: DepthMode,
    },
    UnknownLayer(LayerId),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BufferOverflow {
                requested,
                capacity,
            } => write!(
                f,
                "Buffer overflow: {} elements requested, capacity is {}",
                requested, capacity
            ),
            Self::TargetNotInUse { size_class, index } => write!(
                f,
                "Render target {} of size class {} is not in use",
                index, size_class
            ),
            Self::InvalidSizeClass { size_class, max } => write!(
                f,
                "Invalid size class {} (maximum is {})",
                size_class, max
            ),
            Self::MissingPipeline {
                shader,
                blend,
                depth,
            } => write!(
                f,
                "Shader '{}' has no pipeline for {:?} blending with {:?} depth",
                shader, blend, depth
            ),
            Self::UnknownLayer(id) => write!(f, "Layer {:?} not found", id),
        }
    }
}

impl std::error::Error for RenderError {}

pub type RenderResult<T> = Result<T, RenderError>;
