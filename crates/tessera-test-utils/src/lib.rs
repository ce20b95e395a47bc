//! GPU abstraction seam and test utilities for Tessera.
//!
//! The sprite renderer never talks to `wgpu` directly. Resource creation goes
//! through [`RenderContext`] and render-pass commands go through
//! [`CommandRecorder`]. Both have a real implementation in `tessera-render`
//! and a recording mock here, so batching and pooling behaviour can be
//! verified without a GPU.
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use tessera_test_utils::{MockRenderContext, RenderContext};
//! use wgpu::*;
//!
//! let mock = MockRenderContext::new();
//!
//! let buffer = mock.create_buffer(&BufferDescriptor {
//!     label: Some("test_buffer"),
//!     size: 1024,
//!     usage: BufferUsages::VERTEX,
//!     mapped_at_creation: false,
//! });
//!
//! assert_eq!(mock.count_buffer_creates(), 1);
//! assert!(buffer.is_mock());
//! # }
//! ```
//!
//! # Design
//!
//! GPU wrapper types are owned and cheap to clone, so no lifetimes leak into
//! renderer types. The mock context records through `parking_lot` mutexes
//! because [`RenderContext`] is `Send + Sync`; the mock recorder is a plain
//! `Vec` since command recording is single-threaded.

pub mod command_recorder;
pub mod gpu_types;
#[cfg(feature = "mock")]
pub mod mock_render;
pub mod render_context;

pub use command_recorder::*;
pub use gpu_types::*;
#[cfg(feature = "mock")]
pub use mock_render::*;
pub use render_context::*;
