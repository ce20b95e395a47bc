//! Tessera Render - batched 2D sprite rendering on wgpu
//!
//! Sprites are grouped into layers. Each layer keeps its geometry in one
//! vertex buffer and one index buffer, sorted by depth, texture and shader so
//! that adjacent sprites sharing a texture and shader collapse into a single
//! draw call. A frame pipeline draws the layers, optionally runs a chain of
//! full-screen effects through pooled offscreen targets, and composites the
//! result into the back buffer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # use tessera_render::*;
//! # fn shader() -> Shader { unimplemented!() }
//! # fn texture() -> Texture { unimplemented!() }
//! # fn back_buffer() -> tessera_test_utils::GpuTexture { unimplemented!() }
//! let ctx = GraphicsContext::new_owned_sync().expect("no GPU available");
//! let mut scene = SpriteScene::new(RenderConfig::default());
//! let mut pipeline = FramePipeline::new(ctx.as_ref(), RenderConfig::default(), 800, 600);
//!
//! let layer = scene.create_layer(ctx.as_ref(), "world", BlendMode::Alpha, DepthMode::Disabled);
//! let sprite = scene.spawn(Sprite::texture_quad(
//!     TextureSprite::new(glam::Vec2::new(32.0, 32.0)),
//!     texture(),
//!     shader(),
//! ));
//! scene.add_sprite(layer, sprite)?;
//!
//! // Once per frame:
//! let mut recorder = WgpuCommandRecorder::new(&ctx, Some("Frame"));
//! let stats = pipeline.render(ctx.as_ref(), &mut recorder, &mut scene, &back_buffer())?;
//! recorder.submit(&ctx);
//! println!("{} draw calls", stats.draw_calls);
//! # Ok::<(), RenderError>(())
//! ```
//!
//! Everything takes `&dyn RenderContext` and `&mut dyn CommandRecorder`, so
//! tests run the same code against the recording mocks in
//! `tessera-test-utils`.

pub mod batch;
pub mod buffer;
pub mod config;
pub mod context;
mod context_impl;
pub mod error;
pub mod layer;
pub mod pipeline;
pub mod recorder;
pub mod resource;
pub mod scene;
pub mod sprite;
pub mod state;
pub mod target_pool;

pub use batch::{BatchRenderer, BatchStats};
pub use buffer::DynamicBuffer;
pub use config::RenderConfig;
pub use context::{GraphicsContext, GraphicsContextDescriptor, GraphicsContextError};
pub use error::{RenderError, RenderResult};
pub use layer::{DrawSpan, LayerId, SpriteLayer};
pub use pipeline::{FramePipeline, FrameStats, PostEffect, PostEffectChain};
pub use recorder::WgpuCommandRecorder;
pub use resource::ResourceId;
pub use scene::SpriteScene;
pub use sprite::*;
pub use state::{CAMERA_GROUP, FrameRenderState, SOURCE_GROUP, TEXTURE_GROUP};
pub use target_pool::{RenderTarget, RenderTargetHandle, RenderTargetPool};

pub use tessera_test_utils::{CommandRecorder, RenderContext};
