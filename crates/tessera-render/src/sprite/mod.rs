//! Sprites and the vertex format they produce.
//!
//! A sprite owns its geometry. Property setters only mark it dirty; the
//! vertices and indices are regenerated when the owning layer updates,
//! once per frame.

mod kind;
mod material;

use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::{Pod, Zeroable};
use glam::{Affine2, Vec2, Vec4};
use tessera_core::alloc::sparse_set::IndexSlot;

pub use kind::{GlyphQuad, PathFillSprite, SpriteKind, TextSprite, TextureSprite, UvRect};
pub use material::{BlendMode, DepthMode, Shader, ShaderBuilder, Texture};

use crate::layer::LayerId;
use kind::Paint;

/// Generational handle to a sprite stored in a [`SpriteScene`](crate::SpriteScene).
pub type SpriteId = IndexSlot;

/// Index format matching the `u32` indices sprites generate.
pub const INDEX_FORMAT: wgpu::IndexFormat = wgpu::IndexFormat::Uint32;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
    pub tex_coords: [f32; 2],
    pub alpha: f32,
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x4,
        2 => Float32x2,
        3 => Float32,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

static_assertions::assert_eq_size!(Vertex, [f32; 9]);

static NEXT_DEPTH: AtomicU64 = AtomicU64::new(0);

/// Creation-order depth so sprites default to painter's order.
fn next_depth() -> f32 {
    NEXT_DEPTH.fetch_add(1, Ordering::Relaxed) as f32
}

pub struct Sprite {
    origin: Vec2,
    angle: f32,
    scale: Vec2,
    color: Vec4,
    alpha: f32,
    depth: f32,
    texture: Texture,
    shader: Shader,
    kind: SpriteKind,

    layer: Option<LayerId>,
    layer_index: usize,
    /// Vertex and index counts the owning layer has added to its totals.
    counted: (usize, usize),

    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    dirty: bool,
}

impl Sprite {
    pub fn new(kind: SpriteKind, texture: Texture, shader: Shader) -> Self {
        let mut sprite = Self {
            origin: Vec2::ZERO,
            angle: 0.0,
            scale: Vec2::ONE,
            color: Vec4::ONE,
            alpha: 1.0,
            depth: next_depth(),
            texture,
            shader,
            kind,
            layer: None,
            layer_index: 0,
            counted: (0, 0),
            vertices: Vec::new(),
            indices: Vec::new(),
            dirty: true,
        };
        sprite.update();
        sprite
    }

    pub fn texture_quad(quad: TextureSprite, texture: Texture, shader: Shader) -> Self {
        Self::new(SpriteKind::Texture(quad), texture, shader)
    }

    pub fn path_fill(points: Vec<Vec2>, texture: Texture, shader: Shader) -> Self {
        Self::new(
            SpriteKind::PathFill(PathFillSprite { points }),
            texture,
            shader,
        )
    }

    pub fn text(glyphs: Vec<GlyphQuad>, atlas: Texture, shader: Shader) -> Self {
        Self::new(SpriteKind::Text(TextSprite { glyphs }), atlas, shader)
    }

    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.set_origin(origin);
        self
    }

    pub fn with_depth(mut self, depth: f32) -> Self {
        self.set_depth(depth);
        self
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.set_color(color);
        self
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Vec2) {
        self.origin = origin;
        self.dirty = true;
    }

    /// Rotation in radians around the origin.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle;
        self.dirty = true;
    }

    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vec2) {
        self.scale = scale;
        self.dirty = true;
    }

    pub fn color(&self) -> Vec4 {
        self.color
    }

    pub fn set_color(&mut self, color: Vec4) {
        self.color = color;
        self.dirty = true;
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
        self.dirty = true;
    }

    /// Render order key. Lower depths draw first.
    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth;
        self.dirty = true;
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn set_texture(&mut self, texture: Texture) {
        self.texture = texture;
        self.dirty = true;
    }

    pub fn shader(&self) -> &Shader {
        &self.shader
    }

    pub fn set_shader(&mut self, shader: Shader) {
        self.shader = shader;
        self.dirty = true;
    }

    pub fn kind(&self) -> &SpriteKind {
        &self.kind
    }

    /// Mutable access to the variant data. Marks the sprite dirty.
    pub fn kind_mut(&mut self) -> &mut SpriteKind {
        self.dirty = true;
        &mut self.kind
    }

    /// Layer currently holding this sprite.
    pub fn layer(&self) -> Option<LayerId> {
        self.layer
    }

    /// Slot of this sprite in its layer. Meaningless when [`layer`](Self::layer) is `None`.
    pub fn layer_index(&self) -> usize {
        self.layer_index
    }

    /// Returns the geometry counted by the layer.
    pub(crate) fn attach(&mut self, layer: LayerId, index: usize) -> (usize, usize) {
        self.layer = Some(layer);
        self.layer_index = index;
        self.counted = (self.vertex_count(), self.index_count());
        self.counted
    }

    /// Returns the geometry the layer had counted for this sprite.
    pub(crate) fn detach(&mut self) -> (usize, usize) {
        self.layer = None;
        std::mem::take(&mut self.counted)
    }

    /// Re-record the counted geometry, returning the previous record.
    pub(crate) fn recount(&mut self) -> (usize, usize) {
        let current = (self.vertex_count(), self.index_count());
        std::mem::replace(&mut self.counted, current)
    }

    pub(crate) fn set_layer_index(&mut self, index: usize) {
        self.layer_index = index;
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Indices relative to this sprite's first vertex.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Regenerate geometry if any property changed since the last update.
    ///
    /// Only the owning layer calls this, so a dirty sprite always reaches
    /// the layer rebuild. Returns whether anything was rebuilt.
    pub(crate) fn update(&mut self) -> bool {
        if !self.dirty {
            return false;
        }

        let paint = Paint {
            transform: Affine2::from_scale_angle_translation(self.scale, self.angle, self.origin),
            color: self.color.to_array(),
            alpha: self.alpha,
        };
        self.vertices.clear();
        self.indices.clear();
        self.kind.build(&paint, &mut self.vertices, &mut self.indices);
        self.dirty = false;
        true
    }
}

impl std::fmt::Debug for Sprite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sprite")
            .field("origin", &self.origin)
            .field("depth", &self.depth)
            .field("texture", &self.texture)
            .field("shader", &self.shader)
            .field("layer", &self.layer)
            .field("layer_index", &self.layer_index)
            .field("vertices", &self.vertices.len())
            .field("indices", &self.indices.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::geometry::Size;
    use tessera_test_utils::{GpuBindGroup, GpuRenderPipeline};

    fn quad() -> Sprite {
        let texture = Texture::new("white", Size::new(1, 1), GpuBindGroup::mock(0));
        let shader = Shader::with_pipeline(
            "sprite",
            BlendMode::Alpha,
            DepthMode::Disabled,
            GpuRenderPipeline::mock(1),
        );
        Sprite::texture_quad(TextureSprite::new(Vec2::new(2.0, 2.0)), texture, shader)
    }

    #[test]
    fn geometry_is_built_on_creation() {
        let sprite = quad();
        assert!(!sprite.is_dirty());
        assert_eq!(sprite.vertex_count(), 4);
        assert_eq!(sprite.index_count(), 6);
    }

    #[test]
    fn default_depth_follows_creation_order() {
        let first = quad();
        let second = quad();
        assert!(second.depth() > first.depth());
    }

    #[test]
    fn update_applies_transform_once() {
        let mut sprite = quad().with_origin(Vec2::new(10.0, 20.0));
        assert!(sprite.is_dirty());

        assert!(sprite.update());
        assert!(!sprite.update());
        assert_eq!(sprite.vertices()[0].position, [9.0, 19.0]);
    }

    #[test]
    fn vertex_layout_matches_struct() {
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 36);
        assert_eq!(layout.attributes.len(), 4);
    }
}
