//! Slot-based sprite containers.
//!
//! A layer holds sprite ids in a slot array. Adding appends at a cursor and
//! removing empties a slot in place, so both are O(1) and never move other
//! sprites. The order only changes when the layer sorts on rebuild, which
//! also compacts the live sprites into a prefix.

use std::cmp::Ordering;

use tessera_core::{alloc::sparse_set::SparseSet, profiling::profile_function};
use tessera_test_utils::RenderContext;

use crate::{
    buffer::{DynamicBuffer, chunk_aligned},
    config::RenderConfig,
    error::RenderResult,
    sprite::{BlendMode, DepthMode, Shader, Sprite, SpriteId, Texture, Vertex},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub(crate) u32);

impl LayerId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What one sprite contributed to the last rebuild.
#[derive(Debug, Clone)]
pub struct DrawSpan {
    pub texture: Texture,
    pub shader: Shader,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl DrawSpan {
    /// Whether two spans can share a draw call.
    pub fn batches_with(&self, other: &DrawSpan) -> bool {
        self.texture == other.texture && self.shader == other.shader
    }
}

/// Render order of two live sprites.
fn draw_order(a: &Sprite, b: &Sprite) -> Ordering {
    a.depth()
        .total_cmp(&b.depth())
        .then_with(|| a.texture().id().cmp(&b.texture().id()))
        .then_with(|| a.shader().id().cmp(&b.shader().id()))
}

pub struct SpriteLayer {
    id: LayerId,
    label: String,
    blend: BlendMode,
    depth: DepthMode,

    slots: Vec<Option<SpriteId>>,
    extension: usize,
    cursor: usize,
    live: usize,
    vertex_count: usize,
    index_count: usize,
    dirty: bool,

    vertex_buffer: DynamicBuffer<Vertex>,
    index_buffer: DynamicBuffer<u32>,
    spans: Vec<DrawSpan>,
    rebuilds: u64,

    scratch_vertices: Vec<Vertex>,
    scratch_indices: Vec<u32>,
}

impl SpriteLayer {
    pub(crate) fn new(
        ctx: &dyn RenderContext,
        config: &RenderConfig,
        id: LayerId,
        label: impl Into<String>,
        blend: BlendMode,
        depth: DepthMode,
    ) -> Self {
        let extension = config.slot_extension.max(1);
        Self {
            id,
            label: label.into(),
            blend,
            depth,
            slots: vec![None; extension],
            extension,
            cursor: 0,
            live: 0,
            vertex_count: 0,
            index_count: 0,
            dirty: false,
            vertex_buffer: DynamicBuffer::vertex(ctx, "Sprite Layer Vertices", config.vertex_chunk),
            index_buffer: DynamicBuffer::index(ctx, "Sprite Layer Indices", config.index_chunk),
            spans: Vec::new(),
            rebuilds: 0,
            scratch_vertices: Vec::new(),
            scratch_indices: Vec::new(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend
    }

    pub fn depth_mode(&self) -> DepthMode {
        self.depth
    }

    /// Number of live sprites.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Length of the slot array, live or not.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of times the layer re-sorted and re-uploaded its geometry.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    pub fn slots(&self) -> &[Option<SpriteId>] {
        &self.slots
    }

    /// Live sprites in slot order.
    pub fn sprite_ids(&self) -> impl Iterator<Item = SpriteId> + '_ {
        self.slots.iter().flatten().copied()
    }

    pub fn spans(&self) -> &[DrawSpan] {
        &self.spans
    }

    pub fn vertex_buffer(&self) -> &DynamicBuffer<Vertex> {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &DynamicBuffer<u32> {
        &self.index_buffer
    }

    /// Put a sprite in the next free slot.
    ///
    /// Returns `false` if the sprite already lives in this layer.
    ///
    /// # Panics
    /// Panics if the sprite belongs to another layer. Use
    /// [`SpriteScene::add_sprite`](crate::SpriteScene::add_sprite) to move
    /// sprites between layers.
    pub(crate) fn add_sprite(&mut self, sprites: &mut SparseSet<Sprite>, id: SpriteId) -> bool {
        let sprite = sprites.get_mut(id);
        match sprite.layer() {
            Some(layer) if layer == self.id => return false,
            Some(other) => panic!(
                "sprite already belongs to layer {:?}, remove it before adding to {:?}",
                other, self.id
            ),
            None => {}
        }

        if self.cursor == self.slots.len() {
            self.slots.resize(self.slots.len() + self.extension, None);
            tracing::trace!(
                "Layer '{}' slot array extended to {}",
                self.label,
                self.slots.len()
            );
        }

        let index = self.cursor;
        self.slots[index] = Some(id);
        let (vertices, indices) = sprite.attach(self.id, index);
        self.cursor += 1;
        self.live += 1;
        self.vertex_count += vertices;
        self.index_count += indices;
        self.dirty = true;
        true
    }

    /// Empty the sprite's slot. Other sprites keep their slots.
    ///
    /// Returns `false` if the sprite is not in this layer.
    pub(crate) fn remove_sprite(&mut self, sprites: &mut SparseSet<Sprite>, id: SpriteId) -> bool {
        let sprite = sprites.get_mut(id);
        if sprite.layer() != Some(self.id) {
            return false;
        }

        self.slots[sprite.layer_index()] = None;
        self.live -= 1;
        let (vertices, indices) = sprite.detach();
        self.vertex_count -= vertices;
        self.index_count -= indices;
        self.dirty = true;
        true
    }

    /// Stable sort into render order, compacting live sprites into a prefix.
    ///
    /// Returns `true` if the slot array was shrunk.
    pub(crate) fn sort_sprites(&mut self, sprites: &mut SparseSet<Sprite>) -> bool {
        profile_function!();

        self.slots.sort_by(|a, b| match (a, b) {
            (Some(a), Some(b)) => draw_order(sprites.get(*a), sprites.get(*b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        for (index, id) in self.slots[..self.live].iter().enumerate() {
            if let Some(id) = id {
                sprites.get_mut(*id).set_layer_index(index);
            }
        }
        self.cursor = self.live;

        if self.slots.len() - self.live > 2 * self.extension {
            let len = chunk_aligned(self.live + self.extension, self.extension);
            tracing::debug!(
                "Layer '{}' slot array shrunk {} -> {}",
                self.label,
                self.slots.len(),
                len
            );
            self.slots.truncate(len);
            self.slots.shrink_to_fit();
            return true;
        }
        false
    }

    /// Concatenate live geometry and rewrite both GPU buffers.
    pub(crate) fn update_buffers(
        &mut self,
        ctx: &dyn RenderContext,
        sprites: &SparseSet<Sprite>,
    ) -> RenderResult<()> {
        profile_function!();

        self.scratch_vertices.clear();
        self.scratch_indices.clear();
        self.spans.clear();

        for id in self.slots.iter().flatten() {
            let sprite = sprites.get(*id);
            let base = self.scratch_vertices.len() as u32;
            self.scratch_vertices.extend_from_slice(sprite.vertices());
            self.scratch_indices
                .extend(sprite.indices().iter().map(|index| index + base));
            self.spans.push(DrawSpan {
                texture: sprite.texture().clone(),
                shader: sprite.shader().clone(),
                vertex_count: sprite.vertex_count() as u32,
                index_count: sprite.index_count() as u32,
            });
        }

        self.vertex_count = self.scratch_vertices.len();
        self.index_count = self.scratch_indices.len();
        self.vertex_buffer.grow(ctx, self.scratch_vertices.len());
        self.index_buffer.grow(ctx, self.scratch_indices.len());
        self.vertex_buffer.set_data(ctx, &self.scratch_vertices)?;
        self.index_buffer.set_data(ctx, &self.scratch_indices)?;
        Ok(())
    }

    /// Refresh dirty sprites and rebuild if anything changed.
    ///
    /// Returns whether a rebuild happened.
    pub(crate) fn update(
        &mut self,
        ctx: &dyn RenderContext,
        sprites: &mut SparseSet<Sprite>,
    ) -> RenderResult<bool> {
        profile_function!();

        for id in self.slots.iter().flatten() {
            let sprite = sprites.get_mut(*id);
            if sprite.update() {
                let (vertices, indices) = sprite.recount();
                self.vertex_count = self.vertex_count - vertices + sprite.vertex_count();
                self.index_count = self.index_count - indices + sprite.index_count();
                self.dirty = true;
            }
        }

        if !self.dirty {
            return Ok(false);
        }

        if self.sort_sprites(sprites) {
            self.vertex_buffer.shrink_to(ctx, self.vertex_count);
            self.index_buffer.shrink_to(ctx, self.index_count);
        }
        self.update_buffers(ctx, sprites)?;
        self.rebuilds += 1;
        self.dirty = false;
        Ok(true)
    }
}

impl std::fmt::Debug for SpriteLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpriteLayer")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("live", &self.live)
            .field("capacity", &self.slots.len())
            .field("vertex_count", &self.vertex_count)
            .field("index_count", &self.index_count)
            .field("dirty", &self.dirty)
            .field("rebuilds", &self.rebuilds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use tessera_core::geometry::Size;
    use tessera_test_utils::{GpuBindGroup, GpuRenderPipeline, MockRenderContext};

    use crate::sprite::{PathFillSprite, SpriteKind, TextSprite, TextureSprite};

    struct Fixture {
        ctx: MockRenderContext,
        sprites: SparseSet<Sprite>,
        layer: SpriteLayer,
        texture: Texture,
        shader: Shader,
    }

    fn fixture(extension: usize) -> Fixture {
        let ctx = MockRenderContext::new();
        let config = RenderConfig::default()
            .with_slot_extension(extension)
            .with_vertex_chunk(16)
            .with_index_chunk(24);
        let layer = SpriteLayer::new(
            &ctx,
            &config,
            LayerId(0),
            "test",
            BlendMode::Alpha,
            DepthMode::Disabled,
        );
        Fixture {
            ctx,
            sprites: SparseSet::new(),
            layer,
            texture: Texture::new("atlas", Size::new(16, 16), GpuBindGroup::mock(900)),
            shader: Shader::with_pipeline(
                "sprite",
                BlendMode::Alpha,
                DepthMode::Disabled,
                GpuRenderPipeline::mock(901),
            ),
        }
    }

    impl Fixture {
        fn spawn(&mut self, depth: f32) -> SpriteId {
            let sprite = Sprite::texture_quad(
                TextureSprite::new(Vec2::ONE),
                self.texture.clone(),
                self.shader.clone(),
            )
            .with_depth(depth);
            let id = self.sprites.push(sprite);
            self.layer.add_sprite(&mut self.sprites, id);
            id
        }
    }

    #[test]
    fn add_assigns_consecutive_slots() {
        let mut f = fixture(4);
        let a = f.spawn(0.0);
        let b = f.spawn(0.0);

        assert_eq!(f.sprites.get(a).layer_index(), 0);
        assert_eq!(f.sprites.get(b).layer_index(), 1);
        assert_eq!(f.layer.len(), 2);
        assert_eq!(f.layer.vertex_count(), 8);
        assert_eq!(f.layer.index_count(), 12);
        assert!(f.layer.is_dirty());
    }

    #[test]
    fn adding_twice_is_a_noop() {
        let mut f = fixture(4);
        let a = f.spawn(0.0);

        assert!(!f.layer.add_sprite(&mut f.sprites, a));
        assert_eq!(f.layer.len(), 1);
    }

    #[test]
    fn slot_array_extends_by_chunk() {
        let mut f = fixture(2);
        for _ in 0..3 {
            f.spawn(0.0);
        }
        assert_eq!(f.layer.capacity(), 4);
    }

    #[test]
    fn remove_leaves_hole_without_moving_others() {
        let mut f = fixture(4);
        let a = f.spawn(0.0);
        let b = f.spawn(0.0);
        let c = f.spawn(0.0);

        assert!(f.layer.remove_sprite(&mut f.sprites, b));

        assert_eq!(f.layer.slots()[1], None);
        assert_eq!(f.sprites.get(a).layer_index(), 0);
        assert_eq!(f.sprites.get(c).layer_index(), 2);
        assert_eq!(f.sprites.get(b).layer(), None);
        assert_eq!(f.layer.len(), 2);
        assert!(!f.layer.remove_sprite(&mut f.sprites, b));
    }

    #[test]
    fn removal_subtracts_counted_geometry() {
        let mut f = fixture(4);
        let a = f.spawn(0.0);
        let b = f.spawn(1.0);
        *f.sprites.get_mut(b).kind_mut() = SpriteKind::PathFill(PathFillSprite {
            points: vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y, Vec2::new(0.5, 1.5)],
        });

        f.layer.update(&f.ctx, &mut f.sprites).unwrap();
        assert_eq!(f.layer.vertex_count(), 9);
        assert_eq!(f.layer.index_count(), 15);

        *f.sprites.get_mut(a).kind_mut() = SpriteKind::Text(TextSprite::default());
        assert!(f.layer.remove_sprite(&mut f.sprites, b));
        assert!(f.layer.remove_sprite(&mut f.sprites, a));

        assert_eq!(f.layer.vertex_count(), 0);
        assert_eq!(f.layer.index_count(), 0);
    }

    #[test]
    fn sort_orders_by_depth_and_compacts() {
        let mut f = fixture(4);
        let far = f.spawn(3.0);
        let hole = f.spawn(0.0);
        let near = f.spawn(1.0);
        f.layer.remove_sprite(&mut f.sprites, hole);

        f.layer.sort_sprites(&mut f.sprites);

        assert_eq!(f.layer.slots()[..2], [Some(near), Some(far)]);
        assert!(f.layer.slots()[2..].iter().all(Option::is_none));
        assert_eq!(f.sprites.get(near).layer_index(), 0);
        assert_eq!(f.sprites.get(far).layer_index(), 1);
    }

    #[test]
    fn sort_keeps_slot_order_for_full_ties() {
        let mut f = fixture(4);
        let ids: Vec<_> = (0..4).map(|_| f.spawn(5.0)).collect();

        f.layer.sort_sprites(&mut f.sprites);

        let sorted: Vec<_> = f.layer.sprite_ids().collect();
        assert_eq!(sorted, ids);
    }

    #[test]
    fn sort_shrinks_oversized_slot_array() {
        let mut f = fixture(2);
        let ids: Vec<_> = (0..8).map(|_| f.spawn(0.0)).collect();
        for id in &ids[1..] {
            f.layer.remove_sprite(&mut f.sprites, *id);
        }

        assert!(f.layer.sort_sprites(&mut f.sprites));
        assert_eq!(f.layer.capacity(), 4);
    }

    #[test]
    fn update_buffers_offsets_indices() {
        let mut f = fixture(4);
        f.spawn(0.0);
        f.spawn(1.0);

        f.layer.update(&f.ctx, &mut f.sprites).unwrap();

        let bytes = f.ctx.buffer_contents(f.layer.index_buffer().buffer()).unwrap();
        let indices: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
        assert_eq!(f.layer.spans().len(), 2);
    }

    #[test]
    fn update_is_idempotent_without_changes() {
        let mut f = fixture(4);
        f.spawn(0.0);

        assert!(f.layer.update(&f.ctx, &mut f.sprites).unwrap());
        let writes = f.ctx.count_buffer_writes();
        assert!(!f.layer.update(&f.ctx, &mut f.sprites).unwrap());

        assert_eq!(f.layer.rebuild_count(), 1);
        assert_eq!(f.ctx.count_buffer_writes(), writes);
    }

    #[test]
    fn dirty_sprite_triggers_rebuild() {
        let mut f = fixture(4);
        let a = f.spawn(0.0);
        f.layer.update(&f.ctx, &mut f.sprites).unwrap();

        f.sprites.get_mut(a).set_origin(Vec2::new(5.0, 5.0));

        assert!(f.layer.update(&f.ctx, &mut f.sprites).unwrap());
        assert_eq!(f.layer.rebuild_count(), 2);
    }

    #[test]
    fn buffers_grow_past_initial_chunk() {
        let mut f = fixture(8);
        for i in 0..5 {
            f.spawn(i as f32);
        }

        f.layer.update(&f.ctx, &mut f.sprites).unwrap();

        assert_eq!(f.layer.vertex_buffer().capacity(), 32);
        assert_eq!(f.layer.index_buffer().capacity(), 48);
        assert_eq!(f.layer.vertex_buffer().len(), 20);
    }
}
