use tessera_core::{alloc::sparse_set::SparseSet, profiling::profile_function};
use tessera_test_utils::RenderContext;

use crate::{
    config::RenderConfig,
    error::{RenderError, RenderResult},
    layer::{LayerId, SpriteLayer},
    sprite::{BlendMode, DepthMode, Sprite, SpriteId},
};

/// Owns every sprite and every layer.
///
/// Sprites live in a generational arena. A destroyed sprite's id goes stale,
/// and any later lookup with it panics instead of reaching a recycled slot.
pub struct SpriteScene {
    config: RenderConfig,
    sprites: SparseSet<Sprite>,
    layers: Vec<SpriteLayer>,
}

impl SpriteScene {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            sprites: SparseSet::new(),
            layers: Vec::new(),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Create a layer. Layers draw in creation order.
    pub fn create_layer(
        &mut self,
        ctx: &dyn RenderContext,
        label: impl Into<String>,
        blend: BlendMode,
        depth: DepthMode,
    ) -> LayerId {
        let id = LayerId(self.layers.len() as u32);
        self.layers
            .push(SpriteLayer::new(ctx, &self.config, id, label, blend, depth));
        id
    }

    pub fn layer(&self, id: LayerId) -> RenderResult<&SpriteLayer> {
        self.layers
            .get(id.index())
            .ok_or(RenderError::UnknownLayer(id))
    }

    pub fn layers(&self) -> &[SpriteLayer] {
        &self.layers
    }

    /// Store a sprite. It is not drawn until added to a layer.
    pub fn spawn(&mut self, sprite: Sprite) -> SpriteId {
        self.sprites.push(sprite)
    }

    /// Remove a sprite from its layer and drop it.
    pub fn destroy(&mut self, id: SpriteId) -> Option<Sprite> {
        if !self.sprites.contains(id) {
            return None;
        }
        self.remove_sprite(id);
        self.sprites.try_remove(id)
    }

    /// # Panics
    /// Panics if `id` is stale.
    pub fn sprite(&self, id: SpriteId) -> &Sprite {
        self.sprites.get(id)
    }

    /// # Panics
    /// Panics if `id` is stale.
    pub fn sprite_mut(&mut self, id: SpriteId) -> &mut Sprite {
        self.sprites.get_mut(id)
    }

    pub fn try_sprite(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.try_get(id)
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    pub fn sprites(&self) -> &SparseSet<Sprite> {
        &self.sprites
    }

    /// Put a sprite in `layer`, detaching it from any other layer first.
    ///
    /// Returns `false` if it was already in `layer`.
    pub fn add_sprite(&mut self, layer: LayerId, id: SpriteId) -> RenderResult<bool> {
        // An unknown layer must leave the sprite where it was.
        self.layer(layer)?;

        match self.sprites.get(id).layer() {
            Some(current) if current == layer => return Ok(false),
            Some(current) => {
                self.layers[current.index()].remove_sprite(&mut self.sprites, id);
            }
            None => {}
        }

        Ok(self.layers[layer.index()].add_sprite(&mut self.sprites, id))
    }

    /// Take a sprite out of whatever layer holds it.
    pub fn remove_sprite(&mut self, id: SpriteId) -> bool {
        match self.sprites.get(id).layer() {
            Some(layer) => self.layers[layer.index()].remove_sprite(&mut self.sprites, id),
            None => false,
        }
    }

    pub fn update_layer(&mut self, ctx: &dyn RenderContext, id: LayerId) -> RenderResult<bool> {
        let layer = self
            .layers
            .get_mut(id.index())
            .ok_or(RenderError::UnknownLayer(id))?;
        layer.update(ctx, &mut self.sprites)
    }

    /// Update every layer. Returns how many rebuilt.
    pub fn update(&mut self, ctx: &dyn RenderContext) -> RenderResult<usize> {
        profile_function!();

        let mut rebuilt = 0;
        for layer in &mut self.layers {
            if layer.update(ctx, &mut self.sprites)? {
                rebuilt += 1;
            }
        }
        Ok(rebuilt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use tessera_core::geometry::Size;
    use tessera_test_utils::{GpuBindGroup, GpuRenderPipeline, MockRenderContext};

    use crate::sprite::{Shader, Texture, TextureSprite};

    fn sprite() -> Sprite {
        Sprite::texture_quad(
            TextureSprite::new(Vec2::ONE),
            Texture::new("t", Size::new(1, 1), GpuBindGroup::mock(0)),
            Shader::with_pipeline(
                "s",
                BlendMode::Alpha,
                DepthMode::Disabled,
                GpuRenderPipeline::mock(1),
            ),
        )
    }

    #[test]
    fn moving_between_layers_detaches_first() {
        let ctx = MockRenderContext::new();
        let mut scene = SpriteScene::new(RenderConfig::default());
        let back = scene.create_layer(&ctx, "back", BlendMode::Alpha, DepthMode::Disabled);
        let front = scene.create_layer(&ctx, "front", BlendMode::Alpha, DepthMode::Disabled);
        let id = scene.spawn(sprite());

        assert!(scene.add_sprite(back, id).unwrap());
        assert!(scene.add_sprite(front, id).unwrap());

        assert_eq!(scene.sprite(id).layer(), Some(front));
        assert_eq!(scene.layer(back).unwrap().len(), 0);
        assert_eq!(scene.layer(front).unwrap().len(), 1);
        assert!(!scene.add_sprite(front, id).unwrap());
    }

    #[test]
    fn unknown_layer_is_an_error() {
        let mut scene = SpriteScene::new(RenderConfig::default());
        let id = scene.spawn(sprite());

        assert_eq!(
            scene.add_sprite(LayerId(3), id),
            Err(RenderError::UnknownLayer(LayerId(3)))
        );
    }

    #[test]
    fn destroy_detaches_and_invalidates() {
        let ctx = MockRenderContext::new();
        let mut scene = SpriteScene::new(RenderConfig::default());
        let layer = scene.create_layer(&ctx, "main", BlendMode::Alpha, DepthMode::Disabled);
        let id = scene.spawn(sprite());
        scene.add_sprite(layer, id).unwrap();

        assert!(scene.destroy(id).is_some());

        assert_eq!(scene.layer(layer).unwrap().len(), 0);
        assert!(scene.try_sprite(id).is_none());
        assert!(scene.destroy(id).is_none());
    }
}
