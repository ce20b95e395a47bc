//! Per-variant geometry generation.

use glam::{Affine2, Vec2};

use super::Vertex;

/// Normalized texture rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl UvRect {
    pub const FULL: UvRect = UvRect {
        min: Vec2::ZERO,
        max: Vec2::ONE,
    };

    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    fn lerp(&self, t: Vec2) -> Vec2 {
        self.min + (self.max - self.min) * t
    }
}

impl Default for UvRect {
    fn default() -> Self {
        Self::FULL
    }
}

/// A textured quad.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureSprite {
    pub size: Vec2,
    /// Pivot within the quad, `(0, 0)` is top-left and `(1, 1)` bottom-right.
    pub anchor: Vec2,
    pub uv: UvRect,
}

impl TextureSprite {
    pub fn new(size: Vec2) -> Self {
        Self {
            size,
            anchor: Vec2::splat(0.5),
            uv: UvRect::FULL,
        }
    }
}

/// A convex polygon filled as a triangle fan around its first point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathFillSprite {
    pub points: Vec<Vec2>,
}

/// One pre-laid-out glyph quad, positioned relative to the text origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphQuad {
    pub offset: Vec2,
    pub size: Vec2,
    pub uv: UvRect,
}

/// A run of glyph quads sampling a shared glyph atlas.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextSprite {
    pub glyphs: Vec<GlyphQuad>,
}

/// Variant data of a sprite.
#[derive(Debug, Clone, PartialEq)]
pub enum SpriteKind {
    Texture(TextureSprite),
    PathFill(PathFillSprite),
    Text(TextSprite),
}

/// Vertex attributes shared by every vertex of one sprite.
pub(crate) struct Paint {
    pub transform: Affine2,
    pub color: [f32; 4],
    pub alpha: f32,
}

impl Paint {
    fn vertex(&self, local: Vec2, tex_coords: Vec2) -> Vertex {
        Vertex {
            position: self.transform.transform_point2(local).to_array(),
            color: self.color,
            tex_coords: tex_coords.to_array(),
            alpha: self.alpha,
        }
    }

    fn quad(
        &self,
        top_left: Vec2,
        size: Vec2,
        uv: &UvRect,
        vertices: &mut Vec<Vertex>,
        indices: &mut Vec<u32>,
    ) {
        let base = vertices.len() as u32;
        for corner in [Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y] {
            vertices.push(self.vertex(top_left + size * corner, uv.lerp(corner)));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
}

impl SpriteKind {
    /// Append this sprite's geometry. Indices are relative to the sprite's
    /// first vertex.
    pub(crate) fn build(&self, paint: &Paint, vertices: &mut Vec<Vertex>, indices: &mut Vec<u32>) {
        match self {
            SpriteKind::Texture(quad) => {
                let top_left = -quad.anchor * quad.size;
                paint.quad(top_left, quad.size, &quad.uv, vertices, indices);
            }
            SpriteKind::PathFill(path) => {
                let n = path.points.len();
                if n < 3 {
                    return;
                }

                let min = path.points.iter().copied().fold(Vec2::MAX, Vec2::min);
                let max = path.points.iter().copied().fold(Vec2::MIN, Vec2::max);
                let extent = (max - min).max(Vec2::splat(f32::EPSILON));
                for &point in &path.points {
                    vertices.push(paint.vertex(point, (point - min) / extent));
                }
                for i in 1..(n as u32 - 1) {
                    indices.extend_from_slice(&[0, i, i + 1]);
                }
            }
            SpriteKind::Text(text) => {
                for glyph in &text.glyphs {
                    paint.quad(glyph.offset, glyph.size, &glyph.uv, vertices, indices);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Paint {
        Paint {
            transform: Affine2::IDENTITY,
            color: [1.0; 4],
            alpha: 1.0,
        }
    }

    fn build(kind: &SpriteKind) -> (Vec<Vertex>, Vec<u32>) {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        kind.build(&identity(), &mut vertices, &mut indices);
        (vertices, indices)
    }

    #[test]
    fn texture_quad_is_centered_by_default() {
        let (vertices, indices) = build(&SpriteKind::Texture(TextureSprite::new(Vec2::new(4.0, 2.0))));

        assert_eq!(vertices.len(), 4);
        assert_eq!(indices, vec![0, 1, 2, 2, 3, 0]);
        assert_eq!(vertices[0].position, [-2.0, -1.0]);
        assert_eq!(vertices[2].position, [2.0, 1.0]);
        assert_eq!(vertices[2].tex_coords, [1.0, 1.0]);
    }

    #[test]
    fn path_fill_is_a_fan() {
        let path = PathFillSprite {
            points: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(2.0, 0.0),
                Vec2::new(3.0, 2.0),
                Vec2::new(1.0, 3.0),
                Vec2::new(-1.0, 2.0),
            ],
        };
        let (vertices, indices) = build(&SpriteKind::PathFill(path));

        assert_eq!(vertices.len(), 5);
        assert_eq!(indices.len(), 3 * (5 - 2));
        assert_eq!(&indices[..6], &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn degenerate_path_has_no_geometry() {
        let path = PathFillSprite {
            points: vec![Vec2::ZERO, Vec2::ONE],
        };
        let (vertices, indices) = build(&SpriteKind::PathFill(path));

        assert!(vertices.is_empty());
        assert!(indices.is_empty());
    }

    #[test]
    fn text_emits_one_quad_per_glyph() {
        let glyph = |x: f32| GlyphQuad {
            offset: Vec2::new(x, 0.0),
            size: Vec2::new(8.0, 12.0),
            uv: UvRect::FULL,
        };
        let text = TextSprite {
            glyphs: vec![glyph(0.0), glyph(8.0), glyph(16.0)],
        };
        let (vertices, indices) = build(&SpriteKind::Text(text));

        assert_eq!(vertices.len(), 12);
        assert_eq!(indices.len(), 18);
        assert_eq!(&indices[6..12], &[4, 5, 6, 6, 7, 4]);
    }
}
