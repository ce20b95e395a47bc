//! Math re-exports and the few projection helpers the sprite renderer needs.

pub use glam::*;

/// Orthographic projection mapping pixel coordinates to clip space.
///
/// The origin is the top-left corner of the viewport and +y points down,
/// which matches how sprite positions are authored.
pub fn screen_projection(width: u32, height: u32) -> Mat4 {
    Mat4::orthographic_rh(0.0, width.max(1) as f32, height.max(1) as f32, 0.0, -1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_projection_maps_corners() {
        let proj = screen_projection(800, 600);

        let top_left = proj.project_point3(Vec3::new(0.0, 0.0, 0.0));
        assert!((top_left.x + 1.0).abs() < 1e-5);
        assert!((top_left.y - 1.0).abs() < 1e-5);

        let bottom_right = proj.project_point3(Vec3::new(800.0, 600.0, 0.0));
        assert!((bottom_right.x - 1.0).abs() < 1e-5);
        assert!((bottom_right.y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_screen_projection_zero_size_is_finite() {
        let proj = screen_projection(0, 0);
        assert!(proj.is_finite());
    }
}
