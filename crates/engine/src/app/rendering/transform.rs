use crate::app::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// World space is in pixels with y growing downward, so the camera is a pure
/// translation that puts `camera` at the viewport center.
pub fn world_to_screen_px(world: Vec2, camera: Vec2, viewport: Viewport) -> Vec2 {
    Vec2 {
        x: world.x - camera.x + viewport.width as f32 * 0.5,
        y: world.y - camera.y + viewport.height as f32 * 0.5,
    }
}

pub fn screen_to_world_px(screen: Vec2, camera: Vec2, viewport: Viewport) -> Vec2 {
    Vec2 {
        x: screen.x + camera.x - viewport.width as f32 * 0.5,
        y: screen.y + camera.y - viewport.height as f32 * 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_maps_to_viewport_center() {
        let viewport = Viewport {
            width: 800,
            height: 600,
        };
        let camera = Vec2::new(100.0, 50.0);
        let screen = world_to_screen_px(camera, camera, viewport);
        assert_eq!(screen, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn screen_and_world_transforms_invert() {
        let viewport = Viewport {
            width: 640,
            height: 480,
        };
        let camera = Vec2::new(-12.0, 30.0);
        let world = Vec2::new(57.0, -4.0);
        let back = screen_to_world_px(world_to_screen_px(world, camera, viewport), camera, viewport);
        assert!((back.x - world.x).abs() < 1e-4);
        assert!((back.y - world.y).abs() < 1e-4);
    }
}
