//! Follow camera clamped to the map.

use macroquad::prelude::*;

/// Viewport that follows a target and never shows space outside the map.
///
/// The only state kept between frames is the last computed rectangle.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    viewport: Vec2,
    map_size: Vec2,
    rect: Rect,
}

/// One axis: center on `target`, then clamp into `[0, map - view]`.
/// A map narrower than the view is centered instead.
fn clamp_axis(target: f32, view: f32, map: f32) -> f32 {
    if map <= view {
        return (map - view) / 2.0;
    }
    (target - view / 2.0).clamp(0.0, map - view)
}

impl Camera {
    /// Camera over a map of `map_size` pixels, centered on the map.
    pub fn new(viewport: Vec2, map_size: Vec2) -> Self {
        let mut cam = Camera {
            viewport,
            map_size,
            rect: Rect::new(0.0, 0.0, viewport.x, viewport.y),
        };
        cam.update(map_size / 2.0);
        cam
    }

    /// Recenters on `target` (world pixels) and clamps to the map bounds.
    pub fn update(&mut self, target: Vec2) {
        self.rect = Rect::new(
            clamp_axis(target.x, self.viewport.x, self.map_size.x),
            clamp_axis(target.y, self.viewport.y, self.map_size.y),
            self.viewport.x,
            self.viewport.y,
        );
    }

    /// Called on scene transitions and window resizes.
    pub fn set_bounds(&mut self, viewport: Vec2, map_size: Vec2) {
        self.viewport = viewport;
        self.map_size = map_size;
    }

    /// World rectangle shown this frame.
    pub fn visible_rect(&self) -> Rect {
        self.rect
    }

    /// Converts world pixels to screen pixels.
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        world - self.rect.point()
    }

    /// Macroquad camera showing exactly [`Camera::visible_rect`].
    pub fn to_camera2d(&self) -> Camera2D {
        Camera2D {
            target: self.rect.center(),
            zoom: vec2(2.0 / self.rect.w, 2.0 / self.rect.h),
            ..Default::default()
        }
    }
}
