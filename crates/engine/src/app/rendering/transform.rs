use crate::app::{Camera2D, Vec2};

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// World coordinates are in pixels; the camera position is the world point
/// shown at the viewport center.
pub fn world_to_screen_px(camera: &Camera2D, window_size: (u32, u32), world: Vec2) -> (i32, i32) {
    let x = world.x - camera.position.x + window_size.0 as f32 * 0.5;
    let y = world.y - camera.position.y + window_size.1 as f32 * 0.5;
    (x.round() as i32, y.round() as i32)
}

pub fn screen_to_world_px(camera: &Camera2D, window_size: (u32, u32), screen: Vec2) -> Vec2 {
    Vec2 {
        x: screen.x + camera.position.x - window_size.0 as f32 * 0.5,
        y: screen.y + camera.position.y - window_size.1 as f32 * 0.5,
    }
}
