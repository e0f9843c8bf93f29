use crate::app::TrackCamera;
use crate::math::Vec3;

pub const FOCUS_ANCHOR_X: f32 = 0.3;
pub const GROUND_ANCHOR_Y: f32 = 0.75;
pub const LANE_DEPTH_PX_PER_WORLD: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub width: u32,
    pub height: u32,
}

pub fn world_to_screen(world: Vec3, camera: &TrackCamera, viewport: Viewport) -> (i32, i32) {
    let x = viewport.x as f32
        + (world.z - camera.focus_z) * camera.pixels_per_world
        + viewport.width as f32 * FOCUS_ANCHOR_X;
    let y = viewport.height as f32 * GROUND_ANCHOR_Y
        - world.y * camera.pixels_per_world
        + world.x * LANE_DEPTH_PX_PER_WORLD;
    (x.round() as i32, y.round() as i32)
}
