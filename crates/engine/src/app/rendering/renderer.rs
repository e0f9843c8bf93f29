use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use super::transform::{world_to_screen, Viewport};
use crate::app::{RenderableKind, SceneWorld};
use crate::math::Vec3;

const CLEAR_COLOR: [u8; 4] = [24, 28, 36, 255];
const GROUND_COLOR: [u8; 4] = [52, 64, 52, 255];
const TRACK_TICK_COLOR: [u8; 4] = [80, 96, 80, 255];
const DIVIDER_COLOR: [u8; 4] = [200, 200, 200, 255];
const TRACK_TICK_SPACING_WORLD: f32 = 10.0;
const AVATAR_HALF_SIZE_PX: i32 = 8;
const MARKER_HALF_SIZE_PX: i32 = 2;

#[derive(Debug, Clone, Copy)]
struct ClipRect {
    left: i32,
    right: i32,
    bottom: i32,
}

impl ClipRect {
    fn from_viewport(viewport: Viewport) -> Self {
        Self {
            left: viewport.x as i32,
            right: (viewport.x + viewport.width) as i32,
            bottom: viewport.height as i32,
        }
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= 0 && y < self.bottom
    }
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    width: u32,
    height: u32,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            width: size.width,
            height: size.height,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn build_pixels(window: Arc<Window>, width: u32, height: u32) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render_views(&mut self, left: &SceneWorld, right: &SceneWorld) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }

        let (left_view, right_view) = split_viewports(self.width, self.height);
        let width = self.width;
        let frame = self.pixels.frame_mut();
        for chunk in frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&CLEAR_COLOR);
        }

        draw_view(frame, width, left, left_view);
        draw_view(frame, width, right, right_view);
        let divider = right_view.x as i32;
        for y in 0..self.height as i32 {
            write_pixel_rgba_clipped(frame, width as usize, divider, y, DIVIDER_COLOR);
        }

        self.pixels.render()
    }
}

fn split_viewports(width: u32, height: u32) -> (Viewport, Viewport) {
    let half = width / 2;
    (
        Viewport {
            x: 0,
            width: half,
            height,
        },
        Viewport {
            x: half,
            width: width - half,
            height,
        },
    )
}

fn draw_view(frame: &mut [u8], width: u32, world: &SceneWorld, viewport: Viewport) {
    let clip = ClipRect::from_viewport(viewport);
    let camera = world.camera();

    let (_, ground_y) = world_to_screen(Vec3::new(0.0, 0.0, camera.focus_z), camera, viewport);
    for y in ground_y..clip.bottom {
        draw_horizontal_span(frame, width, clip, y, GROUND_COLOR);
    }

    let visible_half_world = viewport.width as f32 / camera.pixels_per_world.max(f32::EPSILON);
    let first_tick = ((camera.focus_z - visible_half_world) / TRACK_TICK_SPACING_WORLD).floor() as i32;
    let last_tick = ((camera.focus_z + visible_half_world) / TRACK_TICK_SPACING_WORLD).ceil() as i32;
    for tick in first_tick..=last_tick {
        let z = tick as f32 * TRACK_TICK_SPACING_WORLD;
        let (x, y) = world_to_screen(Vec3::new(0.0, 0.0, z), camera, viewport);
        for dy in 0..6 {
            write_pixel_in_clip(frame, width, clip, x, y + dy, TRACK_TICK_COLOR);
        }
    }

    for entity in world.entities() {
        let (x, y) = world_to_screen(entity.transform.position, camera, viewport);
        let color = entity.renderable.color;
        match entity.renderable.kind {
            RenderableKind::FinishLine => {
                for line_y in 0..clip.bottom {
                    write_pixel_in_clip(frame, width, clip, x, line_y, color);
                    write_pixel_in_clip(frame, width, clip, x + 1, line_y, color);
                }
            }
            RenderableKind::Avatar => {
                draw_square(frame, width, clip, x, y - AVATAR_HALF_SIZE_PX, AVATAR_HALF_SIZE_PX, color);
            }
            RenderableKind::Replica => {
                draw_square_outline(frame, width, clip, x, y - AVATAR_HALF_SIZE_PX, AVATAR_HALF_SIZE_PX, color);
            }
            RenderableKind::LaneMarker => {
                draw_square(frame, width, clip, x, y, MARKER_HALF_SIZE_PX, color);
            }
        }
    }
}

fn draw_horizontal_span(frame: &mut [u8], width: u32, clip: ClipRect, y: i32, color: [u8; 4]) {
    for x in clip.left..clip.right {
        write_pixel_in_clip(frame, width, clip, x, y, color);
    }
}

fn draw_square(
    frame: &mut [u8],
    width: u32,
    clip: ClipRect,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    for y in (cy - half_size)..=(cy + half_size) {
        for x in (cx - half_size)..=(cx + half_size) {
            write_pixel_in_clip(frame, width, clip, x, y, color);
        }
    }
}

fn draw_square_outline(
    frame: &mut [u8],
    width: u32,
    clip: ClipRect,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    let left = cx - half_size;
    let right = cx + half_size;
    let top = cy - half_size;
    let bottom = cy + half_size;

    for x in left..=right {
        write_pixel_in_clip(frame, width, clip, x, top, color);
        write_pixel_in_clip(frame, width, clip, x, bottom, color);
    }
    for y in top..=bottom {
        write_pixel_in_clip(frame, width, clip, left, y, color);
        write_pixel_in_clip(frame, width, clip, right, y, color);
    }
}

fn write_pixel_in_clip(frame: &mut [u8], width: u32, clip: ClipRect, x: i32, y: i32, color: [u8; 4]) {
    if clip.contains(x, y) {
        write_pixel_rgba_clipped(frame, width as usize, x, y, color);
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}
