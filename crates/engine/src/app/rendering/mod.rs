mod renderer;
mod transform;

pub use renderer::Renderer;
pub use transform::{world_to_screen, Viewport, FOCUS_ANCHOR_X, GROUND_ANCHOR_Y};
