mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use input::{InputAction, InputSnapshot};
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use rendering::{world_to_screen, Renderer, Viewport, FOCUS_ANCHOR_X, GROUND_ANCHOR_Y};
pub use scene::{
    Entity, EntityId, RenderableDesc, RenderableKind, SceneCommand, SceneKey, SceneWorld,
    Simulation, TrackCamera, Transform, CAMERA_PIXELS_PER_WORLD_DEFAULT,
};
