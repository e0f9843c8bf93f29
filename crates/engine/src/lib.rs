pub mod app;
pub mod feed;
pub mod math;

pub use app::{
    run_app, world_to_screen, AppError, Entity, EntityId, InputAction, InputSnapshot, LoopConfig,
    RenderableDesc, RenderableKind, Renderer, SceneCommand, SceneKey, SceneWorld, Simulation,
    TrackCamera, Transform, Viewport, SLOW_FRAME_ENV_VAR,
};
pub use feed::{
    decode_pose_frame, reconnect_delay, ConnectionManager, ConnectionState, ConnectionStatus,
    FeedConfig, FeedHandle, FeedSnapshot, FrameDecodeError, PlayerPose, PoseAction, PoseFeed,
    PoseFrame, PoseTransport, ReceivedFrame, TransportError, TransportEvent, WebSocketTransport,
    PLAYER_COUNT,
};
pub use math::{approach, Vec3};
