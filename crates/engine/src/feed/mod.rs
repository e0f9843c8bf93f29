mod config;
mod frame;
mod hub;
mod manager;
mod transport;
mod websocket;

pub use config::{
    reconnect_delay, FeedConfig, DEFAULT_FEED_URL, FEED_DISABLED_ENV_VAR, FEED_URL_ENV_VAR,
};
pub use frame::{
    decode_pose_frame, ArmAngles, ArmsAngles, FrameDecodeError, HeadAngles, PlayerPose,
    PoseAction, PoseFrame, PLAYER_COUNT,
};
pub use hub::{FeedHandle, FeedSnapshot, PoseFeed};
pub use manager::{ConnectionManager, ConnectionState, ConnectionStatus, ReceivedFrame};
pub use transport::{PoseTransport, TransportError, TransportEvent};
pub use websocket::WebSocketTransport;
