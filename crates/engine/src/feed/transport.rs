use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Failed(String),
    Closed { reason: Option<String> },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid feed endpoint {endpoint}: {message}")]
    InvalidEndpoint { endpoint: String, message: String },
    #[error("tcp connect to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("websocket handshake failed: {0}")]
    Handshake(String),
    #[error("socket setup failed: {0}")]
    Io(#[source] std::io::Error),
}

/// Duplex link to the pose feed. Implementations never block the caller: `open` starts an
/// attempt and its outcome arrives later through `poll_events`.
pub trait PoseTransport {
    fn open(&mut self, endpoint: &str);
    fn poll_events(&mut self, out: &mut Vec<TransportEvent>);
    fn close(&mut self);
}
