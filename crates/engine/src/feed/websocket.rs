use std::fmt;
use std::io;
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use tracing::{debug, warn};
use tungstenite::client::IntoClientRequest;
use tungstenite::{Error as WsError, HandshakeError, Message, WebSocket};

use super::transport::{PoseTransport, TransportError, TransportEvent};

type ConnectOutcome = Result<WebSocket<TcpStream>, TransportError>;

#[derive(Default)]
pub struct WebSocketTransport {
    pending: Option<Receiver<ConnectOutcome>>,
    socket: Option<WebSocket<TcpStream>>,
    queued: Vec<TransportEvent>,
}

impl fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("connecting", &self.pending.is_some())
            .field("open", &self.socket.is_some())
            .field("queued", &self.queued.len())
            .finish()
    }
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn take_connect_outcome(&mut self, out: &mut Vec<TransportEvent>) {
        let Some(receiver) = self.pending.as_ref() else {
            return;
        };
        let outcome = match receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => Err(TransportError::Handshake(
                "connect worker exited without a result".to_string(),
            )),
        };
        self.pending = None;

        match outcome {
            Ok(socket) => {
                self.socket = Some(socket);
                out.push(TransportEvent::Opened);
            }
            Err(error) => {
                out.push(TransportEvent::Failed(error.to_string()));
                out.push(TransportEvent::Closed { reason: None });
            }
        }
    }

    fn drain_socket(&mut self, out: &mut Vec<TransportEvent>) {
        let Some(socket) = self.socket.as_mut() else {
            return;
        };

        let mut closed: Option<Option<String>> = None;
        loop {
            match socket.read() {
                Ok(Message::Text(text)) => out.push(TransportEvent::Message(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => out.push(TransportEvent::Message(text)),
                    Err(error) => warn!(error = %error, "feed_invalid_utf8_message_dropped"),
                },
                Ok(Message::Close(frame)) => {
                    closed = Some(
                        frame
                            .map(|frame| frame.reason.to_string())
                            .filter(|reason| !reason.is_empty()),
                    );
                    break;
                }
                Ok(_) => {}
                Err(WsError::Io(error)) if error.kind() == io::ErrorKind::WouldBlock => break,
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                    closed = Some(None);
                    break;
                }
                Err(error) => {
                    out.push(TransportEvent::Failed(error.to_string()));
                    closed = Some(Some(error.to_string()));
                    break;
                }
            }
        }

        if closed.is_none() {
            // Pongs queued by `read` go out here.
            match socket.flush() {
                Ok(()) => {}
                Err(WsError::Io(error)) if error.kind() == io::ErrorKind::WouldBlock => {}
                Err(error) => {
                    out.push(TransportEvent::Failed(error.to_string()));
                    closed = Some(Some(error.to_string()));
                }
            }
        }

        if let Some(reason) = closed {
            self.socket = None;
            out.push(TransportEvent::Closed { reason });
        }
    }
}

impl PoseTransport for WebSocketTransport {
    fn open(&mut self, endpoint: &str) {
        self.close();

        let (sender, receiver) = mpsc::channel();
        let endpoint = endpoint.to_string();
        let spawned = thread::Builder::new()
            .name("feed-connect".to_string())
            .spawn(move || {
                // The receiver is gone if the attempt was cancelled; the socket just drops.
                let _ = sender.send(connect_blocking(&endpoint));
            });

        match spawned {
            Ok(_) => self.pending = Some(receiver),
            Err(error) => {
                self.queued
                    .push(TransportEvent::Failed(TransportError::Io(error).to_string()));
                self.queued.push(TransportEvent::Closed { reason: None });
            }
        }
    }

    fn poll_events(&mut self, out: &mut Vec<TransportEvent>) {
        out.append(&mut self.queued);
        self.take_connect_outcome(out);
        self.drain_socket(out);
    }

    fn close(&mut self) {
        self.pending = None;
        self.queued.clear();
        if let Some(mut socket) = self.socket.take() {
            if let Err(error) = socket.close(None) {
                debug!(error = %error, "feed_close_frame_not_sent");
            }
            let _ = socket.flush();
        }
    }
}

fn connect_blocking(endpoint: &str) -> ConnectOutcome {
    let request =
        endpoint
            .into_client_request()
            .map_err(|error| TransportError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                message: error.to_string(),
            })?;
    let host = request
        .uri()
        .host()
        .ok_or_else(|| TransportError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            message: "missing host".to_string(),
        })?
        .to_string();
    let port = request.uri().port_u16().unwrap_or(80);
    let address = format!("{host}:{port}");

    let stream =
        TcpStream::connect(address.as_str()).map_err(|source| TransportError::Connect {
            address: address.clone(),
            source,
        })?;
    stream.set_nodelay(true).map_err(TransportError::Io)?;

    let socket = match tungstenite::client(request, stream) {
        Ok((socket, _response)) => socket,
        Err(HandshakeError::Failure(error)) => {
            return Err(TransportError::Handshake(error.to_string()))
        }
        Err(HandshakeError::Interrupted(_)) => {
            return Err(TransportError::Handshake(
                "handshake interrupted".to_string(),
            ))
        }
    };
    socket
        .get_ref()
        .set_nonblocking(true)
        .map_err(TransportError::Io)?;
    Ok(socket)
}
