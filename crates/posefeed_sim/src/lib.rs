use std::io;
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use engine::feed::ArmAngles;
use engine::{PlayerPose, PoseAction, PoseFrame};
use tracing::{debug, info, warn};
use tungstenite::{Error as WsError, Message, WebSocket};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_RATE_HZ: u32 = 10;
pub const FEED_PATH: &str = "/ws/pose";
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);
const IDLE_SLEEP: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Run,
    Jump,
    Idle,
    Mixed,
}

impl Script {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "run" => Some(Self::Run),
            "jump" => Some(Self::Jump),
            "idle" => Some(Self::Idle),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Jump => "jump",
            Self::Idle => "idle",
            Self::Mixed => "mixed",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SimOptions {
    pub port: u16,
    pub rate_hz: u32,
    pub script: Script,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            rate_hz: DEFAULT_RATE_HZ,
            script: Script::Mixed,
        }
    }
}

pub fn script_frame(script: Script, tick: u64, rate_hz: u32) -> PoseFrame {
    let rate = u64::from(rate_hz.max(1));
    let players = match script {
        Script::Run => [running(), running()],
        Script::Idle => [PlayerPose::default(), PlayerPose::default()],
        // One second of jump, two seconds standing.
        Script::Jump => {
            let phase = tick % (rate * 3);
            let pose = if phase < rate {
                with_action(PoseAction::Jump, 0.0)
            } else {
                PlayerPose::default()
            };
            [pose, pose]
        }
        Script::Mixed => [mixed_pose(tick, rate), mixed_pose(tick + rate * 3, rate)],
    };

    PoseFrame {
        players,
        timestamp: tick as f64 / rate as f64,
    }
}

fn mixed_pose(tick: u64, rate: u64) -> PlayerPose {
    // Twelve-second loop: run, jump, run, crouch, stand and wave.
    let second = (tick % (rate * 12)) / rate;
    match second {
        0..=3 => running(),
        4 => with_action(PoseAction::Jump, 1.5),
        5..=7 => with_action(PoseAction::MountainClimber, 2.5),
        8..=9 => with_action(PoseAction::Crouch, 0.0),
        _ => {
            let mut pose = PlayerPose::default();
            pose.arms.right = ArmAngles {
                shoulder_angle: Some(150.0),
                elbow_angle: Some(170.0),
            };
            pose
        }
    }
}

fn running() -> PlayerPose {
    with_action(PoseAction::Run, 3.0)
}

fn with_action(action: PoseAction, speed: f32) -> PlayerPose {
    PlayerPose {
        action,
        speed,
        ..PlayerPose::default()
    }
}

pub fn encode_frame(frame: &PoseFrame) -> Result<String, String> {
    serde_json::to_string(frame).map_err(|error| format!("failed to encode frame: {error}"))
}

pub struct FeedServer {
    listener: TcpListener,
    clients: Vec<WebSocket<TcpStream>>,
    script: Script,
    rate_hz: u32,
    tick: u64,
    latest: Option<String>,
}

impl FeedServer {
    pub fn bind(port: u16, script: Script, rate_hz: u32) -> Result<Self, String> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .map_err(|error| format!("failed to bind 127.0.0.1:{port}: {error}"))?;
        listener
            .set_nonblocking(true)
            .map_err(|error| format!("failed to set listener non-blocking: {error}"))?;
        Ok(Self {
            listener,
            clients: Vec::new(),
            script,
            rate_hz: rate_hz.max(1),
            tick: 0,
            latest: None,
        })
    }

    pub fn local_port(&self) -> Result<u16, String> {
        self.listener
            .local_addr()
            .map(|addr| addr.port())
            .map_err(|error| format!("failed to read listener address: {error}"))
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => match handshake(stream) {
                    Ok(mut socket) => {
                        info!(peer = %peer, "client_connected");
                        if let Some(latest) = self.latest.as_ref() {
                            if let Err(error) = send_text(&mut socket, latest) {
                                warn!(peer = %peer, error = %error, "client_dropped");
                                continue;
                            }
                        }
                        self.clients.push(socket);
                    }
                    Err(error) => warn!(peer = %peer, error = %error, "client_handshake_failed"),
                },
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => return,
                Err(error) => {
                    warn!(error = %error, "accept_failed");
                    return;
                }
            }
        }
    }

    pub fn step(&mut self) -> Result<(), String> {
        let frame = script_frame(self.script, self.tick, self.rate_hz);
        let text = encode_frame(&frame)?;
        self.tick = self.tick.wrapping_add(1);
        self.broadcast(&text);
        self.latest = Some(text);
        Ok(())
    }

    fn broadcast(&mut self, text: &str) {
        let before = self.clients.len();
        self.clients.retain_mut(|socket| {
            let outcome = drain_incoming(socket).and_then(|()| send_text(socket, text));
            match outcome {
                Ok(()) => true,
                Err(error) => {
                    debug!(error = %error, "client_dropped");
                    false
                }
            }
        });
        if self.clients.len() != before {
            info!(
                dropped = before - self.clients.len(),
                remaining = self.clients.len(),
                "clients_pruned"
            );
        }
    }
}

fn handshake(stream: TcpStream) -> Result<WebSocket<TcpStream>, String> {
    stream
        .set_nonblocking(false)
        .map_err(|error| format!("failed to set blocking mode: {error}"))?;
    stream
        .set_read_timeout(Some(HANDSHAKE_TIMEOUT))
        .map_err(|error| format!("failed to set handshake timeout: {error}"))?;
    let socket = tungstenite::accept(stream).map_err(|error| error.to_string())?;
    socket
        .get_ref()
        .set_nonblocking(true)
        .map_err(|error| format!("failed to set non-blocking mode: {error}"))?;
    Ok(socket)
}

fn drain_incoming(socket: &mut WebSocket<TcpStream>) -> Result<(), String> {
    loop {
        match socket.read() {
            Ok(Message::Close(_)) => return Err("client closed".to_string()),
            Ok(_) => {}
            Err(WsError::Io(error)) if error.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(error) => return Err(error.to_string()),
        }
    }
}

fn send_text(socket: &mut WebSocket<TcpStream>, text: &str) -> Result<(), String> {
    match socket.send(Message::Text(text.to_string())) {
        Ok(()) => Ok(()),
        // Buffered by tungstenite; flushed on the next send.
        Err(WsError::Io(error)) if error.kind() == io::ErrorKind::WouldBlock => Ok(()),
        Err(error) => Err(error.to_string()),
    }
}

pub fn run(options: SimOptions) -> Result<(), String> {
    let mut server = FeedServer::bind(options.port, options.script, options.rate_hz)?;
    let port = server.local_port()?;
    info!(
        endpoint = %format!("ws://127.0.0.1:{port}{FEED_PATH}"),
        rate_hz = options.rate_hz,
        script = options.script.name(),
        "posefeed_sim_listening"
    );

    let interval = Duration::from_secs_f64(1.0 / f64::from(options.rate_hz.max(1)));
    let mut next_broadcast = Instant::now();
    loop {
        server.accept_pending();
        let now = Instant::now();
        if now >= next_broadcast {
            server.step()?;
            next_broadcast += interval;
            if next_broadcast < now {
                next_broadcast = now + interval;
            }
        }
        thread::sleep(IDLE_SLEEP);
    }
}
