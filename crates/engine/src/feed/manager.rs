use std::time::Duration;

use tracing::{debug, info, warn};

use super::config::{reconnect_delay, FeedConfig};
use super::frame::{decode_pose_frame, PoseFrame};
use super::transport::{PoseTransport, TransportEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub last_error: Option<String>,
    pub reconnect_attempts: u32,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            last_error: None,
            reconnect_attempts: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReceivedFrame {
    pub frame: PoseFrame,
    pub received_at: Duration,
    pub sequence: u64,
}

#[derive(Debug)]
pub struct ConnectionManager<T: PoseTransport> {
    transport: T,
    config: FeedConfig,
    status: ConnectionStatus,
    latest: Option<ReceivedFrame>,
    next_sequence: u64,
    retry_in: Option<Duration>,
    manual_close: bool,
    clock: Duration,
    rejected_frames: u64,
    events: Vec<TransportEvent>,
}

impl<T: PoseTransport> ConnectionManager<T> {
    pub fn new(transport: T, config: FeedConfig) -> Self {
        Self {
            transport,
            config,
            status: ConnectionStatus::default(),
            latest: None,
            next_sequence: 0,
            retry_in: None,
            manual_close: false,
            clock: Duration::ZERO,
            rejected_frames: 0,
            events: Vec::new(),
        }
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn latest_frame(&self) -> Option<&ReceivedFrame> {
        self.latest.as_ref()
    }

    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn rejected_frames(&self) -> u64 {
        self.rejected_frames
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn retry_pending(&self) -> Option<Duration> {
        self.retry_in
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn connect(&mut self) {
        match self.status.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                debug!(state = ?self.status.state, "feed_connect_ignored");
                return;
            }
            ConnectionState::Disconnected | ConnectionState::Error => {}
        }

        self.manual_close = false;
        self.retry_in = None;
        self.status.state = ConnectionState::Connecting;
        info!(
            endpoint = %self.config.endpoint,
            attempt = self.status.reconnect_attempts,
            "feed_connecting"
        );
        self.transport.open(&self.config.endpoint);
    }

    pub fn reconnect(&mut self) {
        info!("feed_manual_reconnect");
        self.transport.close();
        self.retry_in = None;
        self.status = ConnectionStatus::default();
        self.connect();
    }

    pub fn disconnect(&mut self) {
        info!("feed_manual_disconnect");
        self.manual_close = true;
        self.retry_in = None;
        self.transport.close();
        if self.status.state != ConnectionState::Error {
            self.status.state = ConnectionState::Disconnected;
        }
    }

    pub fn update(&mut self, dt: Duration) {
        self.clock = self.clock.saturating_add(dt);

        let mut events = std::mem::take(&mut self.events);
        self.transport.poll_events(&mut events);
        for event in events.drain(..) {
            self.handle_event(event);
        }
        self.events = events;

        if let Some(remaining) = self.retry_in {
            let remaining = remaining.saturating_sub(dt);
            if remaining.is_zero() {
                self.retry_in = None;
                self.connect();
            } else {
                self.retry_in = Some(remaining);
            }
        }
    }

    fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => {
                if self.manual_close {
                    self.transport.close();
                    return;
                }
                self.status.state = ConnectionState::Connected;
                self.status.reconnect_attempts = 0;
                self.status.last_error = None;
                info!(endpoint = %self.config.endpoint, "feed_connected");
            }
            TransportEvent::Message(raw) => self.accept_message(&raw),
            TransportEvent::Failed(error) => {
                warn!(error = %error, "feed_transport_error");
                self.status.last_error = Some(error);
            }
            TransportEvent::Closed { reason } => {
                if self.status.state == ConnectionState::Error {
                    return;
                }
                self.status.state = ConnectionState::Disconnected;
                info!(reason = ?reason, manual = self.manual_close, "feed_closed");
                if !self.manual_close {
                    self.schedule_retry();
                }
            }
        }
    }

    fn accept_message(&mut self, raw: &str) {
        if self.status.state != ConnectionState::Connected {
            debug!("feed_message_outside_connection_dropped");
            return;
        }
        match decode_pose_frame(raw) {
            Ok(frame) => {
                self.latest = Some(ReceivedFrame {
                    frame,
                    received_at: self.clock,
                    sequence: self.next_sequence,
                });
                self.next_sequence = self.next_sequence.saturating_add(1);
            }
            Err(error) => {
                self.rejected_frames = self.rejected_frames.saturating_add(1);
                warn!(
                    error = %error,
                    rejected_total = self.rejected_frames,
                    "feed_frame_rejected"
                );
            }
        }
    }

    fn schedule_retry(&mut self) {
        let attempts = self.status.reconnect_attempts;
        if attempts >= self.config.max_reconnect_attempts {
            self.status.state = ConnectionState::Error;
            self.status.last_error = Some(format!(
                "gave up after {attempts} reconnect attempts"
            ));
            warn!(attempts, "feed_reconnect_exhausted");
            return;
        }

        let delay = reconnect_delay(
            attempts,
            self.config.base_reconnect_delay,
            self.config.max_reconnect_delay,
        );
        self.status.reconnect_attempts = attempts.saturating_add(1);
        self.retry_in = Some(delay);
        info!(
            attempt = self.status.reconnect_attempts,
            delay_ms = delay.as_millis() as u64,
            "feed_reconnect_scheduled"
        );
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;

    use serde_json::json;

    use super::*;

    #[derive(Debug, Default)]
    pub(crate) struct ScriptedTransport {
        pub(crate) opens: u32,
        pub(crate) closes: u32,
        pub(crate) script: VecDeque<TransportEvent>,
    }

    impl ScriptedTransport {
        pub(crate) fn push(&mut self, event: TransportEvent) {
            self.script.push_back(event);
        }
    }

    impl PoseTransport for ScriptedTransport {
        fn open(&mut self, _endpoint: &str) {
            self.opens += 1;
        }

        fn poll_events(&mut self, out: &mut Vec<TransportEvent>) {
            out.extend(self.script.drain(..));
        }

        fn close(&mut self) {
            self.closes += 1;
        }
    }

    pub(crate) fn frame_text(first: &str, second: &str) -> String {
        let player = |action: &str| {
            json!({
                "action": action,
                "speed": 0.0,
                "head": { "pitch": null, "yaw": null, "roll": null },
                "arms": {
                    "left": { "shoulder_angle": null, "elbow_angle": null },
                    "right": { "shoulder_angle": null, "elbow_angle": null }
                }
            })
        };
        json!({ "players": [player(first), player(second)], "timestamp": 1.0 }).to_string()
    }

    fn manager() -> ConnectionManager<ScriptedTransport> {
        ConnectionManager::new(ScriptedTransport::default(), FeedConfig::default())
    }

    fn fail_attempt(manager: &mut ConnectionManager<ScriptedTransport>) {
        manager
            .transport_mut()
            .push(TransportEvent::Failed("refused".to_string()));
        manager
            .transport_mut()
            .push(TransportEvent::Closed { reason: None });
        manager.update(Duration::ZERO);
    }

    fn wait_out_retry(manager: &mut ConnectionManager<ScriptedTransport>) {
        let delay = manager.retry_pending().expect("retry scheduled");
        manager.update(delay);
    }

    #[test]
    fn connect_open_close_follows_state_machine() {
        let mut manager = manager();
        assert_eq!(manager.status().state, ConnectionState::Disconnected);

        manager.connect();
        assert_eq!(manager.status().state, ConnectionState::Connecting);

        manager.transport_mut().push(TransportEvent::Opened);
        manager.update(Duration::from_millis(16));
        assert_eq!(manager.status().state, ConnectionState::Connected);

        manager
            .transport_mut()
            .push(TransportEvent::Closed { reason: None });
        manager.update(Duration::from_millis(16));
        assert_eq!(manager.status().state, ConnectionState::Disconnected);
        assert_eq!(manager.status().reconnect_attempts, 1);
    }

    #[test]
    fn connect_while_in_flight_does_not_open_twice() {
        let mut manager = manager();
        manager.connect();
        manager.connect();
        assert_eq!(manager.transport().opens, 1);

        manager.transport_mut().push(TransportEvent::Opened);
        manager.update(Duration::ZERO);
        manager.connect();
        assert_eq!(manager.transport().opens, 1);
    }

    #[test]
    fn retry_waits_for_backoff_delay() {
        let mut manager = manager();
        manager.connect();
        fail_attempt(&mut manager);

        assert_eq!(manager.retry_pending(), Some(Duration::from_millis(1_000)));
        manager.update(Duration::from_millis(999));
        assert_eq!(manager.transport().opens, 1);
        assert_eq!(manager.status().state, ConnectionState::Disconnected);

        manager.update(Duration::from_millis(1));
        assert_eq!(manager.transport().opens, 2);
        assert_eq!(manager.status().state, ConnectionState::Connecting);
    }

    #[test]
    fn backoff_delays_follow_capped_schedule() {
        let mut manager = manager();
        manager.connect();

        let mut delays = Vec::new();
        for _ in 0..5 {
            fail_attempt(&mut manager);
            delays.push(manager.retry_pending().expect("retry").as_millis() as u64);
            wait_out_retry(&mut manager);
        }
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 10_000]);
    }

    #[test]
    fn six_consecutive_drops_end_in_error_without_auto_retry() {
        let mut manager = manager();
        manager.connect();

        for _ in 0..5 {
            fail_attempt(&mut manager);
            wait_out_retry(&mut manager);
        }
        fail_attempt(&mut manager);

        assert_eq!(manager.status().state, ConnectionState::Error);
        assert!(manager.status().last_error.is_some());
        assert_eq!(manager.retry_pending(), None);
        let opens = manager.transport().opens;
        assert_eq!(opens, 6);

        manager.update(Duration::from_secs(60));
        assert_eq!(manager.transport().opens, opens);
        assert_eq!(manager.status().state, ConnectionState::Error);

        manager.reconnect();
        assert_eq!(manager.transport().opens, opens + 1);
        assert_eq!(manager.status().state, ConnectionState::Connecting);
        assert_eq!(manager.status().reconnect_attempts, 0);
    }

    #[test]
    fn successful_open_resets_attempt_counter() {
        let mut manager = manager();
        manager.connect();
        fail_attempt(&mut manager);
        wait_out_retry(&mut manager);
        fail_attempt(&mut manager);
        assert_eq!(manager.status().reconnect_attempts, 2);
        wait_out_retry(&mut manager);

        manager.transport_mut().push(TransportEvent::Opened);
        manager.update(Duration::ZERO);
        assert_eq!(manager.status().reconnect_attempts, 0);
        assert_eq!(manager.status().last_error, None);
    }

    #[test]
    fn manual_disconnect_suppresses_retry() {
        let mut manager = manager();
        manager.connect();
        manager.transport_mut().push(TransportEvent::Opened);
        manager.update(Duration::ZERO);

        manager.disconnect();
        manager
            .transport_mut()
            .push(TransportEvent::Closed { reason: None });
        manager.update(Duration::from_secs(30));

        assert_eq!(manager.status().state, ConnectionState::Disconnected);
        assert_eq!(manager.retry_pending(), None);
        assert_eq!(manager.transport().opens, 1);
    }

    #[test]
    fn disconnect_cancels_scheduled_retry() {
        let mut manager = manager();
        manager.connect();
        fail_attempt(&mut manager);
        assert!(manager.retry_pending().is_some());

        manager.disconnect();
        manager.update(Duration::from_secs(30));
        assert_eq!(manager.transport().opens, 1);
    }

    #[test]
    fn valid_frame_replaces_latest_and_malformed_keeps_previous() {
        let mut manager = manager();
        manager.connect();
        manager.transport_mut().push(TransportEvent::Opened);
        manager
            .transport_mut()
            .push(TransportEvent::Message(frame_text("run", "jump")));
        manager.update(Duration::from_millis(16));

        let first = *manager.latest_frame().expect("frame");
        assert_eq!(first.sequence, 0);

        for bad in [
            "{".to_string(),
            json!({ "players": [], "timestamp": 1.0 }).to_string(),
            frame_text("run", "jump").replace("\"speed\":0.0", "\"speed\":\"x\""),
        ] {
            manager.transport_mut().push(TransportEvent::Message(bad));
        }
        manager.update(Duration::from_millis(16));

        assert_eq!(manager.latest_frame(), Some(&first));
        assert_eq!(manager.rejected_frames(), 3);
        assert_eq!(manager.status().state, ConnectionState::Connected);
    }

    #[test]
    fn frames_record_receive_clock() {
        let mut manager = manager();
        manager.connect();
        manager.transport_mut().push(TransportEvent::Opened);
        manager.update(Duration::from_millis(100));
        manager
            .transport_mut()
            .push(TransportEvent::Message(frame_text("none", "none")));
        manager.update(Duration::from_millis(50));

        let received = manager.latest_frame().expect("frame");
        assert_eq!(received.received_at, Duration::from_millis(150));
    }
}
