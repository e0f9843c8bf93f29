use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{info, warn};

use super::config::FeedConfig;
use super::frame::PoseFrame;
use super::manager::{ConnectionManager, ConnectionState, ConnectionStatus, ReceivedFrame};
use super::transport::PoseTransport;

static FEED_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_feed_lock_poison_once(operation: &'static str) {
    if FEED_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "feed snapshot lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    pub status: ConnectionStatus,
    pub latest: Option<ReceivedFrame>,
    pub clock: Duration,
    pub stale_after: Duration,
}

impl FeedSnapshot {
    pub fn is_connected(&self) -> bool {
        self.status.state == ConnectionState::Connected
    }

    pub fn fresh_frame(&self) -> Option<&PoseFrame> {
        let received = self.latest.as_ref()?;
        let age = self.clock.saturating_sub(received.received_at);
        (age <= self.stale_after).then_some(&received.frame)
    }
}

/// Read side of the feed. Cloning a handle never opens another connection.
#[derive(Clone, Debug)]
pub struct FeedHandle {
    shared: Arc<RwLock<FeedSnapshot>>,
}

impl FeedHandle {
    pub fn snapshot(&self) -> FeedSnapshot {
        match self.shared.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                warn_feed_lock_poison_once("read");
                poisoned.into_inner().clone()
            }
        }
    }
}

#[derive(Debug)]
pub struct PoseFeed<T: PoseTransport> {
    manager: ConnectionManager<T>,
    shared: Arc<RwLock<FeedSnapshot>>,
}

impl<T: PoseTransport> PoseFeed<T> {
    pub fn new(transport: T, config: FeedConfig) -> Self {
        let snapshot = FeedSnapshot {
            stale_after: config.stale_after,
            ..FeedSnapshot::default()
        };
        Self {
            manager: ConnectionManager::new(transport, config),
            shared: Arc::new(RwLock::new(snapshot)),
        }
    }

    pub fn subscribe(&self) -> FeedHandle {
        let handle = FeedHandle {
            shared: Arc::clone(&self.shared),
        };
        info!(subscribers = self.subscriber_count() + 1, "feed_subscribed");
        handle
    }

    pub fn subscriber_count(&self) -> usize {
        Arc::strong_count(&self.shared).saturating_sub(1)
    }

    pub fn status(&self) -> &ConnectionStatus {
        self.manager.status()
    }

    pub fn manager(&self) -> &ConnectionManager<T> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ConnectionManager<T> {
        &mut self.manager
    }

    pub fn connect(&mut self) {
        self.manager.connect();
        self.publish();
    }

    pub fn reconnect(&mut self) {
        self.manager.reconnect();
        self.publish();
    }

    pub fn disconnect(&mut self) {
        self.manager.disconnect();
        self.publish();
    }

    pub fn update(&mut self, dt: Duration) {
        self.manager.update(dt);
        self.publish();
    }

    fn publish(&self) {
        let snapshot = FeedSnapshot {
            status: self.manager.status().clone(),
            latest: self.manager.latest_frame().copied(),
            clock: self.manager.clock(),
            stale_after: self.manager.config().stale_after,
        };
        match self.shared.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => {
                warn_feed_lock_poison_once("write");
                let mut guard = poisoned.into_inner();
                *guard = snapshot;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::frame::PoseAction;
    use crate::feed::manager::tests::{frame_text, ScriptedTransport};
    use crate::feed::transport::TransportEvent;

    fn connected_feed() -> PoseFeed<ScriptedTransport> {
        let mut feed = PoseFeed::new(ScriptedTransport::default(), FeedConfig::default());
        feed.connect();
        feed.manager_mut()
            .transport_mut()
            .push(TransportEvent::Opened);
        feed.update(Duration::from_millis(16));
        feed
    }

    #[test]
    fn many_subscribers_share_one_connection() {
        let mut feed = connected_feed();
        let first = feed.subscribe();
        let second = feed.subscribe();
        let third = second.clone();
        assert_eq!(feed.subscriber_count(), 3);

        feed.manager_mut()
            .transport_mut()
            .push(TransportEvent::Message(frame_text("run", "crouch")));
        feed.update(Duration::from_millis(16));

        assert_eq!(feed.manager().transport().opens, 1);
        for handle in [&first, &second, &third] {
            let snapshot = handle.snapshot();
            assert!(snapshot.is_connected());
            let frame = snapshot.fresh_frame().expect("frame");
            assert_eq!(frame.players[0].action, PoseAction::Run);
            assert_eq!(frame.players[1].action, PoseAction::Crouch);
        }
    }

    #[test]
    fn frame_goes_stale_after_threshold() {
        let mut feed = connected_feed();
        let handle = feed.subscribe();
        feed.manager_mut()
            .transport_mut()
            .push(TransportEvent::Message(frame_text("run", "run")));
        feed.update(Duration::from_millis(16));
        assert!(handle.snapshot().fresh_frame().is_some());

        feed.update(Duration::from_millis(1_000));
        assert!(handle.snapshot().fresh_frame().is_some());

        feed.update(Duration::from_millis(1));
        let snapshot = handle.snapshot();
        assert!(snapshot.fresh_frame().is_none());
        assert!(snapshot.latest.is_some());
    }

    #[test]
    fn snapshot_reflects_manual_disconnect_immediately() {
        let mut feed = connected_feed();
        let handle = feed.subscribe();
        feed.disconnect();
        assert_eq!(
            handle.snapshot().status.state,
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn snapshot_recovers_after_poison_without_panic() {
        let feed = PoseFeed::new(ScriptedTransport::default(), FeedConfig::default());
        let handle = feed.subscribe();
        std::thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = handle.shared.write().expect("write guard");
                    panic!("poison feed lock");
                })
                .join();
        });

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.status.state, ConnectionState::Disconnected);
    }
}
