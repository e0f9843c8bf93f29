use std::time::Duration;

use engine::{
    ConnectionState, ConnectionStatus, FeedConfig, FeedHandle, InputAction, InputSnapshot,
    PoseFeed, PoseTransport, SceneCommand, SceneKey, SceneWorld, Simulation, Vec3,
};
use tracing::{debug, info};

use super::body::SimpleBody;
use super::detector::keyboard_intent;
use super::finish::{FinishHook, RaceCompletionDetector};
use super::game_state::{GameState, GameStateError, TransformReader};
use super::motion::MotionController;
use super::replica::ReplicaSync;
use super::stats::MotionStats;
use super::tuning::{MotionTuning, RaceConfig};
use super::views::{start_position, PlayerView, ViewCues};
use super::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputSource {
    Keyboard,
    Pose,
}

struct FinishReport<'a> {
    stats: &'a MotionStats,
}

impl FinishHook for FinishReport<'_> {
    fn race_finished(&mut self, winner: PlayerId, position: Vec3) {
        info!(winner = %winner, z = position.z, "race_winner_announced");
        self.stats.log_summary();
    }
}

pub(crate) struct RaceSession<T: PoseTransport> {
    feed: PoseFeed<T>,
    feed_handle: FeedHandle,
    feed_status: ConnectionStatus,
    connect_on_start: bool,
    config: RaceConfig,
    reader: TransformReader,
    controllers: [MotionController<SimpleBody>; 2],
    sources: [InputSource; 2],
    replicas: [ReplicaSync; 2],
    views: [PlayerView; 2],
    finish: RaceCompletionDetector,
    stats: MotionStats,
}

impl<T: PoseTransport> RaceSession<T> {
    pub(crate) fn new(
        transport: T,
        feed_config: FeedConfig,
        tuning: MotionTuning,
        config: RaceConfig,
    ) -> Result<Self, GameStateError> {
        let connect_on_start = feed_config.connect_on_start;
        let feed = PoseFeed::new(transport, feed_config);
        let feed_handle = feed.subscribe();

        let starts = PlayerId::ALL.map(|player| start_position(player, &config));
        let game_state = GameState::new(starts.map(|position| engine::Transform {
            position,
            rotation_radians: 0.0,
        }));
        let reader = game_state.reader();

        let [one, two] = PlayerId::ALL;
        let controllers = [
            build_controller(&game_state, one, &tuning, &config)?,
            build_controller(&game_state, two, &tuning, &config)?,
        ];
        let replicas = PlayerId::ALL
            .map(|player| ReplicaSync::new(player.peer(), reader.clone(), config.replica_lerp));
        let views = PlayerId::ALL.map(|player| PlayerView::new(player, &config));
        let finish =
            RaceCompletionDetector::new(reader.clone(), config.trigger_z(), config.poll_interval);

        Ok(Self {
            feed,
            feed_handle,
            feed_status: ConnectionStatus::default(),
            connect_on_start,
            config,
            reader,
            controllers,
            sources: [InputSource::Keyboard; 2],
            replicas,
            views,
            finish,
            stats: MotionStats::default(),
        })
    }

    fn handle_control_keys(&mut self, input: &InputSnapshot) -> SceneCommand {
        if input.quit_requested() || input.was_pressed(InputAction::Quit) {
            return SceneCommand::Quit;
        }
        if input.was_pressed(InputAction::Reconnect) {
            self.feed.reconnect();
        }
        if input.was_pressed(InputAction::ResetRace) {
            self.reset_race();
        }
        SceneCommand::None
    }

    fn drive_players(&mut self, dt: f32, input: &InputSnapshot) {
        let snapshot = self.feed_handle.snapshot();
        let pose_active = snapshot.is_connected();
        let fresh = snapshot.fresh_frame();

        for (controller, source) in self.controllers.iter_mut().zip(self.sources.iter_mut()) {
            let player = controller.player();
            let pose = fresh.map(|frame| &frame.players[player.index()]);
            // The detector runs every tick so the jump edge tracks the feed either way.
            let pose_intent = controller.observe_pose(pose);

            let next_source = if pose_active {
                InputSource::Pose
            } else {
                InputSource::Keyboard
            };
            if next_source != *source {
                info!(player = %player, source = ?next_source, "input_source_changed");
                *source = next_source;
            }
            let intent = match next_source {
                InputSource::Pose => pose_intent,
                InputSource::Keyboard => keyboard_intent(input, player),
            };

            controller.tick(dt, intent);
            for event in controller.drain_events() {
                self.stats.record(&event);
            }
        }
        self.feed_status = snapshot.status;
    }

    fn sync_views(&mut self, dt: f32) {
        for ((view, replica), controller) in self
            .views
            .iter_mut()
            .zip(self.replicas.iter_mut())
            .zip(self.controllers.iter())
        {
            let avatar = self.reader.read(controller.player()).transform;
            let previous_animation = replica.animation();
            let mirrored = replica.sync(dt);
            if replica.animation() != previous_animation {
                debug!(
                    replica_of = %replica.source(),
                    animation = ?replica.animation(),
                    "replica_animation_changed"
                );
            }
            view.sync(
                avatar,
                mirrored,
                ViewCues {
                    gesturing: controller.gestures().any(),
                    crouching: controller.state().is_crouching,
                    replica_animation: replica.animation(),
                },
            );
        }
    }

    fn reset_race(&mut self) {
        self.finish.reset();
        self.stats.reset();
        for controller in &mut self.controllers {
            controller.reset(start_position(controller.player(), &self.config));
        }
        for replica in &mut self.replicas {
            replica.reset();
        }
        info!("race_reset");
    }

    fn feed_label(&self) -> String {
        let status = &self.feed_status;
        match status.state {
            ConnectionState::Connected => "pose feed live".to_string(),
            ConnectionState::Connecting => {
                format!("connecting (attempt {})", status.reconnect_attempts)
            }
            ConnectionState::Disconnected if status.reconnect_attempts > 0 => format!(
                "feed lost, retry {} pending | keyboard",
                status.reconnect_attempts
            ),
            ConnectionState::Disconnected => "keyboard".to_string(),
            ConnectionState::Error => "feed error, F5 to reconnect | keyboard".to_string(),
        }
    }
}

fn build_controller(
    game_state: &GameState,
    player: PlayerId,
    tuning: &MotionTuning,
    config: &RaceConfig,
) -> Result<MotionController<SimpleBody>, GameStateError> {
    let writer = game_state.claim_writer(player)?;
    let body = SimpleBody::new(start_position(player, config), tuning.gravity);
    Ok(MotionController::new(
        Some(body),
        writer,
        tuning.clone(),
        config.lane_for(player),
    ))
}

impl<T: PoseTransport> Simulation for RaceSession<T> {
    fn load(&mut self) {
        if self.connect_on_start {
            self.feed.connect();
        } else {
            info!("feed_autoconnect_disabled");
        }
        self.sync_views(0.0);
        info!(
            finish_z = self.config.finish_z,
            subscribers = self.feed.subscriber_count(),
            "race_loaded"
        );
    }

    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        let step = if fixed_dt_seconds.is_finite() && fixed_dt_seconds > 0.0 {
            Duration::from_secs_f32(fixed_dt_seconds)
        } else {
            Duration::ZERO
        };

        self.feed.update(step);
        if self.handle_control_keys(input) == SceneCommand::Quit {
            return SceneCommand::Quit;
        }

        self.drive_players(fixed_dt_seconds, input);
        self.sync_views(fixed_dt_seconds);

        let mut report = FinishReport { stats: &self.stats };
        if let Some(winner) = self.finish.update(step, &mut report) {
            debug!(winner = %winner, "finish_detector_fired");
        }
        SceneCommand::None
    }

    fn world(&self, key: SceneKey) -> &SceneWorld {
        match key {
            SceneKey::A => self.views[PlayerId::One.index()].world(),
            SceneKey::B => self.views[PlayerId::Two.index()].world(),
        }
    }

    fn shutdown(&mut self) {
        self.feed.disconnect();
        self.stats.log_summary();
        info!("race_shutdown");
    }

    fn debug_title(&self) -> Option<String> {
        let race = match self.finish.status().winner {
            Some(winner) => format!("{winner} wins! Backspace to race again"),
            None => {
                let [one, two] = self.reader.read_all();
                format!(
                    "P1 {:.0} m | P2 {:.0} m",
                    one.transform.position.z, two.transform.position.z
                )
            }
        };
        Some(format!("Pose Race | {} | {race}", self.feed_label()))
    }
}

#[cfg(test)]
mod tests {
    use engine::TransportEvent;
    use serde_json::json;

    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[derive(Debug, Default)]
    struct FakeTransport {
        opens: u32,
        closes: u32,
        pending: Vec<TransportEvent>,
    }

    impl PoseTransport for FakeTransport {
        fn open(&mut self, _endpoint: &str) {
            self.opens += 1;
        }

        fn poll_events(&mut self, out: &mut Vec<TransportEvent>) {
            out.append(&mut self.pending);
        }

        fn close(&mut self) {
            self.closes += 1;
        }
    }

    fn session(connect_on_start: bool, config: RaceConfig) -> RaceSession<FakeTransport> {
        let feed_config = FeedConfig {
            connect_on_start,
            ..FeedConfig::default()
        };
        let mut session = RaceSession::new(
            FakeTransport::default(),
            feed_config,
            MotionTuning::default(),
            config,
        )
        .expect("session");
        session.load();
        session
    }

    fn push(session: &mut RaceSession<FakeTransport>, event: TransportEvent) {
        session
            .feed
            .manager_mut()
            .transport_mut()
            .pending
            .push(event);
    }

    fn frame(first: &str, second: &str) -> TransportEvent {
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
        TransportEvent::Message(
            json!({ "players": [player(first), player(second)], "timestamp": 1.0 }).to_string(),
        )
    }

    fn z_of(session: &RaceSession<FakeTransport>, player: PlayerId) -> f32 {
        session.reader.read(player).transform.position.z
    }

    fn run_ticks(session: &mut RaceSession<FakeTransport>, ticks: u32, input: &InputSnapshot) {
        for _ in 0..ticks {
            session.update(DT, input);
        }
    }

    #[test]
    fn keyboard_drives_players_while_feed_is_down() {
        let mut session = session(false, RaceConfig::default());
        let input = InputSnapshot::empty().with_action_down(InputAction::P2Forward, true);

        run_ticks(&mut session, 60, &input);

        assert_eq!(session.feed.manager().transport().opens, 0);
        assert!(z_of(&session, PlayerId::Two) > 1.0);
        assert_eq!(z_of(&session, PlayerId::One), 0.0);
        assert_eq!(session.sources, [InputSource::Keyboard; 2]);
    }

    #[test]
    fn pose_feed_takes_over_once_connected() {
        let mut session = session(true, RaceConfig::default());
        assert_eq!(session.feed.manager().transport().opens, 1);
        push(&mut session, TransportEvent::Opened);
        session.update(DT, &InputSnapshot::empty());

        let keyboard = InputSnapshot::empty().with_action_down(InputAction::P2Forward, true);
        for _ in 0..60 {
            push(&mut session, frame("run", "none"));
            session.update(DT, &keyboard);
        }

        assert_eq!(session.sources, [InputSource::Pose; 2]);
        assert!(z_of(&session, PlayerId::One) > 1.0);
        assert_eq!(z_of(&session, PlayerId::Two), 0.0);
    }

    #[test]
    fn stale_frame_degrades_to_no_input() {
        let mut session = session(true, RaceConfig::default());
        push(&mut session, TransportEvent::Opened);
        push(&mut session, frame("run", "run"));
        run_ticks(&mut session, 30, &InputSnapshot::empty());
        assert!(session.controllers[0].state().current_speed > 0.0);

        // No new frames: after the stale threshold the avatars coast to rest.
        run_ticks(&mut session, 150, &InputSnapshot::empty());
        assert_eq!(session.controllers[0].state().current_speed, 0.0);
        assert_eq!(session.controllers[1].state().current_speed, 0.0);
    }

    #[test]
    fn held_jump_in_feed_launches_once() {
        let mut session = session(true, RaceConfig::default());
        push(&mut session, TransportEvent::Opened);
        session.update(DT, &InputSnapshot::empty());

        for _ in 0..240 {
            push(&mut session, frame("jump", "none"));
            session.update(DT, &InputSnapshot::empty());
        }
        assert_eq!(session.stats.tally(PlayerId::One).jumps, 1);
        assert_eq!(session.stats.tally(PlayerId::Two).jumps, 0);
    }

    #[test]
    fn replica_in_each_view_tracks_the_peer() {
        let mut session = session(false, RaceConfig::default());
        let input = InputSnapshot::empty()
            .with_action_down(InputAction::P1Forward, true)
            .with_action_down(InputAction::P1Run, true);
        run_ticks(&mut session, 120, &input);
        run_ticks(&mut session, 120, &InputSnapshot::empty());

        let leader_z = z_of(&session, PlayerId::One);
        let replica_z = session.replicas[PlayerId::Two.index()]
            .transform()
            .position
            .z;
        assert_eq!(session.replicas[PlayerId::Two.index()].source(), PlayerId::One);
        assert!((replica_z - leader_z).abs() < 1e-3);
        assert_eq!(session.world(SceneKey::B).camera().focus_z, z_of(&session, PlayerId::Two));
    }

    #[test]
    fn race_finishes_once_and_reset_clears_it() {
        let config = RaceConfig {
            finish_z: 5.0,
            ..RaceConfig::default()
        };
        let mut session = session(false, config);
        let input = InputSnapshot::empty()
            .with_action_down(InputAction::P1Forward, true)
            .with_action_down(InputAction::P1Run, true);
        run_ticks(&mut session, 180, &input);

        assert_eq!(session.finish.status().winner, Some(PlayerId::One));
        let title = session.debug_title().expect("title");
        assert!(title.contains("P1 wins"), "{title}");

        let both = input
            .with_action_down(InputAction::P2Forward, true)
            .with_action_down(InputAction::P2Run, true);
        run_ticks(&mut session, 180, &both);
        assert_eq!(session.finish.status().winner, Some(PlayerId::One));

        session.update(DT, &InputSnapshot::empty().with_action_pressed(InputAction::ResetRace));
        assert!(!session.finish.status().is_finished);
        assert!(z_of(&session, PlayerId::One) < 1.0);
        assert_eq!(session.stats.tally(PlayerId::One).jumps, 0);
    }

    #[test]
    fn reconnect_key_opens_a_fresh_attempt() {
        let mut session = session(false, RaceConfig::default());
        session.update(DT, &InputSnapshot::empty().with_action_pressed(InputAction::Reconnect));

        let transport = session.feed.manager().transport();
        assert_eq!(transport.opens, 1);
        assert_eq!(session.feed.status().state, ConnectionState::Connecting);
    }

    #[test]
    fn quit_key_stops_the_loop() {
        let mut session = session(false, RaceConfig::default());
        let command = session.update(DT, &InputSnapshot::empty().with_action_pressed(InputAction::Quit));
        assert_eq!(command, SceneCommand::Quit);
    }

    #[test]
    fn title_reports_feed_state() {
        let mut session = session(true, RaceConfig::default());
        session.update(DT, &InputSnapshot::empty());
        assert!(session
            .debug_title()
            .expect("title")
            .contains("connecting"));

        push(&mut session, TransportEvent::Opened);
        session.update(DT, &InputSnapshot::empty());
        assert!(session.debug_title().expect("title").contains("live"));
    }

    #[test]
    fn shutdown_closes_the_feed() {
        let mut session = session(true, RaceConfig::default());
        session.shutdown();
        assert_eq!(session.feed.manager().transport().closes, 1);
    }
}
