use std::time::Duration;

use engine::Vec3;
use tracing::info;

use super::game_state::TransformReader;
use super::PlayerId;

pub(crate) trait FinishHook {
    fn race_finished(&mut self, winner: PlayerId, position: Vec3);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RaceStatus {
    pub(crate) is_finished: bool,
    pub(crate) winner: Option<PlayerId>,
}

#[derive(Debug)]
pub(crate) struct RaceCompletionDetector {
    reader: TransformReader,
    trigger_z: f32,
    poll_interval: Duration,
    since_poll: Duration,
    status: RaceStatus,
}

impl RaceCompletionDetector {
    pub(crate) fn new(reader: TransformReader, trigger_z: f32, poll_interval: Duration) -> Self {
        Self {
            reader,
            trigger_z,
            poll_interval: if poll_interval.is_zero() {
                Duration::from_millis(16)
            } else {
                poll_interval
            },
            since_poll: Duration::ZERO,
            status: RaceStatus::default(),
        }
    }

    pub(crate) fn status(&self) -> RaceStatus {
        self.status
    }

    pub(crate) fn update(&mut self, dt: Duration, hook: &mut dyn FinishHook) -> Option<PlayerId> {
        self.since_poll = self.since_poll.saturating_add(dt);
        if self.since_poll < self.poll_interval {
            return None;
        }
        self.since_poll = (self.since_poll - self.poll_interval).min(self.poll_interval);
        self.poll(hook)
    }

    /// Returns the winner only on the poll that decides the race.
    pub(crate) fn poll(&mut self, hook: &mut dyn FinishHook) -> Option<PlayerId> {
        if self.status.is_finished {
            return None;
        }

        let transforms = self.reader.read_all();
        // Same-poll ties resolve to the lower player.
        let (winner, position) = PlayerId::ALL
            .into_iter()
            .map(|player| (player, transforms[player.index()].transform.position))
            .find(|(_, position)| position.z >= self.trigger_z)?;

        self.status = RaceStatus {
            is_finished: true,
            winner: Some(winner),
        };
        info!(winner = %winner, z = position.z, "race_finished");
        hook.race_finished(winner, position);
        Some(winner)
    }

    pub(crate) fn reset(&mut self) {
        self.status = RaceStatus::default();
        self.since_poll = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use engine::Transform;

    use super::*;
    use crate::race::game_state::{GameState, TransformWriter};

    #[derive(Default)]
    struct RecordingHook {
        calls: Vec<PlayerId>,
    }

    impl FinishHook for RecordingHook {
        fn race_finished(&mut self, winner: PlayerId, _position: Vec3) {
            self.calls.push(winner);
        }
    }

    fn place(writer: &TransformWriter, z: f32) {
        writer.publish(Transform {
            position: Vec3::new(0.0, 0.0, z),
            rotation_radians: 0.0,
        });
    }

    fn setup() -> (GameState, TransformWriter, TransformWriter, RaceCompletionDetector) {
        let state = GameState::default();
        let one = state.claim_writer(PlayerId::One).expect("writer one");
        let two = state.claim_writer(PlayerId::Two).expect("writer two");
        let detector =
            RaceCompletionDetector::new(state.reader(), 99.5, Duration::from_millis(16));
        (state, one, two, detector)
    }

    #[test]
    fn first_player_past_trigger_wins() {
        let (_state, one, two, mut detector) = setup();
        let mut hook = RecordingHook::default();
        place(&one, 50.0);
        place(&two, 99.6);

        assert_eq!(detector.poll(&mut hook), Some(PlayerId::Two));
        assert_eq!(
            detector.status(),
            RaceStatus {
                is_finished: true,
                winner: Some(PlayerId::Two)
            }
        );
        assert_eq!(hook.calls, vec![PlayerId::Two]);
    }

    #[test]
    fn repeated_polls_after_finish_are_inert() {
        let (_state, one, two, mut detector) = setup();
        let mut hook = RecordingHook::default();
        place(&one, 100.0);
        detector.poll(&mut hook);

        place(&two, 120.0);
        assert_eq!(detector.poll(&mut hook), None);
        assert_eq!(detector.poll(&mut hook), None);

        assert_eq!(detector.status().winner, Some(PlayerId::One));
        assert_eq!(hook.calls.len(), 1);
    }

    #[test]
    fn same_poll_tie_goes_to_lower_player() {
        let (_state, one, two, mut detector) = setup();
        let mut hook = RecordingHook::default();
        place(&two, 101.0);
        place(&one, 100.0);

        assert_eq!(detector.poll(&mut hook), Some(PlayerId::One));
    }

    #[test]
    fn tolerance_fires_before_the_line() {
        let (_state, one, _two, mut detector) = setup();
        let mut hook = RecordingHook::default();
        place(&one, 99.4);
        assert_eq!(detector.poll(&mut hook), None);
        place(&one, 99.5);
        assert_eq!(detector.poll(&mut hook), Some(PlayerId::One));
    }

    #[test]
    fn update_polls_on_interval() {
        let (_state, one, _two, mut detector) = setup();
        let mut hook = RecordingHook::default();
        place(&one, 100.0);

        assert_eq!(detector.update(Duration::from_millis(10), &mut hook), None);
        assert!(!detector.status().is_finished);
        assert_eq!(
            detector.update(Duration::from_millis(10), &mut hook),
            Some(PlayerId::One)
        );
    }

    #[test]
    fn reset_starts_a_new_race() {
        let (_state, one, _two, mut detector) = setup();
        let mut hook = RecordingHook::default();
        place(&one, 100.0);
        detector.poll(&mut hook);

        detector.reset();
        assert_eq!(detector.status(), RaceStatus::default());
        place(&one, 0.0);
        assert_eq!(detector.poll(&mut hook), None);
        place(&one, 100.0);
        assert_eq!(detector.poll(&mut hook), Some(PlayerId::One));
        assert_eq!(hook.calls.len(), 2);
    }
}
