use tracing::info;

use super::motion::MotionEvent;
use super::PlayerId;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct PlayerTally {
    pub(crate) distance: f32,
    pub(crate) jumps: u32,
}

#[derive(Debug, Default)]
pub(crate) struct MotionStats {
    players: [PlayerTally; 2],
}

impl MotionStats {
    pub(crate) fn record(&mut self, event: &MotionEvent) {
        match *event {
            MotionEvent::Moved { player, distance } => {
                self.players[player.index()].distance += distance;
            }
            MotionEvent::JumpLaunched { player } => {
                let tally = &mut self.players[player.index()];
                tally.jumps = tally.jumps.saturating_add(1);
            }
        }
    }

    pub(crate) fn tally(&self, player: PlayerId) -> PlayerTally {
        self.players[player.index()]
    }

    pub(crate) fn log_summary(&self) {
        for player in PlayerId::ALL {
            let tally = self.tally(player);
            info!(
                player = %player,
                distance = tally.distance,
                jumps = tally.jumps,
                "motion_stats"
            );
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
