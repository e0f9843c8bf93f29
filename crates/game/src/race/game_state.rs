use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use engine::Transform;
use thiserror::Error;
use tracing::warn;

use super::PlayerId;

static GAME_STATE_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_game_state_poison_once(operation: &'static str) {
    if GAME_STATE_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "game_state_lock_poisoned");
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum GameStateError {
    #[error("transform for {player} already has a writer")]
    WriterAlreadyClaimed { player: PlayerId },
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct StampedTransform {
    pub(crate) transform: Transform,
    pub(crate) revision: u64,
}

#[derive(Debug, Default)]
struct Slot {
    current: StampedTransform,
    writer_claimed: bool,
}

#[derive(Debug, Default)]
struct Slots {
    players: [Slot; 2],
}

#[derive(Debug, Clone, Default)]
pub(crate) struct GameState {
    shared: Arc<RwLock<Slots>>,
}

impl GameState {
    pub(crate) fn new(initial: [Transform; 2]) -> Self {
        let state = Self::default();
        {
            let mut slots = state.write("init");
            for (slot, transform) in slots.players.iter_mut().zip(initial) {
                slot.current.transform = transform;
            }
        }
        state
    }

    pub(crate) fn claim_writer(&self, player: PlayerId) -> Result<TransformWriter, GameStateError> {
        let mut slots = self.write("claim_writer");
        let slot = &mut slots.players[player.index()];
        if slot.writer_claimed {
            return Err(GameStateError::WriterAlreadyClaimed { player });
        }
        slot.writer_claimed = true;
        Ok(TransformWriter {
            player,
            shared: Arc::clone(&self.shared),
        })
    }

    pub(crate) fn reader(&self) -> TransformReader {
        TransformReader {
            shared: Arc::clone(&self.shared),
        }
    }

    fn write(&self, operation: &'static str) -> RwLockWriteGuard<'_, Slots> {
        write_slots(&self.shared, operation)
    }
}

fn write_slots<'a>(shared: &'a RwLock<Slots>, operation: &'static str) -> RwLockWriteGuard<'a, Slots> {
    shared.write().unwrap_or_else(|poisoned| {
        warn_game_state_poison_once(operation);
        poisoned.into_inner()
    })
}

fn read_slots<'a>(shared: &'a RwLock<Slots>, operation: &'static str) -> RwLockReadGuard<'a, Slots> {
    shared.read().unwrap_or_else(|poisoned| {
        warn_game_state_poison_once(operation);
        poisoned.into_inner()
    })
}

/// Exclusive write access to one player's transform. Dropping it releases the claim.
#[derive(Debug)]
pub(crate) struct TransformWriter {
    player: PlayerId,
    shared: Arc<RwLock<Slots>>,
}

impl TransformWriter {
    pub(crate) fn player(&self) -> PlayerId {
        self.player
    }

    pub(crate) fn publish(&self, transform: Transform) {
        let mut slots = write_slots(&self.shared, "publish");
        let current = &mut slots.players[self.player.index()].current;
        current.transform = transform;
        current.revision = current.revision.wrapping_add(1);
    }
}

impl Drop for TransformWriter {
    fn drop(&mut self) {
        let mut slots = write_slots(&self.shared, "release_writer");
        slots.players[self.player.index()].writer_claimed = false;
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TransformReader {
    shared: Arc<RwLock<Slots>>,
}

impl TransformReader {
    pub(crate) fn read(&self, player: PlayerId) -> StampedTransform {
        read_slots(&self.shared, "read").players[player.index()].current
    }

    pub(crate) fn read_all(&self) -> [StampedTransform; 2] {
        let slots = read_slots(&self.shared, "read_all");
        [slots.players[0].current, slots.players[1].current]
    }
}
