mod body;
mod detector;
mod finish;
mod game_state;
mod motion;
mod replica;
mod session;
mod stats;
mod tuning;
mod views;

pub(crate) use game_state::GameStateError;
pub(crate) use session::RaceSession;
pub(crate) use tuning::{tuning_from_env, RaceConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum PlayerId {
    One,
    Two,
}

impl PlayerId {
    pub(crate) const ALL: [PlayerId; 2] = [PlayerId::One, PlayerId::Two];

    pub(crate) const fn index(self) -> usize {
        match self {
            PlayerId::One => 0,
            PlayerId::Two => 1,
        }
    }

    pub(crate) const fn peer(self) -> PlayerId {
        match self {
            PlayerId::One => PlayerId::Two,
            PlayerId::Two => PlayerId::One,
        }
    }

    pub(crate) const fn number(self) -> u8 {
        match self {
            PlayerId::One => 1,
            PlayerId::Two => 2,
        }
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.number())
    }
}
