//! Game-clock positions.
//!
//! The game clock counts down within a period, so a later moment has a
//! higher period or, within the same period, fewer seconds remaining.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use boxscore_types::StateSnapshot;

/// A moment on the game clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GamePosition {
    /// Period number (1-based).
    pub period: u32,
    /// Seconds remaining in the period.
    pub game_clock_seconds: u32,
}

impl GamePosition {
    /// Create a position.
    pub const fn new(period: u32, game_clock_seconds: u32) -> Self {
        Self {
            period,
            game_clock_seconds,
        }
    }

    /// Position of the event a snapshot was taken after.
    pub const fn of_snapshot(snapshot: &StateSnapshot) -> Self {
        Self::new(snapshot.period, snapshot.game_clock_seconds)
    }
}

impl Ord for GamePosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.period
            .cmp(&other.period)
            .then_with(|| other.game_clock_seconds.cmp(&self.game_clock_seconds))
    }
}

impl PartialOrd for GamePosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
