//! Event-sourced aggregation of play-by-play logs into box-score snapshots.
//!
//! A contest's ordered event log is folded forward once. Each event adds
//! its integer deltas to the running totals of the entities it touches and
//! emits one immutable [`StateSnapshot`](boxscore_types::StateSnapshot) per
//! touched entity. Snapshots are the durable product; the counters behind
//! them live only for the duration of a fold.
//!
//! # Modules
//!
//! - [`roster`] -- The registered teams and players of one contest.
//! - [`fold`] -- The [`ContestFold`] context and the [`fold()`] entry point.
//! - [`rates`] -- Derived shooting rates, always recomputed from counters.
//! - [`monotonicity`] -- Audit that count stats never decrease.
//!
//! # Invariants
//!
//! - The snapshot at sequence `s` equals the exact integer sum of every
//!   applied delta with sequence `<= s`.
//! - Count stats never decrease within a contest; only `plus_minus` is
//!   signed.
//! - Folding the same log twice produces identical snapshots.
//!
//! # Usage
//!
//! ```
//! use std::collections::{BTreeMap, BTreeSet};
//!
//! use boxscore_aggregation::{ContestRoster, fold};
//! use boxscore_types::{
//!     ContestId, EntityId, Event, EventId, EventType, StatName, WallClock,
//! };
//!
//! let contest = ContestId::new("G1");
//! let roster = ContestRoster::new(contest.clone(), EntityId::new("BOS"), EntityId::new("NYK"))
//!     .and_then(|r| r.with_player(EntityId::new("P1"), EntityId::new("BOS"), true))
//!     .ok();
//!
//! if let Some(roster) = roster {
//!     let event = Event {
//!         event_id: EventId::for_event(&contest, 1),
//!         contest_id: contest,
//!         sequence_number: 1,
//!         period: 1,
//!         game_clock_seconds: 700,
//!         wall_clock: WallClock::unknown("feed"),
//!         event_type: EventType::MadeShot,
//!         acting_entity_id: Some(EntityId::new("P1")),
//!         team_id: None,
//!         stat_deltas: BTreeMap::from([(StatName::Points, 2)]),
//!         participants: BTreeSet::new(),
//!     };
//!     let outcome = fold(&roster, &[event]).ok();
//!     assert_eq!(outcome.map(|o| o.snapshots.len()), Some(3));
//! }
//! ```

pub mod fold;
pub mod monotonicity;
pub mod rates;
pub mod roster;

// Re-export primary types at crate root.
pub use fold::{ContestFold, FoldFailure, FoldOutcome, SkippedEvent, fold};
pub use monotonicity::{MonotonicityResult, MonotonicityViolation, verify_monotonic};
pub use rates::{Rates, derive_rate};
pub use roster::{ContestRoster, PlayerEntry, RosterDocument, RosterError};

use boxscore_types::{ContestId, EntityId, StatName};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Fatal errors raised while folding a contest.
///
/// Each variant identifies the failing event so ingestion can persist the
/// valid prefix and resume after it once the log is corrected.
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    /// Sequence numbers must strictly increase. Repeats are rejected here;
    /// idempotent re-ingestion happens at the index, not the fold.
    #[error("contest {contest_id}: event {sequence_number} arrived after {previous}")]
    OutOfOrder {
        /// The contest.
        contest_id: ContestId,
        /// The rejected event.
        sequence_number: u64,
        /// The last event applied.
        previous: u64,
    },

    /// The event names an entity that is not on the roster.
    #[error("contest {contest_id}: event {sequence_number} references unregistered entity {entity_id}")]
    UnknownEntity {
        /// The contest.
        contest_id: ContestId,
        /// The rejected event.
        sequence_number: u64,
        /// The unregistered entity.
        entity_id: EntityId,
        /// The last event applied before it.
        last_applied: Option<u64>,
    },

    /// The event belongs to a different contest than the fold.
    #[error("event {sequence_number} belongs to contest {actual}, expected {expected}")]
    ContestMismatch {
        /// The contest being folded.
        expected: ContestId,
        /// The contest named by the event.
        actual: ContestId,
        /// The rejected event.
        sequence_number: u64,
    },

    /// A running total left the 64-bit range.
    #[error("contest {contest_id}: {stat} for {entity_id} overflowed at event {sequence_number}")]
    CounterOverflow {
        /// The contest.
        contest_id: ContestId,
        /// The rejected event.
        sequence_number: u64,
        /// The entity whose total overflowed.
        entity_id: EntityId,
        /// The stat.
        stat: StatName,
    },
}

impl AggregationError {
    /// The event that caused the error.
    pub const fn sequence_number(&self) -> u64 {
        match self {
            Self::OutOfOrder {
                sequence_number, ..
            }
            | Self::UnknownEntity {
                sequence_number, ..
            }
            | Self::ContestMismatch {
                sequence_number, ..
            }
            | Self::CounterOverflow {
                sequence_number, ..
            } => *sequence_number,
        }
    }
}
