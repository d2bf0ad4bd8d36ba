//! Error types for the snapshot index and its `PostgreSQL` store.

use boxscore_temporal::PrecisionError;
use boxscore_types::{ContestId, EntityId};

/// Errors returned by [`SnapshotIndex`](crate::SnapshotIndex) lookups and
/// writes.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Nothing is on record for the entity at or before the query point.
    ///
    /// Never answered with zero counters: "no data" and "zero" are
    /// different facts.
    #[error("no data for {entity_id} at or before {as_of}")]
    NoData {
        /// The entity.
        entity_id: EntityId,
        /// The query point, as displayed.
        as_of: String,
    },

    /// A wall-clock query reached data without usable wall-clock precision.
    ///
    /// Query the sequence or game-clock domain instead.
    #[error(
        "wall-clock precision unavailable for {entity_id}{}; query by sequence instead",
        contest_id.as_ref().map(|c| format!(" in contest {c}")).unwrap_or_default()
    )]
    PrecisionUnavailable {
        /// The entity.
        entity_id: EntityId,
        /// The contest lacking precision, when the query was scoped to one.
        contest_id: Option<ContestId>,
    },

    /// A stored or queried timestamp could not be bounded.
    #[error(transparent)]
    Precision(#[from] PrecisionError),

    /// A writer panicked while holding a lock.
    #[error("index lock poisoned: {reason}")]
    LockPoisoned {
        /// The poisoned lock's error message.
        reason: String,
    },

    /// Snapshots of several contests were passed to a single-contest write.
    #[error("snapshot of contest {actual} passed to a write for contest {expected}")]
    ContestMismatch {
        /// The contest being written.
        expected: ContestId,
        /// The contest named by the snapshot.
        actual: ContestId,
    },
}

/// Errors that can occur in the `PostgreSQL` snapshot store.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A counter set could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A wall-clock lookup reached rows that cannot be ordered against the
    /// query. Query by sequence instead.
    #[error("wall-clock precision unavailable for {entity_id}")]
    PrecisionUnavailable {
        /// The entity.
        entity_id: EntityId,
    },

    /// A stored row does not describe a valid snapshot.
    #[error("Corrupt snapshot row: {0}")]
    Corrupt(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
