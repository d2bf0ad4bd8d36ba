//! Snapshot index for box-score reconstruction.
//!
//! Every snapshot row is keyed by `(contest_id, entity_id, sequence_number)`
//! and is immutable once written. Lookups never reconstruct from the event
//! log: point-in-time reads are carry-forward reads over stored rows.
//!
//! # Architecture
//!
//! ```text
//! ContestFold output
//!     |
//!     +-- put / replace_contest --> SnapshotIndex (in memory)
//!     |       |-- per-contest partitions   (sequence, game clock)
//!     |       +-- per-entity timelines     (wall clock, block zone maps)
//!     |
//!     +-- upsert_batch -----------> SnapshotStore (PgSnapshotStore, PostgreSQL)
//!                                       |
//!     load_contest (seeding) <----------+
//! ```
//!
//! # Modules
//!
//! - [`index`] -- The concurrent in-memory index and its query types
//! - [`block`] -- Block-range wall-clock timelines with zone-map pruning
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`snapshot_store`] -- Durable snapshot rows
//! - [`error`] -- Shared error types

pub mod block;
pub mod error;
pub mod index;
pub mod postgres;
pub mod snapshot_store;

// Re-export primary types for convenience.
pub use block::{EntityTimeline, ScanStats, TimelineEntry, ZoneMap};
pub use error::{DbError, IndexError};
pub use index::{AsOf, IndexConfig, PutOutcome, PutSummary, SnapshotIndex};
pub use postgres::{PostgresConfig, PostgresPool};
pub use snapshot_store::{PgSnapshotStore, SnapshotRow, SnapshotStore};
