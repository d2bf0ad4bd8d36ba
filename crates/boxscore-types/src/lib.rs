//! Shared type definitions for box-score reconstruction.
//!
//! This crate is the single source of truth for the records that flow
//! between the aggregation engine, the snapshot index, and the query layer.
//! Types are exported to `TypeScript` via `ts-rs` for reporting consumers.
//!
//! # Modules
//!
//! - [`ids`] -- Contest, entity, and event identifiers
//! - [`enums`] -- Event types, precision levels, the stat schema
//! - [`structs`] -- Events, counter sets, snapshots, biographical facts, derived results
//! - [`record`] -- The external input record and ingestion-boundary validation

pub mod enums;
pub mod ids;
pub mod record;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{EntityKind, EventType, FactType, PrecisionLevel, StatName};
pub use ids::{ContestId, EntityId, EventId};
pub use record::{EventRecord, parse_event_log};
pub use structs::{
    BiographicalFact, CounterSet, DerivedAgeResult, Event, ExperienceResult, SnapshotKey,
    StateSnapshot, WallClock,
};

/// Errors raised when an input record fails validation at the ingestion
/// boundary.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A line of the event log is not a valid event record.
    #[error("malformed event record on line {line}: {source}")]
    Json {
        /// 1-based line number in the log.
        line: usize,
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// A stat name is not part of the schema.
    #[error("event {sequence_number}: unknown stat `{name}`")]
    UnknownStat {
        /// The offending event.
        sequence_number: u64,
        /// The unrecognised name.
        name: String,
    },

    /// A delta is not an integer that fits in 64 bits.
    #[error("event {sequence_number}: delta for {stat} is not an integer ({value})")]
    NonIntegralDelta {
        /// The offending event.
        sequence_number: u64,
        /// The stat.
        stat: StatName,
        /// The delta as written.
        value: String,
    },

    /// A count stat received a negative delta.
    #[error("event {sequence_number}: count stat {stat} cannot decrease (delta {delta})")]
    NegativeCountDelta {
        /// The offending event.
        sequence_number: u64,
        /// The stat.
        stat: StatName,
        /// The negative delta.
        delta: i64,
    },

    /// Period numbers start at 1.
    #[error("event {sequence_number}: period must be at least 1")]
    InvalidPeriod {
        /// The offending event.
        sequence_number: u64,
    },

    /// A wall-clock-capable precision was claimed without a timestamp.
    #[error("event {sequence_number}: precision {precision:?} requires a wall-clock timestamp")]
    MissingWallClock {
        /// The offending event.
        sequence_number: u64,
        /// The claimed precision.
        precision: PrecisionLevel,
    },
}

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes the bindings under `bindings/` relative to the crate
        // root when these are called.
        use ts_rs::TS;

        let _ = crate::ids::ContestId::export_all();
        let _ = crate::ids::EntityId::export_all();
        let _ = crate::ids::EventId::export_all();

        let _ = crate::enums::EventType::export_all();
        let _ = crate::enums::EntityKind::export_all();
        let _ = crate::enums::PrecisionLevel::export_all();
        let _ = crate::enums::StatName::export_all();
        let _ = crate::enums::FactType::export_all();

        let _ = crate::structs::WallClock::export_all();
        let _ = crate::structs::Event::export_all();
        let _ = crate::structs::CounterSet::export_all();
        let _ = crate::structs::SnapshotKey::export_all();
        let _ = crate::structs::StateSnapshot::export_all();
        let _ = crate::structs::BiographicalFact::export_all();
        let _ = crate::structs::DerivedAgeResult::export_all();
        let _ = crate::structs::ExperienceResult::export_all();
    }
}
