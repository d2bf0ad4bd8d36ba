//! Time handling for box-score reconstruction.
//!
//! Three concerns live here, all pure and free of I/O:
//!
//! - [`precision`] -- Resolving stated timestamps into lower/upper bounds,
//!   and the single "stored at or before query" predicate.
//! - [`position`] -- Game-clock positions, ordered with a countdown clock.
//! - [`facts`] and [`age`] -- Versioned biographical facts and the
//!   [`TemporalFeatureDeriver`] computing age and experience from them.
//!
//! Wall-clock readings are advisory. Within a contest the sequence number
//! is the authoritative order; the types here only answer questions that
//! are genuinely about time.

pub mod age;
pub mod facts;
pub mod position;
pub mod precision;

// Re-export primary types at crate root.
pub use age::{FeatureError, TemporalFeatureDeriver};
pub use facts::{FactBook, FactSource};
pub use position::GamePosition;
pub use precision::{PrecisionConfig, PrecisionError, PrecisionModel, TimeBounds, stored_at_or_before};
