//! Derived queries over stored box-score snapshots.
//!
//! # Modules
//!
//! - [`period`] -- Period, half and overtime stats by differencing
//!   period-end checkpoints
//! - [`service`] -- The [`QueryService`] facade over the index and the
//!   temporal feature deriver
//! - [`error`] -- [`QueryError`] and its machine-readable reasons
//!
//! # Example
//!
//! ```
//! use boxscore_index::SnapshotIndex;
//! use boxscore_query::{PeriodAggregator, PeriodConfig, QueryErrorReason};
//! use boxscore_types::{ContestId, EntityId};
//!
//! let index = SnapshotIndex::default();
//! let periods = PeriodAggregator::new(&index, PeriodConfig::default());
//! let err = periods
//!     .period_only(&ContestId::new("G1"), &EntityId::new("P1"), 1)
//!     .unwrap_err();
//! assert_eq!(err.reason(), QueryErrorReason::PeriodNotEnded);
//! ```

pub mod error;
pub mod period;
pub mod service;

pub use error::{QueryError, QueryErrorReason};
pub use period::{PeriodAggregator, PeriodConfig, PeriodSpan, PeriodStats};
pub use service::QueryService;
