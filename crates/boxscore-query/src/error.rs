//! The query error taxonomy.
//!
//! Every query answers with a value or a [`QueryError`]. Callers branch on
//! [`QueryError::reason`], a stable machine-readable code, rather than on
//! the message text.

use serde::{Deserialize, Serialize};

use boxscore_index::IndexError;
use boxscore_temporal::FeatureError;
use boxscore_types::ContestId;

/// Stable reason codes for failed queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryErrorReason {
    /// Nothing on record at or before the query point.
    NoData,
    /// The wall-clock domain cannot answer; use the sequence domain.
    PrecisionUnavailable,
    /// A period boundary has not been ingested yet.
    PeriodNotEnded,
    /// The query itself is malformed.
    InvalidQuery,
    /// The index or its backing store failed.
    Storage,
}

impl QueryErrorReason {
    /// The reason code as written on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoData => "no_data",
            Self::PrecisionUnavailable => "precision_unavailable",
            Self::PeriodNotEnded => "period_not_ended",
            Self::InvalidQuery => "invalid_query",
            Self::Storage => "storage",
        }
    }
}

/// Errors returned by the query layer.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// A snapshot lookup failed.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// An age or experience derivation failed.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// The end of a period has not been ingested.
    #[error("period {period} of contest {contest_id} has not ended")]
    PeriodNotEnded {
        /// The contest.
        contest_id: ContestId,
        /// The period whose boundary is missing.
        period: u32,
    },

    /// The query is malformed (period zero, a half outside regulation).
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Stored counters could not be differenced.
    #[error("corrupt counters: {0}")]
    Corrupt(String),
}

impl QueryError {
    /// The machine-readable reason for this error.
    pub const fn reason(&self) -> QueryErrorReason {
        match self {
            Self::Index(IndexError::NoData { .. })
            | Self::Feature(FeatureError::MissingFact { .. }) => QueryErrorReason::NoData,
            Self::Index(IndexError::PrecisionUnavailable { .. }) => {
                QueryErrorReason::PrecisionUnavailable
            }
            Self::PeriodNotEnded { .. } => QueryErrorReason::PeriodNotEnded,
            Self::Index(
                IndexError::Precision(_) | IndexError::ContestMismatch { .. },
            )
            | Self::Feature(FeatureError::BeforeAnchor { .. } | FeatureError::Precision(_))
            | Self::InvalidQuery(_) => QueryErrorReason::InvalidQuery,
            Self::Index(IndexError::LockPoisoned { .. }) | Self::Corrupt(_) => {
                QueryErrorReason::Storage
            }
        }
    }

    /// A JSON body for reporting consumers: `{"reason": ..., "error": ...}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "reason": self.reason(),
            "error": self.to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use boxscore_types::EntityId;

    use super::*;

    #[test]
    fn reasons_are_stable_codes() {
        let err = QueryError::from(IndexError::NoData {
            entity_id: EntityId::new("P1"),
            as_of: "sequence 3 in G1".to_owned(),
        });
        assert_eq!(err.reason(), QueryErrorReason::NoData);
        assert_eq!(err.to_json()["reason"], "no_data");

        let err = QueryError::PeriodNotEnded {
            contest_id: ContestId::new("G1"),
            period: 3,
        };
        assert_eq!(err.reason().as_str(), "period_not_ended");
    }

    #[test]
    fn precision_unavailable_is_its_own_reason() {
        let err = QueryError::from(IndexError::PrecisionUnavailable {
            entity_id: EntityId::new("P1"),
            contest_id: None,
        });
        assert_eq!(err.reason(), QueryErrorReason::PrecisionUnavailable);
        let json = serde_json::to_string(&err.reason()).unwrap();
        assert_eq!(json, "\"precision_unavailable\"");
    }
}
