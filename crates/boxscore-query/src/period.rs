//! Period-only statistics by differencing cumulative snapshots.
//!
//! Box scores are cumulative, so the stats of any stretch of a contest are
//! the counters at its closing boundary minus the counters at its opening
//! boundary. Boundaries are the checkpoint snapshots written at each
//! `period_end` event; the opening boundary of period 1 is all-zero.
//!
//! Rates of a stretch come from the differenced counters through
//! [`Rates::from_counters`], so a period FG% is `(made2 - made1) /
//! (att2 - att1)`, never a difference of two percentages.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use boxscore_aggregation::Rates;
use boxscore_index::{IndexError, SnapshotIndex};
use boxscore_types::{ContestId, CounterSet, EntityId, StatName};

use crate::error::QueryError;

/// Default number of regulation periods.
const DEFAULT_REGULATION_PERIODS: u32 = 4;

/// Default number of periods in each half.
const DEFAULT_PERIODS_PER_HALF: u32 = 2;

/// Layout of a contest's regulation periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodConfig {
    /// Periods in regulation; later periods are overtime.
    pub regulation_periods: u32,
    /// Periods in each half.
    pub periods_per_half: u32,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            regulation_periods: DEFAULT_REGULATION_PERIODS,
            periods_per_half: DEFAULT_PERIODS_PER_HALF,
        }
    }
}

/// The stretch of a contest a [`PeriodStats`] covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "number", rename_all = "snake_case")]
pub enum PeriodSpan {
    /// One period.
    Period(u32),
    /// One half of regulation.
    Half(u32),
    /// Every period after regulation.
    Overtime,
}

impl fmt::Display for PeriodSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Period(n) => write!(f, "period {n}"),
            Self::Half(h) => write!(f, "half {h}"),
            Self::Overtime => f.write_str("overtime"),
        }
    }
}

/// Counter deltas of one entity over one stretch of a contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodStats {
    /// The contest.
    pub contest_id: ContestId,
    /// The player or team.
    pub entity_id: EntityId,
    /// The stretch covered.
    pub span: PeriodSpan,
    /// Checkpoint sequence opening the stretch; `None` at tip-off.
    pub start_sequence: Option<u64>,
    /// Checkpoint sequence closing the stretch.
    pub end_sequence: u64,
    /// Counter deltas over the stretch.
    pub counters: CounterSet,
}

impl PeriodStats {
    /// The delta of one stat.
    pub fn get(&self, stat: StatName) -> i64 {
        self.counters.get(stat)
    }

    /// Rates recomputed from the differenced counters.
    pub fn rates(&self) -> Rates {
        Rates::from_counters(&self.counters)
    }
}

/// Derives period, half and overtime stats from an index.
#[derive(Debug, Clone, Copy)]
pub struct PeriodAggregator<'a> {
    index: &'a SnapshotIndex,
    config: PeriodConfig,
}

impl<'a> PeriodAggregator<'a> {
    /// Create an aggregator over `index`.
    pub const fn new(index: &'a SnapshotIndex, config: PeriodConfig) -> Self {
        Self { index, config }
    }

    /// The period layout in use.
    pub const fn config(&self) -> PeriodConfig {
        self.config
    }

    /// Stats of `entity_id` within period `n` alone.
    ///
    /// # Errors
    ///
    /// - [`QueryError::InvalidQuery`] for period zero.
    /// - [`QueryError::PeriodNotEnded`] if period `n` (or `n - 1`) has no
    ///   checkpoint yet.
    /// - [`QueryError::Index`] with `NoData` if the entity has no row at the
    ///   end of period `n`.
    pub fn period_only(
        &self,
        contest_id: &ContestId,
        entity_id: &EntityId,
        n: u32,
    ) -> Result<PeriodStats, QueryError> {
        let opening = n
            .checked_sub(1)
            .ok_or_else(|| QueryError::InvalidQuery("periods start at 1".to_owned()))?;
        self.between(contest_id, entity_id, opening, n, PeriodSpan::Period(n))
    }

    /// Stats of `entity_id` within half `h` of regulation.
    ///
    /// Half 1 is periods 1 and 2, half 2 is periods 3 and 4 under the
    /// default layout. Overtime is never part of a half.
    ///
    /// # Errors
    ///
    /// - [`QueryError::InvalidQuery`] for a half outside regulation.
    /// - [`QueryError::PeriodNotEnded`] if a boundary has no checkpoint yet.
    pub fn half(
        &self,
        contest_id: &ContestId,
        entity_id: &EntityId,
        h: u32,
    ) -> Result<PeriodStats, QueryError> {
        let invalid = || {
            QueryError::InvalidQuery(format!(
                "half {h} is outside {} regulation periods",
                self.config.regulation_periods
            ))
        };
        let per_half = self.config.periods_per_half;
        let closing = h.checked_mul(per_half).ok_or_else(invalid)?;
        let opening = closing.checked_sub(per_half).ok_or_else(invalid)?;
        if h == 0 || per_half == 0 || closing > self.config.regulation_periods {
            return Err(invalid());
        }
        self.between(contest_id, entity_id, opening, closing, PeriodSpan::Half(h))
    }

    /// Stats of `entity_id` over every ended overtime period.
    ///
    /// A contest decided in regulation yields all-zero deltas. An overtime
    /// period still in progress is not included until its end is ingested.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::PeriodNotEnded`] if regulation has not ended.
    pub fn overtime(
        &self,
        contest_id: &ContestId,
        entity_id: &EntityId,
    ) -> Result<PeriodStats, QueryError> {
        let regulation = self.config.regulation_periods;
        let closing = self
            .index
            .ended_periods(contest_id)?
            .into_iter()
            .filter(|period| *period > regulation)
            .max()
            .unwrap_or(regulation);
        self.between(contest_id, entity_id, regulation, closing, PeriodSpan::Overtime)
    }

    /// Counters at the end of `closing` minus counters at the end of
    /// `opening`, where period 0 ends before tip-off.
    fn between(
        &self,
        contest_id: &ContestId,
        entity_id: &EntityId,
        opening: u32,
        closing: u32,
        span: PeriodSpan,
    ) -> Result<PeriodStats, QueryError> {
        let end_sequence = self.boundary(contest_id, closing)?;
        let start_sequence = match opening {
            0 => None,
            period => Some(self.boundary(contest_id, period)?),
        };

        let end = self
            .index
            .get_at_sequence(contest_id, entity_id, end_sequence)?
            .counters;
        let start = match start_sequence {
            None => CounterSet::new(),
            Some(seq) => match self.index.get_at_sequence(contest_id, entity_id, seq) {
                Ok(snapshot) => snapshot.counters,
                // Nothing accumulated before the entity's first appearance.
                Err(IndexError::NoData { .. }) => CounterSet::new(),
                Err(err) => return Err(err.into()),
            },
        };

        let counters = end.difference(&start).ok_or_else(|| {
            QueryError::Corrupt(format!(
                "{entity_id} in {contest_id}: {span} delta overflows"
            ))
        })?;

        debug!(
            contest_id = %contest_id,
            entity_id = %entity_id,
            span = %span,
            start_sequence = ?start_sequence,
            end_sequence,
            "Derived period stats"
        );
        Ok(PeriodStats {
            contest_id: contest_id.clone(),
            entity_id: entity_id.clone(),
            span,
            start_sequence,
            end_sequence,
            counters,
        })
    }

    fn boundary(&self, contest_id: &ContestId, period: u32) -> Result<u64, QueryError> {
        self.index
            .period_end_sequence(contest_id, period)?
            .ok_or_else(|| QueryError::PeriodNotEnded {
                contest_id: contest_id.clone(),
                period,
            })
    }
}
