//! The query facade consumed by feature and reporting pipelines.
//!
//! [`QueryService`] puts the snapshot index, the period aggregator and the
//! temporal feature deriver behind one handle whose every method returns a
//! value or a [`QueryError`].

use std::sync::Arc;

use chrono::{DateTime, Utc};

use boxscore_aggregation::Rates;
use boxscore_index::{AsOf, SnapshotIndex};
use boxscore_temporal::{FactSource, TemporalFeatureDeriver};
use boxscore_types::{ContestId, DerivedAgeResult, EntityId, ExperienceResult, StateSnapshot};

use crate::error::QueryError;
use crate::period::{PeriodAggregator, PeriodConfig, PeriodStats};

/// Read-only query surface over a shared [`SnapshotIndex`].
#[derive(Debug, Clone)]
pub struct QueryService<F> {
    index: Arc<SnapshotIndex>,
    periods: PeriodConfig,
    features: Arc<TemporalFeatureDeriver<F>>,
}

impl<F: FactSource> QueryService<F> {
    /// Create a service over an index and a fact source.
    ///
    /// The deriver shares the index's precision model so stored snapshots
    /// and biographical facts are bounded the same way.
    pub fn new(index: Arc<SnapshotIndex>, periods: PeriodConfig, facts: F) -> Self {
        let features = TemporalFeatureDeriver::new(*index.precision_model(), facts);
        Self {
            index,
            periods,
            features: Arc::new(features),
        }
    }

    /// The underlying index.
    pub fn index(&self) -> &SnapshotIndex {
        &self.index
    }

    /// The most recent snapshot of an entity at or before `as_of`.
    ///
    /// # Errors
    ///
    /// Returns `NoData` or `PrecisionUnavailable` (see
    /// [`QueryError::reason`]).
    pub fn get_at_or_before(
        &self,
        entity_id: &EntityId,
        as_of: &AsOf,
    ) -> Result<StateSnapshot, QueryError> {
        Ok(self.index.get_at_or_before(entity_id, as_of)?)
    }

    /// Exact counters of an entity as of one event of a contest.
    ///
    /// # Errors
    ///
    /// Returns `NoData` before the entity's first appearance.
    pub fn get_at_sequence(
        &self,
        contest_id: &ContestId,
        entity_id: &EntityId,
        sequence_number: u64,
    ) -> Result<StateSnapshot, QueryError> {
        Ok(self
            .index
            .get_at_sequence(contest_id, entity_id, sequence_number)?)
    }

    /// Shooting rates of an entity at or before `as_of`, recomputed from
    /// the counters of the snapshot found.
    ///
    /// # Errors
    ///
    /// As [`get_at_or_before`](Self::get_at_or_before).
    pub fn rates_at(&self, entity_id: &EntityId, as_of: &AsOf) -> Result<Rates, QueryError> {
        let snapshot = self.get_at_or_before(entity_id, as_of)?;
        Ok(Rates::from_counters(&snapshot.counters))
    }

    /// Stats within one period.
    ///
    /// # Errors
    ///
    /// See [`PeriodAggregator::period_only`].
    pub fn period_only(
        &self,
        contest_id: &ContestId,
        entity_id: &EntityId,
        period: u32,
    ) -> Result<PeriodStats, QueryError> {
        self.aggregator().period_only(contest_id, entity_id, period)
    }

    /// Stats within one half of regulation.
    ///
    /// # Errors
    ///
    /// See [`PeriodAggregator::half`].
    pub fn half(
        &self,
        contest_id: &ContestId,
        entity_id: &EntityId,
        half: u32,
    ) -> Result<PeriodStats, QueryError> {
        self.aggregator().half(contest_id, entity_id, half)
    }

    /// Stats over every ended overtime period.
    ///
    /// # Errors
    ///
    /// See [`PeriodAggregator::overtime`].
    pub fn overtime(
        &self,
        contest_id: &ContestId,
        entity_id: &EntityId,
    ) -> Result<PeriodStats, QueryError> {
        self.aggregator().overtime(contest_id, entity_id)
    }

    /// Age of a player at `as_of`.
    ///
    /// # Errors
    ///
    /// `NoData` without a birth date, `InvalidQuery` before it.
    pub fn age_at(
        &self,
        entity_id: &EntityId,
        as_of: DateTime<Utc>,
    ) -> Result<DerivedAgeResult, QueryError> {
        Ok(self.features.age_at(entity_id, as_of)?)
    }

    /// Career length of a player at `as_of`.
    ///
    /// # Errors
    ///
    /// `NoData` without a debut date, `InvalidQuery` before it.
    pub fn experience_at(
        &self,
        entity_id: &EntityId,
        as_of: DateTime<Utc>,
    ) -> Result<ExperienceResult, QueryError> {
        Ok(self.features.experience_at(entity_id, as_of)?)
    }

    fn aggregator(&self) -> PeriodAggregator<'_> {
        PeriodAggregator::new(&self.index, self.periods)
    }
}
