//! Core record structs: events, counter sets, snapshots, and biographical
//! facts, plus the derived age/experience value objects.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EntityKind, EventType, FactType, PrecisionLevel, StatName};
use crate::ids::{ContestId, EntityId, EventId};

// ---------------------------------------------------------------------------
// Wall clock
// ---------------------------------------------------------------------------

/// A wall-clock reading tagged with its precision and the feed it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WallClock {
    /// The stated timestamp, if the source reported one.
    pub timestamp: Option<DateTime<Utc>>,
    /// How exact `timestamp` is.
    pub precision: PrecisionLevel,
    /// Name of the feed that reported the timestamp.
    pub source: String,
}

impl WallClock {
    /// A reading with no usable timestamp.
    pub fn unknown(source: impl Into<String>) -> Self {
        Self {
            timestamp: None,
            precision: PrecisionLevel::Unknown,
            source: source.into(),
        }
    }

    /// Whether this reading can take part in wall-clock comparisons.
    pub const fn supports_wall_clock(&self) -> bool {
        self.timestamp.is_some() && self.precision.supports_wall_clock()
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// One normalized play-by-play event.
///
/// Events are immutable. A correction to an earlier event is a new event
/// with its own sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Deterministic identifier derived from contest and sequence.
    pub event_id: EventId,
    /// The contest this event belongs to.
    pub contest_id: ContestId,
    /// Authoritative, gap-free, strictly increasing position in the log.
    pub sequence_number: u64,
    /// Period number (1-based; overtime continues past regulation).
    pub period: u32,
    /// Seconds remaining on the game clock.
    pub game_clock_seconds: u32,
    /// Advisory wall-clock reading.
    pub wall_clock: WallClock,
    /// What happened.
    pub event_type: EventType,
    /// The player responsible, if any.
    pub acting_entity_id: Option<EntityId>,
    /// The team the event is attributed to, if any.
    pub team_id: Option<EntityId>,
    /// Counter changes for the acting entity (validated schema).
    pub stat_deltas: BTreeMap<StatName, i64>,
    /// Every other entity involved.
    pub participants: BTreeSet<EntityId>,
}

impl Event {
    /// Whether any stat delta is non-zero.
    pub fn affects_counters(&self) -> bool {
        self.stat_deltas.values().any(|delta| *delta != 0)
    }

    /// Points credited by this event (zero when none).
    pub fn points(&self) -> i64 {
        self.stat_deltas
            .get(&StatName::Points)
            .copied()
            .unwrap_or(0)
    }

    /// Every entity id referenced by this event.
    pub fn referenced_entities(&self) -> impl Iterator<Item = &EntityId> {
        self.acting_entity_id
            .iter()
            .chain(self.team_id.iter())
            .chain(self.participants.iter())
    }
}

// ---------------------------------------------------------------------------
// Counter set
// ---------------------------------------------------------------------------

/// Running totals for one entity within one contest.
///
/// Only totals are held. Rates are derived from them on demand and never
/// stored. Zero totals are not kept, so two sets compare equal exactly when
/// every stat has the same value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct CounterSet(BTreeMap<StatName, i64>);

impl CounterSet {
    /// Create an empty (all-zero) counter set.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Return the total for `stat` (zero when never touched).
    pub fn get(&self, stat: StatName) -> i64 {
        self.0.get(&stat).copied().unwrap_or(0)
    }

    /// Add `delta` to `stat`, returning the new total.
    ///
    /// Returns `None` on overflow, leaving the set unchanged.
    pub fn add(&mut self, stat: StatName, delta: i64) -> Option<i64> {
        let total = self.get(stat).checked_add(delta)?;
        if total == 0 {
            self.0.remove(&stat);
        } else {
            self.0.insert(stat, total);
        }
        Some(total)
    }

    /// Subtract an earlier set from this one, stat by stat.
    ///
    /// Returns `None` on overflow.
    pub fn difference(&self, earlier: &Self) -> Option<Self> {
        let stats: BTreeSet<StatName> = self.0.keys().chain(earlier.0.keys()).copied().collect();
        let mut out = Self::new();
        for stat in stats {
            let delta = self.get(stat).checked_sub(earlier.get(stat))?;
            out.add(stat, delta)?;
        }
        Some(out)
    }

    /// Whether every total is zero.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the non-zero totals in stat order.
    pub fn iter(&self) -> impl Iterator<Item = (StatName, i64)> + '_ {
        self.0.iter().map(|(stat, total)| (*stat, *total))
    }
}

impl FromIterator<(StatName, i64)> for CounterSet {
    fn from_iter<I: IntoIterator<Item = (StatName, i64)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (stat, delta) in iter {
            // Saturate rather than drop on overflow; only used for literals.
            if set.add(stat, delta).is_none() {
                set.0.insert(stat, i64::MAX);
            }
        }
        set
    }
}

// ---------------------------------------------------------------------------
// State snapshot
// ---------------------------------------------------------------------------

/// Primary key of a snapshot row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SnapshotKey {
    /// The contest.
    pub contest_id: ContestId,
    /// The player or team.
    pub entity_id: EntityId,
    /// The event after which the snapshot was taken.
    pub sequence_number: u64,
}

/// Immutable cumulative statistics for one entity as of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StateSnapshot {
    /// The contest.
    pub contest_id: ContestId,
    /// The player or team.
    pub entity_id: EntityId,
    /// Player or team.
    pub entity_kind: EntityKind,
    /// The event after which the snapshot was taken.
    pub sequence_number: u64,
    /// Period of that event.
    pub period: u32,
    /// Game clock (seconds remaining) at that event.
    pub game_clock_seconds: u32,
    /// Wall-clock timestamp of that event, if known.
    pub wall_clock: Option<DateTime<Utc>>,
    /// Precision of `wall_clock`.
    pub wall_clock_precision: PrecisionLevel,
    /// Running totals through that event.
    pub counters: CounterSet,
    /// Whether the entity was on court after that event.
    pub on_court: bool,
    /// Set on checkpoint snapshots emitted at a `period_end` event.
    pub period_end: bool,
}

impl StateSnapshot {
    /// Return the primary key of this snapshot.
    pub fn key(&self) -> SnapshotKey {
        SnapshotKey {
            contest_id: self.contest_id.clone(),
            entity_id: self.entity_id.clone(),
            sequence_number: self.sequence_number,
        }
    }

    /// Whether the wall clock can take part in wall-clock comparisons.
    pub const fn supports_wall_clock(&self) -> bool {
        self.wall_clock.is_some() && self.wall_clock_precision.supports_wall_clock()
    }
}

// ---------------------------------------------------------------------------
// Biographical facts
// ---------------------------------------------------------------------------

/// A dated fact about a player, owned and versioned by the roster service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BiographicalFact {
    /// The player.
    pub entity_id: EntityId,
    /// Which fact this is.
    pub fact_type: FactType,
    /// The stated value (start of the precision window).
    pub value: DateTime<Utc>,
    /// How exact `value` is.
    pub precision: PrecisionLevel,
    /// When this version of the fact was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl BiographicalFact {
    /// Build a fact from a calendar date, stated at midnight UTC.
    pub fn from_date(
        entity_id: EntityId,
        fact_type: FactType,
        date: NaiveDate,
        precision: PrecisionLevel,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_id,
            fact_type,
            value: date.and_time(chrono::NaiveTime::MIN).and_utc(),
            precision,
            recorded_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Derived temporal features
// ---------------------------------------------------------------------------

/// Elapsed time from a dated fact to a query timestamp.
///
/// Computed on demand and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DerivedAgeResult {
    /// The query timestamp.
    pub as_of: DateTime<Utc>,
    /// Elapsed time in years (365.25-day years) from the stated value.
    pub age_years_decimal: f64,
    /// Whole days elapsed from the stated value.
    pub age_days: i64,
    /// Whole seconds elapsed from the stated value.
    pub age_seconds: i64,
    /// Smallest possible elapsed years given the fact's precision.
    pub age_min_decimal: f64,
    /// Largest possible elapsed years given the fact's precision.
    pub age_max_decimal: f64,
    /// Width of the fact's precision window in hours.
    pub uncertainty_hours: f64,
    /// Readable form, e.g. `"26 years, 233 days"`.
    pub human_string: String,
}

/// Career length at a query timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ExperienceResult {
    /// Elapsed time since the debut.
    #[serde(flatten)]
    pub span: DerivedAgeResult,
    /// Fewer than 365 days since the debut.
    pub is_rookie: bool,
    /// A retirement date is on record at or before `as_of`.
    pub retired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_set_ignores_zero_totals() {
        let mut set = CounterSet::new();
        assert_eq!(set.add(StatName::Points, 0), Some(0));
        assert!(set.is_empty());
        assert_eq!(set.add(StatName::PlusMinus, 3), Some(3));
        assert_eq!(set.add(StatName::PlusMinus, -3), Some(0));
        assert_eq!(set, CounterSet::new());
    }

    #[test]
    fn counter_set_difference_is_per_stat() {
        let later: CounterSet = [(StatName::Fgm, 9), (StatName::Fga, 15)]
            .into_iter()
            .collect();
        let earlier: CounterSet = [(StatName::Fgm, 4), (StatName::Fga, 8), (StatName::Ast, 1)]
            .into_iter()
            .collect();
        let diff = later.difference(&earlier);
        assert!(diff.is_some());
        let diff = diff.unwrap_or_default();
        assert_eq!(diff.get(StatName::Fgm), 5);
        assert_eq!(diff.get(StatName::Fga), 7);
        assert_eq!(diff.get(StatName::Ast), -1);
    }

    #[test]
    fn counter_set_add_rejects_overflow() {
        let mut set = CounterSet::new();
        let _ = set.add(StatName::Points, i64::MAX);
        assert_eq!(set.add(StatName::Points, 1), None);
        assert_eq!(set.get(StatName::Points), i64::MAX);
    }

    #[test]
    fn counter_set_serializes_as_map() {
        let set: CounterSet = [(StatName::Points, 5)].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap_or_default();
        assert_eq!(json, r#"{"points":5}"#);
    }

    #[test]
    fn fact_from_date_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(1998, 3, 3).unwrap_or_default();
        let fact = BiographicalFact::from_date(
            EntityId::new("P3"),
            FactType::BirthDate,
            date,
            PrecisionLevel::Day,
            Utc::now(),
        );
        assert_eq!(fact.value.to_rfc3339(), "1998-03-03T00:00:00+00:00");
    }
}
