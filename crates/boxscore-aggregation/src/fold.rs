//! The contest fold: one forward pass from events to snapshots.
//!
//! [`ContestFold`] is the per-fold context. It exclusively owns one
//! [`CounterSet`] per registered entity and is passed through the fold by
//! value, so no counter state outlives or escapes a single contest. Each
//! applied event yields one [`StateSnapshot`] per touched entity.
//!
//! # Touch rules
//!
//! | Event | Touched entities |
//! |-------|------------------|
//! | any, with acting player | acting player, the player's team |
//! | any, team only | the team |
//! | scoring (`points > 0`) | plus the opposing team (`opp_points`) |
//! | `substitution` | entering player, every leaving participant |
//! | `period_end` | plus every on-court entity and every entity with a stat this period |
//!
//! The fold is pure computation: no I/O, no suspension, no shared state.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use boxscore_types::{
    ContestId, CounterSet, EntityId, EntityKind, Event, EventType, StatName, StateSnapshot,
};

use crate::AggregationError;
use crate::roster::ContestRoster;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// An admin event that referenced an unregistered entity and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEvent {
    /// The skipped event.
    pub sequence_number: u64,
    /// The unregistered entity it referenced.
    pub entity_id: EntityId,
}

/// The result of folding a complete event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldOutcome {
    /// The contest.
    pub contest_id: ContestId,
    /// Every emitted snapshot, in sequence order.
    pub snapshots: Vec<StateSnapshot>,
    /// The last event consumed (applied or skipped).
    pub last_sequence: Option<u64>,
    /// Admin events skipped for referencing unregistered entities.
    pub skipped: Vec<SkippedEvent>,
}

/// A fold that stopped on a fatal error.
///
/// `emitted` is the valid prefix produced before the failing event; it can
/// be persisted and the fold resumed after `last_applied`.
#[derive(Debug, thiserror::Error)]
#[error("fold of contest {contest_id} aborted after sequence {last_applied:?}: {source}")]
pub struct FoldFailure {
    /// The contest.
    pub contest_id: ContestId,
    /// The last event successfully consumed.
    pub last_applied: Option<u64>,
    /// Snapshots emitted before the failure.
    pub emitted: Vec<StateSnapshot>,
    /// What went wrong.
    #[source]
    pub source: Box<AggregationError>,
}

// ---------------------------------------------------------------------------
// Per-entity state
// ---------------------------------------------------------------------------

/// Mutable fold state for one entity.
#[derive(Debug, Clone)]
struct EntityState {
    kind: EntityKind,
    counters: CounterSet,
    on_court: bool,
    /// The latest period in which a non-zero delta was applied.
    stat_period: Option<u32>,
}

// ---------------------------------------------------------------------------
// Contest fold
// ---------------------------------------------------------------------------

/// Per-contest fold context.
#[derive(Debug, Clone)]
pub struct ContestFold<'r> {
    roster: &'r ContestRoster,
    entities: BTreeMap<EntityId, EntityState>,
    last_sequence: Option<u64>,
    skipped: Vec<SkippedEvent>,
}

impl<'r> ContestFold<'r> {
    /// Start a fresh fold: all counters zero, starters on court.
    pub fn new(roster: &'r ContestRoster) -> Self {
        let entities = roster
            .entities()
            .map(|(id, kind)| {
                (
                    id.clone(),
                    EntityState {
                        kind,
                        counters: CounterSet::new(),
                        on_court: roster.starts_on_court(id),
                        stat_period: None,
                    },
                )
            })
            .collect();
        Self {
            roster,
            entities,
            last_sequence: None,
            skipped: Vec::new(),
        }
    }

    /// Restore a fold from durable state so ingestion can continue after
    /// `last_sequence` without reapplying anything.
    ///
    /// `latest` holds the most recent snapshot of each entity. Entities
    /// without a snapshot keep their starting state.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::ContestMismatch`] if a snapshot belongs
    /// to another contest, or [`AggregationError::UnknownEntity`] if it
    /// names an unregistered entity.
    pub fn resume(
        roster: &'r ContestRoster,
        latest: impl IntoIterator<Item = StateSnapshot>,
        last_sequence: u64,
    ) -> Result<Self, AggregationError> {
        let mut fold = Self::new(roster);
        for snapshot in latest {
            if snapshot.contest_id != *roster.contest_id() {
                return Err(AggregationError::ContestMismatch {
                    expected: roster.contest_id().clone(),
                    actual: snapshot.contest_id,
                    sequence_number: snapshot.sequence_number,
                });
            }
            let state = fold.entities.get_mut(&snapshot.entity_id).ok_or_else(|| {
                AggregationError::UnknownEntity {
                    contest_id: roster.contest_id().clone(),
                    sequence_number: snapshot.sequence_number,
                    entity_id: snapshot.entity_id.clone(),
                    last_applied: Some(last_sequence),
                }
            })?;
            state.stat_period = (!snapshot.counters.is_empty()).then_some(snapshot.period);
            state.counters = snapshot.counters;
            state.on_court = snapshot.on_court;
        }
        fold.last_sequence = Some(last_sequence);
        debug!(
            contest_id = %roster.contest_id(),
            last_sequence,
            "Resumed contest fold"
        );
        Ok(fold)
    }

    /// The last event consumed.
    pub const fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    /// Admin events skipped so far.
    pub fn skipped(&self) -> &[SkippedEvent] {
        &self.skipped
    }

    /// Current running totals for an entity.
    pub fn counters(&self, entity_id: &EntityId) -> Option<&CounterSet> {
        self.entities.get(entity_id).map(|state| &state.counters)
    }

    /// Apply one event and return the snapshots it produced.
    ///
    /// On error nothing is changed, so the fold can be inspected or its
    /// prefix persisted.
    ///
    /// # Errors
    ///
    /// - [`AggregationError::OutOfOrder`] if the sequence number does not
    ///   strictly increase (duplicates included).
    /// - [`AggregationError::UnknownEntity`] if an unregistered entity is
    ///   referenced by anything other than a non-scoring admin event.
    /// - [`AggregationError::ContestMismatch`] if the event belongs to
    ///   another contest.
    /// - [`AggregationError::CounterOverflow`] if a total would overflow.
    pub fn apply(&mut self, event: &Event) -> Result<Vec<StateSnapshot>, AggregationError> {
        let contest_id = self.roster.contest_id();
        if event.contest_id != *contest_id {
            return Err(AggregationError::ContestMismatch {
                expected: contest_id.clone(),
                actual: event.contest_id.clone(),
                sequence_number: event.sequence_number,
            });
        }

        self.check_order(event)?;

        if let Some(unknown) = event
            .referenced_entities()
            .find(|id| !self.roster.is_registered(id))
        {
            if event.event_type == EventType::Admin && !event.affects_counters() {
                warn!(
                    contest_id = %contest_id,
                    sequence_number = event.sequence_number,
                    entity_id = %unknown,
                    "Skipping admin event referencing unregistered entity"
                );
                self.skipped.push(SkippedEvent {
                    sequence_number: event.sequence_number,
                    entity_id: unknown.clone(),
                });
                self.last_sequence = Some(event.sequence_number);
                return Ok(Vec::new());
            }
            return Err(AggregationError::UnknownEntity {
                contest_id: contest_id.clone(),
                sequence_number: event.sequence_number,
                entity_id: unknown.clone(),
                last_applied: self.last_sequence,
            });
        }

        // Work on a copy of the touched states so a failure leaves the fold
        // untouched.
        let mut staged: BTreeMap<EntityId, EntityState> = BTreeMap::new();
        let mut materialize = self.stage(event, &mut staged)?;
        if event.event_type == EventType::PeriodEnd {
            for (id, state) in &self.entities {
                let state = staged.get(id).unwrap_or(state);
                if state.on_court || state.stat_period == Some(event.period) {
                    materialize.insert(id.clone());
                }
            }
        }

        for (id, state) in staged {
            self.entities.insert(id, state);
        }
        self.last_sequence = Some(event.sequence_number);

        let snapshots: Vec<StateSnapshot> = materialize
            .iter()
            .filter_map(|id| self.entities.get(id).map(|state| self.snapshot(event, id, state)))
            .collect();

        debug!(
            contest_id = %contest_id,
            sequence_number = event.sequence_number,
            event_type = event.event_type.as_str(),
            snapshots = snapshots.len(),
            "Applied event"
        );
        Ok(snapshots)
    }

    /// Fold the remaining events of a log.
    ///
    /// # Errors
    ///
    /// Returns a [`FoldFailure`] carrying the first fatal error, the last
    /// consumed sequence number, and every snapshot emitted before it.
    pub fn fold_all<'e>(
        mut self,
        events: impl IntoIterator<Item = &'e Event>,
    ) -> Result<FoldOutcome, FoldFailure> {
        let mut snapshots = Vec::new();
        for event in events {
            match self.apply(event) {
                Ok(mut emitted) => snapshots.append(&mut emitted),
                Err(source) => {
                    return Err(FoldFailure {
                        contest_id: self.roster.contest_id().clone(),
                        last_applied: self.last_sequence,
                        emitted: snapshots,
                        source: Box::new(source),
                    });
                }
            }
        }
        Ok(FoldOutcome {
            contest_id: self.roster.contest_id().clone(),
            snapshots,
            last_sequence: self.last_sequence,
            skipped: self.skipped,
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn check_order(&self, event: &Event) -> Result<(), AggregationError> {
        let Some(previous) = self.last_sequence else {
            return Ok(());
        };
        if event.sequence_number <= previous {
            return Err(AggregationError::OutOfOrder {
                contest_id: self.roster.contest_id().clone(),
                sequence_number: event.sequence_number,
                previous,
            });
        }
        if event.sequence_number > previous.saturating_add(1) {
            warn!(
                contest_id = %self.roster.contest_id(),
                previous,
                sequence_number = event.sequence_number,
                "Gap in sequence numbers"
            );
        }
        Ok(())
    }

    /// Compute the new states of every entity the event touches, without
    /// committing them. Returns the touched set.
    fn stage(
        &self,
        event: &Event,
        staged: &mut BTreeMap<EntityId, EntityState>,
    ) -> Result<BTreeSet<EntityId>, AggregationError> {
        let mut touched = BTreeSet::new();

        if event.event_type == EventType::Substitution {
            if let Some(entering) = &event.acting_entity_id {
                self.stage_on_court(event, entering, true, staged)?;
                touched.insert(entering.clone());
            }
            for leaving in event
                .participants
                .iter()
                .filter(|id| Some(*id) != event.acting_entity_id.as_ref())
            {
                self.stage_on_court(event, leaving, false, staged)?;
                touched.insert(leaving.clone());
            }
            if event.stat_deltas.is_empty() {
                return Ok(touched);
            }
        }

        // The entity credited with the deltas, and the team it rolls up to.
        let credited = event.acting_entity_id.as_ref().or(event.team_id.as_ref());
        let team = credited.and_then(|id| self.roster.team_of(id));

        if let Some(credited) = credited {
            self.stage_deltas(event, credited, &event.stat_deltas, staged)?;
            touched.insert(credited.clone());
        }
        if let Some(team) = team {
            if Some(team) != credited {
                self.stage_deltas(event, team, &event.stat_deltas, staged)?;
            }
            touched.insert(team.clone());

            let points = event.points();
            if points > 0 {
                if let Some(opponent) = self.roster.opponent_of(team) {
                    let allowed = BTreeMap::from([(StatName::OppPoints, points)]);
                    self.stage_deltas(event, opponent, &allowed, staged)?;
                    touched.insert(opponent.clone());
                }
            }
        }

        Ok(touched)
    }

    fn staged_state(
        &self,
        entity_id: &EntityId,
        staged: &BTreeMap<EntityId, EntityState>,
        event: &Event,
    ) -> Result<EntityState, AggregationError> {
        staged
            .get(entity_id)
            .or_else(|| self.entities.get(entity_id))
            .cloned()
            .ok_or_else(|| AggregationError::UnknownEntity {
                contest_id: self.roster.contest_id().clone(),
                sequence_number: event.sequence_number,
                entity_id: entity_id.clone(),
                last_applied: self.last_sequence,
            })
    }

    fn stage_deltas(
        &self,
        event: &Event,
        entity_id: &EntityId,
        deltas: &BTreeMap<StatName, i64>,
        staged: &mut BTreeMap<EntityId, EntityState>,
    ) -> Result<(), AggregationError> {
        let mut state = self.staged_state(entity_id, staged, event)?;
        for (stat, delta) in deltas {
            state
                .counters
                .add(*stat, *delta)
                .ok_or_else(|| AggregationError::CounterOverflow {
                    contest_id: self.roster.contest_id().clone(),
                    sequence_number: event.sequence_number,
                    entity_id: entity_id.clone(),
                    stat: *stat,
                })?;
            if *delta != 0 {
                state.stat_period = Some(event.period);
            }
        }
        staged.insert(entity_id.clone(), state);
        Ok(())
    }

    fn stage_on_court(
        &self,
        event: &Event,
        entity_id: &EntityId,
        on_court: bool,
        staged: &mut BTreeMap<EntityId, EntityState>,
    ) -> Result<(), AggregationError> {
        let mut state = self.staged_state(entity_id, staged, event)?;
        // Teams are never substituted.
        if state.kind == EntityKind::Player {
            state.on_court = on_court;
        }
        staged.insert(entity_id.clone(), state);
        Ok(())
    }

    fn snapshot(&self, event: &Event, entity_id: &EntityId, state: &EntityState) -> StateSnapshot {
        StateSnapshot {
            contest_id: self.roster.contest_id().clone(),
            entity_id: entity_id.clone(),
            entity_kind: state.kind,
            sequence_number: event.sequence_number,
            period: event.period,
            game_clock_seconds: event.game_clock_seconds,
            wall_clock: event.wall_clock.timestamp,
            wall_clock_precision: event.wall_clock.precision,
            counters: state.counters.clone(),
            on_court: state.on_court,
            period_end: event.event_type == EventType::PeriodEnd,
        }
    }
}

/// Fold a complete, ordered event log for one contest.
///
/// # Errors
///
/// Returns a [`FoldFailure`] on the first fatal error; see
/// [`ContestFold::apply`].
pub fn fold(roster: &ContestRoster, events: &[Event]) -> Result<FoldOutcome, FoldFailure> {
    ContestFold::new(roster).fold_all(events)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use boxscore_types::{EventId, PrecisionLevel, WallClock};
    use chrono::{DateTime, Duration, Utc};
    use rand::Rng;

    use super::*;

    fn id(s: &str) -> EntityId {
        EntityId::new(s)
    }

    fn roster() -> ContestRoster {
        ContestRoster::new(ContestId::new("G1"), id("BOS"), id("NYK"))
            .unwrap()
            .with_player(id("P1"), id("BOS"), true)
            .unwrap()
            .with_player(id("P2"), id("BOS"), false)
            .unwrap()
            .with_player(id("P3"), id("NYK"), true)
            .unwrap()
    }

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-10-22T23:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn event(
        seq: u64,
        event_type: EventType,
        acting: Option<&str>,
        deltas: &[(StatName, i64)],
    ) -> Event {
        let contest_id = ContestId::new("G1");
        Event {
            event_id: EventId::for_event(&contest_id, seq),
            contest_id,
            sequence_number: seq,
            period: 1,
            game_clock_seconds: 720_u32.saturating_sub(u32::try_from(seq).unwrap()),
            wall_clock: WallClock {
                timestamp: Some(start() + Duration::seconds(i64::try_from(seq).unwrap())),
                precision: PrecisionLevel::Second,
                source: "test".to_owned(),
            },
            event_type,
            acting_entity_id: acting.map(id),
            team_id: None,
            stat_deltas: deltas.iter().copied().collect(),
            participants: BTreeSet::new(),
        }
    }

    fn snapshot_of<'a>(snaps: &'a [StateSnapshot], entity: &str) -> Option<&'a StateSnapshot> {
        snaps.iter().find(|s| s.entity_id.as_str() == entity)
    }

    #[test]
    fn deltas_accumulate_for_player_and_team() {
        let r = roster();
        let events = vec![
            event(1, EventType::MadeShot, Some("P1"), &[(StatName::Points, 2)]),
            event(2, EventType::MadeShot, Some("P1"), &[(StatName::Points, 3)]),
            event(3, EventType::Foul, Some("P1"), &[(StatName::Points, 0), (StatName::Fouls, 1)]),
        ];
        let outcome = fold(&r, &events).unwrap();
        let last_p1 = outcome
            .snapshots
            .iter()
            .rev()
            .find(|s| s.entity_id.as_str() == "P1")
            .unwrap();
        assert_eq!(last_p1.sequence_number, 3);
        assert_eq!(last_p1.counters.get(StatName::Points), 5);
        assert_eq!(last_p1.counters.get(StatName::Fouls), 1);

        let last_team = outcome
            .snapshots
            .iter()
            .rev()
            .find(|s| s.entity_id.as_str() == "BOS")
            .unwrap();
        assert_eq!(last_team.counters.get(StatName::Points), 5);
        assert_eq!(outcome.last_sequence, Some(3));
    }

    #[test]
    fn scoring_touches_opposing_team() {
        let r = roster();
        let events = vec![event(1, EventType::MadeShot, Some("P1"), &[(StatName::Points, 2)])];
        let outcome = fold(&r, &events).unwrap();
        let touched: Vec<&str> = outcome.snapshots.iter().map(|s| s.entity_id.as_str()).collect();
        assert_eq!(touched, vec!["BOS", "NYK", "P1"]);
        let nyk = snapshot_of(&outcome.snapshots, "NYK").unwrap();
        assert_eq!(nyk.counters.get(StatName::OppPoints), 2);
        assert_eq!(nyk.counters.get(StatName::Points), 0);
    }

    #[test]
    fn missed_shot_does_not_touch_opponent() {
        let r = roster();
        let events = vec![event(1, EventType::MissedShot, Some("P3"), &[(StatName::Fga, 1)])];
        let outcome = fold(&r, &events).unwrap();
        let touched: Vec<&str> = outcome.snapshots.iter().map(|s| s.entity_id.as_str()).collect();
        assert_eq!(touched, vec!["NYK", "P3"]);
    }

    #[test]
    fn out_of_order_sequence_is_fatal_with_prefix() {
        let r = roster();
        let events = vec![
            event(1, EventType::MadeShot, Some("P1"), &[(StatName::Points, 2)]),
            event(2, EventType::MadeShot, Some("P1"), &[(StatName::Points, 2)]),
            event(2, EventType::MadeShot, Some("P1"), &[(StatName::Points, 2)]),
        ];
        let failure = fold(&r, &events).unwrap_err();
        assert!(matches!(
            *failure.source,
            AggregationError::OutOfOrder { previous: 2, sequence_number: 2, .. }
        ));
        assert_eq!(failure.last_applied, Some(2));
        assert!(failure.emitted.iter().all(|s| s.sequence_number <= 2));
        assert!(!failure.emitted.is_empty());
    }

    #[test]
    fn unknown_entity_is_fatal_for_scoring_events() {
        let r = roster();
        let events = vec![event(1, EventType::MadeShot, Some("P9"), &[(StatName::Points, 2)])];
        let failure = fold(&r, &events).unwrap_err();
        assert!(matches!(*failure.source, AggregationError::UnknownEntity { .. }));
        assert_eq!(failure.last_applied, None);
    }

    #[test]
    fn unknown_entity_in_non_scoring_admin_event_is_skipped() {
        let r = roster();
        let events = vec![
            event(1, EventType::Admin, Some("REF7"), &[]),
            event(2, EventType::MadeShot, Some("P1"), &[(StatName::Points, 2)]),
        ];
        let outcome = fold(&r, &events).unwrap();
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].sequence_number, 1);
        assert!(outcome.snapshots.iter().all(|s| s.sequence_number == 2));
    }

    #[test]
    fn unknown_entity_in_scoring_admin_event_is_fatal() {
        let r = roster();
        let events = vec![event(1, EventType::Admin, Some("P9"), &[(StatName::Points, 1)])];
        assert!(fold(&r, &events).is_err());
    }

    #[test]
    fn substitution_flips_on_court_for_both_players() {
        let r = roster();
        let mut sub = event(1, EventType::Substitution, Some("P2"), &[]);
        sub.participants = BTreeSet::from([id("P1")]);
        let outcome = fold(&r, &[sub]).unwrap();
        assert!(snapshot_of(&outcome.snapshots, "P2").unwrap().on_court);
        assert!(!snapshot_of(&outcome.snapshots, "P1").unwrap().on_court);

        // Only the two players are touched; the team is unchanged.
        let touched: Vec<&str> = outcome
            .snapshots
            .iter()
            .map(|s| s.entity_id.as_str())
            .collect();
        assert_eq!(touched, vec!["P1", "P2"]);
    }

    #[test]
    fn on_court_changes_only_through_substitution() {
        let r = roster();
        // P2 is a reserve who scores without a substitution event.
        let events = vec![event(1, EventType::MadeShot, Some("P2"), &[(StatName::Points, 2)])];
        let outcome = fold(&r, &events).unwrap();
        assert!(!snapshot_of(&outcome.snapshots, "P2").unwrap().on_court);
    }

    #[test]
    fn period_end_checkpoints_active_entities() {
        let r = roster();
        let mut sub = event(2, EventType::Substitution, Some("P2"), &[]);
        sub.participants = BTreeSet::from([id("P1")]);
        let mut end = event(3, EventType::PeriodEnd, None, &[]);
        end.acting_entity_id = None;
        let events = vec![
            event(1, EventType::MadeShot, Some("P1"), &[(StatName::Points, 2)]),
            sub,
            end,
        ];
        let outcome = fold(&r, &events).unwrap();
        let checkpoint: BTreeMap<&str, &StateSnapshot> = outcome
            .snapshots
            .iter()
            .filter(|s| s.sequence_number == 3)
            .map(|s| (s.entity_id.as_str(), s))
            .collect();
        // P1 is off court but scored this period; P2 and P3 are on court.
        let ids: Vec<&str> = checkpoint.keys().copied().collect();
        assert_eq!(ids, vec!["BOS", "NYK", "P1", "P2", "P3"]);
        assert!(checkpoint.values().all(|s| s.period_end));
        assert_eq!(checkpoint["P1"].counters.get(StatName::Points), 2);
    }

    #[test]
    fn period_end_skips_idle_bench_players() {
        let r = roster();
        let end = event(1, EventType::PeriodEnd, None, &[]);
        let outcome = fold(&r, &[end]).unwrap();
        assert!(snapshot_of(&outcome.snapshots, "P2").is_none());
        assert!(snapshot_of(&outcome.snapshots, "P1").is_some());
    }

    #[test]
    fn resume_continues_without_double_application() {
        let r = roster();
        let events = vec![
            event(1, EventType::MadeShot, Some("P1"), &[(StatName::Points, 2)]),
            event(2, EventType::MadeShot, Some("P1"), &[(StatName::Points, 3)]),
            event(3, EventType::MadeShot, Some("P3"), &[(StatName::Points, 2)]),
        ];
        let full = fold(&r, &events).unwrap();

        let prefix = fold(&r, &events[..2]).unwrap();
        let mut latest: BTreeMap<EntityId, StateSnapshot> = BTreeMap::new();
        for snap in prefix.snapshots {
            latest.insert(snap.entity_id.clone(), snap);
        }
        let resumed = ContestFold::resume(&r, latest.into_values(), 2)
            .unwrap()
            .fold_all(&events[2..])
            .unwrap();

        let full_tail: Vec<&StateSnapshot> =
            full.snapshots.iter().filter(|s| s.sequence_number == 3).collect();
        let resumed_tail: Vec<&StateSnapshot> = resumed.snapshots.iter().collect();
        assert_eq!(full_tail, resumed_tail);
    }

    #[test]
    fn resume_rejects_replayed_events() {
        let r = roster();
        let mut resumed = ContestFold::resume(&r, Vec::new(), 5).unwrap();
        let replay = event(5, EventType::MadeShot, Some("P1"), &[(StatName::Points, 2)]);
        assert!(matches!(
            resumed.apply(&replay),
            Err(AggregationError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn failed_apply_leaves_fold_unchanged() {
        let r = roster();
        let mut f = ContestFold::new(&r);
        let _ = f
            .apply(&event(1, EventType::MadeShot, Some("P1"), &[(StatName::Points, i64::MAX)]))
            .unwrap();
        let overflow = event(2, EventType::MadeShot, Some("P1"), &[(StatName::Points, 1)]);
        assert!(matches!(
            f.apply(&overflow),
            Err(AggregationError::CounterOverflow { .. })
        ));
        assert_eq!(f.last_sequence(), Some(1));
        assert_eq!(f.counters(&id("P1")).unwrap().get(StatName::Points), i64::MAX);
    }

    #[test]
    fn snapshots_equal_exact_sum_of_deltas() {
        let r = roster();
        let mut rng = rand::rng();
        let players = ["P1", "P2", "P3"];
        let events: Vec<Event> = (1..=200_u64)
            .map(|seq| {
                let acting = players[rng.random_range(0..players.len())];
                let points = rng.random_range(0..=3_i64);
                let rebounds = rng.random_range(0..=1_i64);
                event(
                    seq,
                    EventType::MadeShot,
                    Some(acting),
                    &[(StatName::Points, points), (StatName::Dreb, rebounds)],
                )
            })
            .collect();
        let outcome = fold(&r, &events).unwrap();

        for snap in outcome.snapshots.iter().filter(|s| s.entity_kind == EntityKind::Player) {
            let expected: i64 = events
                .iter()
                .filter(|e| e.sequence_number <= snap.sequence_number)
                .filter(|e| e.acting_entity_id.as_ref() == Some(&snap.entity_id))
                .map(Event::points)
                .sum();
            assert_eq!(snap.counters.get(StatName::Points), expected);
        }
    }
}
