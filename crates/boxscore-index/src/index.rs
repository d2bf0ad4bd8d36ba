//! The in-memory snapshot index.
//!
//! Snapshots are partitioned by contest. Each partition sits behind its own
//! lock, so one contest's writer never blocks another's, and any number of
//! readers may query while a contest is being written (they see a strict
//! prefix of it). Lookups come in three time domains:
//!
//! - **Sequence**: carry-forward to the latest row of the entity with
//!   `sequence_number <= s`. Always available.
//! - **Game clock**: the query position maps to the last sequence at or
//!   before it in that contest, then carries forward as above.
//! - **Wall clock**: each entity has a block-range [`EntityTimeline`] of the
//!   upper bounds of its timed rows across all contests. Rows stated at
//!   `game` or `unknown` precision sit at the end of their contest day. The
//!   latest row whose upper bound is at or before the query's lower bound
//!   wins, so a lookup never returns anything that might be later than the
//!   query. When a row of the entity cannot be ordered against the query
//!   (no wall clock at all, or a contest day the query falls inside), the
//!   lookup answers [`IndexError::PrecisionUnavailable`] instead of an
//!   older row.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use boxscore_temporal::{GamePosition, PrecisionModel, TimeBounds, stored_at_or_before};
use boxscore_types::{ContestId, EntityId, PrecisionLevel, SnapshotKey, StateSnapshot};

use crate::block::{EntityTimeline, TimelineEntry};
use crate::error::IndexError;

/// Default number of timeline entries per block.
const DEFAULT_BLOCK_SIZE: usize = 256;

// ---------------------------------------------------------------------------
// Configuration and query types
// ---------------------------------------------------------------------------

/// Index settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Timeline entries per physical block.
    pub block_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// A point in one of the three time domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsOf {
    /// A wall-clock timestamp, optionally restricted to one contest.
    WallClock {
        /// The stated query timestamp.
        at: DateTime<Utc>,
        /// Its precision; the lower bound of the window is compared.
        precision: PrecisionLevel,
        /// Restrict the lookup to one contest.
        contest_id: Option<ContestId>,
    },
    /// A game-clock position within a contest.
    GameClock {
        /// The contest.
        contest_id: ContestId,
        /// Period and seconds remaining.
        position: GamePosition,
    },
    /// A sequence number within a contest.
    Sequence {
        /// The contest.
        contest_id: ContestId,
        /// The event sequence number.
        sequence_number: u64,
    },
}

impl AsOf {
    /// An exact wall-clock query across every contest.
    pub const fn wall_clock(at: DateTime<Utc>, precision: PrecisionLevel) -> Self {
        Self::WallClock {
            at,
            precision,
            contest_id: None,
        }
    }
}

impl fmt::Display for AsOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WallClock {
                at,
                precision,
                contest_id,
            } => {
                write!(f, "{} ({})", at.to_rfc3339(), precision.as_str())?;
                if let Some(contest_id) = contest_id {
                    write!(f, " in {contest_id}")?;
                }
                Ok(())
            }
            Self::GameClock {
                contest_id,
                position,
            } => write!(
                f,
                "period {} with {}s left in {contest_id}",
                position.period, position.game_clock_seconds
            ),
            Self::Sequence {
                contest_id,
                sequence_number,
            } => write!(f, "sequence {sequence_number} in {contest_id}"),
        }
    }
}

/// What a single `put` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PutOutcome {
    /// The key was new.
    Inserted,
    /// An identical row was already stored.
    Unchanged,
    /// A different row with the same key was overwritten.
    Replaced,
}

/// Totals over a batch of writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutSummary {
    /// Rows inserted.
    pub inserted: usize,
    /// Rows already present and identical.
    pub unchanged: usize,
    /// Rows overwritten.
    pub replaced: usize,
}

impl PutSummary {
    fn record(&mut self, outcome: PutOutcome) {
        let slot = match outcome {
            PutOutcome::Inserted => &mut self.inserted,
            PutOutcome::Unchanged => &mut self.unchanged,
            PutOutcome::Replaced => &mut self.replaced,
        };
        *slot = slot.saturating_add(1);
    }
}

// ---------------------------------------------------------------------------
// Partitions
// ---------------------------------------------------------------------------

/// Every row of one contest.
#[derive(Debug, Default)]
struct ContestPartition {
    rows: BTreeMap<(EntityId, u64), StateSnapshot>,
    /// Highest sequence seen at each game-clock position.
    positions: BTreeMap<GamePosition, u64>,
    /// Checkpoint sequence of every ended period.
    period_ends: BTreeMap<u32, u64>,
    last_sequence: Option<u64>,
    /// Rows carrying a usable wall clock.
    wall_clock_rows: usize,
}

impl ContestPartition {
    fn index_row(&mut self, snapshot: &StateSnapshot) {
        let seq = snapshot.sequence_number;
        let slot = self
            .positions
            .entry(GamePosition::of_snapshot(snapshot))
            .or_insert(seq);
        *slot = (*slot).max(seq);
        if snapshot.period_end {
            self.period_ends.insert(snapshot.period, seq);
        }
        self.last_sequence = Some(self.last_sequence.map_or(seq, |last| last.max(seq)));
        if snapshot.supports_wall_clock() {
            self.wall_clock_rows = self.wall_clock_rows.saturating_add(1);
        }
    }

    fn reindex(&mut self) {
        self.positions.clear();
        self.period_ends.clear();
        self.last_sequence = None;
        self.wall_clock_rows = 0;
        let rows = std::mem::take(&mut self.rows);
        for snapshot in rows.values() {
            self.index_row(snapshot);
        }
        self.rows = rows;
    }

    fn carry_forward(&self, entity_id: &EntityId, sequence_number: u64) -> Option<&StateSnapshot> {
        self.rows
            .range((entity_id.clone(), 0)..=(entity_id.clone(), sequence_number))
            .next_back()
            .map(|(_, snapshot)| snapshot)
    }

    fn entities(&self) -> BTreeSet<&EntityId> {
        self.rows.keys().map(|(entity, _)| entity).collect()
    }
}

/// Where a row sits on the wall clock.
#[derive(Debug, Clone, Copy)]
enum Placement {
    /// Upper bound of a precision-capable reading.
    Bounded(DateTime<Utc>),
    /// A `game` or `unknown` reading: only the contest day is known.
    ContestDay(TimeBounds),
    /// No wall clock at all.
    Untimed,
}

/// Contest-day window of a contest's coarse rows.
#[derive(Debug, Clone, Copy)]
struct ContestDay {
    window: TimeBounds,
    rows: usize,
}

/// Wall-clock view of one entity across contests.
#[derive(Debug)]
struct EntityClock {
    /// Every timed row; coarse rows at the end of their contest day.
    timeline: EntityTimeline,
    contest_days: BTreeMap<ContestId, ContestDay>,
    /// Rows without a wall clock, per contest.
    untimed: BTreeMap<ContestId, usize>,
}

impl EntityClock {
    fn new(block_size: usize) -> Self {
        Self {
            timeline: EntityTimeline::new(block_size),
            contest_days: BTreeMap::new(),
            untimed: BTreeMap::new(),
        }
    }

    fn add(&mut self, key: &SnapshotKey, placement: Placement) {
        let entry = |upper| TimelineEntry {
            upper,
            contest_id: key.contest_id.clone(),
            sequence_number: key.sequence_number,
        };
        match placement {
            Placement::Bounded(upper) => self.timeline.push(entry(upper)),
            Placement::ContestDay(window) => {
                self.timeline.push(entry(window.upper));
                self.contest_days
                    .entry(key.contest_id.clone())
                    .and_modify(|day| {
                        day.window.lower = day.window.lower.min(window.lower);
                        day.window.upper = day.window.upper.max(window.upper);
                        day.rows = day.rows.saturating_add(1);
                    })
                    .or_insert(ContestDay { window, rows: 1 });
            }
            Placement::Untimed => {
                let rows = self.untimed.entry(key.contest_id.clone()).or_insert(0);
                *rows = rows.saturating_add(1);
            }
        }
    }

    fn remove(&mut self, key: &SnapshotKey, placement: Placement) {
        match placement {
            Placement::Bounded(_) => {
                self.timeline.remove(key);
            }
            Placement::ContestDay(_) => {
                self.timeline.remove(key);
                let emptied = self.contest_days.get_mut(&key.contest_id).is_some_and(|day| {
                    day.rows = day.rows.saturating_sub(1);
                    day.rows == 0
                });
                if emptied {
                    self.contest_days.remove(&key.contest_id);
                }
            }
            Placement::Untimed => {
                let emptied = self.untimed.get_mut(&key.contest_id).is_some_and(|rows| {
                    *rows = rows.saturating_sub(1);
                    *rows == 0
                });
                if emptied {
                    self.untimed.remove(&key.contest_id);
                }
            }
        }
    }

    fn remove_contest(&mut self, contest_id: &ContestId) {
        self.timeline.remove_contest(contest_id);
        self.contest_days.remove(contest_id);
        self.untimed.remove(contest_id);
    }

    /// Whether some in-scope row may or may not precede `query`: an untimed
    /// row, or a contest day that `query` starts inside.
    fn is_ambiguous(&self, query: &TimeBounds, scope: Option<&ContestId>) -> bool {
        let in_scope = |contest_id: &ContestId| scope.is_none_or(|s| s == contest_id);
        self.untimed.keys().any(in_scope)
            || self.contest_days.iter().any(|(contest_id, day)| {
                in_scope(contest_id)
                    && day.window.lower <= query.lower
                    && !stored_at_or_before(&day.window, query)
            })
    }
}

// ---------------------------------------------------------------------------
// Snapshot index
// ---------------------------------------------------------------------------

type Shared<T> = Arc<RwLock<T>>;

/// Concurrent, append-mostly index of state snapshots.
#[derive(Debug)]
pub struct SnapshotIndex {
    config: IndexConfig,
    model: PrecisionModel,
    contests: RwLock<BTreeMap<ContestId, Shared<ContestPartition>>>,
    clocks: RwLock<BTreeMap<EntityId, Shared<EntityClock>>>,
}

impl Default for SnapshotIndex {
    fn default() -> Self {
        Self::new(IndexConfig::default(), PrecisionModel::default())
    }
}

impl SnapshotIndex {
    /// Create an empty index.
    pub fn new(config: IndexConfig, model: PrecisionModel) -> Self {
        Self {
            config,
            model,
            contests: RwLock::new(BTreeMap::new()),
            clocks: RwLock::new(BTreeMap::new()),
        }
    }

    /// The precision model used to bound stored timestamps.
    pub const fn precision_model(&self) -> &PrecisionModel {
        &self.model
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Idempotent upsert keyed by `(contest_id, entity_id, sequence_number)`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Precision`] if the wall clock cannot be
    /// bounded, or [`IndexError::LockPoisoned`].
    pub fn put(&self, snapshot: StateSnapshot) -> Result<PutOutcome, IndexError> {
        let partition = self.partition_or_create(&snapshot.contest_id)?;
        let mut partition = write(&partition)?;
        self.put_locked(&mut partition, snapshot)
    }

    /// Upsert many snapshots, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing row; rows before it stay written.
    pub fn put_all(
        &self,
        snapshots: impl IntoIterator<Item = StateSnapshot>,
    ) -> Result<PutSummary, IndexError> {
        let mut summary = PutSummary::default();
        for snapshot in snapshots {
            summary.record(self.put(snapshot)?);
        }
        Ok(summary)
    }

    /// Replace every row of a contest with `snapshots`.
    ///
    /// Readers see either the old rows or a prefix of the new ones.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::ContestMismatch`] if a snapshot belongs to
    /// another contest; nothing is changed in that case.
    pub fn replace_contest(
        &self,
        contest_id: &ContestId,
        snapshots: Vec<StateSnapshot>,
    ) -> Result<PutSummary, IndexError> {
        if let Some(stray) = snapshots.iter().find(|s| s.contest_id != *contest_id) {
            return Err(IndexError::ContestMismatch {
                expected: contest_id.clone(),
                actual: stray.contest_id.clone(),
            });
        }

        let partition = self.partition_or_create(contest_id)?;
        let mut partition = write(&partition)?;
        let previous: Vec<EntityId> = partition.entities().into_iter().cloned().collect();
        for entity_id in &previous {
            if let Some(clock) = self.clock(entity_id)? {
                let mut clock = write(&clock)?;
                clock.remove_contest(contest_id);
            }
        }
        *partition = ContestPartition::default();

        let mut summary = PutSummary::default();
        for snapshot in snapshots {
            summary.record(self.put_locked(&mut partition, snapshot)?);
        }
        debug!(
            contest_id = %contest_id,
            replaced_entities = previous.len(),
            inserted = summary.inserted,
            "Replaced contest snapshots"
        );
        Ok(summary)
    }

    fn put_locked(
        &self,
        partition: &mut ContestPartition,
        snapshot: StateSnapshot,
    ) -> Result<PutOutcome, IndexError> {
        let placement = self.placement(&snapshot)?;
        let row_key = (snapshot.entity_id.clone(), snapshot.sequence_number);

        let (outcome, previous) = match partition.rows.get(&row_key) {
            Some(existing) if *existing == snapshot => return Ok(PutOutcome::Unchanged),
            Some(existing) => (PutOutcome::Replaced, Some(self.placement(existing)?)),
            None => (PutOutcome::Inserted, None),
        };

        let key = snapshot.key();
        let clock = self.clock_or_create(&snapshot.entity_id)?;
        {
            let mut clock = write(&clock)?;
            if let Some(previous) = previous {
                clock.remove(&key, previous);
            }
            clock.add(&key, placement);
        }

        match outcome {
            PutOutcome::Replaced => {
                partition.rows.insert(row_key, snapshot);
                partition.reindex();
            }
            _ => {
                partition.index_row(&snapshot);
                partition.rows.insert(row_key, snapshot);
            }
        }

        debug!(
            contest_id = %key.contest_id,
            entity_id = %key.entity_id,
            sequence_number = key.sequence_number,
            outcome = ?outcome,
            "Indexed snapshot"
        );
        Ok(outcome)
    }

    fn placement(&self, snapshot: &StateSnapshot) -> Result<Placement, IndexError> {
        let Some(at) = snapshot.wall_clock else {
            return Ok(Placement::Untimed);
        };
        let bounds = self.model.resolve_bounds(at, snapshot.wall_clock_precision)?;
        Ok(if snapshot.wall_clock_precision.supports_wall_clock() {
            Placement::Bounded(bounds.upper)
        } else {
            Placement::ContestDay(bounds)
        })
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Exact counters of an entity as of one event, by carry-forward.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NoData`] if the entity has no row at or before
    /// `sequence_number` in the contest.
    pub fn get_at_sequence(
        &self,
        contest_id: &ContestId,
        entity_id: &EntityId,
        sequence_number: u64,
    ) -> Result<StateSnapshot, IndexError> {
        let no_data = || IndexError::NoData {
            entity_id: entity_id.clone(),
            as_of: AsOf::Sequence {
                contest_id: contest_id.clone(),
                sequence_number,
            }
            .to_string(),
        };
        let partition = self.partition(contest_id)?.ok_or_else(no_data)?;
        let partition = read(&partition)?;
        partition
            .carry_forward(entity_id, sequence_number)
            .cloned()
            .ok_or_else(no_data)
    }

    /// The most recent snapshot of an entity at or before `as_of`.
    ///
    /// # Errors
    ///
    /// - [`IndexError::NoData`] before the entity's first appearance.
    /// - [`IndexError::PrecisionUnavailable`] for a wall-clock query scoped
    ///   to a contest without wall-clock precision, or one that a row of the
    ///   entity cannot be ordered against.
    pub fn get_at_or_before(
        &self,
        entity_id: &EntityId,
        as_of: &AsOf,
    ) -> Result<StateSnapshot, IndexError> {
        match as_of {
            AsOf::Sequence {
                contest_id,
                sequence_number,
            } => self.get_at_sequence(contest_id, entity_id, *sequence_number),
            AsOf::GameClock {
                contest_id,
                position,
            } => self.get_at_game_clock(contest_id, entity_id, *position, as_of),
            AsOf::WallClock {
                at,
                precision,
                contest_id,
            } => self.get_at_wall_clock(entity_id, *at, *precision, contest_id.as_ref(), as_of),
        }
    }

    fn get_at_game_clock(
        &self,
        contest_id: &ContestId,
        entity_id: &EntityId,
        position: GamePosition,
        as_of: &AsOf,
    ) -> Result<StateSnapshot, IndexError> {
        let no_data = || IndexError::NoData {
            entity_id: entity_id.clone(),
            as_of: as_of.to_string(),
        };
        let partition = self.partition(contest_id)?.ok_or_else(no_data)?;
        let partition = read(&partition)?;
        let (_, sequence_number) = partition
            .positions
            .range(..=position)
            .next_back()
            .ok_or_else(no_data)?;
        partition
            .carry_forward(entity_id, *sequence_number)
            .cloned()
            .ok_or_else(no_data)
    }

    fn get_at_wall_clock(
        &self,
        entity_id: &EntityId,
        at: DateTime<Utc>,
        precision: PrecisionLevel,
        contest_id: Option<&ContestId>,
        as_of: &AsOf,
    ) -> Result<StateSnapshot, IndexError> {
        let unavailable = || IndexError::PrecisionUnavailable {
            entity_id: entity_id.clone(),
            contest_id: contest_id.cloned(),
        };
        let no_data = || IndexError::NoData {
            entity_id: entity_id.clone(),
            as_of: as_of.to_string(),
        };

        if !precision.supports_wall_clock() {
            return Err(unavailable());
        }
        if let Some(contest_id) = contest_id {
            if let Some(partition) = self.partition(contest_id)? {
                let partition = read(&partition)?;
                if !partition.rows.is_empty() && partition.wall_clock_rows == 0 {
                    return Err(unavailable());
                }
            }
        }

        let query = self.model.resolve_bounds(at, precision)?;
        let clock = self.clock(entity_id)?.ok_or_else(no_data)?;
        let entry = {
            let clock = read(&clock)?;
            if clock.is_ambiguous(&query, contest_id) {
                return Err(unavailable());
            }
            let (entry, stats) = clock.timeline.latest_at_or_before(query.lower, contest_id);
            debug!(
                entity_id = %entity_id,
                blocks = stats.blocks_total,
                pruned = stats.blocks_pruned,
                hit = entry.is_some(),
                "Wall-clock lookup"
            );
            entry.cloned()
        };

        let entry = entry.ok_or_else(no_data)?;
        self.get_at_sequence(&entry.contest_id, entity_id, entry.sequence_number)
    }

    /// The last sequence number stored for a contest.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] only.
    pub fn last_sequence(&self, contest_id: &ContestId) -> Result<Option<u64>, IndexError> {
        self.with_partition(contest_id, |p| p.last_sequence)
            .map(Option::flatten)
    }

    /// The latest snapshot of every entity in a contest.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] only.
    pub fn latest_per_entity(&self, contest_id: &ContestId) -> Result<Vec<StateSnapshot>, IndexError> {
        self.with_partition(contest_id, |p| {
            p.entities()
                .into_iter()
                .filter_map(|entity| p.carry_forward(entity, u64::MAX).cloned())
                .collect()
        })
        .map(Option::unwrap_or_default)
    }

    /// The checkpoint sequence of a period, if its end has been ingested.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] only.
    pub fn period_end_sequence(
        &self,
        contest_id: &ContestId,
        period: u32,
    ) -> Result<Option<u64>, IndexError> {
        self.with_partition(contest_id, |p| p.period_ends.get(&period).copied())
            .map(Option::flatten)
    }

    /// Every period whose end has been ingested, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] only.
    pub fn ended_periods(&self, contest_id: &ContestId) -> Result<Vec<u32>, IndexError> {
        self.with_partition(contest_id, |p| p.period_ends.keys().copied().collect())
            .map(Option::unwrap_or_default)
    }

    /// Every row of a contest in `(sequence, entity)` order.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] only.
    pub fn contest_snapshots(&self, contest_id: &ContestId) -> Result<Vec<StateSnapshot>, IndexError> {
        self.with_partition(contest_id, |p| {
            let mut rows: Vec<StateSnapshot> = p.rows.values().cloned().collect();
            rows.sort_by(|a, b| {
                a.sequence_number
                    .cmp(&b.sequence_number)
                    .then_with(|| a.entity_id.cmp(&b.entity_id))
            });
            rows
        })
        .map(Option::unwrap_or_default)
    }

    /// Whether a row exists for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] only.
    pub fn contains(&self, key: &SnapshotKey) -> Result<bool, IndexError> {
        self.with_partition(&key.contest_id, |p| {
            p.rows
                .contains_key(&(key.entity_id.clone(), key.sequence_number))
        })
        .map(|found| found.unwrap_or(false))
    }

    /// Contests with at least one row.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] only.
    pub fn contests(&self) -> Result<Vec<ContestId>, IndexError> {
        Ok(read(&self.contests)?.keys().cloned().collect())
    }

    /// Total number of rows.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] only.
    pub fn row_count(&self) -> Result<usize, IndexError> {
        let partitions: Vec<Shared<ContestPartition>> =
            read(&self.contests)?.values().cloned().collect();
        partitions
            .iter()
            .try_fold(0_usize, |total, p| Ok(total.saturating_add(read(p)?.rows.len())))
    }

    // -----------------------------------------------------------------------
    // Locking helpers
    // -----------------------------------------------------------------------

    fn partition(&self, contest_id: &ContestId) -> Result<Option<Shared<ContestPartition>>, IndexError> {
        Ok(read(&self.contests)?.get(contest_id).cloned())
    }

    fn partition_or_create(&self, contest_id: &ContestId) -> Result<Shared<ContestPartition>, IndexError> {
        if let Some(existing) = self.partition(contest_id)? {
            return Ok(existing);
        }
        Ok(Arc::clone(
            write(&self.contests)?
                .entry(contest_id.clone())
                .or_default(),
        ))
    }

    fn with_partition<T>(
        &self,
        contest_id: &ContestId,
        f: impl FnOnce(&ContestPartition) -> T,
    ) -> Result<Option<T>, IndexError> {
        let Some(partition) = self.partition(contest_id)? else {
            return Ok(None);
        };
        let partition = read(&partition)?;
        Ok(Some(f(&partition)))
    }

    fn clock(&self, entity_id: &EntityId) -> Result<Option<Shared<EntityClock>>, IndexError> {
        Ok(read(&self.clocks)?.get(entity_id).cloned())
    }

    fn clock_or_create(&self, entity_id: &EntityId) -> Result<Shared<EntityClock>, IndexError> {
        if let Some(existing) = self.clock(entity_id)? {
            return Ok(existing);
        }
        let block_size = self.config.block_size;
        Ok(Arc::clone(
            write(&self.clocks)?
                .entry(entity_id.clone())
                .or_insert_with(|| Arc::new(RwLock::new(EntityClock::new(block_size)))),
        ))
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, IndexError> {
    lock.read().map_err(|err| IndexError::LockPoisoned {
        reason: err.to_string(),
    })
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, IndexError> {
    lock.write().map_err(|err| IndexError::LockPoisoned {
        reason: err.to_string(),
    })
}
