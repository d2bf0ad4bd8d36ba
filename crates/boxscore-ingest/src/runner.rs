//! Concurrent multi-contest ingestion.
//!
//! Each contest is folded on a Tokio blocking worker: the fold is pure CPU
//! work with no suspension points, and it owns its counter sets for its
//! whole lifetime. A semaphore bounds how many folds run at once. The only
//! shared resource is the [`SnapshotIndex`], which takes one writer per
//! contest, so distinct contests never wait on each other.
//!
//! A contest already present in the index is resumed from its durable
//! prefix (latest snapshot per entity plus the last sequence) unless
//! `replace_existing` is set, in which case it is rebuilt and swapped in
//! with [`SnapshotIndex::replace_contest`]. [`IngestRunner::seed`] loads
//! that prefix from a [`SnapshotStore`] so a restarted process resumes
//! where the last one stopped.
//!
//! A fold that fails still writes the valid prefix it emitted; the report
//! carries the last applied sequence so the contest can be resumed once the
//! log is corrected.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use boxscore_aggregation::{
    AggregationError, ContestFold, ContestRoster, FoldFailure, FoldOutcome, MonotonicityResult,
    RosterError, verify_monotonic,
};
use boxscore_index::{DbError, IndexError, PutSummary, SnapshotIndex, SnapshotStore};
use boxscore_query::PeriodConfig;
use boxscore_types::{ContestId, Event, IngestError, parse_event_log};

use crate::config::IngestConfig;

/// Suffix of an event log file.
const EVENTS_SUFFIX: &str = ".events.jsonl";

/// Suffix of a roster file.
const ROSTER_SUFFIX: &str = ".roster.json";

/// Errors that stop an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// An input file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The file or directory.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An event log failed validation.
    #[error("invalid event log {}: {source}", path.display())]
    EventLog {
        /// The log file.
        path: PathBuf,
        /// The validation error.
        source: IngestError,
    },

    /// A roster document is invalid.
    #[error("invalid roster {}: {source}", path.display())]
    Roster {
        /// The roster file.
        path: PathBuf,
        /// The roster error.
        source: RosterError,
    },

    /// An event log has no matching roster.
    #[error("no roster for event log {}", path.display())]
    MissingRoster {
        /// The log file.
        path: PathBuf,
    },

    /// An event in a log names a different contest than its roster.
    #[error("event log for {expected} contains events of {actual}")]
    ContestMismatch {
        /// The roster's contest.
        expected: ContestId,
        /// The contest named by an event.
        actual: ContestId,
    },

    /// The durable prefix of a contest could not be restored.
    #[error("cannot resume contest {contest_id}: {source}")]
    Resume {
        /// The contest.
        contest_id: ContestId,
        /// The underlying aggregation error.
        source: Box<AggregationError>,
    },

    /// The snapshot index rejected a write or read.
    #[error("index error: {source}")]
    Index {
        /// The underlying index error.
        #[from]
        source: IndexError,
    },

    /// The durable snapshot store failed.
    #[error("database error: {source}")]
    Db {
        /// The underlying database error.
        #[from]
        source: DbError,
    },

    /// A fold task panicked or was cancelled.
    #[error("fold task failed: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One contest ready to fold.
#[derive(Debug, Clone)]
pub struct ContestInput {
    /// The registered entities.
    pub roster: ContestRoster,
    /// The validated, ordered event log.
    pub events: Vec<Event>,
}

impl ContestInput {
    /// Pair a roster with its log, checking every event names the contest.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::ContestMismatch`] on the first foreign event.
    pub fn new(roster: ContestRoster, events: Vec<Event>) -> Result<Self, RunnerError> {
        if let Some(stray) = events
            .iter()
            .find(|event| event.contest_id != *roster.contest_id())
        {
            return Err(RunnerError::ContestMismatch {
                expected: roster.contest_id().clone(),
                actual: stray.contest_id.clone(),
            });
        }
        Ok(Self { roster, events })
    }

    /// The contest.
    pub const fn contest_id(&self) -> &ContestId {
        self.roster.contest_id()
    }
}

/// Load every `<contest>.events.jsonl` in `dir` with its
/// `<contest>.roster.json`, in file-name order.
///
/// # Errors
///
/// Returns [`RunnerError::Io`], [`RunnerError::EventLog`],
/// [`RunnerError::Roster`] or [`RunnerError::MissingRoster`] for the first
/// contest that cannot be loaded.
pub fn load_inputs(dir: &Path) -> Result<Vec<ContestInput>, RunnerError> {
    let mut logs: BTreeMap<String, PathBuf> = BTreeMap::new();
    for entry in std::fs::read_dir(dir).map_err(io_error(dir))? {
        let path = entry.map_err(io_error(dir))?.path();
        let stem = path
            .file_name()
            .and_then(std::ffi::OsStr::to_str)
            .and_then(|name| name.strip_suffix(EVENTS_SUFFIX))
            .map(str::to_owned);
        if let Some(stem) = stem {
            logs.insert(stem, path);
        }
    }

    let mut inputs = Vec::with_capacity(logs.len());
    for (stem, log_path) in logs {
        let roster_path = dir.join(format!("{stem}{ROSTER_SUFFIX}"));
        if !roster_path.exists() {
            return Err(RunnerError::MissingRoster { path: log_path });
        }
        let roster_json = std::fs::read_to_string(&roster_path).map_err(io_error(&roster_path))?;
        let roster = ContestRoster::from_json(&roster_json).map_err(|source| RunnerError::Roster {
            path: roster_path,
            source,
        })?;
        let jsonl = std::fs::read_to_string(&log_path).map_err(io_error(&log_path))?;
        let events = parse_event_log(&jsonl).map_err(|source| RunnerError::EventLog {
            path: log_path,
            source,
        })?;
        inputs.push(ContestInput::new(roster, events)?);
    }
    Ok(inputs)
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> RunnerError {
    let path = path.to_path_buf();
    move |source| RunnerError::Io { path, source }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened to one contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContestReport {
    /// The contest.
    pub contest_id: ContestId,
    /// Events in the input log.
    pub events_total: usize,
    /// Events folded in this run (after any resumed prefix).
    pub events_applied: usize,
    /// Snapshots emitted in this run.
    pub snapshots: usize,
    /// Index write totals.
    pub put: PutSummary,
    /// Last sequence consumed, durable prefix included.
    pub last_sequence: Option<u64>,
    /// Admin events skipped for unregistered entities.
    pub skipped_events: usize,
    /// Whether the contest was resumed from the index.
    pub resumed: bool,
    /// The fatal fold error, if the fold stopped early.
    pub failure: Option<String>,
    /// Count-stat decreases found by the audit.
    pub monotonicity_violations: usize,
    /// Periods whose end has been ingested, ascending.
    pub ended_periods: Vec<u32>,
    /// Regulation periods with no end event yet.
    pub missing_periods: Vec<u32>,
}

impl ContestReport {
    /// Whether the whole log was applied.
    pub const fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Folds contests concurrently into a shared index.
#[derive(Debug, Clone)]
pub struct IngestRunner {
    index: Arc<SnapshotIndex>,
    config: IngestConfig,
    periods: PeriodConfig,
}

impl IngestRunner {
    /// Create a runner writing into `index`.
    pub fn new(index: Arc<SnapshotIndex>, config: IngestConfig) -> Self {
        Self {
            index,
            config,
            periods: PeriodConfig::default(),
        }
    }

    /// Set the regulation layout contests are checked against.
    #[must_use]
    pub const fn with_periods(mut self, periods: PeriodConfig) -> Self {
        self.periods = periods;
        self
    }

    /// The shared index.
    pub fn index(&self) -> &Arc<SnapshotIndex> {
        &self.index
    }

    /// Ingest every contest, at most `max_concurrent_folds` at a time.
    ///
    /// Reports come back in contest order. A contest whose fold fails is
    /// reported, not raised; only infrastructure failures stop the run.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Resume`] if a durable prefix cannot be
    /// restored, [`RunnerError::Index`] on an index failure, or
    /// [`RunnerError::Join`] if a fold task panicked.
    pub async fn run(&self, inputs: Vec<ContestInput>) -> Result<Vec<ContestReport>, RunnerError> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_folds.max(1)));
        let mut join_set = JoinSet::new();

        for input in inputs {
            let index = Arc::clone(&self.index);
            let config = self.config.clone();
            let periods = self.periods;
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = semaphore.acquire_owned().await.ok();
                match tokio::task::spawn_blocking(move || {
                    ingest_contest(&index, &config, periods, &input)
                })
                    .await
                {
                    Ok(result) => result,
                    Err(source) => Err(RunnerError::from(source)),
                }
            });
        }

        let mut reports = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            reports.push(joined??);
        }
        reports.sort_by(|a, b| a.contest_id.cmp(&b.contest_id));

        let failed = reports.iter().filter(|r| !r.is_complete()).count();
        info!(
            contests = reports.len(),
            failed,
            rows = self.index.row_count()?,
            "Ingestion run complete"
        );
        Ok(reports)
    }

    /// Load the durable prefix of each input contest from `store`.
    ///
    /// Does nothing when `replace_existing` is set, since those contests are
    /// rebuilt from their logs. Returns the number of rows loaded.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Db`] if the store fails, or
    /// [`RunnerError::Index`] if a row cannot be indexed.
    pub async fn seed<S: SnapshotStore>(
        &self,
        store: &S,
        inputs: &[ContestInput],
    ) -> Result<usize, RunnerError> {
        if self.config.replace_existing {
            return Ok(0);
        }

        let mut loaded: usize = 0;
        for input in inputs {
            let contest_id = input.contest_id();
            let Some(last_sequence) = store.last_sequence(contest_id).await? else {
                continue;
            };
            let snapshots = store.load_contest(contest_id).await?;
            let rows = snapshots.len();
            let put = self.index.put_all(snapshots)?;
            info!(
                contest_id = %contest_id,
                last_sequence,
                rows,
                inserted = put.inserted,
                "Seeded contest from store"
            );
            loaded = loaded.saturating_add(rows);
        }
        Ok(loaded)
    }

    /// Write the indexed snapshots of the reported contests to `store`.
    ///
    /// Contests are written whole; the upsert skips unchanged rows. With
    /// `replace_existing` set, each contest's stored rows are deleted first
    /// so rows the rebuilt log no longer produces do not survive.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Db`] if a delete or batch fails.
    pub async fn persist<S: SnapshotStore>(
        &self,
        store: &S,
        reports: &[ContestReport],
    ) -> Result<u64, RunnerError> {
        let mut written: u64 = 0;
        for report in reports {
            if self.config.replace_existing {
                let deleted = store.delete_contest(&report.contest_id).await?;
                debug!(
                    contest_id = %report.contest_id,
                    deleted,
                    "Cleared stored contest before rewrite"
                );
            }
            let snapshots = self.index.contest_snapshots(&report.contest_id)?;
            let rows = store.upsert_batch(&snapshots).await?;
            info!(
                contest_id = %report.contest_id,
                rows,
                "Persisted contest snapshots"
            );
            written = written.saturating_add(rows);
        }
        Ok(written)
    }
}

/// Fold one contest and write its snapshots. Runs on a blocking worker.
fn ingest_contest(
    index: &SnapshotIndex,
    config: &IngestConfig,
    periods: PeriodConfig,
    input: &ContestInput,
) -> Result<ContestReport, RunnerError> {
    let contest_id = input.contest_id().clone();
    let durable = if config.replace_existing {
        None
    } else {
        index.last_sequence(&contest_id)?
    };

    let fold = match durable {
        Some(last) => ContestFold::resume(&input.roster, index.latest_per_entity(&contest_id)?, last)
            .map_err(|source| RunnerError::Resume {
                contest_id: contest_id.clone(),
                source: Box::new(source),
            })?,
        None => ContestFold::new(&input.roster),
    };
    let pending: Vec<&Event> = input
        .events
        .iter()
        .filter(|event| durable.is_none_or(|last| event.sequence_number > last))
        .collect();
    let events_applied = pending.len();

    let (snapshots, last_sequence, skipped_events, failure, events_applied) =
        match fold.fold_all(pending) {
            Ok(FoldOutcome {
                snapshots,
                last_sequence,
                skipped,
                ..
            }) => (snapshots, last_sequence, skipped.len(), None, events_applied),
            Err(FoldFailure {
                last_applied,
                emitted,
                source,
                ..
            }) => {
                error!(
                    contest_id = %contest_id,
                    last_applied = ?last_applied,
                    error = %source,
                    "Contest fold aborted; writing valid prefix"
                );
                let applied = match (last_applied, durable) {
                    (Some(last), Some(prefix)) => input
                        .events
                        .iter()
                        .filter(|e| e.sequence_number > prefix && e.sequence_number <= last)
                        .count(),
                    (Some(last), None) => input
                        .events
                        .iter()
                        .filter(|e| e.sequence_number <= last)
                        .count(),
                    (None, _) => 0,
                };
                (emitted, last_applied, 0, Some(source.to_string()), applied)
            }
        };

    let snapshot_count = snapshots.len();
    let put = if config.replace_existing {
        index.replace_contest(&contest_id, snapshots)?
    } else {
        index.put_all(snapshots)?
    };

    let monotonicity_violations = if config.verify_monotonicity {
        match verify_monotonic(&index.contest_snapshots(&contest_id)?) {
            MonotonicityResult::Monotonic => 0,
            MonotonicityResult::Violated(violations) => {
                for violation in &violations {
                    error!(
                        contest_id = %contest_id,
                        entity_id = %violation.entity_id,
                        stat = violation.stat.as_str(),
                        earlier_sequence = violation.earlier_sequence,
                        later_sequence = violation.later_sequence,
                        "Count stat decreased"
                    );
                }
                violations.len()
            }
        }
    } else {
        0
    };

    let ended_periods = index.ended_periods(&contest_id)?;
    let missing_periods: Vec<u32> = (1..=periods.regulation_periods)
        .filter(|period| !ended_periods.contains(period))
        .collect();
    if failure.is_none() && !missing_periods.is_empty() {
        warn!(
            contest_id = %contest_id,
            missing = ?missing_periods,
            "Log ends before regulation is complete"
        );
    }

    if skipped_events > 0 {
        warn!(
            contest_id = %contest_id,
            skipped_events,
            "Skipped admin events referencing unregistered entities"
        );
    }
    info!(
        contest_id = %contest_id,
        events = events_applied,
        snapshots = snapshot_count,
        inserted = put.inserted,
        unchanged = put.unchanged,
        resumed = durable.is_some(),
        "Contest ingested"
    );

    Ok(ContestReport {
        contest_id,
        events_total: input.events.len(),
        events_applied,
        snapshots: snapshot_count,
        put,
        last_sequence: last_sequence.or(durable),
        skipped_events,
        resumed: durable.is_some(),
        failure,
        monotonicity_violations,
        ended_periods,
        missing_periods,
    })
}
