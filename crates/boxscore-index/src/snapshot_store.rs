//! Durable snapshot rows in `PostgreSQL`.
//!
//! One append-only table holds every snapshot.
//! [`PostgresPool::ensure_schema`](crate::PostgresPool::ensure_schema)
//! provisions it as:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS box_score_snapshots (
//!     contest_id           TEXT        NOT NULL,
//!     entity_id            TEXT        NOT NULL,
//!     sequence_number      BIGINT      NOT NULL,
//!     entity_kind          TEXT        NOT NULL,
//!     period               INTEGER     NOT NULL,
//!     game_clock_seconds   INTEGER     NOT NULL,
//!     wall_clock           TIMESTAMPTZ,
//!     wall_clock_precision TEXT        NOT NULL,
//!     wall_clock_upper     TIMESTAMPTZ,
//!     counters             JSONB       NOT NULL,
//!     on_court             BOOLEAN     NOT NULL,
//!     period_end           BOOLEAN     NOT NULL,
//!     PRIMARY KEY (contest_id, entity_id, sequence_number)
//! );
//! CREATE INDEX IF NOT EXISTS box_score_snapshots_wall_clock_upper
//!     ON box_score_snapshots USING BRIN (wall_clock_upper);
//! ```
//!
//! `wall_clock_upper` is the upper bound of the stored wall clock under the
//! precision model (the end of the contest day for `game` and `unknown`
//! rows), and is `NULL` for rows without a wall clock. The
//! BRIN index keeps one min/max summary per block range of the table, which
//! suits rows that arrive roughly in time order.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use boxscore_temporal::PrecisionModel;
use boxscore_types::{ContestId, EntityId, EntityKind, PrecisionLevel, StateSnapshot};

use crate::error::DbError;

/// Default batch size for upserts.
const DEFAULT_BATCH_SIZE: usize = 500;

/// Columns selected by every read, in [`SnapshotRow`] order.
const SELECT_COLUMNS: &str = "contest_id, entity_id, sequence_number, entity_kind, period, \
     game_clock_seconds, wall_clock, wall_clock_precision, counters, on_court, period_end";

/// Operations on the `box_score_snapshots` table.
pub struct PgSnapshotStore<'a> {
    pool: &'a PgPool,
    model: PrecisionModel,
    batch_size: usize,
}

impl<'a> PgSnapshotStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool, model: PrecisionModel) -> Self {
        Self {
            pool,
            model,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the batch size for upserts.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Idempotent batch upsert.
    ///
    /// Each batch is one `INSERT ... SELECT FROM UNNEST` in its own
    /// transaction. A row whose key exists is only rewritten when its
    /// content differs, so re-ingesting the same snapshots is a no-op.
    /// Returns the number of rows inserted or changed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a batch fails, or
    /// [`DbError::Serialization`] if a counter set cannot be encoded.
    pub async fn upsert_batch(&self, snapshots: &[StateSnapshot]) -> Result<u64, DbError> {
        if snapshots.is_empty() {
            return Ok(0);
        }

        let mut written: u64 = 0;
        for chunk in snapshots.chunks(self.batch_size.max(1)) {
            let mut tx = self.pool.begin().await?;

            let len = chunk.len();
            let mut contest_ids = Vec::with_capacity(len);
            let mut entity_ids = Vec::with_capacity(len);
            let mut sequences = Vec::with_capacity(len);
            let mut kinds = Vec::with_capacity(len);
            let mut periods = Vec::with_capacity(len);
            let mut clocks = Vec::with_capacity(len);
            let mut wall_clocks: Vec<Option<DateTime<Utc>>> = Vec::with_capacity(len);
            let mut precisions = Vec::with_capacity(len);
            let mut uppers: Vec<Option<DateTime<Utc>>> = Vec::with_capacity(len);
            let mut counters = Vec::with_capacity(len);
            let mut on_court = Vec::with_capacity(len);
            let mut period_end = Vec::with_capacity(len);

            for snapshot in chunk {
                contest_ids.push(snapshot.contest_id.as_str().to_owned());
                entity_ids.push(snapshot.entity_id.as_str().to_owned());
                sequences.push(i64::try_from(snapshot.sequence_number).unwrap_or(i64::MAX));
                kinds.push(snapshot.entity_kind.as_str().to_owned());
                periods.push(i32::try_from(snapshot.period).unwrap_or(i32::MAX));
                clocks.push(i32::try_from(snapshot.game_clock_seconds).unwrap_or(i32::MAX));
                wall_clocks.push(snapshot.wall_clock);
                precisions.push(snapshot.wall_clock_precision.as_str().to_owned());
                uppers.push(self.wall_clock_upper(snapshot));
                counters.push(serde_json::to_value(&snapshot.counters)?);
                on_court.push(snapshot.on_court);
                period_end.push(snapshot.period_end);
            }

            let result = sqlx::query(
                r"INSERT INTO box_score_snapshots
                  (contest_id, entity_id, sequence_number, entity_kind, period, game_clock_seconds,
                   wall_clock, wall_clock_precision, wall_clock_upper, counters, on_court, period_end)
                  SELECT * FROM UNNEST($1::TEXT[], $2::TEXT[], $3::BIGINT[], $4::TEXT[], $5::INTEGER[],
                                       $6::INTEGER[], $7::TIMESTAMPTZ[], $8::TEXT[], $9::TIMESTAMPTZ[],
                                       $10::JSONB[], $11::BOOLEAN[], $12::BOOLEAN[])
                  ON CONFLICT (contest_id, entity_id, sequence_number) DO UPDATE SET
                    entity_kind = EXCLUDED.entity_kind,
                    period = EXCLUDED.period,
                    game_clock_seconds = EXCLUDED.game_clock_seconds,
                    wall_clock = EXCLUDED.wall_clock,
                    wall_clock_precision = EXCLUDED.wall_clock_precision,
                    wall_clock_upper = EXCLUDED.wall_clock_upper,
                    counters = EXCLUDED.counters,
                    on_court = EXCLUDED.on_court,
                    period_end = EXCLUDED.period_end
                  WHERE (box_score_snapshots.entity_kind, box_score_snapshots.period,
                         box_score_snapshots.game_clock_seconds, box_score_snapshots.wall_clock,
                         box_score_snapshots.wall_clock_precision, box_score_snapshots.counters,
                         box_score_snapshots.on_court, box_score_snapshots.period_end)
                        IS DISTINCT FROM
                        (EXCLUDED.entity_kind, EXCLUDED.period, EXCLUDED.game_clock_seconds,
                         EXCLUDED.wall_clock, EXCLUDED.wall_clock_precision, EXCLUDED.counters,
                         EXCLUDED.on_court, EXCLUDED.period_end)",
            )
            .bind(&contest_ids)
            .bind(&entity_ids)
            .bind(&sequences)
            .bind(&kinds)
            .bind(&periods)
            .bind(&clocks)
            .bind(&wall_clocks)
            .bind(&precisions)
            .bind(&uppers)
            .bind(&counters)
            .bind(&on_court)
            .bind(&period_end)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            written = written.saturating_add(result.rows_affected());
        }

        tracing::debug!(
            count = snapshots.len(),
            written,
            "Upserted snapshots (batch UNNEST)"
        );
        Ok(written)
    }

    /// Latest row of an entity at or before a sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Corrupt`] if the row cannot be decoded.
    pub async fn get_at_sequence(
        &self,
        contest_id: &ContestId,
        entity_id: &EntityId,
        sequence_number: u64,
    ) -> Result<Option<StateSnapshot>, DbError> {
        let row = sqlx::query_as::<_, SnapshotRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM box_score_snapshots
             WHERE contest_id = $1 AND entity_id = $2 AND sequence_number <= $3
             ORDER BY sequence_number DESC
             LIMIT 1"
        ))
        .bind(contest_id.as_str())
        .bind(entity_id.as_str())
        .bind(i64::try_from(sequence_number).unwrap_or(i64::MAX))
        .fetch_optional(self.pool)
        .await?;

        row.map(StateSnapshot::try_from).transpose()
    }

    /// Latest timed row of an entity whose stored upper bound is at or
    /// before `bound` (the query's lower bound).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::PrecisionUnavailable`] when the lookup is scoped
    /// to a contest without wall-clock precision, or when an in-scope row
    /// of the entity has no wall clock or a contest day containing `bound`.
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Corrupt`] if the row cannot be decoded.
    pub async fn get_at_or_before_wall_clock(
        &self,
        entity_id: &EntityId,
        bound: DateTime<Utc>,
        contest_id: Option<&ContestId>,
    ) -> Result<Option<StateSnapshot>, DbError> {
        let ambiguous: bool = sqlx::query_scalar(
            r"SELECT
                ($3::TEXT IS NOT NULL
                 AND EXISTS (SELECT 1 FROM box_score_snapshots WHERE contest_id = $3)
                 AND NOT EXISTS (SELECT 1 FROM box_score_snapshots
                                 WHERE contest_id = $3
                                   AND wall_clock IS NOT NULL
                                   AND wall_clock_precision NOT IN ('game', 'unknown')))
                OR EXISTS (SELECT 1 FROM box_score_snapshots
                           WHERE entity_id = $1
                             AND ($3::TEXT IS NULL OR contest_id = $3)
                             AND (wall_clock_upper IS NULL
                                  OR (wall_clock_precision IN ('game', 'unknown')
                                      AND wall_clock_upper > $2
                                      AND wall_clock_upper - INTERVAL '86399 seconds' <= $2)))",
        )
        .bind(entity_id.as_str())
        .bind(bound)
        .bind(contest_id.map(ContestId::as_str))
        .fetch_one(self.pool)
        .await?;
        if ambiguous {
            return Err(DbError::PrecisionUnavailable {
                entity_id: entity_id.clone(),
            });
        }

        let row = sqlx::query_as::<_, SnapshotRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM box_score_snapshots
             WHERE entity_id = $1
               AND wall_clock_upper <= $2
               AND ($3::TEXT IS NULL OR contest_id = $3)
             ORDER BY wall_clock_upper DESC, contest_id DESC, sequence_number DESC
             LIMIT 1"
        ))
        .bind(entity_id.as_str())
        .bind(bound)
        .bind(contest_id.map(ContestId::as_str))
        .fetch_optional(self.pool)
        .await?;

        row.map(StateSnapshot::try_from).transpose()
    }

    /// Every row of a contest in `(sequence, entity)` order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Corrupt`] if a row cannot be decoded.
    pub async fn load_contest(&self, contest_id: &ContestId) -> Result<Vec<StateSnapshot>, DbError> {
        let rows = sqlx::query_as::<_, SnapshotRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM box_score_snapshots
             WHERE contest_id = $1
             ORDER BY sequence_number, entity_id"
        ))
        .bind(contest_id.as_str())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(StateSnapshot::try_from).collect()
    }

    /// The last durable sequence number of a contest.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn last_sequence(&self, contest_id: &ContestId) -> Result<Option<u64>, DbError> {
        let max: Option<i64> = sqlx::query_scalar(
            r"SELECT MAX(sequence_number) FROM box_score_snapshots WHERE contest_id = $1",
        )
        .bind(contest_id.as_str())
        .fetch_one(self.pool)
        .await?;

        max.map(|seq| {
            u64::try_from(seq).map_err(|err| DbError::Corrupt(format!("sequence {seq}: {err}")))
        })
        .transpose()
    }

    /// Delete every row of a contest, for replace-all re-ingestion.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_contest(&self, contest_id: &ContestId) -> Result<u64, DbError> {
        let result = sqlx::query(r"DELETE FROM box_score_snapshots WHERE contest_id = $1")
            .bind(contest_id.as_str())
            .execute(self.pool)
            .await?;

        tracing::debug!(
            contest_id = %contest_id,
            deleted = result.rows_affected(),
            "Deleted contest snapshots"
        );
        Ok(result.rows_affected())
    }

    fn wall_clock_upper(&self, snapshot: &StateSnapshot) -> Option<DateTime<Utc>> {
        let at = snapshot.wall_clock?;
        self.model
            .resolve_bounds(at, snapshot.wall_clock_precision)
            .ok()
            .map(|bounds| bounds.upper)
    }
}

// ---------------------------------------------------------------------------
// Durable store seam
// ---------------------------------------------------------------------------

/// The durable snapshot operations ingestion relies on.
///
/// Ingestion seeds the in-memory index from [`load_contest`] before folding
/// and writes back through [`upsert_batch`] afterwards.
///
/// [`load_contest`]: SnapshotStore::load_contest
/// [`upsert_batch`]: SnapshotStore::upsert_batch
pub trait SnapshotStore: Sync {
    /// Every stored row of a contest in `(sequence, entity)` order.
    fn load_contest(
        &self,
        contest_id: &ContestId,
    ) -> impl Future<Output = Result<Vec<StateSnapshot>, DbError>> + Send;

    /// The last stored sequence number of a contest.
    fn last_sequence(
        &self,
        contest_id: &ContestId,
    ) -> impl Future<Output = Result<Option<u64>, DbError>> + Send;

    /// Idempotent upsert; returns the rows inserted or changed.
    fn upsert_batch(
        &self,
        snapshots: &[StateSnapshot],
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Drop every row of a contest; returns the rows deleted.
    fn delete_contest(
        &self,
        contest_id: &ContestId,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;
}

impl SnapshotStore for PgSnapshotStore<'_> {
    fn load_contest(
        &self,
        contest_id: &ContestId,
    ) -> impl Future<Output = Result<Vec<StateSnapshot>, DbError>> + Send {
        Self::load_contest(self, contest_id)
    }

    fn last_sequence(
        &self,
        contest_id: &ContestId,
    ) -> impl Future<Output = Result<Option<u64>, DbError>> + Send {
        Self::last_sequence(self, contest_id)
    }

    fn upsert_batch(
        &self,
        snapshots: &[StateSnapshot],
    ) -> impl Future<Output = Result<u64, DbError>> + Send {
        Self::upsert_batch(self, snapshots)
    }

    fn delete_contest(
        &self,
        contest_id: &ContestId,
    ) -> impl Future<Output = Result<u64, DbError>> + Send {
        Self::delete_contest(self, contest_id)
    }
}

/// A row from the `box_score_snapshots` table.
///
/// Uses runtime types rather than compile-time checked types to avoid
/// requiring a live database during builds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    /// The contest.
    pub contest_id: String,
    /// The player or team.
    pub entity_id: String,
    /// The event after which the snapshot was taken.
    pub sequence_number: i64,
    /// `player` or `team`.
    pub entity_kind: String,
    /// Period of that event.
    pub period: i32,
    /// Game clock at that event.
    pub game_clock_seconds: i32,
    /// Stated wall clock.
    pub wall_clock: Option<DateTime<Utc>>,
    /// Precision level name.
    pub wall_clock_precision: String,
    /// Running totals as a JSON object.
    pub counters: serde_json::Value,
    /// On-court flag.
    pub on_court: bool,
    /// Checkpoint flag.
    pub period_end: bool,
}

impl TryFrom<SnapshotRow> for StateSnapshot {
    type Error = DbError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let key = format!("{}/{}/{}", row.contest_id, row.entity_id, row.sequence_number);
        let entity_kind: EntityKind =
            serde_json::from_value(serde_json::Value::String(row.entity_kind))
                .map_err(|err| corrupt(&key, "entity_kind", &err))?;
        let wall_clock_precision: PrecisionLevel =
            serde_json::from_value(serde_json::Value::String(row.wall_clock_precision))
                .map_err(|err| corrupt(&key, "wall_clock_precision", &err))?;
        let sequence_number = u64::try_from(row.sequence_number)
            .map_err(|err| corrupt(&key, "sequence_number", &err))?;
        let period = u32::try_from(row.period).map_err(|err| corrupt(&key, "period", &err))?;
        let game_clock_seconds = u32::try_from(row.game_clock_seconds)
            .map_err(|err| corrupt(&key, "game_clock_seconds", &err))?;
        let counters = serde_json::from_value(row.counters)?;

        Ok(Self {
            contest_id: ContestId::new(row.contest_id),
            entity_id: EntityId::new(row.entity_id),
            entity_kind,
            sequence_number,
            period,
            game_clock_seconds,
            wall_clock: row.wall_clock,
            wall_clock_precision,
            counters,
            on_court: row.on_court,
            period_end: row.period_end,
        })
    }
}

fn corrupt(key: &str, column: &str, err: &dyn std::fmt::Display) -> DbError {
    DbError::Corrupt(format!("{key}: {column}: {err}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boxscore_types::StatName;

    use super::*;

    fn row() -> SnapshotRow {
        SnapshotRow {
            contest_id: "G1".to_owned(),
            entity_id: "P1".to_owned(),
            sequence_number: 3,
            entity_kind: "player".to_owned(),
            period: 1,
            game_clock_seconds: 700,
            wall_clock: None,
            wall_clock_precision: "unknown".to_owned(),
            counters: serde_json::json!({"points": 5, "fouls": 1}),
            on_court: true,
            period_end: false,
        }
    }

    #[test]
    fn row_decodes_into_snapshot() {
        let snapshot = StateSnapshot::try_from(row()).unwrap();
        assert_eq!(snapshot.sequence_number, 3);
        assert_eq!(snapshot.entity_kind, EntityKind::Player);
        assert_eq!(snapshot.counters.get(StatName::Points), 5);
        assert_eq!(snapshot.counters.get(StatName::Fouls), 1);
    }

    #[test]
    fn negative_sequence_is_corrupt() {
        let mut bad = row();
        bad.sequence_number = -1;
        assert!(matches!(StateSnapshot::try_from(bad), Err(DbError::Corrupt(_))));
    }

    #[test]
    fn unknown_precision_name_is_corrupt() {
        let mut bad = row();
        bad.wall_clock_precision = "fortnight".to_owned();
        assert!(matches!(StateSnapshot::try_from(bad), Err(DbError::Corrupt(_))));
    }
}
