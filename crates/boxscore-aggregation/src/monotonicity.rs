//! Monotonicity audit over emitted snapshots.
//!
//! Count stats never decrease within a contest: for consecutive snapshots
//! of the same entity, every non-signed stat in the later one is at least
//! its value in the earlier one. Only `plus_minus` may move both ways.
//!
//! Ingestion already rejects negative count deltas, so a violation here
//! means stored rows were corrupted or came from another writer.

use std::collections::BTreeMap;

use boxscore_types::{ContestId, EntityId, StatName, StateSnapshot};

/// One decreasing count stat between two snapshots of the same entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonotonicityViolation {
    /// The contest.
    pub contest_id: ContestId,
    /// The entity.
    pub entity_id: EntityId,
    /// The stat that went down.
    pub stat: StatName,
    /// Earlier snapshot's sequence number.
    pub earlier_sequence: u64,
    /// Earlier value.
    pub earlier_value: i64,
    /// Later snapshot's sequence number.
    pub later_sequence: u64,
    /// Later value.
    pub later_value: i64,
}

/// The result of a monotonicity audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonotonicityResult {
    /// Every count stat is non-decreasing.
    Monotonic,
    /// At least one count stat decreased.
    Violated(Vec<MonotonicityViolation>),
}

/// Audit a set of snapshots.
///
/// Snapshots may span several contests and arrive in any order; they are
/// grouped by `(contest, entity)` and compared in sequence order.
pub fn verify_monotonic<'a>(
    snapshots: impl IntoIterator<Item = &'a StateSnapshot>,
) -> MonotonicityResult {
    let mut series: BTreeMap<(&ContestId, &EntityId), Vec<&StateSnapshot>> = BTreeMap::new();
    for snapshot in snapshots {
        series
            .entry((&snapshot.contest_id, &snapshot.entity_id))
            .or_default()
            .push(snapshot);
    }

    let mut violations = Vec::new();
    for rows in series.values_mut() {
        rows.sort_by_key(|s| s.sequence_number);
        for pair in rows.windows(2) {
            let [earlier, later] = pair else {
                continue;
            };
            for stat in StatName::ALL.iter().filter(|stat| !stat.is_signed()) {
                let before = earlier.counters.get(*stat);
                let after = later.counters.get(*stat);
                if after < before {
                    violations.push(MonotonicityViolation {
                        contest_id: later.contest_id.clone(),
                        entity_id: later.entity_id.clone(),
                        stat: *stat,
                        earlier_sequence: earlier.sequence_number,
                        earlier_value: before,
                        later_sequence: later.sequence_number,
                        later_value: after,
                    });
                }
            }
        }
    }

    if violations.is_empty() {
        MonotonicityResult::Monotonic
    } else {
        MonotonicityResult::Violated(violations)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreachable)]
mod tests {
    use boxscore_types::{CounterSet, EntityKind, PrecisionLevel};

    use super::*;

    fn snap(seq: u64, counters: &[(StatName, i64)]) -> StateSnapshot {
        StateSnapshot {
            contest_id: ContestId::new("G1"),
            entity_id: EntityId::new("P1"),
            entity_kind: EntityKind::Player,
            sequence_number: seq,
            period: 1,
            game_clock_seconds: 600,
            wall_clock: None,
            wall_clock_precision: PrecisionLevel::Unknown,
            counters: counters.iter().copied().collect::<CounterSet>(),
            on_court: true,
            period_end: false,
        }
    }

    #[test]
    fn increasing_counts_pass() {
        let rows = [
            snap(1, &[(StatName::Points, 2)]),
            snap(4, &[(StatName::Points, 5), (StatName::Ast, 1)]),
        ];
        assert_eq!(verify_monotonic(&rows), MonotonicityResult::Monotonic);
    }

    #[test]
    fn plus_minus_may_decrease() {
        let rows = [
            snap(1, &[(StatName::PlusMinus, 4)]),
            snap(2, &[(StatName::PlusMinus, -1)]),
        ];
        assert_eq!(verify_monotonic(&rows), MonotonicityResult::Monotonic);
    }

    #[test]
    fn decreasing_count_is_reported_regardless_of_input_order() {
        let rows = [
            snap(9, &[(StatName::Points, 3)]),
            snap(2, &[(StatName::Points, 7)]),
        ];
        let MonotonicityResult::Violated(violations) = verify_monotonic(&rows) else {
            unreachable!("expected a violation");
        };
        assert_eq!(violations.len(), 1);
        let v = violations.first().unwrap();
        assert_eq!(v.stat, StatName::Points);
        assert_eq!((v.earlier_sequence, v.later_sequence), (2, 9));
    }
}
