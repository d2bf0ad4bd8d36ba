//! Block-range wall-clock timeline for one entity.
//!
//! Entries are appended to fixed-capacity blocks in arrival order, the way
//! rows land in physical pages. Each block keeps a zone map of the smallest
//! and largest stored upper bound it holds; a lookup prunes whole blocks on
//! that summary and only searches inside the survivors. Inside a block,
//! entries are kept sorted so the search is a binary search.

use chrono::{DateTime, Utc};

use boxscore_types::{ContestId, SnapshotKey};

/// One wall-clock-capable snapshot, reduced to what the timeline needs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimelineEntry {
    /// Upper bound of the snapshot's wall-clock reading.
    pub upper: DateTime<Utc>,
    /// The contest.
    pub contest_id: ContestId,
    /// The snapshot's sequence number.
    pub sequence_number: u64,
}

impl TimelineEntry {
    /// Whether the entry belongs to the row with `key`.
    fn is_row(&self, key: &SnapshotKey) -> bool {
        self.contest_id == key.contest_id && self.sequence_number == key.sequence_number
    }
}

/// Zone map of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneMap {
    /// Smallest upper bound in the block.
    pub min_upper: DateTime<Utc>,
    /// Largest upper bound in the block.
    pub max_upper: DateTime<Utc>,
}

impl ZoneMap {
    /// Whether no entry in the block can be at or before `bound`.
    pub fn can_prune(&self, bound: DateTime<Utc>) -> bool {
        self.min_upper > bound
    }
}

#[derive(Debug, Clone, Default)]
struct Block {
    /// Sorted by `(upper, contest, sequence)`.
    entries: Vec<TimelineEntry>,
    zone: Option<ZoneMap>,
}

impl Block {
    fn insert(&mut self, entry: TimelineEntry) {
        let upper = entry.upper;
        let pos = self.entries.partition_point(|e| *e < entry);
        self.entries.insert(pos, entry);
        self.zone = Some(self.zone.map_or(
            ZoneMap {
                min_upper: upper,
                max_upper: upper,
            },
            |z| ZoneMap {
                min_upper: z.min_upper.min(upper),
                max_upper: z.max_upper.max(upper),
            },
        ));
    }

    fn refresh_zone(&mut self) {
        self.zone = match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => Some(ZoneMap {
                min_upper: first.upper,
                max_upper: last.upper,
            }),
            _ => None,
        };
    }

    /// The latest entry with `upper <= bound`, optionally in one contest.
    fn latest_at_or_before(
        &self,
        bound: DateTime<Utc>,
        contest: Option<&ContestId>,
    ) -> Option<&TimelineEntry> {
        let end = self.entries.partition_point(|e| e.upper <= bound);
        self.entries
            .get(..end)?
            .iter()
            .rev()
            .find(|e| contest.is_none_or(|c| e.contest_id == *c))
    }
}

/// Statistics from one timeline lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Blocks whose zone map was consulted.
    pub blocks_total: usize,
    /// Blocks skipped without searching.
    pub blocks_pruned: usize,
}

/// Block-range index of an entity's timed snapshots.
#[derive(Debug, Clone)]
pub struct EntityTimeline {
    block_size: usize,
    blocks: Vec<Block>,
}

impl EntityTimeline {
    /// Create an empty timeline whose blocks hold `block_size` entries.
    ///
    /// A zero block size is treated as one.
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
            blocks: Vec::new(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.blocks.iter().map(|b| b.entries.len()).sum()
    }

    /// Whether the timeline holds no entries.
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.entries.is_empty())
    }

    /// Number of physical blocks.
    pub const fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Append an entry to the open block, starting a new one when full.
    pub fn push(&mut self, entry: TimelineEntry) {
        let needs_block = self
            .blocks
            .last()
            .is_none_or(|b| b.entries.len() >= self.block_size);
        if needs_block {
            self.blocks.push(Block::default());
        }
        if let Some(block) = self.blocks.last_mut() {
            block.insert(entry);
        }
    }

    /// Remove the entry for one row, if present.
    pub fn remove(&mut self, key: &SnapshotKey) -> bool {
        let mut removed = false;
        for block in &mut self.blocks {
            let before = block.entries.len();
            block.entries.retain(|e| !e.is_row(key));
            if block.entries.len() != before {
                block.refresh_zone();
                removed = true;
                break;
            }
        }
        self.blocks.retain(|b| !b.entries.is_empty());
        removed
    }

    /// Remove every entry of a contest.
    pub fn remove_contest(&mut self, contest_id: &ContestId) {
        for block in &mut self.blocks {
            block.entries.retain(|e| e.contest_id != *contest_id);
            block.refresh_zone();
        }
        self.blocks.retain(|b| !b.entries.is_empty());
    }

    /// The latest entry whose upper bound is at or before `bound`.
    ///
    /// Ties on the upper bound resolve to the highest sequence number.
    pub fn latest_at_or_before(
        &self,
        bound: DateTime<Utc>,
        contest: Option<&ContestId>,
    ) -> (Option<&TimelineEntry>, ScanStats) {
        let mut stats = ScanStats::default();
        let mut best: Option<&TimelineEntry> = None;
        for block in &self.blocks {
            stats.blocks_total = stats.blocks_total.saturating_add(1);
            let Some(zone) = block.zone else {
                continue;
            };
            let dominated = best.is_some_and(|b| zone.max_upper < b.upper);
            if zone.can_prune(bound) || dominated {
                stats.blocks_pruned = stats.blocks_pruned.saturating_add(1);
                continue;
            }
            if let Some(candidate) = block.latest_at_or_before(bound, contest) {
                if best.is_none_or(|b| candidate > b) {
                    best = Some(candidate);
                }
            }
        }
        (best, stats)
    }
}
