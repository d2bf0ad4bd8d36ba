//! The external input record and its validation at the ingestion boundary.
//!
//! [`EventRecord`] mirrors the JSON produced by the normalization
//! collaborator. [`EventRecord::into_event`] checks the stat schema once
//! and produces a typed [`Event`]; nothing downstream handles stat names as
//! strings.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::IngestError;
use crate::enums::{EventType, PrecisionLevel, StatName};
use crate::ids::{ContestId, EntityId, EventId};
use crate::structs::{Event, WallClock};

/// Feed name recorded when the input does not name one.
const DEFAULT_WALL_CLOCK_SOURCE: &str = "feed";

/// One event exactly as delivered by the normalization collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// The contest this event belongs to.
    pub contest_id: String,
    /// Position in the contest's log.
    pub sequence_number: u64,
    /// Period number.
    pub period: u32,
    /// Seconds remaining on the game clock.
    pub game_clock_seconds: u32,
    /// ISO 8601 wall-clock timestamp, if known.
    #[serde(default)]
    pub wall_clock: Option<DateTime<Utc>>,
    /// Precision of `wall_clock`.
    pub wall_clock_precision: PrecisionLevel,
    /// Feed that reported `wall_clock`.
    #[serde(default)]
    pub wall_clock_source: Option<String>,
    /// Event type wire name.
    pub event_type: EventType,
    /// The player responsible, if any.
    #[serde(default)]
    pub acting_entity_id: Option<String>,
    /// The team the event is attributed to, if any.
    #[serde(default)]
    pub team_id: Option<String>,
    /// Counter changes keyed by stat wire name.
    #[serde(default)]
    pub stat_deltas: BTreeMap<String, serde_json::Number>,
    /// Every other entity involved.
    #[serde(default)]
    pub participants: Vec<String>,
}

impl EventRecord {
    /// Validate the record against the stat schema and convert it.
    ///
    /// # Errors
    ///
    /// - [`IngestError::UnknownStat`] for a stat name outside the schema.
    /// - [`IngestError::NonIntegralDelta`] for a fractional or out-of-range delta.
    /// - [`IngestError::NegativeCountDelta`] for a negative delta on a count stat.
    /// - [`IngestError::InvalidPeriod`] for period zero.
    /// - [`IngestError::MissingWallClock`] when a wall-clock-capable precision
    ///   is claimed without a timestamp.
    pub fn into_event(self) -> Result<Event, IngestError> {
        if self.period == 0 {
            return Err(IngestError::InvalidPeriod {
                sequence_number: self.sequence_number,
            });
        }

        if self.wall_clock.is_none() && self.wall_clock_precision.supports_wall_clock() {
            return Err(IngestError::MissingWallClock {
                sequence_number: self.sequence_number,
                precision: self.wall_clock_precision,
            });
        }

        let mut stat_deltas = BTreeMap::new();
        for (name, number) in &self.stat_deltas {
            let stat = StatName::parse(name).ok_or_else(|| IngestError::UnknownStat {
                sequence_number: self.sequence_number,
                name: name.clone(),
            })?;
            let delta = number.as_i64().ok_or_else(|| IngestError::NonIntegralDelta {
                sequence_number: self.sequence_number,
                stat,
                value: number.to_string(),
            })?;
            if delta < 0 && !stat.is_signed() {
                return Err(IngestError::NegativeCountDelta {
                    sequence_number: self.sequence_number,
                    stat,
                    delta,
                });
            }
            stat_deltas.insert(stat, delta);
        }

        let contest_id = ContestId::new(self.contest_id);
        // A missing timestamp carries no precision regardless of the claim.
        let precision = if self.wall_clock.is_some() {
            self.wall_clock_precision
        } else {
            PrecisionLevel::Unknown
        };

        Ok(Event {
            event_id: EventId::for_event(&contest_id, self.sequence_number),
            contest_id,
            sequence_number: self.sequence_number,
            period: self.period,
            game_clock_seconds: self.game_clock_seconds,
            wall_clock: WallClock {
                timestamp: self.wall_clock,
                precision,
                source: self
                    .wall_clock_source
                    .unwrap_or_else(|| DEFAULT_WALL_CLOCK_SOURCE.to_owned()),
            },
            event_type: self.event_type,
            acting_entity_id: self.acting_entity_id.map(EntityId::new),
            team_id: self.team_id.map(EntityId::new),
            stat_deltas,
            participants: self
                .participants
                .into_iter()
                .map(EntityId::new)
                .collect::<BTreeSet<_>>(),
        })
    }
}

/// Parse a JSON-lines event log into validated events.
///
/// Blank lines are ignored.
///
/// # Errors
///
/// Returns [`IngestError::Json`] for a malformed line, or any validation
/// error from [`EventRecord::into_event`].
pub fn parse_event_log(jsonl: &str) -> Result<Vec<Event>, IngestError> {
    jsonl
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let record: EventRecord =
                serde_json::from_str(line).map_err(|source| IngestError::Json {
                    line: index.saturating_add(1),
                    source,
                })?;
            record.into_event()
        })
        .collect()
}
