//! Enumeration types for box-score reconstruction.
//!
//! Event types, entity kinds, timestamp precision levels, the closed stat
//! schema and biographical fact types.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// The kind of play-by-play event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventType {
    /// A field goal was made.
    MadeShot,
    /// A field goal was missed.
    MissedShot,
    /// A free throw attempt (made or missed, per the deltas).
    FreeThrow,
    /// An offensive or defensive rebound.
    Rebound,
    /// A turnover.
    Turnover,
    /// A personal or technical foul.
    Foul,
    /// One player enters, one or more leave.
    Substitution,
    /// Start of a period.
    PeriodStart,
    /// End of a period. Forces a checkpoint snapshot.
    PeriodEnd,
    /// Administrative entry (timeouts, reviews, ejections, corrections).
    Admin,
}

impl EventType {
    /// Return the wire name of this event type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MadeShot => "made_shot",
            Self::MissedShot => "missed_shot",
            Self::FreeThrow => "free_throw",
            Self::Rebound => "rebound",
            Self::Turnover => "turnover",
            Self::Foul => "foul",
            Self::Substitution => "substitution",
            Self::PeriodStart => "period_start",
            Self::PeriodEnd => "period_end",
            Self::Admin => "admin",
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Whether a snapshot describes a player or a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EntityKind {
    /// An individual player.
    Player,
    /// A team.
    Team,
}

impl EntityKind {
    /// Return the wire name of this entity kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Team => "team",
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamp precision
// ---------------------------------------------------------------------------

/// How exact a timestamp is.
///
/// Ordered from finest to coarsest, so `a < b` means `a` is more precise.
/// `Game` (only the period is known) and `Unknown` cannot support
/// wall-clock comparisons; their bounds widen to the contest day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum PrecisionLevel {
    /// Exact to the millisecond.
    Millisecond,
    /// Exact to the second.
    Second,
    /// Exact to the minute.
    Minute,
    /// Exact to the hour.
    Hour,
    /// Calendar day only.
    Day,
    /// Calendar month only.
    Month,
    /// Calendar year only.
    Year,
    /// Only the period of the contest is known.
    Game,
    /// No usable precision.
    Unknown,
}

impl PrecisionLevel {
    /// Whether timestamps at this precision can answer wall-clock queries.
    pub const fn supports_wall_clock(self) -> bool {
        !matches!(self, Self::Game | Self::Unknown)
    }

    /// Return the wire name of this precision level.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Millisecond => "millisecond",
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
            Self::Game => "game",
            Self::Unknown => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Stat schema
// ---------------------------------------------------------------------------

/// A box-score statistic tracked as a running counter.
///
/// The schema is closed: any other stat name is rejected when an event
/// record crosses the ingestion boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StatName {
    /// Points scored.
    Points,
    /// Field goals made.
    Fgm,
    /// Field goals attempted.
    Fga,
    /// Three-point field goals made.
    Fg3m,
    /// Three-point field goals attempted.
    Fg3a,
    /// Free throws made.
    Ftm,
    /// Free throws attempted.
    Fta,
    /// Offensive rebounds.
    Oreb,
    /// Defensive rebounds.
    Dreb,
    /// Assists.
    Ast,
    /// Steals.
    Stl,
    /// Blocked shots.
    Blk,
    /// Turnovers.
    Tov,
    /// Personal fouls.
    Fouls,
    /// Point differential while on court. The only signed stat.
    PlusMinus,
    /// Points scored by the opponent (team entities).
    OppPoints,
}

impl StatName {
    /// Every stat in the schema, in declaration order.
    pub const ALL: [Self; 16] = [
        Self::Points,
        Self::Fgm,
        Self::Fga,
        Self::Fg3m,
        Self::Fg3a,
        Self::Ftm,
        Self::Fta,
        Self::Oreb,
        Self::Dreb,
        Self::Ast,
        Self::Stl,
        Self::Blk,
        Self::Tov,
        Self::Fouls,
        Self::PlusMinus,
        Self::OppPoints,
    ];

    /// Whether the running total may decrease.
    ///
    /// Every stat except plus/minus is a count and must never go down
    /// within a contest.
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::PlusMinus)
    }

    /// Return the wire name of this stat.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Fgm => "fgm",
            Self::Fga => "fga",
            Self::Fg3m => "fg3m",
            Self::Fg3a => "fg3a",
            Self::Ftm => "ftm",
            Self::Fta => "fta",
            Self::Oreb => "oreb",
            Self::Dreb => "dreb",
            Self::Ast => "ast",
            Self::Stl => "stl",
            Self::Blk => "blk",
            Self::Tov => "tov",
            Self::Fouls => "fouls",
            Self::PlusMinus => "plus_minus",
            Self::OppPoints => "opp_points",
        }
    }

    /// Parse a wire name into a stat, if it belongs to the schema.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stat| stat.as_str() == name)
    }
}

impl core::fmt::Display for StatName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Biographical facts
// ---------------------------------------------------------------------------

/// The kind of dated biographical fact held by the roster collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum FactType {
    /// Date of birth.
    BirthDate,
    /// First professional appearance.
    DebutDate,
    /// Retirement from play.
    RetirementDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_orders_finest_first() {
        assert!(PrecisionLevel::Millisecond < PrecisionLevel::Minute);
        assert!(PrecisionLevel::Day < PrecisionLevel::Month);
        assert!(PrecisionLevel::Year < PrecisionLevel::Game);
        assert!(PrecisionLevel::Game < PrecisionLevel::Unknown);
    }

    #[test]
    fn only_game_and_unknown_lack_wall_clock() {
        assert!(PrecisionLevel::Minute.supports_wall_clock());
        assert!(!PrecisionLevel::Game.supports_wall_clock());
        assert!(!PrecisionLevel::Unknown.supports_wall_clock());
    }

    #[test]
    fn plus_minus_is_the_only_signed_stat() {
        let signed: Vec<StatName> = StatName::ALL
            .into_iter()
            .filter(|s| s.is_signed())
            .collect();
        assert_eq!(signed, vec![StatName::PlusMinus]);
    }

    #[test]
    fn stat_wire_names_match_serde() {
        for stat in StatName::ALL {
            let json = serde_json::to_string(&stat).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", stat.as_str()));
            assert_eq!(StatName::parse(stat.as_str()), Some(stat));
        }
    }

    #[test]
    fn unknown_stat_name_does_not_parse() {
        assert_eq!(StatName::parse("made"), None);
    }

    #[test]
    fn event_type_wire_names_match_serde() {
        let json = serde_json::to_string(&EventType::PeriodEnd).unwrap_or_default();
        assert_eq!(json, format!("\"{}\"", EventType::PeriodEnd.as_str()));
    }
}
