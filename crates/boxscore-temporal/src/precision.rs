//! Precision-aware timestamp bounds.
//!
//! A stated timestamp is only as exact as its [`PrecisionLevel`]. The
//! [`PrecisionModel`] widens each stated value into the closed interval of
//! instants it could denote, at one-second resolution (one millisecond for
//! `millisecond` and `second`). Every wall-clock comparison in the system
//! goes through [`stored_at_or_before`], which compares the *upper* bound of
//! the stored value against the *lower* bound of the query. A stored row
//! therefore only counts as "at or before" a query when it cannot possibly
//! be later, which rules out lookahead.
//!
//! `game` and `unknown` precisions carry no usable wall clock. They resolve
//! to the bounds of the contest day, in a configured UTC offset, and are
//! refused by wall-clock queries.

use chrono::{
    DateTime, Datelike, DurationRound, FixedOffset, NaiveDate, NaiveTime, Offset, TimeDelta,
    TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

use boxscore_types::PrecisionLevel;

/// Seconds in one day.
const SECONDS_PER_DAY: i64 = 86_400;

/// Seconds in one hour.
const SECONDS_PER_HOUR: i32 = 3_600;

/// Default contest-day offset: UTC-5.
const DEFAULT_OFFSET_WEST_SECONDS: i32 = 18_000;

/// Errors raised while resolving bounds.
#[derive(Debug, thiserror::Error)]
pub enum PrecisionError {
    /// The value is too close to the edge of the representable range for
    /// its window to be computed.
    #[error("cannot resolve {precision:?} bounds for {value}")]
    OutOfRange {
        /// The stated value.
        value: DateTime<Utc>,
        /// Its precision.
        precision: PrecisionLevel,
    },

    /// The contest-day offset is not a valid UTC offset.
    #[error("invalid contest-day UTC offset: {hours} hours")]
    InvalidOffset {
        /// The configured offset.
        hours: i32,
    },
}

/// Precision settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PrecisionConfig {
    /// UTC offset, in hours, of the local day used for `game` and `unknown`
    /// precision.
    pub contest_day_utc_offset_hours: i32,
}

impl Default for PrecisionConfig {
    fn default() -> Self {
        Self {
            contest_day_utc_offset_hours: -5,
        }
    }
}

/// The closed interval of instants a stated timestamp may denote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBounds {
    /// Earliest possible instant.
    pub lower: DateTime<Utc>,
    /// Latest possible instant.
    pub upper: DateTime<Utc>,
}

impl TimeBounds {
    /// Bounds of an exact instant.
    pub const fn exact(at: DateTime<Utc>) -> Self {
        Self {
            lower: at,
            upper: at,
        }
    }

    /// `upper - lower`.
    pub fn width(&self) -> TimeDelta {
        self.upper.signed_duration_since(self.lower)
    }

    /// Whether `at` falls inside the interval.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.lower <= at && at <= self.upper
    }
}

/// Whether a stored value is certainly at or before the query.
///
/// The single comparison predicate for wall-clock lookups: the stored
/// upper bound must not exceed the query's lower bound.
pub fn stored_at_or_before(stored: &TimeBounds, query: &TimeBounds) -> bool {
    stored.upper <= query.lower
}

/// Resolves stated timestamps into [`TimeBounds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecisionModel {
    contest_day_offset: FixedOffset,
}

impl Default for PrecisionModel {
    fn default() -> Self {
        Self {
            contest_day_offset: FixedOffset::west_opt(DEFAULT_OFFSET_WEST_SECONDS)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

impl PrecisionModel {
    /// Build a model from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PrecisionError::InvalidOffset`] if the offset is not
    /// strictly between -24 and +24 hours.
    pub fn new(config: &PrecisionConfig) -> Result<Self, PrecisionError> {
        let hours = config.contest_day_utc_offset_hours;
        let offset = hours
            .checked_mul(SECONDS_PER_HOUR)
            .and_then(FixedOffset::east_opt)
            .ok_or(PrecisionError::InvalidOffset { hours })?;
        Ok(Self {
            contest_day_offset: offset,
        })
    }

    /// The offset used for contest-day bounds.
    pub const fn contest_day_offset(&self) -> FixedOffset {
        self.contest_day_offset
    }

    /// Resolve the interval of instants `value` may denote.
    ///
    /// # Errors
    ///
    /// Returns [`PrecisionError::OutOfRange`] if the window falls outside
    /// the representable range.
    pub fn resolve_bounds(
        &self,
        value: DateTime<Utc>,
        precision: PrecisionLevel,
    ) -> Result<TimeBounds, PrecisionError> {
        let out_of_range = || PrecisionError::OutOfRange { value, precision };
        let truncated = |unit: TimeDelta| value.duration_trunc(unit).map_err(|_| out_of_range());

        let (lower, span) = match precision {
            PrecisionLevel::Millisecond => (truncated(TimeDelta::milliseconds(1))?, TimeDelta::zero()),
            PrecisionLevel::Second => (
                truncated(TimeDelta::seconds(1))?,
                TimeDelta::milliseconds(999),
            ),
            PrecisionLevel::Minute => (truncated(TimeDelta::minutes(1))?, TimeDelta::seconds(59)),
            PrecisionLevel::Hour => (
                truncated(TimeDelta::hours(1))?,
                TimeDelta::seconds(i64::from(SECONDS_PER_HOUR).saturating_sub(1)),
            ),
            PrecisionLevel::Day => (
                midnight(value.date_naive()),
                TimeDelta::seconds(SECONDS_PER_DAY.saturating_sub(1)),
            ),
            PrecisionLevel::Month => {
                let first = NaiveDate::from_ymd_opt(value.year(), value.month(), 1)
                    .ok_or_else(out_of_range)?;
                let next = first
                    .checked_add_months(chrono::Months::new(1))
                    .ok_or_else(out_of_range)?;
                return last_second_before(midnight(first), midnight(next)).ok_or_else(out_of_range);
            }
            PrecisionLevel::Year => {
                let first = NaiveDate::from_ymd_opt(value.year(), 1, 1).ok_or_else(out_of_range)?;
                let next = first
                    .checked_add_months(chrono::Months::new(12))
                    .ok_or_else(out_of_range)?;
                return last_second_before(midnight(first), midnight(next)).ok_or_else(out_of_range);
            }
            PrecisionLevel::Game | PrecisionLevel::Unknown => {
                let local_day = value.with_timezone(&self.contest_day_offset).date_naive();
                let start = self
                    .contest_day_offset
                    .from_local_datetime(&local_day.and_time(NaiveTime::MIN))
                    .single()
                    .ok_or_else(out_of_range)?
                    .with_timezone(&Utc);
                (start, TimeDelta::seconds(SECONDS_PER_DAY.saturating_sub(1)))
            }
        };

        let upper = lower.checked_add_signed(span).ok_or_else(out_of_range)?;
        Ok(TimeBounds { lower, upper })
    }

    /// Nominal width of the precision window containing `value`.
    ///
    /// Unlike [`TimeBounds::width`], which stops at the last representable
    /// second, this is the full window: one minute for `minute`, 24 hours
    /// for `day`, the calendar month's length for `month`.
    ///
    /// # Errors
    ///
    /// Returns [`PrecisionError::OutOfRange`] if the window cannot be
    /// computed.
    pub fn uncertainty_window(
        &self,
        value: DateTime<Utc>,
        precision: PrecisionLevel,
    ) -> Result<TimeDelta, PrecisionError> {
        let window = match precision {
            PrecisionLevel::Millisecond => TimeDelta::milliseconds(1),
            PrecisionLevel::Second => TimeDelta::seconds(1),
            PrecisionLevel::Minute => TimeDelta::minutes(1),
            PrecisionLevel::Hour => TimeDelta::hours(1),
            PrecisionLevel::Day | PrecisionLevel::Game | PrecisionLevel::Unknown => {
                TimeDelta::days(1)
            }
            PrecisionLevel::Month | PrecisionLevel::Year => {
                let bounds = self.resolve_bounds(value, precision)?;
                bounds
                    .width()
                    .checked_add(&TimeDelta::seconds(1))
                    .ok_or(PrecisionError::OutOfRange { value, precision })?
            }
        };
        Ok(window)
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// `[start, end - 1s]`.
fn last_second_before(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<TimeBounds> {
    let upper = end.checked_sub_signed(TimeDelta::seconds(1))?;
    Some(TimeBounds {
        lower: start,
        upper,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn bounds(s: &str, precision: PrecisionLevel) -> TimeBounds {
        PrecisionModel::default().resolve_bounds(at(s), precision).unwrap()
    }

    #[test]
    fn minute_spans_fifty_nine_seconds() {
        let b = bounds("2024-10-22T20:18:00Z", PrecisionLevel::Minute);
        assert_eq!(b.lower, at("2024-10-22T20:18:00Z"));
        assert_eq!(b.upper, at("2024-10-22T20:18:59Z"));
    }

    #[test]
    fn coarse_values_are_truncated_first() {
        let b = bounds("2024-10-22T20:18:42.250Z", PrecisionLevel::Hour);
        assert_eq!(b.lower, at("2024-10-22T20:00:00Z"));
        assert_eq!(b.upper, at("2024-10-22T20:59:59Z"));

        let s = bounds("2024-10-22T20:18:42.250Z", PrecisionLevel::Second);
        assert_eq!(s.lower, at("2024-10-22T20:18:42Z"));
        assert_eq!(s.upper, at("2024-10-22T20:18:42.999Z"));
    }

    #[test]
    fn day_covers_the_calendar_day() {
        let b = bounds("1998-03-03T00:00:00Z", PrecisionLevel::Day);
        assert_eq!(b.upper, at("1998-03-03T23:59:59Z"));
        assert_eq!(b.width(), TimeDelta::seconds(86_399));
    }

    #[test]
    fn month_handles_leap_february() {
        let b = bounds("2024-02-10T12:00:00Z", PrecisionLevel::Month);
        assert_eq!(b.lower, at("2024-02-01T00:00:00Z"));
        assert_eq!(b.upper, at("2024-02-29T23:59:59Z"));
        let window = PrecisionModel::default()
            .uncertainty_window(at("2024-02-10T12:00:00Z"), PrecisionLevel::Month)
            .unwrap();
        assert_eq!(window, TimeDelta::days(29));
    }

    #[test]
    fn year_runs_to_new_years_eve() {
        let b = bounds("1998-07-01T00:00:00Z", PrecisionLevel::Year);
        assert_eq!(b.lower, at("1998-01-01T00:00:00Z"));
        assert_eq!(b.upper, at("1998-12-31T23:59:59Z"));
    }

    #[test]
    fn unknown_resolves_to_contest_day_in_local_offset() {
        // 02:00 UTC on the 23rd is still the 22nd at UTC-5.
        let b = bounds("2024-10-23T02:00:00Z", PrecisionLevel::Unknown);
        assert_eq!(b.lower, at("2024-10-22T05:00:00Z"));
        assert_eq!(b.upper, at("2024-10-23T04:59:59Z"));
    }

    #[test]
    fn coarser_precision_never_narrows_bounds() {
        let value = at("2024-10-22T20:18:42.250Z");
        let model = PrecisionModel::default();
        let levels = [
            PrecisionLevel::Millisecond,
            PrecisionLevel::Second,
            PrecisionLevel::Minute,
            PrecisionLevel::Hour,
            PrecisionLevel::Day,
            PrecisionLevel::Month,
            PrecisionLevel::Year,
        ];
        let widths: Vec<TimeDelta> = levels
            .iter()
            .map(|p| model.resolve_bounds(value, *p).unwrap().width())
            .collect();
        assert!(widths.windows(2).all(|w| w.first() <= w.last()));
    }

    #[test]
    fn comparison_uses_stored_upper_and_query_lower() {
        let model = PrecisionModel::default();
        let stored = model
            .resolve_bounds(at("2024-10-22T20:18:00Z"), PrecisionLevel::Minute)
            .unwrap();
        let query = |s: &str| model.resolve_bounds(at(s), PrecisionLevel::Second).unwrap();
        // Stored minute may extend to 20:18:59, so a query at 20:18:30 must
        // not see it.
        assert!(!stored_at_or_before(&stored, &query("2024-10-22T20:18:30Z")));
        assert!(stored_at_or_before(&stored, &query("2024-10-22T20:19:00Z")));
    }

    #[test]
    fn invalid_offset_is_rejected() {
        let config = PrecisionConfig {
            contest_day_utc_offset_hours: 30,
        };
        assert!(matches!(
            PrecisionModel::new(&config),
            Err(PrecisionError::InvalidOffset { hours: 30 })
        ));
    }

    #[test]
    fn configured_offset_matches_default_model() {
        let model = PrecisionModel::new(&PrecisionConfig::default()).unwrap();
        assert_eq!(model, PrecisionModel::default());
    }
}
