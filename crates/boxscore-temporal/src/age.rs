//! Age and experience derived from dated biographical facts.
//!
//! Nothing here is stored. Both features are recomputed from the fact and
//! the query timestamp on every call, so a corrected birth date is picked
//! up immediately and identical inputs always give identical outputs.
//!
//! The point estimate is measured from the stated value. The precision
//! window of the fact turns it into a range: the youngest possible age is
//! measured from the window's upper bound, the oldest from its lower bound.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use boxscore_types::{BiographicalFact, DerivedAgeResult, EntityId, ExperienceResult, FactType};

use crate::facts::FactSource;
use crate::precision::{PrecisionError, PrecisionModel};

/// Seconds in a 365.25-day year.
const SECONDS_PER_YEAR: i64 = 31_557_600;

/// Seconds in one day.
const SECONDS_PER_DAY: i64 = 86_400;

/// Days before a player stops being a rookie.
const ROOKIE_DAYS: i64 = 365;

/// Errors raised while deriving a temporal feature.
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    /// No version of the fact is on record.
    #[error("no {fact_type:?} on record for {entity_id}")]
    MissingFact {
        /// The entity.
        entity_id: EntityId,
        /// The missing fact.
        fact_type: FactType,
    },

    /// The query timestamp precedes the fact.
    #[error("{entity_id}: {as_of} is before {fact_type:?} {anchor}")]
    BeforeAnchor {
        /// The entity.
        entity_id: EntityId,
        /// The fact measured from.
        fact_type: FactType,
        /// The fact's stated value.
        anchor: DateTime<Utc>,
        /// The query timestamp.
        as_of: DateTime<Utc>,
    },

    /// The fact's precision window could not be resolved.
    #[error(transparent)]
    Precision(#[from] PrecisionError),
}

/// Derives age and experience on demand.
#[derive(Debug, Clone)]
pub struct TemporalFeatureDeriver<F> {
    model: PrecisionModel,
    facts: F,
}

impl<F: FactSource> TemporalFeatureDeriver<F> {
    /// Create a deriver over a fact source.
    pub const fn new(model: PrecisionModel, facts: F) -> Self {
        Self { model, facts }
    }

    /// The underlying fact source.
    pub const fn facts(&self) -> &F {
        &self.facts
    }

    /// Age of `entity_id` at `as_of`, measured from the birth date.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::MissingFact`] if no birth date is on record,
    /// or [`FeatureError::BeforeAnchor`] if `as_of` precedes it.
    pub fn age_at(
        &self,
        entity_id: &EntityId,
        as_of: DateTime<Utc>,
    ) -> Result<DerivedAgeResult, FeatureError> {
        let birth = self.require(entity_id, FactType::BirthDate, as_of)?;
        let result = self.measure(birth, as_of)?;
        debug!(
            entity_id = %entity_id,
            as_of = %as_of,
            age_years = result.age_years_decimal,
            precision = birth.precision.as_str(),
            "Derived age"
        );
        Ok(result)
    }

    /// Career length of `entity_id` at `as_of`, measured from the debut.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::MissingFact`] if no debut date is on record,
    /// or [`FeatureError::BeforeAnchor`] if `as_of` precedes it.
    pub fn experience_at(
        &self,
        entity_id: &EntityId,
        as_of: DateTime<Utc>,
    ) -> Result<ExperienceResult, FeatureError> {
        let debut = self.require(entity_id, FactType::DebutDate, as_of)?;
        let span = self.measure(debut, as_of)?;
        let retired = self
            .facts
            .fact_at(entity_id, FactType::RetirementDate, as_of)
            .is_some_and(|fact| fact.value <= as_of);
        Ok(ExperienceResult {
            is_rookie: span.age_days < ROOKIE_DAYS,
            retired,
            span,
        })
    }

    fn require(
        &self,
        entity_id: &EntityId,
        fact_type: FactType,
        as_of: DateTime<Utc>,
    ) -> Result<&BiographicalFact, FeatureError> {
        self.facts
            .fact_at(entity_id, fact_type, as_of)
            .ok_or_else(|| FeatureError::MissingFact {
                entity_id: entity_id.clone(),
                fact_type,
            })
    }

    fn measure(
        &self,
        fact: &BiographicalFact,
        as_of: DateTime<Utc>,
    ) -> Result<DerivedAgeResult, FeatureError> {
        if as_of < fact.value {
            return Err(FeatureError::BeforeAnchor {
                entity_id: fact.entity_id.clone(),
                fact_type: fact.fact_type,
                anchor: fact.value,
                as_of,
            });
        }

        let bounds = self.model.resolve_bounds(fact.value, fact.precision)?;
        let window = self.model.uncertainty_window(fact.value, fact.precision)?;

        let elapsed = as_of.signed_duration_since(fact.value);
        let youngest = as_of
            .signed_duration_since(bounds.upper)
            .max(TimeDelta::zero());
        let oldest = as_of.signed_duration_since(bounds.lower);

        let age_seconds = elapsed.num_seconds();
        Ok(DerivedAgeResult {
            as_of,
            age_years_decimal: years(elapsed),
            age_days: elapsed.num_days(),
            age_seconds,
            age_min_decimal: years(youngest),
            age_max_decimal: years(oldest),
            uncertainty_hours: hours(window),
            human_string: human_string(age_seconds),
        })
    }
}

/// Elapsed time in 365.25-day years.
#[allow(clippy::cast_precision_loss)]
fn years(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / (SECONDS_PER_YEAR as f64 * 1000.0)
}

#[allow(clippy::cast_precision_loss)]
fn hours(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 3_600_000.0
}

/// `"26 years, 234 days"`, with singular forms where they apply.
fn human_string(age_seconds: i64) -> String {
    let whole_years = age_seconds.checked_div(SECONDS_PER_YEAR).unwrap_or(0);
    let days = age_seconds
        .checked_rem(SECONDS_PER_YEAR)
        .and_then(|rest| rest.checked_div(SECONDS_PER_DAY))
        .unwrap_or(0);
    format!("{}, {}", plural(whole_years, "year"), plural(days, "day"))
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use boxscore_types::PrecisionLevel;
    use chrono::NaiveDate;

    use super::*;
    use crate::facts::FactBook;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn fact(
        entity: &str,
        fact_type: FactType,
        date: (i32, u32, u32),
        precision: PrecisionLevel,
    ) -> BiographicalFact {
        BiographicalFact::from_date(
            EntityId::new(entity),
            fact_type,
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            precision,
            at("2015-01-01T00:00:00Z"),
        )
    }

    fn deriver(facts: Vec<BiographicalFact>) -> TemporalFeatureDeriver<FactBook> {
        TemporalFeatureDeriver::new(PrecisionModel::default(), facts.into_iter().collect())
    }

    #[test]
    fn age_from_day_precision_birth_date() {
        let d = deriver(vec![fact("P3", FactType::BirthDate, (1998, 3, 3), PrecisionLevel::Day)]);
        let age = d.age_at(&EntityId::new("P3"), at("2024-10-22T20:18:00Z")).unwrap();

        assert!((age.age_years_decimal - 26.6416).abs() < 0.01);
        assert!(((age.age_years_decimal * 10.0).round() - 266.0).abs() < 1e-9);
        assert_eq!(age.age_days, 9730);
        assert_eq!(age.human_string, "26 years, 234 days");

        let width = age.age_max_decimal - age.age_min_decimal;
        assert!((width - 0.002_74).abs() < 0.000_01);
        assert!(age.age_min_decimal <= age.age_years_decimal);
        assert!(age.age_years_decimal <= age.age_max_decimal);
        assert_eq!(age.uncertainty_hours, 24.0);
    }

    #[test]
    fn coarser_birth_precision_widens_the_range() {
        let as_of = at("2024-10-22T20:18:00Z");
        let day = deriver(vec![fact("P3", FactType::BirthDate, (1998, 3, 3), PrecisionLevel::Day)])
            .age_at(&EntityId::new("P3"), as_of)
            .unwrap();
        let month = deriver(vec![fact("P3", FactType::BirthDate, (1998, 3, 1), PrecisionLevel::Month)])
            .age_at(&EntityId::new("P3"), as_of)
            .unwrap();
        let year = deriver(vec![fact("P3", FactType::BirthDate, (1998, 1, 1), PrecisionLevel::Year)])
            .age_at(&EntityId::new("P3"), as_of)
            .unwrap();

        let width = |r: &DerivedAgeResult| r.age_max_decimal - r.age_min_decimal;
        assert!(width(&day) < width(&month));
        assert!(width(&month) < width(&year));
        assert!(month.uncertainty_hours > day.uncertainty_hours);
    }

    #[test]
    fn missing_birth_date_is_an_error() {
        let d = deriver(Vec::new());
        assert!(matches!(
            d.age_at(&EntityId::new("P3"), at("2024-10-22T20:18:00Z")),
            Err(FeatureError::MissingFact { .. })
        ));
    }

    #[test]
    fn query_before_birth_is_an_error() {
        let d = deriver(vec![fact("P3", FactType::BirthDate, (1998, 3, 3), PrecisionLevel::Day)]);
        assert!(matches!(
            d.age_at(&EntityId::new("P3"), at("1990-01-01T00:00:00Z")),
            Err(FeatureError::BeforeAnchor { .. })
        ));
    }

    #[test]
    fn rookie_within_first_year() {
        let d = deriver(vec![fact("P3", FactType::DebutDate, (2024, 10, 22), PrecisionLevel::Day)]);
        let exp = d
            .experience_at(&EntityId::new("P3"), at("2025-03-01T00:00:00Z"))
            .unwrap();
        assert!(exp.is_rookie);
        assert!(!exp.retired);

        let later = d
            .experience_at(&EntityId::new("P3"), at("2025-10-22T00:00:00Z"))
            .unwrap();
        assert!(!later.is_rookie);
    }

    #[test]
    fn retirement_on_record_is_reported() {
        let d = deriver(vec![
            fact("P3", FactType::DebutDate, (2010, 10, 27), PrecisionLevel::Day),
            fact("P3", FactType::RetirementDate, (2022, 6, 30), PrecisionLevel::Day),
        ]);
        let before = d
            .experience_at(&EntityId::new("P3"), at("2020-01-01T00:00:00Z"))
            .unwrap();
        assert!(!before.retired);
        let after = d
            .experience_at(&EntityId::new("P3"), at("2023-01-01T00:00:00Z"))
            .unwrap();
        assert!(after.retired);
    }

    #[test]
    fn identical_inputs_give_identical_outputs() {
        let d = deriver(vec![fact("P3", FactType::BirthDate, (1998, 3, 3), PrecisionLevel::Day)]);
        let as_of = at("2024-10-22T20:18:00Z");
        assert_eq!(
            d.age_at(&EntityId::new("P3"), as_of).unwrap(),
            d.age_at(&EntityId::new("P3"), as_of).unwrap()
        );
    }

    #[test]
    fn sub_second_windows_keep_their_uncertainty() {
        let half_second = hours(TimeDelta::milliseconds(500));
        assert!(half_second > 0.0);
        assert!((half_second - 0.5 / 3600.0).abs() < 1e-12);
        assert!((hours(TimeDelta::milliseconds(1_999)) - 1.999 / 3600.0).abs() < 1e-12);
    }

    #[test]
    fn singular_units() {
        assert_eq!(human_string(SECONDS_PER_YEAR + SECONDS_PER_DAY), "1 year, 1 day");
        assert_eq!(human_string(0), "0 years, 0 days");
    }
}
