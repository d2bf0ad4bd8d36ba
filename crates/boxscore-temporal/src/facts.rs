//! Versioned biographical facts.
//!
//! Facts are owned by the roster service and may be corrected over time.
//! Each correction is a new version with a later `recorded_at`. Lookups
//! take the latest version recorded at or before the query timestamp.
//! When every version was recorded after it, the earliest version is
//! used: a birth date describes the past, so its first known value is the
//! best available answer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use boxscore_types::{BiographicalFact, EntityId, FactType};

/// Read access to biographical facts.
pub trait FactSource {
    /// The version of a fact in effect at `as_of`, if any is on record.
    fn fact_at(
        &self,
        entity_id: &EntityId,
        fact_type: FactType,
        as_of: DateTime<Utc>,
    ) -> Option<&BiographicalFact>;
}

/// In-memory fact store keyed by entity and fact type.
#[derive(Debug, Clone, Default)]
pub struct FactBook {
    /// Versions of each fact, sorted by `recorded_at`.
    versions: BTreeMap<(EntityId, FactType), Vec<BiographicalFact>>,
}

impl FactBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fact version.
    ///
    /// A version with the same `recorded_at` as an existing one replaces it.
    pub fn record(&mut self, fact: BiographicalFact) {
        let versions = self
            .versions
            .entry((fact.entity_id.clone(), fact.fact_type))
            .or_default();
        match versions.binary_search_by_key(&fact.recorded_at, |v| v.recorded_at) {
            Ok(pos) => {
                if let Some(slot) = versions.get_mut(pos) {
                    *slot = fact;
                }
            }
            Err(pos) => versions.insert(pos, fact),
        }
    }

    /// Number of fact versions held.
    pub fn len(&self) -> usize {
        self.versions.values().map(Vec::len).sum()
    }

    /// Whether the book holds no facts.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

impl FromIterator<BiographicalFact> for FactBook {
    fn from_iter<I: IntoIterator<Item = BiographicalFact>>(iter: I) -> Self {
        let mut book = Self::new();
        for fact in iter {
            book.record(fact);
        }
        book
    }
}

impl FactSource for FactBook {
    fn fact_at(
        &self,
        entity_id: &EntityId,
        fact_type: FactType,
        as_of: DateTime<Utc>,
    ) -> Option<&BiographicalFact> {
        let versions = self.versions.get(&(entity_id.clone(), fact_type))?;
        versions
            .iter()
            .rev()
            .find(|v| v.recorded_at <= as_of)
            .or_else(|| versions.first())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boxscore_types::PrecisionLevel;
    use chrono::NaiveDate;

    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn birth(date: (i32, u32, u32), precision: PrecisionLevel, recorded: &str) -> BiographicalFact {
        BiographicalFact::from_date(
            EntityId::new("P3"),
            FactType::BirthDate,
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            precision,
            at(recorded),
        )
    }

    #[test]
    fn latest_version_at_or_before_query_wins() {
        let book: FactBook = [
            birth((1998, 1, 1), PrecisionLevel::Year, "2016-06-01T00:00:00Z"),
            birth((1998, 3, 3), PrecisionLevel::Day, "2018-06-01T00:00:00Z"),
        ]
        .into_iter()
        .collect();

        let early = book
            .fact_at(&EntityId::new("P3"), FactType::BirthDate, at("2017-01-01T00:00:00Z"))
            .unwrap();
        assert_eq!(early.precision, PrecisionLevel::Year);

        let late = book
            .fact_at(&EntityId::new("P3"), FactType::BirthDate, at("2024-10-22T00:00:00Z"))
            .unwrap();
        assert_eq!(late.precision, PrecisionLevel::Day);
    }

    #[test]
    fn falls_back_to_earliest_version() {
        let book: FactBook = [birth((1998, 3, 3), PrecisionLevel::Day, "2018-06-01T00:00:00Z")]
            .into_iter()
            .collect();
        let fact = book.fact_at(&EntityId::new("P3"), FactType::BirthDate, at("2000-01-01T00:00:00Z"));
        assert!(fact.is_some());
    }

    #[test]
    fn missing_fact_is_none() {
        let book = FactBook::new();
        assert!(book.is_empty());
        assert!(
            book.fact_at(&EntityId::new("P3"), FactType::DebutDate, at("2024-01-01T00:00:00Z"))
                .is_none()
        );
    }

    #[test]
    fn same_recorded_at_replaces_version() {
        let mut book = FactBook::new();
        book.record(birth((1998, 3, 4), PrecisionLevel::Day, "2018-06-01T00:00:00Z"));
        book.record(birth((1998, 3, 3), PrecisionLevel::Day, "2018-06-01T00:00:00Z"));
        assert_eq!(book.len(), 1);
    }
}
