//! Derived shooting rates and rebound totals.
//!
//! Rates are never stored or averaged. Every consumer recomputes them from
//! the two underlying counters through [`derive_rate`], so a period rate is
//! always `(made2 - made1) / (att2 - att1)` and never a difference of two
//! percentages. All arithmetic is [`Decimal`] -- no floating point.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use boxscore_types::{CounterSet, StatName};

/// Free-throw weight in the true-shooting denominator.
const TS_FTA_WEIGHT: Decimal = Decimal::from_parts(44, 0, 0, false, 2);

/// Weight of a made three in effective field-goal percentage.
const EFG_THREE_WEIGHT: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Divide `made` by `attempted`.
///
/// Returns `None` when nothing was attempted: the rate is undefined, not
/// zero. Also `None` for a negative denominator or on overflow.
pub fn derive_rate(made: impl Into<Decimal>, attempted: impl Into<Decimal>) -> Option<Decimal> {
    let attempted = attempted.into();
    if attempted <= Decimal::ZERO {
        return None;
    }
    made.into().checked_div(attempted)
}

/// Field-goal percentage.
pub fn fg_pct(counters: &CounterSet) -> Option<Decimal> {
    derive_rate(counters.get(StatName::Fgm), counters.get(StatName::Fga))
}

/// Three-point percentage.
pub fn fg3_pct(counters: &CounterSet) -> Option<Decimal> {
    derive_rate(counters.get(StatName::Fg3m), counters.get(StatName::Fg3a))
}

/// Free-throw percentage.
pub fn ft_pct(counters: &CounterSet) -> Option<Decimal> {
    derive_rate(counters.get(StatName::Ftm), counters.get(StatName::Fta))
}

/// Effective field-goal percentage: `(fgm + 0.5 * fg3m) / fga`.
pub fn efg_pct(counters: &CounterSet) -> Option<Decimal> {
    let weighted_threes = EFG_THREE_WEIGHT.checked_mul(Decimal::from(counters.get(StatName::Fg3m)))?;
    let made = Decimal::from(counters.get(StatName::Fgm)).checked_add(weighted_threes)?;
    derive_rate(made, counters.get(StatName::Fga))
}

/// True-shooting percentage: `points / (2 * (fga + 0.44 * fta))`.
pub fn ts_pct(counters: &CounterSet) -> Option<Decimal> {
    let weighted_fta = TS_FTA_WEIGHT.checked_mul(Decimal::from(counters.get(StatName::Fta)))?;
    let attempts = Decimal::from(counters.get(StatName::Fga)).checked_add(weighted_fta)?;
    let denominator = Decimal::TWO.checked_mul(attempts)?;
    derive_rate(counters.get(StatName::Points), denominator)
}

/// Offensive plus defensive rebounds.
pub fn total_rebounds(counters: &CounterSet) -> i64 {
    counters
        .get(StatName::Oreb)
        .saturating_add(counters.get(StatName::Dreb))
}

/// Every derived rate for one counter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rates {
    /// Field-goal percentage.
    pub fg_pct: Option<Decimal>,
    /// Three-point percentage.
    pub fg3_pct: Option<Decimal>,
    /// Free-throw percentage.
    pub ft_pct: Option<Decimal>,
    /// Effective field-goal percentage.
    pub efg_pct: Option<Decimal>,
    /// True-shooting percentage.
    pub ts_pct: Option<Decimal>,
    /// Offensive plus defensive rebounds.
    pub rebounds: i64,
}

impl Rates {
    /// Compute every rate from `counters`.
    pub fn from_counters(counters: &CounterSet) -> Self {
        Self {
            fg_pct: fg_pct(counters),
            fg3_pct: fg3_pct(counters),
            ft_pct: ft_pct(counters),
            efg_pct: efg_pct(counters),
            ts_pct: ts_pct(counters),
            rebounds: total_rebounds(counters),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn counters(pairs: &[(StatName, i64)]) -> CounterSet {
        pairs.iter().copied().collect()
    }

    #[test]
    fn zero_attempts_is_undefined() {
        assert_eq!(derive_rate(0, 0), None);
        assert_eq!(fg_pct(&CounterSet::new()), None);
    }

    #[test]
    fn rate_is_made_over_attempted() {
        assert_eq!(derive_rate(1, 4), Some(dec!(0.25)));
    }

    #[test]
    fn negative_denominator_is_undefined() {
        assert_eq!(derive_rate(1, -2), None);
    }

    #[test]
    fn efg_weights_threes() {
        let c = counters(&[(StatName::Fgm, 4), (StatName::Fg3m, 2), (StatName::Fga, 10)]);
        assert_eq!(efg_pct(&c), Some(dec!(0.5)));
    }

    #[test]
    fn ts_pct_matches_formula() {
        // 20 / (2 * (10 + 0.44 * 5)) = 20 / 24.4
        let c = counters(&[(StatName::Points, 20), (StatName::Fga, 10), (StatName::Fta, 5)]);
        let expected = dec!(20) / dec!(24.4);
        assert_eq!(ts_pct(&c), Some(expected));
    }

    #[test]
    fn ts_pct_undefined_without_attempts() {
        let c = counters(&[(StatName::Points, 0)]);
        assert_eq!(ts_pct(&c), None);
    }

    #[test]
    fn rebounds_sum_both_ends() {
        let c = counters(&[(StatName::Oreb, 3), (StatName::Dreb, 7)]);
        assert_eq!(total_rebounds(&c), 10);
    }

    #[test]
    fn rates_bundle_every_rate() {
        let c = counters(&[
            (StatName::Ftm, 3),
            (StatName::Fta, 4),
            (StatName::Oreb, 1),
            (StatName::Dreb, 5),
        ]);
        let rates = Rates::from_counters(&c);
        assert_eq!(rates.ft_pct, Some(dec!(0.75)));
        assert_eq!(rates.fg_pct, None);
        assert_eq!(rates.rebounds, 6);
    }
}
