//! Pure calculators that turn raw CRM entity state into derived fields.
//!
//! Nothing in this module performs I/O or keeps state between calls. Callers
//! pass `now` explicitly so that recency-based scores are reproducible, and
//! are responsible for validating inputs (see [`crate::validation`]) and for
//! persisting the derived values in the same transaction as the triggering
//! event.

pub mod campaign;
pub mod catalog;
pub mod financial;
pub mod health;
pub mod lead;
pub mod service_levels;

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, Utc};

pub use campaign::{funnel_rates, FunnelCounters, FunnelRates};
pub use health::{customer_health_score, HealthScoreRules};
pub use lead::{score_lead, LeadScoreBreakdown, LeadScoringRules, RecencyBand, Threshold};

/// Rounds a monetary amount to cents, half away from zero.
pub fn round_money(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

/// `value × percent / 100`.
pub fn percent_of(value: &BigDecimal, percent: &BigDecimal) -> BigDecimal {
    value * percent / BigDecimal::from(100)
}

/// `numerator / denominator × 100` at two decimals, `None` unless the
/// denominator is positive.
pub fn ratio_percent(numerator: i64, denominator: i64) -> Option<BigDecimal> {
    if denominator <= 0 {
        return None;
    }
    let rate = BigDecimal::from(numerator) * BigDecimal::from(100) / BigDecimal::from(denominator);
    Some(rate.with_scale_round(2, RoundingMode::HalfUp))
}

/// Whole days elapsed from `from` to `to`.
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_days()
}

/// Whole minutes elapsed from `from` to `to`, saturating at the `i32` range.
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i32 {
    let minutes = (to - from).num_minutes();
    minutes.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    #[test]
    fn money_rounds_half_up() {
        let v = BigDecimal::from_str("15.125").unwrap();
        assert_eq!(round_money(&v), BigDecimal::from_str("15.13").unwrap());
        let v = BigDecimal::from_str("15.124").unwrap();
        assert_eq!(round_money(&v), BigDecimal::from_str("15.12").unwrap());
    }

    #[test]
    fn ratio_guards_zero_denominator() {
        assert_eq!(ratio_percent(5, 0), None);
        assert_eq!(ratio_percent(1, 3), Some(BigDecimal::from_str("33.33").unwrap()));
        assert_eq!(ratio_percent(2, 3), Some(BigDecimal::from_str("66.67").unwrap()));
    }

    #[test]
    fn elapsed_time_truncates() {
        let start = Utc::now();
        let end = start + Duration::hours(47) + Duration::seconds(59);
        assert_eq!(days_between(start, end), 1);
        assert_eq!(minutes_between(start, start + Duration::seconds(119)), 1);
    }
}
