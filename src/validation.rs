//! Precondition checks run before any calculator sees caller input.
//!
//! Calculators assume non-negative counters, percentages within 0..=100 and
//! positive quantities. Handlers and services reject anything else here
//! with [`AppError::ValidationError`]. Decimal inputs are stored as
//! `NUMERIC(_, 2)`, so finer values are rejected rather than rounded.

use bigdecimal::{BigDecimal, Zero};
use regex::Regex;
use std::sync::OnceLock;

use crate::errors::AppError;

type Result<T = ()> = std::result::Result<T, AppError>;

fn currency_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{3}$").expect("static regex"))
}

fn two_places(field: &str, value: &BigDecimal) -> Result {
    let (_, scale) = value.normalized().as_bigint_and_exponent();
    if scale > 2 {
        return Err(AppError::ValidationError(format!(
            "{field} allows at most two decimal places (got {value})"
        )));
    }
    Ok(())
}

pub fn non_negative_count(field: &str, value: i64) -> Result {
    if value < 0 {
        return Err(AppError::ValidationError(format!(
            "{field} must not be negative (got {value})"
        )));
    }
    Ok(())
}

pub fn positive_quantity(field: &str, value: &BigDecimal) -> Result {
    if *value <= BigDecimal::zero() {
        return Err(AppError::ValidationError(format!(
            "{field} must be greater than zero (got {value})"
        )));
    }
    two_places(field, value)
}

pub fn non_negative_amount(field: &str, value: &BigDecimal) -> Result {
    if *value < BigDecimal::zero() {
        return Err(AppError::ValidationError(format!(
            "{field} must not be negative (got {value})"
        )));
    }
    two_places(field, value)
}

/// Percentages such as discount and tax rates: 0 to 100 inclusive.
pub fn percent(field: &str, value: &BigDecimal) -> Result {
    if *value < BigDecimal::zero() || *value > BigDecimal::from(100) {
        return Err(AppError::ValidationError(format!(
            "{field} must be between 0 and 100 (got {value})"
        )));
    }
    two_places(field, value)
}

pub fn probability(value: i32) -> Result {
    if !(0..=100).contains(&value) {
        return Err(AppError::ValidationError(format!(
            "probability must be between 0 and 100 (got {value})"
        )));
    }
    Ok(())
}

pub fn payment_amount(value: &BigDecimal) -> Result {
    if *value <= BigDecimal::zero() {
        return Err(AppError::ValidationError(format!(
            "payment amount must be positive (got {value})"
        )));
    }
    two_places("amount", value)
}

pub fn satisfaction(value: &BigDecimal) -> Result {
    if *value < BigDecimal::zero() || *value > BigDecimal::from(10) {
        return Err(AppError::ValidationError(format!(
            "satisfaction_score must be between 0 and 10 (got {value})"
        )));
    }
    Ok(())
}

/// Three uppercase letters, ISO 4217 style.
pub fn currency_code(value: &str) -> Result {
    if !currency_re().is_match(value) {
        return Err(AppError::ValidationError(format!(
            "currency must be a three-letter ISO 4217 code (got '{value}')"
        )));
    }
    Ok(())
}

/// Returns the trimmed tag, rejecting blank ones.
pub fn tag(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError("tag must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn percent_bounds_are_inclusive() {
        assert!(percent("discount_percent", &dec("0")).is_ok());
        assert!(percent("discount_percent", &dec("100")).is_ok());
        assert!(percent("discount_percent", &dec("100.01")).is_err());
        assert!(percent("discount_percent", &dec("-0.5")).is_err());
    }

    #[test]
    fn probability_range() {
        assert!(probability(0).is_ok());
        assert!(probability(100).is_ok());
        assert!(matches!(probability(101), Err(AppError::ValidationError(_))));
        assert!(probability(-1).is_err());
    }

    #[test]
    fn quantities_and_payments_must_be_positive() {
        assert!(positive_quantity("quantity", &dec("0.5")).is_ok());
        assert!(positive_quantity("quantity", &dec("0")).is_err());
        assert!(payment_amount(&dec("0")).is_err());
        assert!(non_negative_amount("gateway_fee", &dec("0")).is_ok());
        assert!(non_negative_amount("gateway_fee", &dec("-1")).is_err());
    }

    #[test]
    fn sub_cent_precision_is_rejected() {
        let err = positive_quantity("quantity", &dec("0.001")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: quantity allows at most two decimal places (got 0.001)"
        );
        assert!(non_negative_amount("unit_price", &dec("19.999")).is_err());
        assert!(percent("tax_rate", &dec("7.125")).is_err());
        assert!(payment_amount(&dec("10.005")).is_err());

        // trailing zeros do not count
        assert!(positive_quantity("quantity", &dec("1.500")).is_ok());
        assert!(non_negative_amount("unit_price", &dec("19.99")).is_ok());
        assert!(positive_quantity("quantity", &dec("1000")).is_ok());
    }

    #[test]
    fn counters_cannot_go_negative() {
        assert!(non_negative_count("sent", 0).is_ok());
        let err = non_negative_count("sent", -3).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: sent must not be negative (got -3)");
    }

    #[test]
    fn currency_shape() {
        assert!(currency_code("EUR").is_ok());
        assert!(currency_code("eur").is_err());
        assert!(currency_code("EURO").is_err());
        assert!(currency_code("").is_err());
    }

    #[test]
    fn tags_are_trimmed() {
        assert_eq!(tag("  vip ").unwrap(), "vip");
        assert!(tag("   ").is_err());
    }

    #[test]
    fn satisfaction_scale() {
        assert!(satisfaction(&dec("10")).is_ok());
        assert!(satisfaction(&dec("10.5")).is_err());
    }
}
