use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{days_between, lead::RecencyBand};
use crate::models::Customer;

/// Weights and caps of the customer health model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthScoreRules {
    pub engagement_weight: BigDecimal,
    pub engagement_cap: i32,
    pub satisfaction_weight: BigDecimal,
    pub recency_bands: Vec<RecencyBand>,
    /// Revenue per health point.
    pub revenue_divisor: i64,
    pub revenue_cap: i32,
    pub max_score: i32,
}

impl Default for HealthScoreRules {
    fn default() -> Self {
        Self {
            engagement_weight: BigDecimal::new(4.into(), 1),
            engagement_cap: 40,
            satisfaction_weight: BigDecimal::from(2),
            recency_bands: vec![
                RecencyBand {
                    within_days: 30,
                    points: 20,
                },
                RecencyBand {
                    within_days: 90,
                    points: 10,
                },
            ],
            revenue_divisor: 1000,
            revenue_cap: 20,
            max_score: 100,
        }
    }
}

/// Health score in `[0, max_score]`, at two decimals.
///
/// Sums four independent contributions: engagement, satisfaction, contact
/// recency and lifetime revenue. Missing inputs contribute nothing.
pub fn customer_health_score(
    customer: &Customer,
    now: DateTime<Utc>,
    rules: &HealthScoreRules,
) -> BigDecimal {
    let zero = BigDecimal::from(0);
    let mut score = zero.clone();

    if let Some(engagement) = customer.engagement_score.filter(|e| *e != 0) {
        let weighted = BigDecimal::from(engagement) * &rules.engagement_weight;
        score += weighted.min(BigDecimal::from(rules.engagement_cap));
    }

    if let Some(satisfaction) = &customer.satisfaction_score {
        score += satisfaction * &rules.satisfaction_weight;
    }

    if let Some(last_contact) = customer.last_contact_date {
        let days = days_between(last_contact, now);
        if let Some(band) = rules.recency_bands.iter().find(|b| days <= b.within_days) {
            score += BigDecimal::from(band.points);
        }
    }

    if let Some(revenue) = customer.total_revenue.as_ref().filter(|r| **r > zero) {
        let points = revenue / &BigDecimal::from(rules.revenue_divisor);
        score += points.min(BigDecimal::from(rules.revenue_cap));
    }

    let clamped = score.max(zero).min(BigDecimal::from(rules.max_score));
    super::round_money(&clamped)
}

impl Customer {
    pub fn calculate_health_score(&self, now: DateTime<Utc>, rules: &HealthScoreRules) -> BigDecimal {
        customer_health_score(self, now, rules)
    }
}
