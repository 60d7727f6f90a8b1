use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::ratio_percent;
use crate::models::{Campaign, CampaignMetric};

/// Cumulative funnel counters shared by campaigns and their daily metrics.
pub trait FunnelCounters {
    fn sent(&self) -> i64;
    fn delivered(&self) -> i64;
    fn opened(&self) -> i64;
    fn clicked(&self) -> i64;
    fn converted(&self) -> i64;
}

/// Stage-to-stage conversion percentages. `None` where the previous stage is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunnelRates {
    pub delivery_rate: Option<BigDecimal>,
    pub open_rate: Option<BigDecimal>,
    pub click_rate: Option<BigDecimal>,
    pub conversion_rate: Option<BigDecimal>,
}

/// Computes every rate from scratch out of the current counters.
pub fn funnel_rates<C: FunnelCounters + ?Sized>(counters: &C) -> FunnelRates {
    FunnelRates {
        delivery_rate: ratio_percent(counters.delivered(), counters.sent()),
        open_rate: ratio_percent(counters.opened(), counters.delivered()),
        click_rate: ratio_percent(counters.clicked(), counters.opened()),
        conversion_rate: ratio_percent(counters.converted(), counters.clicked()),
    }
}

macro_rules! impl_funnel {
    ($ty:ty) => {
        impl FunnelCounters for $ty {
            fn sent(&self) -> i64 {
                self.sent_count.into()
            }
            fn delivered(&self) -> i64 {
                self.delivered_count.into()
            }
            fn opened(&self) -> i64 {
                self.opened_count.into()
            }
            fn clicked(&self) -> i64 {
                self.clicked_count.into()
            }
            fn converted(&self) -> i64 {
                self.converted_count.into()
            }
        }

        impl $ty {
            fn assign_rates(&mut self, rates: FunnelRates) {
                self.delivery_rate = rates.delivery_rate;
                self.open_rate = rates.open_rate;
                self.click_rate = rates.click_rate;
                self.conversion_rate = rates.conversion_rate;
            }

            pub fn rates(&self) -> FunnelRates {
                FunnelRates {
                    delivery_rate: self.delivery_rate.clone(),
                    open_rate: self.open_rate.clone(),
                    click_rate: self.click_rate.clone(),
                    conversion_rate: self.conversion_rate.clone(),
                }
            }
        }
    };
}

impl_funnel!(Campaign);
impl_funnel!(CampaignMetric);

impl Campaign {
    /// Recomputes the campaign-level rates.
    pub fn calculate_metrics(&mut self) -> FunnelRates {
        let rates = funnel_rates(&*self);
        self.assign_rates(rates.clone());
        rates
    }
}

impl CampaignMetric {
    /// Recomputes this day's rates.
    pub fn calculate_rates(&mut self) -> FunnelRates {
        let rates = funnel_rates(&*self);
        self.assign_rates(rates.clone());
        rates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CampaignType;
    use chrono::{NaiveDate, Utc};
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn empty_open_stage_yields_zero_open_rate_and_no_click_rate() {
        let mut c = Campaign::new("Spring promo", CampaignType::Email, Utc::now());
        c.sent_count = 1000;
        c.delivered_count = 950;

        let rates = c.calculate_metrics();
        assert_eq!(rates.delivery_rate, Some(dec("95.0")));
        assert_eq!(rates.open_rate, Some(dec("0")));
        assert_eq!(rates.click_rate, None);
        assert_eq!(rates.conversion_rate, None);
        assert_eq!(c.rates(), rates);
    }

    #[test]
    fn untouched_campaign_has_no_rates() {
        let mut c = Campaign::new("Draft", CampaignType::Sms, Utc::now());
        assert_eq!(c.calculate_metrics(), FunnelRates::default());
    }

    #[test]
    fn stale_rates_are_cleared_when_a_stage_empties() {
        let mut c = Campaign::new("Reset", CampaignType::Email, Utc::now());
        c.sent_count = 10;
        c.delivered_count = 10;
        c.opened_count = 4;
        c.clicked_count = 2;
        c.calculate_metrics();
        assert_eq!(c.click_rate, Some(dec("50")));

        c.opened_count = 0;
        c.clicked_count = 0;
        c.calculate_metrics();
        assert_eq!(c.click_rate, None);
        assert_eq!(c.conversion_rate, None);
    }

    #[test]
    fn daily_metric_rates_are_independent_of_campaign() {
        let campaign_id = Uuid::new_v4();
        let mut day = CampaignMetric::new(campaign_id, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        day.sent_count = 3;
        day.delivered_count = 3;
        day.opened_count = 1;
        day.clicked_count = 1;
        day.converted_count = 1;

        let rates = day.calculate_rates();
        assert_eq!(rates.delivery_rate, Some(dec("100")));
        assert_eq!(rates.open_rate, Some(dec("33.33")));
        assert_eq!(rates.click_rate, Some(dec("100")));
        assert_eq!(rates.conversion_rate, Some(dec("100")));
    }
}
