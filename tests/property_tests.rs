/// Property-based tests using proptest
/// Invariants the calculators must hold for every input in their domain
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_crm_api::metrics::{customer_health_score, score_lead, HealthScoreRules, LeadScoringRules};
use rust_crm_api::models::*;
use uuid::Uuid;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn cents(value: i64) -> BigDecimal {
    BigDecimal::new(value.into(), 2)
}

fn company_size() -> impl Strategy<Value = Option<CompanySize>> {
    prop_oneof![
        Just(None),
        Just(Some(CompanySize::Small)),
        Just(Some(CompanySize::Medium)),
        Just(Some(CompanySize::Large)),
        Just(Some(CompanySize::Enterprise)),
    ]
}

prop_compose! {
    fn any_lead()(
        size in company_size(),
        revenue in proptest::option::of(0i64..10_000_000),
        title in proptest::option::of("(CEO|Sales Manager|Engineer|Intern|Director of Ops)"),
        visits in 0i32..1_000,
        opens in 0i32..1_000,
        clicks in 0i32..1_000,
        interactions in 0i32..1_000,
        contact_days_ago in proptest::option::of(0i64..400),
    ) -> Lead {
        let now = fixed_now();
        let mut lead = Lead::new("L-PROP", now - Duration::days(500));
        lead.company_size = size;
        lead.annual_revenue = revenue.map(BigDecimal::from);
        lead.job_title = title;
        lead.website_visits = visits;
        lead.email_opens = opens;
        lead.email_clicks = clicks;
        lead.total_interactions = interactions;
        lead.last_contact_date = contact_days_ago.map(|d| now - Duration::days(d));
        lead
    }
}

// Property: lead sub-scores stay within their caps and sum to the total
proptest! {
    #[test]
    fn lead_scores_respect_caps(lead in any_lead()) {
        let rules = LeadScoringRules::default();
        let b = score_lead(&lead, fixed_now(), &rules);

        prop_assert!((0..=30).contains(&b.demographic_score));
        prop_assert!((0..=40).contains(&b.behavioral_score));
        prop_assert!((0..=30).contains(&b.engagement_score));
        prop_assert!((0..=100).contains(&b.lead_score));
        prop_assert_eq!(
            b.lead_score,
            (b.demographic_score + b.behavioral_score + b.engagement_score).min(100)
        );
        prop_assert_eq!(b.quality, LeadQuality::from_score(b.lead_score, &rules));
    }

    #[test]
    fn lead_scoring_is_idempotent(lead in any_lead()) {
        let rules = LeadScoringRules::default();
        let mut scored = lead.clone();
        let first = scored.calculate_lead_score(fixed_now(), &rules);
        let snapshot = scored.clone();
        let second = scored.calculate_lead_score(fixed_now(), &rules);

        prop_assert_eq!(first, second);
        prop_assert_eq!(snapshot, scored);
    }

    #[test]
    fn more_visits_never_lower_the_score(lead in any_lead(), extra in 0i32..100) {
        let rules = LeadScoringRules::default();
        let before = score_lead(&lead, fixed_now(), &rules).lead_score;
        let mut busier = lead.clone();
        busier.website_visits += extra;
        let after = score_lead(&busier, fixed_now(), &rules).lead_score;
        prop_assert!(after >= before);
    }
}

fn quality_rank(q: LeadQuality) -> u8 {
    match q {
        LeadQuality::Cold => 0,
        LeadQuality::Warm => 1,
        LeadQuality::Hot => 2,
    }
}

// Property: quality is monotone in the score
proptest! {
    #[test]
    fn quality_is_monotone(a in 0i32..=100, b in 0i32..=100) {
        let rules = LeadScoringRules::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            quality_rank(LeadQuality::from_score(lo, &rules))
                <= quality_rank(LeadQuality::from_score(hi, &rules))
        );
    }
}

// Property: health score stays in [0, 100] at two decimals
proptest! {
    #[test]
    fn health_score_is_bounded(
        engagement in proptest::option::of(-50i32..500),
        satisfaction_tenths in proptest::option::of(0i64..=100),
        contact_days_ago in proptest::option::of(0i64..1_000),
        revenue_cents in proptest::option::of(-1_000_000i64..100_000_000),
    ) {
        let now = fixed_now();
        let mut customer = Customer::new("Acme", CustomerType::Business, now);
        customer.engagement_score = engagement;
        customer.satisfaction_score = satisfaction_tenths.map(|t| BigDecimal::new(t.into(), 1));
        customer.last_contact_date = contact_days_ago.map(|d| now - Duration::days(d));
        customer.total_revenue = revenue_cents.map(cents);

        let score = customer_health_score(&customer, now, &HealthScoreRules::default());
        prop_assert!(score >= BigDecimal::zero());
        prop_assert!(score <= BigDecimal::from(100));
        prop_assert!(score.fractional_digit_count() <= 2);
    }
}

// Property: funnel rates are percentages or absent, never divided by zero
proptest! {
    #[test]
    fn campaign_rates_are_bounded(
        sent in 0i32..100_000,
        delivered_pct in 0i32..=100,
        opened_pct in 0i32..=100,
        clicked_pct in 0i32..=100,
        converted_pct in 0i32..=100,
    ) {
        let mut campaign = Campaign::new("Prop", CampaignType::Email, fixed_now());
        campaign.sent_count = sent;
        campaign.delivered_count = sent * delivered_pct / 100;
        campaign.opened_count = campaign.delivered_count * opened_pct / 100;
        campaign.clicked_count = campaign.opened_count * clicked_pct / 100;
        campaign.converted_count = campaign.clicked_count * converted_pct / 100;

        let rates = campaign.calculate_metrics();
        for (rate, denominator) in [
            (&rates.delivery_rate, campaign.sent_count),
            (&rates.open_rate, campaign.delivered_count),
            (&rates.click_rate, campaign.opened_count),
            (&rates.conversion_rate, campaign.clicked_count),
        ] {
            match rate {
                Some(r) => {
                    prop_assert!(denominator > 0);
                    prop_assert!(*r >= BigDecimal::zero() && *r <= BigDecimal::from(100));
                }
                None => prop_assert_eq!(denominator, 0),
            }
        }
        prop_assert_eq!(campaign.calculate_metrics(), rates);
    }
}

// Property: paying exactly the total settles the invoice
proptest! {
    #[test]
    fn full_payment_settles_invoice(
        lines in proptest::collection::vec((1i64..50, 1i64..100_000, 0i64..=100, 0i64..=25), 1..6),
        invoice_tax in 0i64..=20,
    ) {
        let now = fixed_now();
        let mut invoice = Invoice::new("INV-PROP", Uuid::new_v4(), now);
        invoice.status = InvoiceStatus::Sent;
        invoice.tax_rate = Some(BigDecimal::from(invoice_tax));

        let items: Vec<InvoiceItem> = lines
            .into_iter()
            .map(|(qty, price_cents, discount, tax)| {
                let mut item =
                    InvoiceItem::new(invoice.id, "line", BigDecimal::from(qty), cents(price_cents));
                item.discount_percent = Some(BigDecimal::from(discount));
                item.tax_rate = Some(BigDecimal::from(tax));
                item.calculate_total();
                item
            })
            .collect();

        let total = invoice.calculate_totals(&items);
        prop_assert_eq!(&invoice.due_amount, &total);
        prop_assume!(total > BigDecimal::zero());

        invoice.add_payment(&total, now);
        prop_assert!(invoice.due_amount.is_zero());
        prop_assert_eq!(invoice.status, InvoiceStatus::Paid);
        prop_assert_eq!(invoice.paid_date, Some(now));
    }

    #[test]
    fn line_totals_are_in_cents(qty in 1i64..1_000, price_cents in 0i64..10_000_000, discount in 0i64..=100, tax in 0i64..=100) {
        let mut item = InvoiceItem::new(Uuid::new_v4(), "line", BigDecimal::from(qty), cents(price_cents));
        item.discount_percent = Some(BigDecimal::from(discount));
        item.tax_rate = Some(BigDecimal::from(tax));
        let total = item.calculate_total();

        prop_assert!(total >= BigDecimal::zero());
        prop_assert!(total.fractional_digit_count() <= 2);
        prop_assert_eq!(
            total,
            cents(qty * price_cents) - &item.discount_amount + &item.tax_amount
        );
    }
}

// Property: weighted amount is zero at the extremes and the full amount at 100%
proptest! {
    #[test]
    fn weighted_amount_bounds(amount_cents in 0i64..1_000_000_000, probability in 0i32..=100) {
        let mut opp = Opportunity::new("Deal", Uuid::new_v4(), Uuid::new_v4(), cents(amount_cents), fixed_now());
        opp.probability = probability;
        let weighted = opp.calculate_weighted_amount();

        prop_assert!(weighted >= BigDecimal::zero());
        prop_assert!(weighted <= cents(amount_cents));
        if probability == 100 {
            prop_assert_eq!(&weighted, &cents(amount_cents));
        }
        if probability == 0 || amount_cents == 0 {
            prop_assert!(weighted.is_zero());
        }
    }
}
