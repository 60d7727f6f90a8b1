/// Worked examples for each calculator, checked end to end through the
/// public library API.
use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_crm_api::config::ScoringConfig;
use rust_crm_api::metrics::{customer_health_score, score_lead, HealthScoreRules, LeadScoringRules};
use rust_crm_api::models::*;
use std::str::FromStr;
use uuid::Uuid;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 9, 30, 0).unwrap()
}

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

#[test]
fn enterprise_cto_lead_scores_hot() {
    let mut lead = Lead::new("L-1001", now() - Duration::days(60));
    lead.company_size = Some(CompanySize::Enterprise);
    lead.annual_revenue = Some(dec("2000000"));
    lead.job_title = Some("CTO".to_string());
    lead.website_visits = 12;
    lead.email_opens = 6;
    lead.email_clicks = 4;
    lead.total_interactions = 11;
    lead.last_contact_date = Some(now() - Duration::days(3));

    let b = score_lead(&lead, now(), &LeadScoringRules::default());
    assert_eq!(b.demographic_score, 30);
    assert_eq!(b.behavioral_score, 40);
    assert_eq!(b.engagement_score, 30);
    assert_eq!(b.lead_score, 100);
    assert_eq!(b.quality, LeadQuality::Hot);
}

#[test]
fn quality_boundaries() {
    let rules = LeadScoringRules::default();
    assert_eq!(LeadQuality::from_score(49, &rules), LeadQuality::Cold);
    assert_eq!(LeadQuality::from_score(50, &rules), LeadQuality::Warm);
    assert_eq!(LeadQuality::from_score(79, &rules), LeadQuality::Warm);
    assert_eq!(LeadQuality::from_score(80, &rules), LeadQuality::Hot);
}

#[test]
fn engaged_customer_is_fully_healthy() {
    let mut customer = Customer::new("Globex", CustomerType::Enterprise, now() - Duration::days(400));
    customer.engagement_score = Some(100);
    customer.satisfaction_score = Some(dec("10"));
    customer.last_contact_date = Some(now() - Duration::days(5));
    customer.total_revenue = Some(dec("50000"));

    let score = customer_health_score(&customer, now(), &HealthScoreRules::default());
    assert_eq!(score, BigDecimal::from(100));
}

#[test]
fn campaign_with_no_opens() {
    let mut campaign = Campaign::new("Spring launch", CampaignType::Email, now());
    campaign.sent_count = 1000;
    campaign.delivered_count = 950;

    let rates = campaign.calculate_metrics();
    assert_eq!(rates.delivery_rate, Some(dec("95.0")));
    assert_eq!(rates.open_rate, Some(BigDecimal::from(0)));
    assert_eq!(rates.click_rate, None);
    assert_eq!(rates.conversion_rate, None);
    assert_eq!(campaign.delivery_rate, Some(dec("95.00")));
}

#[test]
fn invoice_with_item_and_invoice_tax_then_paid_in_full() {
    let mut invoice = Invoice::new("INV-2026-0001", Uuid::new_v4(), now());
    invoice.status = InvoiceStatus::Sent;
    invoice.tax_rate = Some(dec("8"));

    let mut item = InvoiceItem::new(invoice.id, "Consulting", dec("2"), dec("100"));
    item.discount_percent = Some(dec("10"));
    item.tax_rate = Some(dec("5"));
    assert_eq!(item.calculate_total(), dec("189"));
    assert_eq!(item.discount_amount, dec("20"));
    assert_eq!(item.tax_amount, dec("9"));

    let total = invoice.calculate_totals(&[item]);
    assert_eq!(invoice.subtotal, dec("189"));
    assert_eq!(invoice.tax_amount, dec("15.12"));
    assert_eq!(total, dec("204.12"));
    assert_eq!(invoice.due_amount, dec("204.12"));

    invoice.add_payment(&total, now());
    assert_eq!(invoice.due_amount, BigDecimal::from(0));
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    assert_eq!(invoice.paid_date, Some(now()));
}

#[test]
fn recomputing_twice_changes_nothing() {
    let mut invoice = Invoice::new("INV-2026-0002", Uuid::new_v4(), now());
    let mut item = InvoiceItem::new(invoice.id, "Licence", dec("3"), dec("49.99"));
    item.calculate_total();
    let items = vec![item];

    let first = invoice.calculate_totals(&items);
    let snapshot = invoice.clone();
    let second = invoice.calculate_totals(&items);
    assert_eq!(first, second);
    assert_eq!(snapshot, invoice);

    let mut customer = Customer::new("Initech", CustomerType::Business, now());
    customer.engagement_score = Some(37);
    let rules = HealthScoreRules::default();
    assert_eq!(
        customer.calculate_health_score(now(), &rules),
        customer.calculate_health_score(now(), &rules)
    );
}

#[test]
fn custom_rules_keep_scenarios_when_only_thresholds_move() {
    let config = ScoringConfig::from_json(r#"{"lead": {"hot_threshold": 90}}"#).unwrap();
    assert_eq!(LeadQuality::from_score(85, &config.lead), LeadQuality::Warm);
    assert_eq!(LeadQuality::from_score(90, &config.lead), LeadQuality::Hot);
    assert_eq!(config.health, HealthScoreRules::default());
}

#[test]
fn closing_a_deal_weighs_and_times_it() {
    let created = now() - Duration::days(42);
    let mut opp = Opportunity::new("Fleet renewal", Uuid::new_v4(), Uuid::new_v4(), dec("12500"), created);
    opp.probability = 35;
    assert_eq!(opp.calculate_weighted_amount(), dec("4375"));

    opp.status = OpportunityStatus::Won;
    opp.probability = 100;
    opp.actual_close_date = Some(now());
    assert_eq!(opp.calculate_sales_cycle(), Some(42));
    assert_eq!(opp.calculate_weighted_amount(), dec("12500"));
}

#[test]
fn tier_quote_honours_band() {
    let mut tier = PricingTier::new(Uuid::new_v4(), "Growth", dec("7.25"));
    tier.min_quantity = 10;
    tier.max_quantity = Some(100);
    tier.setup_fee = Some(dec("99"));

    assert_eq!(tier.calculate_price(9), None);
    assert_eq!(tier.calculate_price(10), Some(dec("171.50")));
    assert_eq!(tier.calculate_price(100), Some(dec("824")));
    assert_eq!(tier.calculate_price(101), None);
}
