//! Line, invoice, payment and opportunity money math.
//!
//! Every stored amount is rounded to cents as it is produced, so totals are
//! always the exact sum of the figures a reader sees on the document.

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{days_between, percent_of, round_money};
use crate::models::{
    Invoice, InvoiceItem, InvoiceStatus, Opportunity, OpportunityProduct, Payment, PricingTier,
};

fn percent_or_zero(base: &BigDecimal, percent: Option<&BigDecimal>) -> BigDecimal {
    match percent {
        Some(p) if !p.is_zero() => round_money(&percent_of(base, p)),
        _ => BigDecimal::zero(),
    }
}

impl InvoiceItem {
    /// Derives discount, tax and total for this line.
    ///
    /// Discount applies to `quantity × unit_price`; tax applies to the
    /// discounted amount. Missing percentages count as zero.
    pub fn calculate_total(&mut self) -> BigDecimal {
        let subtotal = round_money(&(&self.quantity * &self.unit_price));
        self.discount_amount = percent_or_zero(&subtotal, self.discount_percent.as_ref());
        let after_discount = subtotal - &self.discount_amount;
        self.tax_amount = percent_or_zero(&after_discount, self.tax_rate.as_ref());
        self.total_amount = after_discount + &self.tax_amount;
        self.total_amount.clone()
    }
}

impl Invoice {
    /// Rebuilds subtotal, tax, total and due from the current line items.
    ///
    /// Item totals already include item-level tax and the invoice rate is
    /// applied again on top of their sum.
    // TODO: confirm with billing whether invoice-level tax should skip lines
    // that carry their own tax_rate.
    pub fn calculate_totals(&mut self, items: &[InvoiceItem]) -> BigDecimal {
        self.subtotal = items.iter().map(|i| &i.total_amount).sum();
        self.tax_amount = percent_or_zero(&self.subtotal, self.tax_rate.as_ref());
        self.total_amount = &self.subtotal + &self.tax_amount - &self.discount_amount;
        self.due_amount = &self.total_amount - &self.paid_amount;
        self.total_amount.clone()
    }

    /// Applies a payment and moves the status forward.
    ///
    /// Fully settled invoices become `paid` and get a paid date; otherwise
    /// any money received marks them `partially_paid`.
    pub fn add_payment(&mut self, amount: &BigDecimal, now: DateTime<Utc>) {
        self.paid_amount = round_money(&(&self.paid_amount + amount));
        self.due_amount = &self.total_amount - &self.paid_amount;

        if self.due_amount <= BigDecimal::zero() {
            self.status = InvoiceStatus::Paid;
            self.paid_date = Some(now);
        } else if self.paid_amount > BigDecimal::zero() {
            self.status = InvoiceStatus::PartiallyPaid;
        }
    }

    /// Awaiting payment and past its due date.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        let awaiting = matches!(
            self.status,
            InvoiceStatus::Sent | InvoiceStatus::Viewed | InvoiceStatus::PartiallyPaid
        );
        awaiting && self.due_date.is_some_and(|due| now > due)
    }
}

impl Payment {
    pub fn calculate_net_amount(&mut self) -> BigDecimal {
        let fee = self.gateway_fee.clone().unwrap_or_else(BigDecimal::zero);
        let net = &self.amount - fee;
        self.net_amount = Some(net.clone());
        net
    }
}

impl Opportunity {
    /// `amount × probability / 100`, or zero when either is zero.
    pub fn calculate_weighted_amount(&mut self) -> BigDecimal {
        let weighted = if self.amount.is_zero() || self.probability == 0 {
            BigDecimal::zero()
        } else {
            round_money(&percent_of(&self.amount, &BigDecimal::from(self.probability)))
        };
        self.weighted_amount = Some(weighted.clone());
        weighted
    }

    /// Whole days from creation to close. Unchanged while the deal is open.
    pub fn calculate_sales_cycle(&mut self) -> Option<i32> {
        if let Some(closed) = self.actual_close_date {
            let days = days_between(self.created_at, closed);
            self.sales_cycle_days = Some(i32::try_from(days).unwrap_or(i32::MAX));
        }
        self.sales_cycle_days
    }

    pub fn advance_stage(&mut self, stage_id: Uuid, now: DateTime<Utc>) {
        self.stage_id = stage_id;
        self.stage_changed_at = now;
    }
}

impl OpportunityProduct {
    pub fn calculate_total(&mut self) -> BigDecimal {
        let subtotal = round_money(&(BigDecimal::from(self.quantity) * &self.unit_price));
        self.discount_amount = percent_or_zero(&subtotal, self.discount_percent.as_ref());
        self.total_amount = subtotal - &self.discount_amount;
        self.total_amount.clone()
    }
}

impl PricingTier {
    /// Price of `quantity` units on this tier, `None` outside its band.
    pub fn calculate_price(&self, quantity: i32) -> Option<BigDecimal> {
        if self.max_quantity.is_some_and(|max| quantity > max) {
            return None;
        }
        if quantity < self.min_quantity {
            return None;
        }
        let base = BigDecimal::from(quantity) * &self.unit_price;
        let setup = self.setup_fee.clone().unwrap_or_else(BigDecimal::zero);
        Some(round_money(&(base + setup)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentMethod;
    use chrono::Duration;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn invoice_with_item(now: DateTime<Utc>) -> (Invoice, Vec<InvoiceItem>) {
        let mut invoice = Invoice::new("INV-1001", Uuid::new_v4(), now);
        invoice.tax_rate = Some(dec("8"));
        let mut item = InvoiceItem::new(invoice.id, "Consulting", dec("2"), dec("100"));
        item.discount_percent = Some(dec("10"));
        item.tax_rate = Some(dec("5"));
        item.calculate_total();
        (invoice, vec![item])
    }

    #[test]
    fn item_discount_then_tax() {
        let (_, items) = invoice_with_item(Utc::now());
        let item = &items[0];
        assert_eq!(item.discount_amount, dec("20"));
        assert_eq!(item.tax_amount, dec("9"));
        assert_eq!(item.total_amount, dec("189"));
    }

    #[test]
    fn item_without_percentages_is_plain_product() {
        let mut item = InvoiceItem::new(Uuid::new_v4(), "Widget", dec("3"), dec("19.99"));
        assert_eq!(item.calculate_total(), dec("59.97"));
        assert!(item.discount_amount.is_zero());
        assert!(item.tax_amount.is_zero());
    }

    #[test]
    fn invoice_tax_stacks_on_item_tax() {
        let (mut invoice, items) = invoice_with_item(Utc::now());
        let total = invoice.calculate_totals(&items);
        assert_eq!(invoice.subtotal, dec("189"));
        assert_eq!(invoice.tax_amount, dec("15.12"));
        assert_eq!(total, dec("204.12"));
        assert_eq!(invoice.due_amount, dec("204.12"));
    }

    #[test]
    fn header_discount_reduces_total() {
        let (mut invoice, items) = invoice_with_item(Utc::now());
        invoice.discount_amount = dec("4.12");
        assert_eq!(invoice.calculate_totals(&items), dec("200"));
    }

    #[test]
    fn paying_in_full_settles_the_invoice() {
        let now = Utc::now();
        let (mut invoice, items) = invoice_with_item(now);
        invoice.status = InvoiceStatus::Sent;
        invoice.calculate_totals(&items);

        let total = invoice.total_amount.clone();
        invoice.add_payment(&total, now);
        assert!(invoice.due_amount.is_zero());
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.paid_date, Some(now));
    }

    #[test]
    fn partial_payment_then_remainder() {
        let now = Utc::now();
        let (mut invoice, items) = invoice_with_item(now);
        invoice.status = InvoiceStatus::Sent;
        invoice.calculate_totals(&items);

        invoice.add_payment(&dec("100"), now);
        assert_eq!(invoice.status, InvoiceStatus::PartiallyPaid);
        assert_eq!(invoice.due_amount, dec("104.12"));
        assert_eq!(invoice.paid_date, None);

        invoice.add_payment(&dec("104.12"), now);
        assert_eq!(invoice.status, InvoiceStatus::Paid);
    }

    #[test]
    fn overpayment_leaves_negative_due() {
        let now = Utc::now();
        let (mut invoice, items) = invoice_with_item(now);
        invoice.calculate_totals(&items);
        invoice.add_payment(&dec("250"), now);
        assert_eq!(invoice.due_amount, dec("-45.88"));
        assert_eq!(invoice.status, InvoiceStatus::Paid);
    }

    #[test]
    fn overdue_only_while_awaiting_payment() {
        let now = Utc::now();
        let mut invoice = Invoice::new("INV-2", Uuid::new_v4(), now);
        invoice.due_date = Some(now - Duration::days(1));
        assert!(!invoice.is_overdue(now), "drafts are never overdue");

        invoice.status = InvoiceStatus::Sent;
        assert!(invoice.is_overdue(now));

        invoice.status = InvoiceStatus::Paid;
        assert!(!invoice.is_overdue(now));

        invoice.status = InvoiceStatus::Viewed;
        invoice.due_date = None;
        assert!(!invoice.is_overdue(now));
    }

    #[test]
    fn payment_net_subtracts_fee() {
        let mut p = Payment::new(Uuid::new_v4(), dec("100"), PaymentMethod::Stripe, Utc::now());
        assert_eq!(p.calculate_net_amount(), dec("100"));
        p.gateway_fee = Some(dec("3.20"));
        assert_eq!(p.calculate_net_amount(), dec("96.80"));
        assert_eq!(p.net_amount, Some(dec("96.80")));
    }

    #[test]
    fn weighted_amount_follows_probability() {
        let now = Utc::now();
        let mut opp = Opportunity::new("Renewal", Uuid::new_v4(), Uuid::new_v4(), dec("12500"), now);
        assert!(opp.calculate_weighted_amount().is_zero());
        opp.probability = 35;
        assert_eq!(opp.calculate_weighted_amount(), dec("4375"));
        opp.probability = 100;
        assert_eq!(opp.calculate_weighted_amount(), dec("12500"));
    }

    #[test]
    fn sales_cycle_counts_whole_days() {
        let created = Utc::now();
        let mut opp = Opportunity::new("Deal", Uuid::new_v4(), Uuid::new_v4(), dec("1"), created);
        assert_eq!(opp.calculate_sales_cycle(), None);
        opp.actual_close_date = Some(created + Duration::days(42) + Duration::hours(23));
        assert_eq!(opp.calculate_sales_cycle(), Some(42));
    }

    #[test]
    fn advancing_stage_stamps_time() {
        let created = Utc::now();
        let mut opp = Opportunity::new("Deal", Uuid::new_v4(), Uuid::new_v4(), dec("1"), created);
        let next = Uuid::new_v4();
        let later = created + Duration::hours(5);
        opp.advance_stage(next, later);
        assert_eq!(opp.stage_id, next);
        assert_eq!(opp.stage_changed_at, later);
    }

    #[test]
    fn opportunity_line_is_discounted_but_untaxed() {
        let mut line = OpportunityProduct::new(Uuid::new_v4(), Uuid::new_v4(), 4, dec("250"));
        line.discount_percent = Some(dec("15"));
        assert_eq!(line.calculate_total(), dec("850"));
        assert_eq!(line.discount_amount, dec("150"));
    }

    #[test]
    fn tier_price_respects_band() {
        let mut tier = PricingTier::new(Uuid::new_v4(), "Team", dec("12.50"));
        tier.min_quantity = 5;
        tier.max_quantity = Some(50);
        tier.setup_fee = Some(dec("99"));

        assert_eq!(tier.calculate_price(4), None);
        assert_eq!(tier.calculate_price(51), None);
        assert_eq!(tier.calculate_price(5), Some(dec("161.50")));
        assert_eq!(tier.calculate_price(50), Some(dec("724")));

        tier.max_quantity = None;
        assert_eq!(tier.calculate_price(10_000), Some(dec("125099")));
    }
}
