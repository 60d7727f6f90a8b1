use crate::db_storage::CrmStorage;
use crate::errors::{AppError, ResultExt};
use crate::metrics::{
    customer_health_score, score_lead, FunnelCounters, HealthScoreRules, LeadScoringRules,
};
use crate::models::*;
use crate::tags::TagList;
use crate::validation;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

// ============ Leads ============

pub struct LeadService {
    storage: CrmStorage,
    rules: LeadScoringRules,
}

fn bump(field: &str, current: i32, delta: i32) -> Result<i32, AppError> {
    validation::non_negative_count(field, delta.into())?;
    current
        .checked_add(delta)
        .ok_or_else(|| AppError::ValidationError(format!("{} would overflow", field)))
}

/// Adds `count` events of `kind` to the lead's counters.
///
/// Direct contact also moves the contact dates; `last_contact_date` never
/// moves backwards for late-arriving events.
fn apply_interaction(
    lead: &mut Lead,
    kind: InteractionKind,
    count: i32,
    occurred_at: DateTime<Utc>,
) -> Result<(), AppError> {
    match kind {
        InteractionKind::WebsiteVisit => {
            lead.website_visits = bump("website_visits", lead.website_visits, count)?;
        }
        InteractionKind::EmailOpen => {
            lead.email_opens = bump("email_opens", lead.email_opens, count)?;
        }
        InteractionKind::EmailClick => {
            lead.email_clicks = bump("email_clicks", lead.email_clicks, count)?;
        }
        InteractionKind::Contact => {
            lead.total_interactions = bump("total_interactions", lead.total_interactions, count)?;
            if lead.first_contact_date.map_or(true, |first| occurred_at < first) {
                lead.first_contact_date = Some(occurred_at);
            }
            if lead.last_contact_date.map_or(true, |last| occurred_at > last) {
                lead.last_contact_date = Some(occurred_at);
            }
        }
    }
    Ok(())
}

fn score_response(lead_id: Uuid, b: &crate::metrics::LeadScoreBreakdown) -> LeadScoreResponse {
    LeadScoreResponse {
        lead_id,
        demographic_score: b.demographic_score,
        behavioral_score: b.behavioral_score,
        engagement_score: b.engagement_score,
        lead_score: b.lead_score,
        quality: b.quality,
    }
}

impl LeadService {
    pub fn new(pool: PgPool, rules: LeadScoringRules) -> Self {
        Self {
            storage: CrmStorage::new(pool),
            rules,
        }
    }

    /// Recomputes and stores the lead's scores from its current state.
    pub async fn rescore(&self, lead_id: Uuid) -> Result<LeadScoreResponse, AppError> {
        let now = Utc::now();
        let mut tx = self.storage.begin().await?;
        let mut lead = self
            .storage
            .lock_lead(&mut tx, lead_id)
            .await
            .context("loading lead for rescore")?;

        let breakdown = score_lead(&lead, now, &self.rules);
        lead.apply_score(&breakdown);
        self.storage.save_lead_activity(&mut tx, &lead).await?;
        tx.commit().await.map_err(AppError::DatabaseError)?;

        tracing::info!(
            "Lead {} rescored: {} ({})",
            lead_id,
            breakdown.lead_score,
            breakdown.quality
        );
        Ok(score_response(lead_id, &breakdown))
    }

    /// Records interaction events and rescores in the same transaction.
    pub async fn record_interaction(
        &self,
        lead_id: Uuid,
        event: &LeadInteraction,
    ) -> Result<LeadScoreResponse, AppError> {
        let count = event.count.unwrap_or(1);
        validation::non_negative_count("count", count.into())?;
        let now = Utc::now();
        let occurred_at = event.occurred_at.unwrap_or(now);

        let mut tx = self.storage.begin().await?;
        let mut lead = self
            .storage
            .lock_lead(&mut tx, lead_id)
            .await
            .context("loading lead for interaction")?;

        apply_interaction(&mut lead, event.kind, count, occurred_at)?;
        let breakdown = score_lead(&lead, now, &self.rules);
        lead.apply_score(&breakdown);

        self.storage.save_lead_activity(&mut tx, &lead).await?;
        tx.commit().await.map_err(AppError::DatabaseError)?;

        tracing::debug!(
            "Lead {}: +{} {} -> score {}",
            lead_id,
            count,
            event.kind,
            breakdown.lead_score
        );
        Ok(score_response(lead_id, &breakdown))
    }
}

// ============ Customers ============

pub struct CustomerService {
    storage: CrmStorage,
    rules: HealthScoreRules,
}

impl CustomerService {
    pub fn new(pool: PgPool, rules: HealthScoreRules) -> Self {
        Self {
            storage: CrmStorage::new(pool),
            rules,
        }
    }

    /// Health is evaluated on every read and never stored.
    pub async fn health_score(&self, customer_id: Uuid) -> Result<HealthScoreResponse, AppError> {
        let customer = self
            .storage
            .fetch_customer(customer_id)
            .await
            .context("loading customer for health score")?;
        if let Some(satisfaction) = &customer.satisfaction_score {
            validation::satisfaction(satisfaction)
                .with_context(|| format!("customer {}", customer.customer_number))?;
        }

        let now = Utc::now();
        let health_score = customer_health_score(&customer, now, &self.rules);
        tracing::debug!("Customer {} health score {}", customer_id, health_score);

        Ok(HealthScoreResponse {
            customer_id,
            display_name: customer.display_name(),
            health_score,
            computed_at: now,
        })
    }
}

// ============ Campaigns ============

pub struct CampaignService {
    storage: CrmStorage,
}

const DAILY_METRICS_LIMIT: i64 = 30;

macro_rules! apply_events {
    ($record:expr, $events:expr) => {{
        $record.sent_count = bump("sent", $record.sent_count, $events.sent)?;
        $record.delivered_count = bump("delivered", $record.delivered_count, $events.delivered)?;
        $record.opened_count = bump("opened", $record.opened_count, $events.opened)?;
        $record.clicked_count = bump("clicked", $record.clicked_count, $events.clicked)?;
        $record.converted_count = bump("converted", $record.converted_count, $events.converted)?;
        $record.unsubscribed_count =
            bump("unsubscribed", $record.unsubscribed_count, $events.unsubscribed)?;
        $record.bounced_count = bump("bounced", $record.bounced_count, $events.bounced)?;
    }};
}

fn validate_events(events: &CampaignEvents) -> Result<(), AppError> {
    for (field, value) in [
        ("sent", events.sent),
        ("delivered", events.delivered),
        ("opened", events.opened),
        ("clicked", events.clicked),
        ("converted", events.converted),
        ("unsubscribed", events.unsubscribed),
        ("bounced", events.bounced),
    ] {
        validation::non_negative_count(field, value.into())?;
    }
    Ok(())
}

/// Every stage holds at most what reached the stage before it, so each
/// rate stays within 0..=100.
fn ensure_funnel_order<C: FunnelCounters>(scope: &str, counters: &C) -> Result<(), AppError> {
    for (stage, count, previous, reached) in [
        ("delivered", counters.delivered(), "sent", counters.sent()),
        ("opened", counters.opened(), "delivered", counters.delivered()),
        ("clicked", counters.clicked(), "opened", counters.opened()),
        ("converted", counters.converted(), "clicked", counters.clicked()),
    ] {
        if count > reached {
            return Err(AppError::ValidationError(format!(
                "{scope}: {stage} ({count}) would exceed {previous} ({reached})"
            )));
        }
    }
    Ok(())
}

fn metrics_response(campaign: &Campaign, daily: Vec<CampaignMetric>) -> CampaignMetricsResponse {
    CampaignMetricsResponse {
        campaign_id: campaign.id,
        sent_count: campaign.sent_count,
        delivered_count: campaign.delivered_count,
        opened_count: campaign.opened_count,
        clicked_count: campaign.clicked_count,
        converted_count: campaign.converted_count,
        delivery_rate: campaign.delivery_rate.clone(),
        open_rate: campaign.open_rate.clone(),
        click_rate: campaign.click_rate.clone(),
        conversion_rate: campaign.conversion_rate.clone(),
        daily,
    }
}

impl CampaignService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            storage: CrmStorage::new(pool),
        }
    }

    /// Adds event counts to the campaign and to its row for the day, then
    /// recomputes both sets of rates.
    pub async fn record_events(
        &self,
        campaign_id: Uuid,
        events: &CampaignEvents,
    ) -> Result<CampaignMetricsResponse, AppError> {
        validate_events(events)?;
        let day = events.metric_date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.storage.begin().await?;
        let mut campaign = self
            .storage
            .lock_campaign(&mut tx, campaign_id)
            .await
            .context("loading campaign for events")?;
        let mut daily = self
            .storage
            .lock_campaign_metric(&mut tx, campaign_id, day)
            .await
            .context("loading daily campaign metric")?;

        apply_events!(campaign, events);
        apply_events!(daily, events);
        ensure_funnel_order("campaign totals", &campaign)?;
        ensure_funnel_order(&format!("daily metrics for {}", day), &daily)?;
        campaign.calculate_metrics();
        daily.calculate_rates();

        self.storage.save_campaign_counters(&mut tx, &campaign).await?;
        self.storage.save_campaign_metric(&mut tx, &daily).await?;
        tx.commit().await.map_err(AppError::DatabaseError)?;

        tracing::info!(
            "Campaign {} events recorded for {}: delivery={:?} open={:?}",
            campaign_id,
            day,
            campaign.delivery_rate,
            campaign.open_rate
        );
        Ok(metrics_response(&campaign, vec![daily]))
    }

    pub async fn metrics(&self, campaign_id: Uuid) -> Result<CampaignMetricsResponse, AppError> {
        let campaign = self
            .storage
            .fetch_campaign(campaign_id)
            .await
            .context("loading campaign metrics")?;
        let daily = self
            .storage
            .list_campaign_metrics(campaign_id, DAILY_METRICS_LIMIT)
            .await?;
        Ok(metrics_response(&campaign, daily))
    }
}

// ============ Invoices ============

pub struct InvoiceService {
    storage: CrmStorage,
    default_currency: String,
}

fn ensure_editable(invoice: &Invoice) -> Result<(), AppError> {
    match invoice.status {
        InvoiceStatus::Paid | InvoiceStatus::Cancelled | InvoiceStatus::Refunded => {
            Err(AppError::Conflict(format!(
                "invoice {} is {} and cannot be changed",
                invoice.invoice_number, invoice.status
            )))
        }
        _ => Ok(()),
    }
}

fn payment_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("PAY-{}-{}", now.format("%Y%m%d"), suffix[..8].to_uppercase())
}

/// Invoices stored without a currency are billed in the configured default.
fn settle_currency(invoice: &mut Invoice, default_currency: &str) {
    if invoice.currency.trim().is_empty() {
        invoice.currency = default_currency.to_string();
    }
}

impl InvoiceService {
    pub fn new(pool: PgPool, default_currency: impl Into<String>) -> Self {
        Self {
            storage: CrmStorage::new(pool),
            default_currency: default_currency.into(),
        }
    }

    pub async fn add_item(
        &self,
        invoice_id: Uuid,
        input: &NewInvoiceItem,
    ) -> Result<InvoiceSummary, AppError> {
        if input.description.trim().is_empty() {
            return Err(AppError::ValidationError(
                "description must not be empty".to_string(),
            ));
        }
        validation::positive_quantity("quantity", &input.quantity)?;
        validation::non_negative_amount("unit_price", &input.unit_price)?;
        if let Some(p) = &input.discount_percent {
            validation::percent("discount_percent", p)?;
        }
        if let Some(p) = &input.tax_rate {
            validation::percent("tax_rate", p)?;
        }

        let mut tx = self.storage.begin().await?;
        let mut invoice = self
            .storage
            .lock_invoice(&mut tx, invoice_id)
            .await
            .context("loading invoice for new item")?;
        ensure_editable(&invoice)?;

        let mut items = self.storage.invoice_items(&mut tx, invoice_id).await?;
        let mut item = InvoiceItem::new(
            invoice_id,
            input.description.trim(),
            input.quantity.clone(),
            input.unit_price.clone(),
        );
        item.product_id = input.product_id;
        item.discount_percent = input.discount_percent.clone();
        item.tax_rate = input.tax_rate.clone();
        item.sort_order = i32::try_from(items.len()).unwrap_or(i32::MAX);
        item.calculate_total();

        self.storage.insert_invoice_item(&mut tx, &item).await?;
        items.push(item);
        invoice.calculate_totals(&items);
        self.storage.save_invoice_amounts(&mut tx, &invoice).await?;
        tx.commit().await.map_err(AppError::DatabaseError)?;

        tracing::info!(
            "Invoice {} item added, total now {}",
            invoice.invoice_number,
            invoice.total_amount
        );
        Ok(InvoiceSummary::new(&invoice, items.len(), Utc::now()))
    }

    /// Rebuilds invoice amounts from the stored items.
    pub async fn recalculate(&self, invoice_id: Uuid) -> Result<InvoiceSummary, AppError> {
        let mut tx = self.storage.begin().await?;
        let mut invoice = self
            .storage
            .lock_invoice(&mut tx, invoice_id)
            .await
            .context("loading invoice for recalculation")?;
        let items = self.storage.invoice_items(&mut tx, invoice_id).await?;

        invoice.calculate_totals(&items);
        self.storage.save_invoice_amounts(&mut tx, &invoice).await?;
        tx.commit().await.map_err(AppError::DatabaseError)?;

        Ok(InvoiceSummary::new(&invoice, items.len(), Utc::now()))
    }

    /// Records a completed payment against the invoice and updates its balance.
    pub async fn record_payment(
        &self,
        invoice_id: Uuid,
        input: &NewPayment,
    ) -> Result<PaymentReceipt, AppError> {
        validation::payment_amount(&input.amount)?;
        if let Some(fee) = &input.gateway_fee {
            validation::non_negative_amount("gateway_fee", fee)?;
        }
        if let Some(currency) = &input.currency {
            validation::currency_code(currency)?;
        }

        let now = Utc::now();
        let mut tx = self.storage.begin().await?;
        let mut invoice = self
            .storage
            .lock_invoice(&mut tx, invoice_id)
            .await
            .context("loading invoice for payment")?;
        ensure_editable(&invoice)?;
        settle_currency(&mut invoice, &self.default_currency);

        if let Some(currency) = &input.currency {
            if *currency != invoice.currency {
                return Err(AppError::ValidationError(format!(
                    "payment currency {} does not match invoice currency {}",
                    currency, invoice.currency
                )));
            }
        }

        let mut payment = Payment::new(
            invoice.customer_id,
            input.amount.clone(),
            input.payment_method,
            now,
        );
        payment.payment_number = payment_number(now);
        payment.invoice_id = Some(invoice_id);
        payment.currency = invoice.currency.clone();
        payment.status = PaymentStatus::Completed;
        payment.gateway_fee = input.gateway_fee.clone();
        payment.transaction_id = input.transaction_id.clone();
        let net_amount = payment.calculate_net_amount();

        self.storage.insert_payment(&mut tx, &payment).await?;
        invoice.add_payment(&payment.amount, now);
        self.storage.save_invoice_amounts(&mut tx, &invoice).await?;
        let item_count = self.storage.invoice_items(&mut tx, invoice_id).await?.len();
        tx.commit().await.map_err(AppError::DatabaseError)?;

        tracing::info!(
            "Payment {} applied to invoice {}: due {} ({})",
            payment.payment_number,
            invoice.invoice_number,
            invoice.due_amount,
            invoice.status
        );

        Ok(PaymentReceipt {
            payment_id: payment.id,
            payment_number: payment.payment_number,
            amount: payment.amount,
            net_amount,
            invoice: InvoiceSummary::new(&invoice, item_count, now),
        })
    }
}

// ============ Opportunities ============

pub struct OpportunityService {
    storage: CrmStorage,
}

fn ensure_open(opportunity: &Opportunity) -> Result<(), AppError> {
    if opportunity.status != OpportunityStatus::Open {
        return Err(AppError::Conflict(format!(
            "opportunity {} is already {}",
            opportunity.id, opportunity.status
        )));
    }
    Ok(())
}

impl OpportunityService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            storage: CrmStorage::new(pool),
        }
    }

    pub async fn update_probability(
        &self,
        opportunity_id: Uuid,
        update: &ProbabilityUpdate,
    ) -> Result<OpportunitySummary, AppError> {
        validation::probability(update.probability)?;

        let mut tx = self.storage.begin().await?;
        let mut opportunity = self
            .storage
            .lock_opportunity(&mut tx, opportunity_id)
            .await
            .context("loading opportunity for probability update")?;
        ensure_open(&opportunity)?;

        opportunity.probability = update.probability;
        if let Some(stage_id) = update.stage_id.filter(|s| *s != opportunity.stage_id) {
            opportunity.advance_stage(stage_id, Utc::now());
        }
        opportunity.calculate_weighted_amount();

        self.storage.save_opportunity(&mut tx, &opportunity).await?;
        tx.commit().await.map_err(AppError::DatabaseError)?;

        Ok(OpportunitySummary::from(&opportunity))
    }

    /// Closes the deal. Won deals weigh their full amount, lost and
    /// abandoned ones weigh nothing.
    pub async fn close(
        &self,
        opportunity_id: Uuid,
        request: &CloseOpportunity,
    ) -> Result<OpportunitySummary, AppError> {
        let probability = match request.outcome {
            OpportunityStatus::Won => 100,
            OpportunityStatus::Lost | OpportunityStatus::Abandoned => 0,
            OpportunityStatus::Open => {
                return Err(AppError::ValidationError(
                    "outcome must be won, lost or abandoned".to_string(),
                ))
            }
        };

        let mut tx = self.storage.begin().await?;
        let mut opportunity = self
            .storage
            .lock_opportunity(&mut tx, opportunity_id)
            .await
            .context("loading opportunity for close")?;
        ensure_open(&opportunity)?;

        let closed_at = request.closed_at.unwrap_or_else(Utc::now);
        if closed_at < opportunity.created_at {
            return Err(AppError::ValidationError(
                "closed_at must not precede the opportunity's creation".to_string(),
            ));
        }

        opportunity.status = request.outcome;
        opportunity.probability = probability;
        opportunity.actual_close_date = Some(closed_at);
        opportunity.calculate_sales_cycle();
        opportunity.calculate_weighted_amount();

        self.storage.save_opportunity(&mut tx, &opportunity).await?;
        tx.commit().await.map_err(AppError::DatabaseError)?;

        tracing::info!(
            "Opportunity {} closed as {} after {:?} days",
            opportunity_id,
            opportunity.status,
            opportunity.sales_cycle_days
        );
        Ok(OpportunitySummary::from(&opportunity))
    }
}

// ============ Catalog ============

pub struct CatalogService {
    storage: CrmStorage,
}

impl CatalogService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            storage: CrmStorage::new(pool),
        }
    }

    pub async fn quote(&self, tier_id: Uuid, quantity: i32) -> Result<PriceQuote, AppError> {
        validation::positive_quantity("quantity", &BigDecimal::from(quantity))?;
        let tier = self
            .storage
            .fetch_pricing_tier(tier_id)
            .await
            .context("loading pricing tier")?;

        Ok(PriceQuote {
            pricing_tier_id: tier_id,
            quantity,
            price: tier.calculate_price(quantity),
        })
    }

    pub async fn stock_status(&self, product_id: Uuid) -> Result<StockStatus, AppError> {
        let product = self
            .storage
            .fetch_product(product_id)
            .await
            .context("loading product stock")?;

        Ok(StockStatus {
            product_id,
            track_inventory: product.track_inventory,
            stock_quantity: product.stock_quantity,
            is_low_stock: product.is_low_stock(),
            is_out_of_stock: product.is_out_of_stock(),
        })
    }
}

// ============ Labels ============

/// Add and remove for every JSON list column: tags, competitors, features.
pub struct TagService {
    storage: CrmStorage,
}

impl TagService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            storage: CrmStorage::new(pool),
        }
    }

    async fn edit(
        &self,
        table: &'static str,
        column: &'static str,
        id: Uuid,
        edit: impl FnOnce(&mut TagList) -> bool,
    ) -> Result<LabelsResponse, AppError> {
        let mut tx = self.storage.begin().await?;
        let mut values = self
            .storage
            .lock_labels(&mut tx, table, column, id)
            .await
            .with_context(|| format!("loading {}.{}", table, column))?;

        let changed = edit(&mut values);
        if changed {
            self.storage
                .save_labels(&mut tx, table, column, id, &values)
                .await?;
        }
        tx.commit().await.map_err(AppError::DatabaseError)?;

        Ok(LabelsResponse {
            id,
            values,
            changed,
        })
    }

    pub async fn add_tag(
        &self,
        target: TagTarget,
        id: Uuid,
        tag: &str,
    ) -> Result<LabelsResponse, AppError> {
        let tag = validation::tag(tag)?;
        self.edit(target.as_str(), "tags", id, |tags| tags.add(tag))
            .await
    }

    pub async fn remove_tag(
        &self,
        target: TagTarget,
        id: Uuid,
        tag: &str,
    ) -> Result<LabelsResponse, AppError> {
        let tag = validation::tag(tag)?;
        self.edit(target.as_str(), "tags", id, |tags| tags.remove(&tag))
            .await
    }

    pub async fn add_competitor(&self, opportunity_id: Uuid, name: &str) -> Result<LabelsResponse, AppError> {
        let name = validation::tag(name)?;
        self.edit("opportunities", "competitors", opportunity_id, |c| c.add(name))
            .await
    }

    pub async fn remove_competitor(
        &self,
        opportunity_id: Uuid,
        name: &str,
    ) -> Result<LabelsResponse, AppError> {
        let name = validation::tag(name)?;
        self.edit("opportunities", "competitors", opportunity_id, |c| c.remove(&name))
            .await
    }

    pub async fn add_feature(&self, product_id: Uuid, feature: &str) -> Result<LabelsResponse, AppError> {
        let feature = validation::tag(feature)?;
        self.edit("products", "features", product_id, |f| f.add(feature))
            .await
    }

    pub async fn remove_feature(
        &self,
        product_id: Uuid,
        feature: &str,
    ) -> Result<LabelsResponse, AppError> {
        let feature = validation::tag(feature)?;
        self.edit("products", "features", product_id, |f| f.remove(&feature))
            .await
    }
}

// ============ Activities, Tasks & Tickets ============

pub struct WorkItemService {
    storage: CrmStorage,
}

impl WorkItemService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            storage: CrmStorage::new(pool),
        }
    }

    pub async fn complete_activity(
        &self,
        activity_id: Uuid,
        request: &CompleteActivity,
    ) -> Result<ActivityTiming, AppError> {
        let mut tx = self.storage.begin().await?;
        let mut activity = self
            .storage
            .lock_activity(&mut tx, activity_id)
            .await
            .context("loading activity")?;
        if matches!(
            activity.status,
            ActivityStatus::Completed | ActivityStatus::Cancelled
        ) {
            return Err(AppError::Conflict(format!(
                "activity {} is already {}",
                activity_id, activity.status
            )));
        }

        let now = Utc::now();
        let was_overdue = activity.is_overdue(now);
        activity.mark_completed(now, request.outcome.clone());
        self.storage
            .save_activity_completion(&mut tx, &activity)
            .await?;
        tx.commit().await.map_err(AppError::DatabaseError)?;

        Ok(ActivityTiming {
            activity_id,
            status: activity.status,
            completed_at: activity.completed_at,
            duration_minutes: activity.duration_minutes,
            was_overdue,
        })
    }

    pub async fn complete_task(&self, task_id: Uuid) -> Result<TaskTiming, AppError> {
        let mut tx = self.storage.begin().await?;
        let mut task = self
            .storage
            .lock_task(&mut tx, task_id)
            .await
            .context("loading task")?;
        if task.status == ActivityStatus::Completed {
            return Err(AppError::Conflict(format!("task {} is already completed", task_id)));
        }

        let now = Utc::now();
        let was_overdue = task.is_overdue(now);
        task.mark_completed(now);
        self.storage.save_task_completion(&mut tx, &task).await?;
        tx.commit().await.map_err(AppError::DatabaseError)?;

        Ok(TaskTiming {
            task_id,
            status: task.status,
            completed_at: task.completed_at,
            progress_percent: task.progress_percent,
            was_overdue,
        })
    }

    /// Stamps the first agent response. Later responses do not move it.
    pub async fn record_ticket_response(&self, ticket_id: Uuid) -> Result<TicketTiming, AppError> {
        let mut tx = self.storage.begin().await?;
        let mut ticket = self
            .storage
            .lock_ticket(&mut tx, ticket_id)
            .await
            .context("loading ticket")?;

        if ticket.first_response_at.is_none() {
            ticket.first_response_at = Some(Utc::now());
            ticket.calculate_first_response_time();
            if ticket.status == TicketStatus::Open {
                ticket.status = TicketStatus::InProgress;
            }
            self.storage.save_ticket_timing(&mut tx, &ticket).await?;
        }
        tx.commit().await.map_err(AppError::DatabaseError)?;

        Ok(ticket_timing(&ticket))
    }

    pub async fn resolve_ticket(&self, ticket_id: Uuid) -> Result<TicketTiming, AppError> {
        let mut tx = self.storage.begin().await?;
        let mut ticket = self
            .storage
            .lock_ticket(&mut tx, ticket_id)
            .await
            .context("loading ticket")?;
        if matches!(
            ticket.status,
            TicketStatus::Resolved | TicketStatus::Closed | TicketStatus::Cancelled
        ) {
            return Err(AppError::Conflict(format!(
                "ticket {} is already {}",
                ticket.ticket_number, ticket.status
            )));
        }

        ticket.status = TicketStatus::Resolved;
        ticket.resolved_at = Some(Utc::now());
        ticket.calculate_resolution_time();
        self.storage.save_ticket_timing(&mut tx, &ticket).await?;
        tx.commit().await.map_err(AppError::DatabaseError)?;

        tracing::info!(
            "Ticket {} resolved in {:?} minutes",
            ticket.ticket_number,
            ticket.resolution_time_minutes
        );
        Ok(ticket_timing(&ticket))
    }
}

fn ticket_timing(ticket: &Ticket) -> TicketTiming {
    TicketTiming {
        ticket_id: ticket.id,
        status: ticket.status,
        first_response_time_minutes: ticket.first_response_time_minutes,
        resolution_time_minutes: ticket.resolution_time_minutes,
    }
}
