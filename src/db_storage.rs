use crate::errors::AppError;
use crate::models::*;
use crate::tags::TagList;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};
use std::str::FromStr;
use uuid::Uuid;

/// Database storage for CRM records and their derived fields.
///
/// Loads used by a recompute take a row lock (`FOR UPDATE`) on the caller's
/// transaction, so the inputs cannot change between reading them and
/// writing the derived values back.
#[derive(Clone)]
pub struct CrmStorage {
    pool: PgPool,
}

fn decode_enum<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: UnknownVariant| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn decode_opt_enum<T>(row: &PgRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| {
        s.parse().map_err(|e: UnknownVariant| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
    })
    .transpose()
}

fn decode_list(row: &PgRow, column: &str) -> Result<TagList, sqlx::Error> {
    let raw: Option<Json<Vec<String>>> = row.try_get(column)?;
    Ok(raw.map(|Json(values)| TagList::from(values)).unwrap_or_default())
}

fn not_found(kind: &str, id: Uuid) -> AppError {
    AppError::NotFound(format!("{} {} not found", kind, id))
}

// ============ Row mapping ============

const LEAD_COLUMNS: &str = r#"
    id, lead_number, first_name, last_name, company_name, job_title, email,
    status::text AS status, quality::text AS quality,
    lead_score, demographic_score, behavioral_score, engagement_score,
    company_size::text AS company_size, annual_revenue,
    website_visits, email_opens, email_clicks, total_interactions,
    first_contact_date, last_contact_date, tags, created_at, updated_at
"#;

fn lead_from_row(row: &PgRow) -> Result<Lead, sqlx::Error> {
    Ok(Lead {
        id: row.try_get("id")?,
        lead_number: row.try_get("lead_number")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        company_name: row.try_get("company_name")?,
        job_title: row.try_get("job_title")?,
        email: row.try_get("email")?,
        status: decode_enum(row, "status")?,
        quality: decode_opt_enum(row, "quality")?,
        lead_score: row.try_get("lead_score")?,
        demographic_score: row.try_get("demographic_score")?,
        behavioral_score: row.try_get("behavioral_score")?,
        engagement_score: row.try_get("engagement_score")?,
        company_size: decode_opt_enum(row, "company_size")?,
        annual_revenue: row.try_get("annual_revenue")?,
        website_visits: row.try_get("website_visits")?,
        email_opens: row.try_get("email_opens")?,
        email_clicks: row.try_get("email_clicks")?,
        total_interactions: row.try_get("total_interactions")?,
        first_contact_date: row.try_get("first_contact_date")?,
        last_contact_date: row.try_get("last_contact_date")?,
        tags: decode_list(row, "tags")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const CUSTOMER_COLUMNS: &str = r#"
    id, customer_number, name, customer_type::text AS customer_type, status::text AS status,
    first_name, last_name, email, engagement_score, satisfaction_score,
    last_contact_date, total_revenue, tags, created_at, updated_at
"#;

fn customer_from_row(row: &PgRow) -> Result<Customer, sqlx::Error> {
    Ok(Customer {
        id: row.try_get("id")?,
        customer_number: row.try_get("customer_number")?,
        name: row.try_get("name")?,
        customer_type: decode_enum(row, "customer_type")?,
        status: decode_enum(row, "status")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        engagement_score: row.try_get("engagement_score")?,
        satisfaction_score: row.try_get("satisfaction_score")?,
        last_contact_date: row.try_get("last_contact_date")?,
        total_revenue: row.try_get("total_revenue")?,
        tags: decode_list(row, "tags")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const CAMPAIGN_COLUMNS: &str = r#"
    id, name, campaign_type::text AS campaign_type, status::text AS status,
    sent_count, delivered_count, opened_count, clicked_count, converted_count,
    unsubscribed_count, bounced_count,
    delivery_rate, open_rate, click_rate, conversion_rate,
    tags, created_at, updated_at
"#;

fn campaign_from_row(row: &PgRow) -> Result<Campaign, sqlx::Error> {
    Ok(Campaign {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        campaign_type: decode_enum(row, "campaign_type")?,
        status: decode_enum(row, "status")?,
        sent_count: row.try_get("sent_count")?,
        delivered_count: row.try_get("delivered_count")?,
        opened_count: row.try_get("opened_count")?,
        clicked_count: row.try_get("clicked_count")?,
        converted_count: row.try_get("converted_count")?,
        unsubscribed_count: row.try_get("unsubscribed_count")?,
        bounced_count: row.try_get("bounced_count")?,
        delivery_rate: row.try_get("delivery_rate")?,
        open_rate: row.try_get("open_rate")?,
        click_rate: row.try_get("click_rate")?,
        conversion_rate: row.try_get("conversion_rate")?,
        tags: decode_list(row, "tags")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const CAMPAIGN_METRIC_COLUMNS: &str = r#"
    id, campaign_id, metric_date,
    sent_count, delivered_count, opened_count, clicked_count, converted_count,
    unsubscribed_count, bounced_count,
    delivery_rate, open_rate, click_rate, conversion_rate
"#;

fn campaign_metric_from_row(row: &PgRow) -> Result<CampaignMetric, sqlx::Error> {
    Ok(CampaignMetric {
        id: row.try_get("id")?,
        campaign_id: row.try_get("campaign_id")?,
        metric_date: row.try_get("metric_date")?,
        sent_count: row.try_get("sent_count")?,
        delivered_count: row.try_get("delivered_count")?,
        opened_count: row.try_get("opened_count")?,
        clicked_count: row.try_get("clicked_count")?,
        converted_count: row.try_get("converted_count")?,
        unsubscribed_count: row.try_get("unsubscribed_count")?,
        bounced_count: row.try_get("bounced_count")?,
        delivery_rate: row.try_get("delivery_rate")?,
        open_rate: row.try_get("open_rate")?,
        click_rate: row.try_get("click_rate")?,
        conversion_rate: row.try_get("conversion_rate")?,
    })
}

const INVOICE_COLUMNS: &str = r#"
    id, invoice_number, customer_id, opportunity_id, status::text AS status,
    subtotal, tax_amount, discount_amount, total_amount, paid_amount, due_amount,
    tax_rate, currency, issue_date, due_date, sent_date, paid_date, created_at, updated_at
"#;

fn invoice_from_row(row: &PgRow) -> Result<Invoice, sqlx::Error> {
    Ok(Invoice {
        id: row.try_get("id")?,
        invoice_number: row.try_get("invoice_number")?,
        customer_id: row.try_get("customer_id")?,
        opportunity_id: row.try_get("opportunity_id")?,
        status: decode_enum(row, "status")?,
        subtotal: row.try_get("subtotal")?,
        tax_amount: row.try_get("tax_amount")?,
        discount_amount: row.try_get("discount_amount")?,
        total_amount: row.try_get("total_amount")?,
        paid_amount: row.try_get("paid_amount")?,
        due_amount: row.try_get("due_amount")?,
        tax_rate: row.try_get("tax_rate")?,
        currency: row
            .try_get::<Option<String>, _>("currency")?
            .unwrap_or_default(),
        issue_date: row.try_get("issue_date")?,
        due_date: row.try_get("due_date")?,
        sent_date: row.try_get("sent_date")?,
        paid_date: row.try_get("paid_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn invoice_item_from_row(row: &PgRow) -> Result<InvoiceItem, sqlx::Error> {
    Ok(InvoiceItem {
        id: row.try_get("id")?,
        invoice_id: row.try_get("invoice_id")?,
        product_id: row.try_get("product_id")?,
        description: row.try_get("description")?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("unit_price")?,
        discount_percent: row.try_get("discount_percent")?,
        discount_amount: row.try_get("discount_amount")?,
        tax_rate: row.try_get("tax_rate")?,
        tax_amount: row.try_get("tax_amount")?,
        total_amount: row.try_get("total_amount")?,
        sort_order: row.try_get("sort_order")?,
    })
}

const OPPORTUNITY_COLUMNS: &str = r#"
    id, name, customer_id, stage_id, status::text AS status, priority::text AS priority,
    amount, probability, weighted_amount, expected_close_date, actual_close_date,
    sales_cycle_days, stage_changed_at, competitors, tags, created_at, updated_at
"#;

fn opportunity_from_row(row: &PgRow) -> Result<Opportunity, sqlx::Error> {
    Ok(Opportunity {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        customer_id: row.try_get("customer_id")?,
        stage_id: row.try_get("stage_id")?,
        status: decode_enum(row, "status")?,
        priority: decode_enum(row, "priority")?,
        amount: row.try_get("amount")?,
        probability: row.try_get("probability")?,
        weighted_amount: row.try_get("weighted_amount")?,
        expected_close_date: row.try_get("expected_close_date")?,
        actual_close_date: row.try_get("actual_close_date")?,
        sales_cycle_days: row.try_get("sales_cycle_days")?,
        stage_changed_at: row.try_get("stage_changed_at")?,
        competitors: decode_list(row, "competitors")?,
        tags: decode_list(row, "tags")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: row.try_get("id")?,
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        status: decode_enum(row, "status")?,
        base_price: row.try_get("base_price")?,
        currency: row.try_get("currency")?,
        pricing_type: decode_enum(row, "pricing_type")?,
        track_inventory: row.try_get("track_inventory")?,
        stock_quantity: row.try_get("stock_quantity")?,
        low_stock_threshold: row.try_get("low_stock_threshold")?,
        features: decode_list(row, "features")?,
        tags: decode_list(row, "tags")?,
    })
}

fn pricing_tier_from_row(row: &PgRow) -> Result<PricingTier, sqlx::Error> {
    Ok(PricingTier {
        id: row.try_get("id")?,
        product_id: row.try_get("product_id")?,
        name: row.try_get("name")?,
        min_quantity: row.try_get("min_quantity")?,
        max_quantity: row.try_get("max_quantity")?,
        unit_price: row.try_get("unit_price")?,
        setup_fee: row.try_get("setup_fee")?,
        features: decode_list(row, "features")?,
    })
}

fn activity_from_row(row: &PgRow) -> Result<Activity, sqlx::Error> {
    Ok(Activity {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        activity_type: decode_enum(row, "activity_type")?,
        status: decode_enum(row, "status")?,
        priority: decode_enum(row, "priority")?,
        scheduled_at: row.try_get("scheduled_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        duration_minutes: row.try_get("duration_minutes")?,
        outcome: row.try_get("outcome")?,
        created_at: row.try_get("created_at")?,
    })
}

fn task_from_row(row: &PgRow) -> Result<Task, sqlx::Error> {
    Ok(Task {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        status: decode_enum(row, "status")?,
        priority: decode_enum(row, "priority")?,
        due_date: row.try_get("due_date")?,
        completed_at: row.try_get("completed_at")?,
        progress_percent: row.try_get("progress_percent")?,
        tags: decode_list(row, "tags")?,
        created_at: row.try_get("created_at")?,
    })
}

fn ticket_from_row(row: &PgRow) -> Result<Ticket, sqlx::Error> {
    Ok(Ticket {
        id: row.try_get("id")?,
        ticket_number: row.try_get("ticket_number")?,
        subject: row.try_get("subject")?,
        status: decode_enum(row, "status")?,
        priority: decode_enum(row, "priority")?,
        first_response_at: row.try_get("first_response_at")?,
        first_response_time_minutes: row.try_get("first_response_time_minutes")?,
        resolved_at: row.try_get("resolved_at")?,
        resolution_time_minutes: row.try_get("resolution_time_minutes")?,
        tags: decode_list(row, "tags")?,
        created_at: row.try_get("created_at")?,
    })
}

impl CrmStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens the transaction a business event runs in.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        self.pool.begin().await.map_err(AppError::DatabaseError)
    }

    // ============ Leads ============

    pub async fn lock_lead(&self, conn: &mut PgConnection, id: Uuid) -> Result<Lead, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM leads WHERE id = $1 FOR UPDATE",
            LEAD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| not_found("Lead", id))?;

        Ok(lead_from_row(&row)?)
    }

    /// Writes interaction counters, contact dates and all score fields together.
    pub async fn save_lead_activity(
        &self,
        conn: &mut PgConnection,
        lead: &Lead,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE leads
            SET website_visits = $2,
                email_opens = $3,
                email_clicks = $4,
                total_interactions = $5,
                first_contact_date = $6,
                last_contact_date = $7,
                demographic_score = $8,
                behavioral_score = $9,
                engagement_score = $10,
                lead_score = $11,
                quality = $12,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(lead.id)
        .bind(lead.website_visits)
        .bind(lead.email_opens)
        .bind(lead.email_clicks)
        .bind(lead.total_interactions)
        .bind(lead.first_contact_date)
        .bind(lead.last_contact_date)
        .bind(lead.demographic_score)
        .bind(lead.behavioral_score)
        .bind(lead.engagement_score)
        .bind(lead.lead_score)
        .bind(lead.quality.map(|q| q.as_str()))
        .execute(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(())
    }

    // ============ Customers ============

    pub async fn fetch_customer(&self, id: Uuid) -> Result<Customer, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM customers WHERE id = $1", CUSTOMER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?
            .ok_or_else(|| not_found("Customer", id))?;

        Ok(customer_from_row(&row)?)
    }

    // ============ Campaigns ============

    pub async fn fetch_campaign(&self, id: Uuid) -> Result<Campaign, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM campaigns WHERE id = $1", CAMPAIGN_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?
            .ok_or_else(|| not_found("Campaign", id))?;

        Ok(campaign_from_row(&row)?)
    }

    pub async fn lock_campaign(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Campaign, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM campaigns WHERE id = $1 FOR UPDATE",
            CAMPAIGN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| not_found("Campaign", id))?;

        Ok(campaign_from_row(&row)?)
    }

    pub async fn save_campaign_counters(
        &self,
        conn: &mut PgConnection,
        campaign: &Campaign,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE campaigns
            SET sent_count = $2,
                delivered_count = $3,
                opened_count = $4,
                clicked_count = $5,
                converted_count = $6,
                unsubscribed_count = $7,
                bounced_count = $8,
                delivery_rate = $9,
                open_rate = $10,
                click_rate = $11,
                conversion_rate = $12,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(campaign.id)
        .bind(campaign.sent_count)
        .bind(campaign.delivered_count)
        .bind(campaign.opened_count)
        .bind(campaign.clicked_count)
        .bind(campaign.converted_count)
        .bind(campaign.unsubscribed_count)
        .bind(campaign.bounced_count)
        .bind(&campaign.delivery_rate)
        .bind(&campaign.open_rate)
        .bind(&campaign.click_rate)
        .bind(&campaign.conversion_rate)
        .execute(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(())
    }

    /// Locks the metric row for `(campaign_id, day)`, creating an empty one first if needed.
    pub async fn lock_campaign_metric(
        &self,
        conn: &mut PgConnection,
        campaign_id: Uuid,
        day: NaiveDate,
    ) -> Result<CampaignMetric, AppError> {
        sqlx::query(
            r#"
            INSERT INTO campaign_metrics (id, campaign_id, metric_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (campaign_id, metric_date) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(campaign_id)
        .bind(day)
        .execute(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM campaign_metrics WHERE campaign_id = $1 AND metric_date = $2 FOR UPDATE",
            CAMPAIGN_METRIC_COLUMNS
        ))
        .bind(campaign_id)
        .bind(day)
        .fetch_one(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(campaign_metric_from_row(&row)?)
    }

    pub async fn save_campaign_metric(
        &self,
        conn: &mut PgConnection,
        metric: &CampaignMetric,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE campaign_metrics
            SET sent_count = $2,
                delivered_count = $3,
                opened_count = $4,
                clicked_count = $5,
                converted_count = $6,
                unsubscribed_count = $7,
                bounced_count = $8,
                delivery_rate = $9,
                open_rate = $10,
                click_rate = $11,
                conversion_rate = $12
            WHERE id = $1
            "#,
        )
        .bind(metric.id)
        .bind(metric.sent_count)
        .bind(metric.delivered_count)
        .bind(metric.opened_count)
        .bind(metric.clicked_count)
        .bind(metric.converted_count)
        .bind(metric.unsubscribed_count)
        .bind(metric.bounced_count)
        .bind(&metric.delivery_rate)
        .bind(&metric.open_rate)
        .bind(&metric.click_rate)
        .bind(&metric.conversion_rate)
        .execute(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(())
    }

    /// Most recent daily metrics first.
    pub async fn list_campaign_metrics(
        &self,
        campaign_id: Uuid,
        limit: i64,
    ) -> Result<Vec<CampaignMetric>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM campaign_metrics WHERE campaign_id = $1 ORDER BY metric_date DESC LIMIT $2",
            CAMPAIGN_METRIC_COLUMNS
        ))
        .bind(campaign_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        rows.iter()
            .map(|r| campaign_metric_from_row(r).map_err(AppError::from))
            .collect()
    }

    // ============ Invoices & Payments ============

    pub async fn lock_invoice(&self, conn: &mut PgConnection, id: Uuid) -> Result<Invoice, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM invoices WHERE id = $1 FOR UPDATE",
            INVOICE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| not_found("Invoice", id))?;

        Ok(invoice_from_row(&row)?)
    }

    pub async fn invoice_items(
        &self,
        conn: &mut PgConnection,
        invoice_id: Uuid,
    ) -> Result<Vec<InvoiceItem>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id, invoice_id, product_id, description, quantity, unit_price,
                   discount_percent, discount_amount, tax_rate, tax_amount, total_amount, sort_order
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY sort_order, id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?;

        rows.iter()
            .map(|r| invoice_item_from_row(r).map_err(AppError::from))
            .collect()
    }

    pub async fn insert_invoice_item(
        &self,
        conn: &mut PgConnection,
        item: &InvoiceItem,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO invoice_items (
                id, invoice_id, product_id, description, quantity, unit_price,
                discount_percent, discount_amount, tax_rate, tax_amount, total_amount, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(item.id)
        .bind(item.invoice_id)
        .bind(item.product_id)
        .bind(&item.description)
        .bind(&item.quantity)
        .bind(&item.unit_price)
        .bind(&item.discount_percent)
        .bind(&item.discount_amount)
        .bind(&item.tax_rate)
        .bind(&item.tax_amount)
        .bind(&item.total_amount)
        .bind(item.sort_order)
        .execute(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(())
    }

    /// Writes every derived amount of the invoice along with its status.
    pub async fn save_invoice_amounts(
        &self,
        conn: &mut PgConnection,
        invoice: &Invoice,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE invoices
            SET subtotal = $2,
                tax_amount = $3,
                total_amount = $4,
                paid_amount = $5,
                due_amount = $6,
                status = $7,
                paid_date = $8,
                currency = $9,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(invoice.id)
        .bind(&invoice.subtotal)
        .bind(&invoice.tax_amount)
        .bind(&invoice.total_amount)
        .bind(&invoice.paid_amount)
        .bind(&invoice.due_amount)
        .bind(invoice.status.as_str())
        .bind(invoice.paid_date)
        .bind(&invoice.currency)
        .execute(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(())
    }

    pub async fn insert_payment(
        &self,
        conn: &mut PgConnection,
        payment: &Payment,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, payment_number, invoice_id, customer_id, amount, currency,
                payment_method, status, payment_date, transaction_id, gateway_fee, net_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(payment.id)
        .bind(&payment.payment_number)
        .bind(payment.invoice_id)
        .bind(payment.customer_id)
        .bind(&payment.amount)
        .bind(&payment.currency)
        .bind(payment.payment_method.as_str())
        .bind(payment.status.as_str())
        .bind(payment.payment_date)
        .bind(&payment.transaction_id)
        .bind(&payment.gateway_fee)
        .bind(&payment.net_amount)
        .execute(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(())
    }

    // ============ Opportunities ============

    pub async fn lock_opportunity(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Opportunity, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM opportunities WHERE id = $1 FOR UPDATE",
            OPPORTUNITY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| not_found("Opportunity", id))?;

        Ok(opportunity_from_row(&row)?)
    }

    pub async fn save_opportunity(
        &self,
        conn: &mut PgConnection,
        opportunity: &Opportunity,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE opportunities
            SET status = $2,
                probability = $3,
                weighted_amount = $4,
                actual_close_date = $5,
                sales_cycle_days = $6,
                stage_id = $7,
                stage_changed_at = $8,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(opportunity.id)
        .bind(opportunity.status.as_str())
        .bind(opportunity.probability)
        .bind(&opportunity.weighted_amount)
        .bind(opportunity.actual_close_date)
        .bind(opportunity.sales_cycle_days)
        .bind(opportunity.stage_id)
        .bind(opportunity.stage_changed_at)
        .execute(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(())
    }

    // ============ Catalog ============

    pub async fn fetch_product(&self, id: Uuid) -> Result<Product, AppError> {
        let row = sqlx::query(
            r#"
            SELECT id, sku, name, status::text AS status, base_price, currency,
                   pricing_type::text AS pricing_type, track_inventory, stock_quantity,
                   low_stock_threshold, features, tags
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| not_found("Product", id))?;

        Ok(product_from_row(&row)?)
    }

    pub async fn fetch_pricing_tier(&self, id: Uuid) -> Result<PricingTier, AppError> {
        let row = sqlx::query(
            r#"
            SELECT id, product_id, name, min_quantity, max_quantity, unit_price, setup_fee, features
            FROM pricing_tiers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| not_found("Pricing tier", id))?;

        Ok(pricing_tier_from_row(&row)?)
    }

    // ============ Activities, Tasks & Tickets ============

    pub async fn lock_activity(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Activity, AppError> {
        let row = sqlx::query(
            r#"
            SELECT id, title, activity_type::text AS activity_type, status::text AS status,
                   priority::text AS priority, scheduled_at, started_at, completed_at,
                   duration_minutes, outcome, created_at
            FROM activities
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| not_found("Activity", id))?;

        Ok(activity_from_row(&row)?)
    }

    pub async fn save_activity_completion(
        &self,
        conn: &mut PgConnection,
        activity: &Activity,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE activities
            SET status = $2, completed_at = $3, duration_minutes = $4, outcome = $5, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(activity.id)
        .bind(activity.status.as_str())
        .bind(activity.completed_at)
        .bind(activity.duration_minutes)
        .bind(&activity.outcome)
        .execute(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(())
    }

    pub async fn lock_task(&self, conn: &mut PgConnection, id: Uuid) -> Result<Task, AppError> {
        let row = sqlx::query(
            r#"
            SELECT id, title, status::text AS status, priority::text AS priority,
                   due_date, completed_at, progress_percent, tags, created_at
            FROM tasks
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| not_found("Task", id))?;

        Ok(task_from_row(&row)?)
    }

    pub async fn save_task_completion(
        &self,
        conn: &mut PgConnection,
        task: &Task,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET status = $2, completed_at = $3, progress_percent = $4, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(task.id)
        .bind(task.status.as_str())
        .bind(task.completed_at)
        .bind(task.progress_percent)
        .execute(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(())
    }

    pub async fn lock_ticket(&self, conn: &mut PgConnection, id: Uuid) -> Result<Ticket, AppError> {
        let row = sqlx::query(
            r#"
            SELECT id, ticket_number, subject, status::text AS status, priority::text AS priority,
                   first_response_at, first_response_time_minutes,
                   resolved_at, resolution_time_minutes, tags, created_at
            FROM tickets
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| not_found("Ticket", id))?;

        Ok(ticket_from_row(&row)?)
    }

    pub async fn save_ticket_timing(
        &self,
        conn: &mut PgConnection,
        ticket: &Ticket,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE tickets
            SET status = $2,
                first_response_at = $3,
                first_response_time_minutes = $4,
                resolved_at = $5,
                resolution_time_minutes = $6,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.status.as_str())
        .bind(ticket.first_response_at)
        .bind(ticket.first_response_time_minutes)
        .bind(ticket.resolved_at)
        .bind(ticket.resolution_time_minutes)
        .execute(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(())
    }

    // ============ Label lists ============

    /// Locks and returns a JSON list column.
    ///
    /// `table` and `column` come from closed enums, never from request text.
    pub async fn lock_labels(
        &self,
        conn: &mut PgConnection,
        table: &'static str,
        column: &'static str,
        id: Uuid,
    ) -> Result<TagList, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {column} FROM {table} WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", table, id)))?;

        Ok(decode_list(&row, column)?)
    }

    pub async fn save_labels(
        &self,
        conn: &mut PgConnection,
        table: &'static str,
        column: &'static str,
        id: Uuid,
        labels: &TagList,
    ) -> Result<(), AppError> {
        sqlx::query(&format!(
            "UPDATE {table} SET {column} = $2, updated_at = now() WHERE id = $1"
        ))
        .bind(id)
        .bind(Json(labels))
        .execute(&mut *conn)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(())
    }
}
