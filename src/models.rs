use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::tags::TagList;

// ============ Enumerations ============

/// Returned when a stored or submitted string is not a member of a closed enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} value '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Declares a closed enum persisted as text, with its wire names listed once.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum!(
    /// Pipeline position of a lead.
    LeadStatus {
        New => "new",
        Contacted => "contacted",
        Qualified => "qualified",
        Unqualified => "unqualified",
        Converted => "converted",
        Lost => "lost",
    }
);

string_enum!(
    /// Quality tier derived from the lead score.
    LeadQuality {
        Hot => "hot",
        Warm => "warm",
        Cold => "cold",
    }
);

string_enum!(
    /// Company size band. Stored with capitalised names.
    CompanySize {
        Small => "Small",
        Medium => "Medium",
        Large => "Large",
        Enterprise => "Enterprise",
    }
);

string_enum!(
    CustomerType {
        Individual => "individual",
        Business => "business",
        Enterprise => "enterprise",
    }
);

string_enum!(
    CustomerStatus {
        Prospect => "prospect",
        Active => "active",
        Inactive => "inactive",
        Churned => "churned",
        Blacklisted => "blacklisted",
    }
);

string_enum!(
    CampaignType {
        Email => "email",
        Sms => "sms",
        Social => "social",
        Webinar => "webinar",
        Event => "event",
        Content => "content",
        PaidAds => "paid_ads",
        DirectMail => "direct_mail",
    }
);

string_enum!(
    CampaignStatus {
        Draft => "draft",
        Scheduled => "scheduled",
        Active => "active",
        Paused => "paused",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

string_enum!(
    /// Billing state of an invoice.
    InvoiceStatus {
        Draft => "draft",
        Sent => "sent",
        Viewed => "viewed",
        Paid => "paid",
        PartiallyPaid => "partially_paid",
        Overdue => "overdue",
        Cancelled => "cancelled",
        Refunded => "refunded",
    }
);

string_enum!(
    PaymentStatus {
        Pending => "pending",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
        Refunded => "refunded",
    }
);

string_enum!(
    PaymentMethod {
        CreditCard => "credit_card",
        DebitCard => "debit_card",
        BankTransfer => "bank_transfer",
        Paypal => "paypal",
        Stripe => "stripe",
        Check => "check",
        Cash => "cash",
        WireTransfer => "wire_transfer",
    }
);

string_enum!(
    OpportunityStatus {
        Open => "open",
        Won => "won",
        Lost => "lost",
        Abandoned => "abandoned",
    }
);

string_enum!(
    OpportunityPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
);

string_enum!(
    ActivityType {
        Call => "call",
        Email => "email",
        Meeting => "meeting",
        Task => "task",
        Note => "note",
        Sms => "sms",
        Social => "social",
        Webinar => "webinar",
        Demo => "demo",
        Proposal => "proposal",
        Contract => "contract",
        Payment => "payment",
        Support => "support",
    }
);

string_enum!(
    /// Shared by activities and tasks.
    ActivityStatus {
        Planned => "planned",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
        Overdue => "overdue",
    }
);

string_enum!(
    ActivityPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
);

string_enum!(
    TicketStatus {
        Open => "open",
        InProgress => "in_progress",
        WaitingCustomer => "waiting_customer",
        WaitingVendor => "waiting_vendor",
        Resolved => "resolved",
        Closed => "closed",
        Cancelled => "cancelled",
    }
);

string_enum!(
    TicketPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
        Critical => "critical",
    }
);

string_enum!(
    ProductStatus {
        Active => "active",
        Inactive => "inactive",
        Discontinued => "discontinued",
        Draft => "draft",
    }
);

string_enum!(
    PricingType {
        Fixed => "fixed",
        Tiered => "tiered",
        UsageBased => "usage_based",
        Subscription => "subscription",
    }
);

string_enum!(
    /// Entity kinds that carry a `tags` list. Names match their tables.
    TagTarget {
        Lead => "leads",
        Customer => "customers",
        Campaign => "campaigns",
        Opportunity => "opportunities",
        Product => "products",
        Ticket => "tickets",
        Task => "tasks",
    }
);

fn zero() -> BigDecimal {
    BigDecimal::from(0)
}

// ============ Leads & Customers ============

/// A prospective contact that has not been converted to a customer.
///
/// The four score fields and `quality` are derived by the lead scorer and
/// written back together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// Unique identifier for the lead.
    pub id: Uuid,
    /// Human-facing reference, unique per lead.
    pub lead_number: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    /// Free-text title, matched case-insensitively for seniority keywords.
    pub job_title: Option<String>,
    pub email: Option<String>,
    pub status: LeadStatus,
    /// Tier derived from `lead_score`.
    pub quality: Option<LeadQuality>,
    /// Sum of the three sub-scores, 0 to 100.
    pub lead_score: i32,
    /// Firmographic sub-score, 0 to 30.
    pub demographic_score: i32,
    /// Web and email activity sub-score, 0 to 40.
    pub behavioral_score: i32,
    /// Interaction volume and recency sub-score, 0 to 30.
    pub engagement_score: i32,
    pub company_size: Option<CompanySize>,
    pub annual_revenue: Option<BigDecimal>,
    pub website_visits: i32,
    pub email_opens: i32,
    pub email_clicks: i32,
    pub total_interactions: i32,
    pub first_contact_date: Option<DateTime<Utc>>,
    pub last_contact_date: Option<DateTime<Utc>>,
    pub tags: TagList,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Lead {
    pub fn new(lead_number: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            lead_number: lead_number.into(),
            first_name: None,
            last_name: None,
            company_name: None,
            job_title: None,
            email: None,
            status: LeadStatus::New,
            quality: None,
            lead_score: 0,
            demographic_score: 0,
            behavioral_score: 0,
            engagement_score: 0,
            company_size: None,
            annual_revenue: None,
            website_visits: 0,
            email_opens: 0,
            email_clicks: 0,
            total_interactions: 0,
            first_contact_date: None,
            last_contact_date: None,
            tags: TagList::new(),
            created_at,
            updated_at: None,
        }
    }

    /// First and last name joined, skipping whichever is missing.
    pub fn full_name(&self) -> Option<String> {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
            (None, None) => None,
        }
    }
}

/// A customer account. Health is computed on read and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Unique identifier for the customer.
    pub id: Uuid,
    pub customer_number: String,
    /// Account or legal name.
    pub name: String,
    pub customer_type: CustomerType,
    pub status: CustomerStatus,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// Externally maintained engagement index, nominally 0 to 100.
    pub engagement_score: Option<i32>,
    /// Survey satisfaction, 0 to 10.
    pub satisfaction_score: Option<BigDecimal>,
    pub last_contact_date: Option<DateTime<Utc>>,
    /// Lifetime revenue in account currency.
    pub total_revenue: Option<BigDecimal>,
    pub tags: TagList,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn new(
        name: impl Into<String>,
        customer_type: CustomerType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_number: String::new(),
            name: name.into(),
            customer_type,
            status: CustomerStatus::Prospect,
            first_name: None,
            last_name: None,
            email: None,
            engagement_score: None,
            satisfaction_score: None,
            last_contact_date: None,
            total_revenue: None,
            tags: TagList::new(),
            created_at,
            updated_at: None,
        }
    }

    /// Personal name, only for individuals with both parts recorded.
    pub fn full_name(&self) -> Option<String> {
        if self.customer_type != CustomerType::Individual {
            return None;
        }
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            _ => None,
        }
    }

    pub fn display_name(&self) -> String {
        self.full_name().unwrap_or_else(|| self.name.clone())
    }
}

// ============ Campaigns ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub campaign_type: CampaignType,
    pub status: CampaignStatus,
    pub sent_count: i32,
    pub delivered_count: i32,
    pub opened_count: i32,
    pub clicked_count: i32,
    pub converted_count: i32,
    pub unsubscribed_count: i32,
    pub bounced_count: i32,
    pub delivery_rate: Option<BigDecimal>,
    pub open_rate: Option<BigDecimal>,
    pub click_rate: Option<BigDecimal>,
    pub conversion_rate: Option<BigDecimal>,
    pub tags: TagList,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Campaign {
    pub fn new(
        name: impl Into<String>,
        campaign_type: CampaignType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            campaign_type,
            status: CampaignStatus::Draft,
            sent_count: 0,
            delivered_count: 0,
            opened_count: 0,
            clicked_count: 0,
            converted_count: 0,
            unsubscribed_count: 0,
            bounced_count: 0,
            delivery_rate: None,
            open_rate: None,
            click_rate: None,
            conversion_rate: None,
            tags: TagList::new(),
            created_at,
            updated_at: None,
        }
    }
}

/// One day of counters for a campaign, rated independently of the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignMetric {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub metric_date: NaiveDate,
    pub sent_count: i32,
    pub delivered_count: i32,
    pub opened_count: i32,
    pub clicked_count: i32,
    pub converted_count: i32,
    pub unsubscribed_count: i32,
    pub bounced_count: i32,
    pub delivery_rate: Option<BigDecimal>,
    pub open_rate: Option<BigDecimal>,
    pub click_rate: Option<BigDecimal>,
    pub conversion_rate: Option<BigDecimal>,
}

impl CampaignMetric {
    pub fn new(campaign_id: Uuid, metric_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            metric_date,
            sent_count: 0,
            delivered_count: 0,
            opened_count: 0,
            clicked_count: 0,
            converted_count: 0,
            unsubscribed_count: 0,
            bounced_count: 0,
            delivery_rate: None,
            open_rate: None,
            click_rate: None,
            conversion_rate: None,
        }
    }
}

// ============ Billing ============

/// An invoice header. Amount fields are derived from its items and payments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier for the invoice.
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub opportunity_id: Option<Uuid>,
    pub status: InvoiceStatus,
    /// Sum of item totals.
    pub subtotal: BigDecimal,
    /// Invoice-level tax on the subtotal.
    pub tax_amount: BigDecimal,
    /// Header discount, entered directly rather than derived.
    pub discount_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub paid_amount: BigDecimal,
    pub due_amount: BigDecimal,
    /// Invoice-level tax percentage, applied on top of item taxes.
    pub tax_rate: Option<BigDecimal>,
    /// ISO 4217 code.
    pub currency: String,
    pub issue_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub sent_date: Option<DateTime<Utc>>,
    pub paid_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Invoice {
    pub fn new(
        invoice_number: impl Into<String>,
        customer_id: Uuid,
        issue_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            invoice_number: invoice_number.into(),
            customer_id,
            opportunity_id: None,
            status: InvoiceStatus::Draft,
            subtotal: zero(),
            tax_amount: zero(),
            discount_amount: zero(),
            total_amount: zero(),
            paid_amount: zero(),
            due_amount: zero(),
            tax_rate: None,
            currency: "USD".to_string(),
            issue_date,
            due_date: None,
            sent_date: None,
            paid_date: None,
            created_at: issue_date,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub product_id: Option<Uuid>,
    pub description: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub discount_percent: Option<BigDecimal>,
    pub discount_amount: BigDecimal,
    pub tax_rate: Option<BigDecimal>,
    pub tax_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub sort_order: i32,
}

impl InvoiceItem {
    pub fn new(
        invoice_id: Uuid,
        description: impl Into<String>,
        quantity: BigDecimal,
        unit_price: BigDecimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            invoice_id,
            product_id: None,
            description: description.into(),
            quantity,
            unit_price,
            discount_percent: None,
            discount_amount: zero(),
            tax_rate: None,
            tax_amount: zero(),
            total_amount: zero(),
            sort_order: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub payment_number: String,
    pub invoice_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
    /// Reference assigned by the processor, if any.
    pub transaction_id: Option<String>,
    pub gateway_fee: Option<BigDecimal>,
    pub net_amount: Option<BigDecimal>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        customer_id: Uuid,
        amount: BigDecimal,
        payment_method: PaymentMethod,
        payment_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            payment_number: String::new(),
            invoice_id: None,
            customer_id,
            amount,
            currency: "USD".to_string(),
            payment_method,
            status: PaymentStatus::Pending,
            payment_date,
            transaction_id: None,
            gateway_fee: None,
            net_amount: None,
            created_at: payment_date,
        }
    }
}

// ============ Opportunities & Catalog ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: Uuid,
    pub name: String,
    pub customer_id: Uuid,
    pub stage_id: Uuid,
    pub status: OpportunityStatus,
    pub priority: OpportunityPriority,
    pub amount: BigDecimal,
    /// Win probability in percent.
    pub probability: i32,
    pub weighted_amount: Option<BigDecimal>,
    pub expected_close_date: Option<DateTime<Utc>>,
    pub actual_close_date: Option<DateTime<Utc>>,
    pub sales_cycle_days: Option<i32>,
    pub stage_changed_at: DateTime<Utc>,
    pub competitors: TagList,
    pub tags: TagList,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Opportunity {
    pub fn new(
        name: impl Into<String>,
        customer_id: Uuid,
        stage_id: Uuid,
        amount: BigDecimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            customer_id,
            stage_id,
            status: OpportunityStatus::Open,
            priority: OpportunityPriority::Medium,
            amount,
            probability: 0,
            weighted_amount: None,
            expected_close_date: None,
            actual_close_date: None,
            sales_cycle_days: None,
            stage_changed_at: created_at,
            competitors: TagList::new(),
            tags: TagList::new(),
            created_at,
            updated_at: None,
        }
    }
}

/// A product line on an opportunity. Untaxed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityProduct {
    pub id: Uuid,
    pub opportunity_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub discount_percent: Option<BigDecimal>,
    pub discount_amount: BigDecimal,
    pub total_amount: BigDecimal,
}

impl OpportunityProduct {
    pub fn new(
        opportunity_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        unit_price: BigDecimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            opportunity_id,
            product_id,
            quantity,
            unit_price,
            discount_percent: None,
            discount_amount: zero(),
            total_amount: zero(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub status: ProductStatus,
    pub base_price: BigDecimal,
    pub currency: String,
    pub pricing_type: PricingType,
    pub track_inventory: bool,
    pub stock_quantity: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    pub features: TagList,
    pub tags: TagList,
}

impl Product {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, base_price: BigDecimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            sku: sku.into(),
            name: name.into(),
            status: ProductStatus::Active,
            base_price,
            currency: "USD".to_string(),
            pricing_type: PricingType::Fixed,
            track_inventory: false,
            stock_quantity: None,
            low_stock_threshold: None,
            features: TagList::new(),
            tags: TagList::new(),
        }
    }
}

/// Quantity band of a product's price list. `max_quantity = None` is unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTier {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub min_quantity: i32,
    pub max_quantity: Option<i32>,
    pub unit_price: BigDecimal,
    pub setup_fee: Option<BigDecimal>,
    pub features: TagList,
}

impl PricingTier {
    pub fn new(product_id: Uuid, name: impl Into<String>, unit_price: BigDecimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            name: name.into(),
            min_quantity: 1,
            max_quantity: None,
            unit_price,
            setup_fee: None,
            features: TagList::new(),
        }
    }
}

// ============ Activities, Tasks & Tickets ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub title: String,
    pub activity_type: ActivityType,
    pub status: ActivityStatus,
    pub priority: ActivityPriority,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub outcome: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(
        title: impl Into<String>,
        activity_type: ActivityType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            activity_type,
            status: ActivityStatus::Planned,
            priority: ActivityPriority::Medium,
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            duration_minutes: None,
            outcome: None,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub status: ActivityStatus,
    pub priority: ActivityPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress_percent: i32,
    pub tags: TagList,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            status: ActivityStatus::Planned,
            priority: ActivityPriority::Medium,
            due_date: None,
            completed_at: None,
            progress_percent: 0,
            tags: TagList::new(),
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_number: String,
    pub subject: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub first_response_at: Option<DateTime<Utc>>,
    pub first_response_time_minutes: Option<i32>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_time_minutes: Option<i32>,
    pub tags: TagList,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(
        ticket_number: impl Into<String>,
        subject: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket_number: ticket_number.into(),
            subject: subject.into(),
            status: TicketStatus::Open,
            priority: TicketPriority::Medium,
            first_response_at: None,
            first_response_time_minutes: None,
            resolved_at: None,
            resolution_time_minutes: None,
            tags: TagList::new(),
            created_at,
        }
    }
}

// ============ API Request/Response Models ============

string_enum!(
    /// What happened to a lead. Only direct contact counts as an interaction.
    InteractionKind {
        WebsiteVisit => "website_visit",
        EmailOpen => "email_open",
        EmailClick => "email_click",
        Contact => "contact",
    }
);

/// Body of `POST /api/v1/leads/:id/interactions`.
#[derive(Debug, Clone, Deserialize)]
pub struct LeadInteraction {
    pub kind: InteractionKind,
    /// Number of events to record, default 1.
    pub count: Option<i32>,
    /// When the events happened, default now.
    pub occurred_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadScoreResponse {
    pub lead_id: Uuid,
    pub demographic_score: i32,
    pub behavioral_score: i32,
    pub engagement_score: i32,
    pub lead_score: i32,
    pub quality: LeadQuality,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthScoreResponse {
    pub customer_id: Uuid,
    pub display_name: String,
    pub health_score: BigDecimal,
    pub computed_at: DateTime<Utc>,
}

/// Counter deltas reported by a delivery provider for one campaign.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CampaignEvents {
    pub sent: i32,
    pub delivered: i32,
    pub opened: i32,
    pub clicked: i32,
    pub converted: i32,
    pub unsubscribed: i32,
    pub bounced: i32,
    /// Day the events belong to, default today (UTC).
    pub metric_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignMetricsResponse {
    pub campaign_id: Uuid,
    pub sent_count: i32,
    pub delivered_count: i32,
    pub opened_count: i32,
    pub clicked_count: i32,
    pub converted_count: i32,
    pub delivery_rate: Option<BigDecimal>,
    pub open_rate: Option<BigDecimal>,
    pub click_rate: Option<BigDecimal>,
    pub conversion_rate: Option<BigDecimal>,
    /// Per-day rows, newest first.
    pub daily: Vec<CampaignMetric>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoiceItem {
    pub description: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub discount_percent: Option<BigDecimal>,
    pub tax_rate: Option<BigDecimal>,
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub amount: BigDecimal,
    pub payment_method: PaymentMethod,
    pub gateway_fee: Option<BigDecimal>,
    /// Must match the invoice currency when given.
    pub currency: Option<String>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceSummary {
    pub invoice_id: Uuid,
    pub status: InvoiceStatus,
    pub currency: String,
    pub subtotal: BigDecimal,
    pub tax_amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub paid_amount: BigDecimal,
    pub due_amount: BigDecimal,
    pub item_count: usize,
    pub is_overdue: bool,
}

impl InvoiceSummary {
    pub fn new(invoice: &Invoice, item_count: usize, now: DateTime<Utc>) -> Self {
        Self {
            invoice_id: invoice.id,
            status: invoice.status,
            currency: invoice.currency.clone(),
            subtotal: invoice.subtotal.clone(),
            tax_amount: invoice.tax_amount.clone(),
            discount_amount: invoice.discount_amount.clone(),
            total_amount: invoice.total_amount.clone(),
            paid_amount: invoice.paid_amount.clone(),
            due_amount: invoice.due_amount.clone(),
            item_count,
            is_overdue: invoice.is_overdue(now),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub payment_id: Uuid,
    pub payment_number: String,
    pub amount: BigDecimal,
    pub net_amount: BigDecimal,
    pub invoice: InvoiceSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbabilityUpdate {
    pub probability: i32,
    /// Moves the deal to another pipeline stage in the same step.
    pub stage_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloseOpportunity {
    /// `won`, `lost` or `abandoned`.
    pub outcome: OpportunityStatus,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpportunitySummary {
    pub opportunity_id: Uuid,
    pub status: OpportunityStatus,
    pub stage_id: Uuid,
    pub amount: BigDecimal,
    pub probability: i32,
    pub weighted_amount: Option<BigDecimal>,
    pub actual_close_date: Option<DateTime<Utc>>,
    pub sales_cycle_days: Option<i32>,
}

impl From<&Opportunity> for OpportunitySummary {
    fn from(o: &Opportunity) -> Self {
        Self {
            opportunity_id: o.id,
            status: o.status,
            stage_id: o.stage_id,
            amount: o.amount.clone(),
            probability: o.probability,
            weighted_amount: o.weighted_amount.clone(),
            actual_close_date: o.actual_close_date,
            sales_cycle_days: o.sales_cycle_days,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteParams {
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceQuote {
    pub pricing_tier_id: Uuid,
    pub quantity: i32,
    /// `None` when the quantity is outside the tier's band.
    pub price: Option<BigDecimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockStatus {
    pub product_id: Uuid,
    pub track_inventory: bool,
    pub stock_quantity: Option<i32>,
    pub is_low_stock: bool,
    pub is_out_of_stock: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelRequest {
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelsResponse {
    pub id: Uuid,
    pub values: TagList,
    /// `false` when the add or remove was a no-op.
    pub changed: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteActivity {
    pub outcome: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityTiming {
    pub activity_id: Uuid,
    pub status: ActivityStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    /// Scheduled time had already passed when it was completed.
    pub was_overdue: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskTiming {
    pub task_id: Uuid,
    pub status: ActivityStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress_percent: i32,
    pub was_overdue: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketTiming {
    pub ticket_id: Uuid,
    pub status: TicketStatus,
    pub first_response_time_minutes: Option<i32>,
    pub resolution_time_minutes: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_round_trip_through_their_names() {
        for status in InvoiceStatus::ALL {
            assert_eq!(status.as_str().parse::<InvoiceStatus>().unwrap(), *status);
        }
        for size in CompanySize::ALL {
            assert_eq!(size.to_string().parse::<CompanySize>().unwrap(), *size);
        }
    }

    #[test]
    fn unknown_values_are_rejected() {
        let err = "lukewarm".parse::<LeadQuality>().unwrap_err();
        assert_eq!(err.kind, "LeadQuality");
        assert_eq!(err.to_string(), "unknown LeadQuality value 'lukewarm'");
        // stored casing matters
        assert!("enterprise".parse::<CompanySize>().is_err());
    }

    #[test]
    fn serde_uses_stored_names() {
        let json = serde_json::to_string(&InvoiceStatus::PartiallyPaid).unwrap();
        assert_eq!(json, r#""partially_paid""#);
        let size: CompanySize = serde_json::from_str(r#""Enterprise""#).unwrap();
        assert_eq!(size, CompanySize::Enterprise);
        assert!(serde_json::from_str::<LeadStatus>(r#""archived""#).is_err());
    }

    #[test]
    fn customer_display_name_prefers_personal_name_for_individuals() {
        let now = Utc::now();
        let mut person = Customer::new("J. Doe Account", CustomerType::Individual, now);
        person.first_name = Some("Jane".into());
        person.last_name = Some("Doe".into());
        assert_eq!(person.display_name(), "Jane Doe");

        person.last_name = None;
        assert_eq!(person.display_name(), "J. Doe Account");

        let mut company = Customer::new("Acme Corp", CustomerType::Business, now);
        company.first_name = Some("Jane".into());
        company.last_name = Some("Doe".into());
        assert_eq!(company.full_name(), None);
        assert_eq!(company.display_name(), "Acme Corp");
    }

    #[test]
    fn lead_full_name_skips_missing_parts() {
        let mut lead = Lead::new("L-1", Utc::now());
        assert_eq!(lead.full_name(), None);
        lead.last_name = Some("Silva".into());
        assert_eq!(lead.full_name().as_deref(), Some("Silva"));
        lead.first_name = Some("Ana".into());
        assert_eq!(lead.full_name().as_deref(), Some("Ana Silva"));
    }
}
