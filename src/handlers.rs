use crate::config::Config;
use crate::errors::AppError;
use crate::models::*;
use crate::services::{
    CampaignService, CatalogService, CustomerService, InvoiceService, LeadService,
    OpportunityService, TagService, WorkItemService,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration, including the scoring rules.
    pub config: Config,
}

/// Health check endpoint.
///
/// Returns the service status and version.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-crm-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

// ============ Leads ============

/// POST /api/v1/leads/:id/score
///
/// Recomputes the lead's demographic, behavioral and engagement scores and
/// its quality band, and stores them.
pub async fn rescore_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<LeadScoreResponse>, AppError> {
    tracing::info!("POST /leads/{}/score", id);

    let service = LeadService::new(state.db.clone(), state.config.scoring.lead.clone());
    let scored = service.rescore(id).await?;

    Ok(Json(scored))
}

/// POST /api/v1/leads/:id/interactions
///
/// Records website visits, email opens, email clicks or direct contacts and
/// rescores the lead in the same transaction.
pub async fn record_lead_interaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LeadInteraction>,
) -> Result<Json<LeadScoreResponse>, AppError> {
    tracing::info!("POST /leads/{}/interactions - kind: {}", id, payload.kind);

    let service = LeadService::new(state.db.clone(), state.config.scoring.lead.clone());
    let scored = service.record_interaction(id, &payload).await?;

    Ok(Json(scored))
}

// ============ Customers ============

/// GET /api/v1/customers/:id/health-score
pub async fn customer_health_score(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<HealthScoreResponse>, AppError> {
    tracing::info!("GET /customers/{}/health-score", id);

    let service = CustomerService::new(state.db.clone(), state.config.scoring.health.clone());
    Ok(Json(service.health_score(id).await?))
}

// ============ Campaigns ============

/// GET /api/v1/campaigns/:id/metrics
///
/// Campaign totals and rates, plus the most recent daily rows.
pub async fn campaign_metrics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CampaignMetricsResponse>, AppError> {
    tracing::info!("GET /campaigns/{}/metrics", id);

    let service = CampaignService::new(state.db.clone());
    Ok(Json(service.metrics(id).await?))
}

/// POST /api/v1/campaigns/:id/events
///
/// Adds delivery-provider counts to the campaign and its daily row.
pub async fn record_campaign_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CampaignEvents>,
) -> Result<Json<CampaignMetricsResponse>, AppError> {
    tracing::info!("POST /campaigns/{}/events - {:?}", id, payload);

    let service = CampaignService::new(state.db.clone());
    Ok(Json(service.record_events(id, &payload).await?))
}

// ============ Invoices ============

/// POST /api/v1/invoices/:id/items
pub async fn add_invoice_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<NewInvoiceItem>,
) -> Result<(StatusCode, Json<InvoiceSummary>), AppError> {
    tracing::info!("POST /invoices/{}/items", id);

    let service = InvoiceService::new(state.db.clone(), state.config.default_currency.clone());
    let summary = service.add_item(id, &payload).await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

/// POST /api/v1/invoices/:id/recalculate
pub async fn recalculate_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceSummary>, AppError> {
    tracing::info!("POST /invoices/{}/recalculate", id);

    let service = InvoiceService::new(state.db.clone(), state.config.default_currency.clone());
    Ok(Json(service.recalculate(id).await?))
}

/// POST /api/v1/invoices/:id/payments
///
/// Records a completed payment and moves the invoice to paid or
/// partially paid.
pub async fn record_invoice_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<NewPayment>,
) -> Result<(StatusCode, Json<PaymentReceipt>), AppError> {
    tracing::info!(
        "POST /invoices/{}/payments - amount: {}, method: {}",
        id,
        payload.amount,
        payload.payment_method
    );

    let service = InvoiceService::new(state.db.clone(), state.config.default_currency.clone());
    let receipt = service.record_payment(id, &payload).await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

// ============ Opportunities ============

/// PUT /api/v1/opportunities/:id/probability
pub async fn update_opportunity_probability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProbabilityUpdate>,
) -> Result<Json<OpportunitySummary>, AppError> {
    tracing::info!(
        "PUT /opportunities/{}/probability - {}",
        id,
        payload.probability
    );

    let service = OpportunityService::new(state.db.clone());
    Ok(Json(service.update_probability(id, &payload).await?))
}

/// POST /api/v1/opportunities/:id/close
pub async fn close_opportunity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CloseOpportunity>,
) -> Result<Json<OpportunitySummary>, AppError> {
    tracing::info!("POST /opportunities/{}/close - {}", id, payload.outcome);

    let service = OpportunityService::new(state.db.clone());
    Ok(Json(service.close(id, &payload).await?))
}

/// POST /api/v1/opportunities/:id/competitors
pub async fn add_competitor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LabelRequest>,
) -> Result<Json<LabelsResponse>, AppError> {
    let service = TagService::new(state.db.clone());
    Ok(Json(service.add_competitor(id, &payload.value).await?))
}

/// DELETE /api/v1/opportunities/:id/competitors/:value
pub async fn remove_competitor(
    State(state): State<Arc<AppState>>,
    Path((id, value)): Path<(Uuid, String)>,
) -> Result<Json<LabelsResponse>, AppError> {
    let service = TagService::new(state.db.clone());
    Ok(Json(service.remove_competitor(id, &value).await?))
}

// ============ Catalog ============

/// GET /api/v1/pricing-tiers/:id/quote?quantity=N
///
/// Price for `quantity` units under the tier. `price` is null when the
/// quantity falls outside the tier's band.
pub async fn quote_pricing_tier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<QuoteParams>,
) -> Result<Json<PriceQuote>, AppError> {
    tracing::info!("GET /pricing-tiers/{}/quote - quantity: {}", id, params.quantity);

    let service = CatalogService::new(state.db.clone());
    Ok(Json(service.quote(id, params.quantity).await?))
}

/// GET /api/v1/products/:id/stock-status
pub async fn product_stock_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<StockStatus>, AppError> {
    let service = CatalogService::new(state.db.clone());
    Ok(Json(service.stock_status(id).await?))
}

/// POST /api/v1/products/:id/features
pub async fn add_product_feature(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LabelRequest>,
) -> Result<Json<LabelsResponse>, AppError> {
    let service = TagService::new(state.db.clone());
    Ok(Json(service.add_feature(id, &payload.value).await?))
}

/// DELETE /api/v1/products/:id/features/:value
pub async fn remove_product_feature(
    State(state): State<Arc<AppState>>,
    Path((id, value)): Path<(Uuid, String)>,
) -> Result<Json<LabelsResponse>, AppError> {
    let service = TagService::new(state.db.clone());
    Ok(Json(service.remove_feature(id, &value).await?))
}

// ============ Tags ============

/// POST /api/v1/tags/:entity/:id
///
/// `entity` is one of leads, customers, campaigns, opportunities, products,
/// tickets or tasks. Adding a tag that is already present is a no-op.
pub async fn add_tag(
    State(state): State<Arc<AppState>>,
    Path((entity, id)): Path<(String, Uuid)>,
    Json(payload): Json<LabelRequest>,
) -> Result<Json<LabelsResponse>, AppError> {
    let target: TagTarget = entity.parse()?;
    tracing::info!("POST /tags/{}/{} - {}", target, id, payload.value);

    let service = TagService::new(state.db.clone());
    Ok(Json(service.add_tag(target, id, &payload.value).await?))
}

/// DELETE /api/v1/tags/:entity/:id/:tag
pub async fn remove_tag(
    State(state): State<Arc<AppState>>,
    Path((entity, id, tag)): Path<(String, Uuid, String)>,
) -> Result<Json<LabelsResponse>, AppError> {
    let target: TagTarget = entity.parse()?;
    tracing::info!("DELETE /tags/{}/{}/{}", target, id, tag);

    let service = TagService::new(state.db.clone());
    Ok(Json(service.remove_tag(target, id, &tag).await?))
}

// ============ Activities, Tasks & Tickets ============

/// POST /api/v1/activities/:id/complete
pub async fn complete_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    payload: Option<Json<CompleteActivity>>,
) -> Result<Json<ActivityTiming>, AppError> {
    tracing::info!("POST /activities/{}/complete", id);

    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let service = WorkItemService::new(state.db.clone());
    Ok(Json(service.complete_activity(id, &request).await?))
}

/// POST /api/v1/tasks/:id/complete
pub async fn complete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskTiming>, AppError> {
    tracing::info!("POST /tasks/{}/complete", id);

    let service = WorkItemService::new(state.db.clone());
    Ok(Json(service.complete_task(id).await?))
}

/// POST /api/v1/tickets/:id/first-response
pub async fn record_ticket_response(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketTiming>, AppError> {
    tracing::info!("POST /tickets/{}/first-response", id);

    let service = WorkItemService::new(state.db.clone());
    Ok(Json(service.record_ticket_response(id).await?))
}

/// POST /api/v1/tickets/:id/resolve
pub async fn resolve_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketTiming>, AppError> {
    tracing::info!("POST /tickets/{}/resolve", id);

    let service = WorkItemService::new(state.db.clone());
    Ok(Json(service.resolve_ticket(id).await?))
}
