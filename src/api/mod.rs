// Thin namespace wrapper for API-layer components, plus the route table
pub mod handlers {
    pub use crate::handlers::*;
}

use crate::handlers::{self as h, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Every `/api/v1` route. Callers add state and middleware.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Leads
        .route("/api/v1/leads/:id/score", post(h::rescore_lead))
        .route(
            "/api/v1/leads/:id/interactions",
            post(h::record_lead_interaction),
        )
        // Customers
        .route(
            "/api/v1/customers/:id/health-score",
            get(h::customer_health_score),
        )
        // Campaigns
        .route("/api/v1/campaigns/:id/metrics", get(h::campaign_metrics))
        .route(
            "/api/v1/campaigns/:id/events",
            post(h::record_campaign_events),
        )
        // Invoices & payments
        .route("/api/v1/invoices/:id/items", post(h::add_invoice_item))
        .route(
            "/api/v1/invoices/:id/payments",
            post(h::record_invoice_payment),
        )
        .route(
            "/api/v1/invoices/:id/recalculate",
            post(h::recalculate_invoice),
        )
        // Opportunities
        .route(
            "/api/v1/opportunities/:id/probability",
            put(h::update_opportunity_probability),
        )
        .route("/api/v1/opportunities/:id/close", post(h::close_opportunity))
        .route(
            "/api/v1/opportunities/:id/competitors",
            post(h::add_competitor),
        )
        .route(
            "/api/v1/opportunities/:id/competitors/:value",
            delete(h::remove_competitor),
        )
        // Catalog
        .route(
            "/api/v1/pricing-tiers/:id/quote",
            get(h::quote_pricing_tier),
        )
        .route(
            "/api/v1/products/:id/stock-status",
            get(h::product_stock_status),
        )
        .route("/api/v1/products/:id/features", post(h::add_product_feature))
        .route(
            "/api/v1/products/:id/features/:value",
            delete(h::remove_product_feature),
        )
        // Tags on any taggable record
        .route("/api/v1/tags/:entity/:id", post(h::add_tag))
        .route("/api/v1/tags/:entity/:id/:tag", delete(h::remove_tag))
        // Activities, tasks & tickets
        .route(
            "/api/v1/activities/:id/complete",
            post(h::complete_activity),
        )
        .route("/api/v1/tasks/:id/complete", post(h::complete_task))
        .route(
            "/api/v1/tickets/:id/first-response",
            post(h::record_ticket_response),
        )
        .route("/api/v1/tickets/:id/resolve", post(h::resolve_ticket))
}

/// Health check plus all API routes, with tracing and CORS.
pub fn router(state: Arc<AppState>) -> Router {
    assemble(api_routes(), state)
}

/// Mounts `/health` beside `api` and adds the shared outer layers.
///
/// The binary passes [`api_routes`] wrapped in rate limiting and a body
/// size cap so that `/health` stays unthrottled.
pub fn assemble(api: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(h::health))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
