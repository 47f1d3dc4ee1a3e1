use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

// REST API consumed by the dashboard frontend
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Health check
        .route("/", get(handlers::api::health))

        // Overview cards and charts
        .route("/stats", get(handlers::api::get_stats))
        .route("/invoice-trends", get(handlers::api::invoice_trends))
        .route("/vendors/top10", get(handlers::api::top_vendors))
        .route("/category-spend", get(handlers::api::category_spend))
        .route("/cash-outflow", get(handlers::api::cash_outflow))

        // Invoice table
        .route("/invoices", get(handlers::api::list_invoices))

        // Natural-language bridge
        .route("/chat-with-data", post(handlers::api::chat_with_data))

        // System status
        .route("/status", get(handlers::api::system_status))
}
