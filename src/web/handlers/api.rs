use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use duckdb::params;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::chat::{ChatError, RowMap};
use crate::db::rows;
use crate::db::DuckDbConnectionManager;
use crate::web::state::AppState;

// Wire types

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_spend: f64,
    pub total_invoices: i64,
    pub avg_invoice_value: f64,
    pub documents_uploaded: i64,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub invoice_count: i64,
    pub vendor_count: i64,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn fetch_failed(label: &'static str, detail: String) -> ApiError {
    error!("{}: {}", label, detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: label.to_string(),
            details: None,
        }),
    )
}

/// Runs a fixed aggregate statement on a pooled connection and returns the
/// rows as JSON-ready maps.
async fn fetch_rows(
    pool: &r2d2::Pool<DuckDbConnectionManager>,
    sql: &'static str,
) -> Result<Vec<RowMap>, String> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<Vec<RowMap>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn.prepare(sql).map_err(|e| e.to_string())?;
        rows::query_rows(&mut stmt, []).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())?
}

// Health check
pub async fn health() -> &'static str {
    "API is running!"
}

// Overview cards
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<Stats>, ApiError> {
    let pool = state.db_pool.clone();

    let stats = tokio::task::spawn_blocking(move || -> Result<Stats, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.query_row(
            "SELECT COALESCE(SUM(amount), 0), COUNT(id), COALESCE(AVG(amount), 0) \
             FROM \"Invoice\"",
            [],
            |row| {
                let total_invoices: i64 = row.get(1)?;
                Ok(Stats {
                    total_spend: row.get(0)?,
                    total_invoices,
                    avg_invoice_value: row.get(2)?,
                    // One uploaded document per invoice
                    documents_uploaded: total_invoices,
                })
            },
        )
        .map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())
    .and_then(|r| r)
    .map_err(|e| fetch_failed("Failed to fetch stats", e))?;

    Ok(Json(stats))
}

// Main line chart
pub async fn invoice_trends(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RowMap>>, ApiError> {
    let trends = fetch_rows(
        &state.db_pool,
        "SELECT strftime(date, '%Y-%m') AS month, \
                SUM(amount) AS total_spend, \
                COUNT(id) AS invoice_count \
         FROM \"Invoice\" \
         GROUP BY month \
         ORDER BY month",
    )
    .await
    .map_err(|e| fetch_failed("Failed to fetch trends", e))?;

    Ok(Json(trends))
}

// Vendor bar chart
pub async fn top_vendors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RowMap>>, ApiError> {
    let vendors = fetch_rows(
        &state.db_pool,
        "SELECT v.name, SUM(i.amount) AS total_spend \
         FROM \"Invoice\" i \
         JOIN \"Vendor\" v ON i.\"vendorId\" = v.id \
         GROUP BY v.name \
         ORDER BY total_spend DESC \
         LIMIT 10",
    )
    .await
    .map_err(|e| fetch_failed("Failed to fetch top vendors", e))?;

    Ok(Json(vendors))
}

// Pie chart; line items carry the accurate per-category amounts
pub async fn category_spend(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RowMap>>, ApiError> {
    let spend = fetch_rows(
        &state.db_pool,
        "SELECT category, SUM(price * quantity) AS total_spend \
         FROM \"LineItem\" \
         GROUP BY category \
         ORDER BY total_spend DESC",
    )
    .await
    .map_err(|e| fetch_failed("Failed to fetch category spend", e))?;

    Ok(Json(spend))
}

// Cash outflow chart
pub async fn cash_outflow(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RowMap>>, ApiError> {
    let outflow = fetch_rows(
        &state.db_pool,
        "SELECT CAST(due_date AS DATE) AS date, \
                SUM(amount) AS amount_due \
         FROM \"Invoice\" \
         WHERE status != 'Paid' \
         GROUP BY CAST(due_date AS DATE) \
         ORDER BY 1 \
         LIMIT 30",
    )
    .await
    .map_err(|e| fetch_failed("Failed to fetch cash outflow", e))?;

    Ok(Json(outflow))
}

// Invoice table, newest first, optional search over number and vendor name.
// The search term is user input and is always bound as a parameter.
pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InvoiceQuery>,
) -> Result<Json<Vec<RowMap>>, ApiError> {
    let pool = state.db_pool.clone();
    let search = query.search.clone().filter(|s| !s.is_empty());

    let invoices = tokio::task::spawn_blocking(move || -> Result<Vec<RowMap>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;

        match search {
            Some(term) => {
                let pattern = format!("%{}%", term);
                let mut stmt = conn
                    .prepare(
                        "SELECT i.id, i.invoice_number, i.date, i.due_date, i.amount, \
                                i.status, v.name AS vendor \
                         FROM \"Invoice\" i \
                         JOIN \"Vendor\" v ON i.\"vendorId\" = v.id \
                         WHERE i.invoice_number ILIKE ? OR v.name ILIKE ? \
                         ORDER BY i.date DESC",
                    )
                    .map_err(|e| e.to_string())?;
                rows::query_rows(&mut stmt, params![pattern.clone(), pattern])
                    .map_err(|e| e.to_string())
            }
            None => {
                let mut stmt = conn
                    .prepare(
                        "SELECT i.id, i.invoice_number, i.date, i.due_date, i.amount, \
                                i.status, v.name AS vendor \
                         FROM \"Invoice\" i \
                         JOIN \"Vendor\" v ON i.\"vendorId\" = v.id \
                         ORDER BY i.date DESC",
                    )
                    .map_err(|e| e.to_string())?;
                rows::query_rows(&mut stmt, []).map_err(|e| e.to_string())
            }
        }
    })
    .await
    .map_err(|e| e.to_string())
    .and_then(|r| r)
    .map_err(|e| fetch_failed("Failed to fetch invoices", e))?;

    Ok(Json(invoices))
}

// Natural-language bridge
pub async fn chat_with_data(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Response {
    info!("chat-with-data question: {}", payload.question);

    match state.pipeline.answer(&payload.question).await {
        Ok(answer) => (StatusCode::OK, Json(answer)).into_response(),
        Err(e) => {
            error!("chat-with-data failed: {}", e);
            chat_error_response(e)
        }
    }
}

fn chat_error_response(e: ChatError) -> Response {
    let (status, label) = match &e {
        ChatError::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "database unavailable"),
        ChatError::ModelUnavailable(_) => (StatusCode::BAD_GATEWAY, "processing failed"),
        ChatError::InvalidGeneratedQuery(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "could not generate a valid query",
        ),
        ChatError::QueryExecutionError(_) => (StatusCode::BAD_REQUEST, "query execution failed"),
    };

    let details = match e {
        ChatError::StoreUnavailable(d)
        | ChatError::ModelUnavailable(d)
        | ChatError::InvalidGeneratedQuery(d)
        | ChatError::QueryExecutionError(d) => d,
    };

    (
        status,
        Json(ErrorBody {
            error: label.to_string(),
            details: Some(details),
        }),
    )
        .into_response()
}

// System status
pub async fn system_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SystemStatus>, ApiError> {
    let now = chrono::Utc::now();
    let uptime = now.signed_duration_since(state.startup_time).num_seconds();

    let pool = state.db_pool.clone();
    let (invoice_count, vendor_count) =
        tokio::task::spawn_blocking(move || -> Result<(i64, i64), String> {
            let conn = pool.get().map_err(|e| e.to_string())?;
            let invoices: i64 = conn
                .query_row("SELECT COUNT(*) FROM \"Invoice\"", [], |row| row.get(0))
                .map_err(|e| e.to_string())?;
            let vendors: i64 = conn
                .query_row("SELECT COUNT(*) FROM \"Vendor\"", [], |row| row.get(0))
                .map_err(|e| e.to_string())?;
            Ok((invoices, vendors))
        })
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r)
        .map_err(|e| fetch_failed("Failed to fetch status", e))?;

    Ok(Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        invoice_count,
        vendor_count,
    }))
}
