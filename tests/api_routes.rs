//! Endpoint tests over a real temporary store, with only the model provider
//! replaced by a scripted double.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use r2d2::Pool;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

use spendlens::chat::{CatalogSchemaSource, ChatPipeline, PooledQueryRunner};
use spendlens::config::AppConfig;
use spendlens::db::{self, DuckDbConnectionManager};
use spendlens::llm::{CompletionClient, LlmError};
use spendlens::web::routes::api_routes;
use spendlens::web::state::AppState;

struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
        })
    }
}

#[async_trait]
impl CompletionClient for ScriptedModel {
    async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String, LlmError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::ResponseError("script exhausted".to_string())))
    }
}

/// Temporary store with one vendor and two invoices.
fn seeded_state(model_replies: Vec<Result<String, LlmError>>) -> (Arc<AppState>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("api.duckdb");
    let manager = DuckDbConnectionManager::new(db_path.to_string_lossy().to_string());
    let pool = Pool::builder().max_size(2).build(manager).unwrap();

    {
        let conn = pool.get().unwrap();
        db::bootstrap_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO "Vendor" (name) VALUES ('Acme Corp');
            INSERT INTO "Customer" (name, address) VALUES ('Globex', '1 Main St');
            INSERT INTO "Invoice"
                (invoice_number, date, due_date, amount, status, "vendorId", "customerId")
            VALUES
                ('INV-100', TIMESTAMP '2024-01-10 00:00:00', TIMESTAMP '2024-02-10 00:00:00',
                 150.0, 'Pending', 1, 1),
                ('INV-200', TIMESTAMP '2024-02-05 00:00:00', TIMESTAMP '2024-03-05 00:00:00',
                 50.0, 'Paid', 1, 1);
            INSERT INTO "LineItem" (description, quantity, price, category, "invoiceId")
            VALUES ('Cloud hosting', 3, 50.0, 'IT/Cloud', 1);
            "#,
        )
        .unwrap();
    }

    let pipeline = ChatPipeline::new(
        Arc::new(CatalogSchemaSource::new(pool.clone())),
        ScriptedModel::new(model_replies),
        Arc::new(PooledQueryRunner::new(pool.clone())),
        false,
    );

    let state = Arc::new(AppState::new(AppConfig::default(), pool, pipeline));
    (state, dir)
}

async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let app = api_routes().with_state(state);
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn post_chat(state: Arc<AppState>, question: &str) -> (StatusCode, Value) {
    let app = api_routes().with_state(state);
    let request = Request::builder()
        .method("POST")
        .uri("/chat-with-data")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(format!("{{\"question\": \"{}\"}}", question)))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_check_answers() {
    let (state, _dir) = seeded_state(vec![]);
    let app = api_routes().with_state(state);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"API is running!");
}

#[tokio::test]
async fn stats_aggregate_the_invoices() {
    let (state, _dir) = seeded_state(vec![]);
    let (status, body) = get_json(state, "/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalSpend"], 200.0);
    assert_eq!(body["totalInvoices"], 2);
    assert_eq!(body["avgInvoiceValue"], 100.0);
    assert_eq!(body["documentsUploaded"], 2);
}

#[tokio::test]
async fn invoice_trends_group_by_month() {
    let (state, _dir) = seeded_state(vec![]);
    let (status, body) = get_json(state, "/invoice-trends").await;

    assert_eq!(status, StatusCode::OK);
    let months: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["month"].as_str().unwrap())
        .collect();
    assert_eq!(months, vec!["2024-01", "2024-02"]);
    // Counts are 64-bit aggregates and serialize as strings
    assert_eq!(body[0]["invoice_count"], "1");
}

#[tokio::test]
async fn invoices_filter_on_search_term() {
    let (state, _dir) = seeded_state(vec![]);

    let (status, body) = get_json(state.clone(), "/invoices").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    // Newest first
    assert_eq!(body[0]["invoice_number"], "INV-200");

    let (status, body) = get_json(state.clone(), "/invoices?search=inv-100").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["invoice_number"], "INV-100");
    assert_eq!(body[0]["vendor"], "Acme Corp");

    let (status, body) = get_json(state, "/invoices?search=acme").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn cash_outflow_skips_paid_invoices() {
    let (state, _dir) = seeded_state(vec![]);
    let (status, body) = get_json(state, "/cash-outflow").await;

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["date"], "2024-02-10");
    assert_eq!(rows[0]["amount_due"], 150.0);
}

#[tokio::test]
async fn category_spend_multiplies_price_by_quantity() {
    let (state, _dir) = seeded_state(vec![]);
    let (status, body) = get_json(state, "/category-spend").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["category"], "IT/Cloud");
    assert_eq!(body[0]["total_spend"], 150.0);
}

#[tokio::test]
async fn chat_with_data_runs_generated_sql_against_the_store() {
    let (state, _dir) = seeded_state(vec![Ok(
        "```sql\nSELECT SUM(amount) AS sum FROM \"Invoice\";\n```".to_string(),
    )]);

    let (status, body) = post_chat(state, "what is the total spend?").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sql"], "SELECT SUM(amount) AS sum FROM \"Invoice\"");
    let results: Value = serde_json::from_str(body["results_json"].as_str().unwrap()).unwrap();
    assert_eq!(results[0]["sum"], 200.0);
    assert!(body.get("explanation").is_none());
}

#[tokio::test]
async fn chat_with_data_rejects_non_select_output() {
    let (state, _dir) = seeded_state(vec![Ok("DROP TABLE \"Invoice\";".to_string())]);

    let (status, body) = post_chat(state.clone(), "drop the invoices table").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "could not generate a valid query");

    // The gate fired before execution: the table is still there
    let (status, body) = get_json(state, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalInvoices"], 2);
}

#[tokio::test]
async fn chat_with_data_surfaces_store_errors() {
    let (state, _dir) = seeded_state(vec![Ok(
        "SELECT no_such_column FROM \"Invoice\"".to_string(),
    )]);

    let (status, body) = post_chat(state, "bad column").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "query execution failed");
    assert!(body["details"].as_str().is_some());
}

#[tokio::test]
async fn system_status_reports_counts() {
    let (state, _dir) = seeded_state(vec![]);
    let (status, body) = get_json(state, "/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invoice_count"], 2);
    assert_eq!(body["vendor_count"], 1);
    assert!(body["version"].as_str().is_some());
}
