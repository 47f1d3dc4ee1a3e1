pub mod prompt;
pub mod sanitize;
pub mod schema;

pub use schema::{CatalogSchemaSource, SchemaColumn, SchemaDescriptor};

use crate::db::rows;
use crate::db::DuckDbConnectionManager;
use crate::llm::CompletionClient;
use async_trait::async_trait;
use r2d2::Pool;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

// Deterministic SQL, looser prose
const SQL_TEMPERATURE: f32 = 0.0;
const EXPLANATION_TEMPERATURE: f32 = 0.7;

/// Character budget for the result sample handed to the explanation call.
const EXPLANATION_SAMPLE_CHARS: usize = 400;

pub type RowMap = Map<String, Value>;

#[derive(Debug)]
pub enum ChatError {
    StoreUnavailable(String),
    ModelUnavailable(String),
    InvalidGeneratedQuery(String),
    QueryExecutionError(String),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::StoreUnavailable(msg) => write!(f, "store unavailable: {}", msg),
            ChatError::ModelUnavailable(msg) => write!(f, "model call failed: {}", msg),
            ChatError::InvalidGeneratedQuery(msg) => {
                write!(f, "invalid generated query: {}", msg)
            }
            ChatError::QueryExecutionError(msg) => write!(f, "query execution failed: {}", msg),
        }
    }
}

impl Error for ChatError {}

/// Reads the column catalog of the connected store.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn describe(&self) -> Result<SchemaDescriptor, ChatError>;
}

/// Executes validated SQL and returns the rows as column -> value maps.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    async fn run(&self, sql: &str) -> Result<Vec<RowMap>, ChatError>;
}

#[derive(Debug, Serialize)]
pub struct ChatAnswer {
    pub sql: String,
    /// JSON-encoded array of row objects, matching the wire contract.
    pub results_json: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// The question -> schema -> model -> sanitize -> execute -> explain pipeline.
///
/// Holds no per-request state: every call to [`answer`](Self::answer) is a
/// pure function of the question, the current catalog and the model output.
pub struct ChatPipeline {
    schema: Arc<dyn SchemaSource>,
    model: Arc<dyn CompletionClient>,
    runner: Arc<dyn QueryRunner>,
    explain: bool,
}

impl ChatPipeline {
    pub fn new(
        schema: Arc<dyn SchemaSource>,
        model: Arc<dyn CompletionClient>,
        runner: Arc<dyn QueryRunner>,
        explain: bool,
    ) -> Self {
        Self {
            schema,
            model,
            runner,
            explain,
        }
    }

    pub async fn answer(&self, question: &str) -> Result<ChatAnswer, ChatError> {
        debug!("Chat question: {}", question);

        let descriptor = self.schema.describe().await?;
        let generation_prompt = prompt::sql_generation_prompt(&descriptor, question);

        let raw = self
            .model
            .complete(&generation_prompt, SQL_TEMPERATURE)
            .await
            .map_err(|e| ChatError::ModelUnavailable(e.to_string()))?;
        debug!("Raw model output: {}", raw);

        let sql = sanitize::sanitize_sql(&raw)?;
        info!("Validated SQL: {}", sql);

        let rows = self.runner.run(&sql).await?;
        let results_json = serde_json::to_string(&rows)
            .map_err(|e| ChatError::QueryExecutionError(e.to_string()))?;

        let explanation = if self.explain {
            self.explain_results(question, &sql, &results_json).await
        } else {
            None
        };

        Ok(ChatAnswer {
            sql,
            results_json,
            explanation,
        })
    }

    /// Best-effort second model call. Failures degrade to no explanation; the
    /// SQL and rows are the deliverable.
    async fn explain_results(
        &self,
        question: &str,
        sql: &str,
        results_json: &str,
    ) -> Option<String> {
        let sample: String = results_json.chars().take(EXPLANATION_SAMPLE_CHARS).collect();
        let explanation_prompt = prompt::explanation_prompt(question, sql, &sample);

        match self
            .model
            .complete(&explanation_prompt, EXPLANATION_TEMPERATURE)
            .await
        {
            Ok(text) => {
                let text = text.trim().to_string();
                if text.is_empty() { None } else { Some(text) }
            }
            Err(e) => {
                warn!("Explanation call failed, responding without one: {}", e);
                None
            }
        }
    }
}

/// Production executor: runs the statement on a pooled DuckDB connection in a
/// blocking task. No statement timeout and no row cap.
pub struct PooledQueryRunner {
    pool: Pool<DuckDbConnectionManager>,
}

impl PooledQueryRunner {
    pub fn new(pool: Pool<DuckDbConnectionManager>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryRunner for PooledQueryRunner {
    async fn run(&self, sql: &str) -> Result<Vec<RowMap>, ChatError> {
        let pool = self.pool.clone();
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ChatError::StoreUnavailable(e.to_string()))?;
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| ChatError::QueryExecutionError(e.to_string()))?;
            rows::query_rows(&mut stmt, [])
                .map_err(|e| ChatError::QueryExecutionError(e.to_string()))
        })
        .await
        .map_err(|e| ChatError::QueryExecutionError(format!("query task failed: {}", e)))?
    }
}
