use crate::chat::ChatPipeline;
use crate::config::AppConfig;
use crate::db::DuckDbConnectionManager;
use r2d2::Pool;

/// Shared application state for the web server. Nothing here is per-request:
/// the chat pipeline is stateless and the pool hands out store connections.
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: Pool<DuckDbConnectionManager>,
    pub pipeline: ChatPipeline,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db_pool: Pool<DuckDbConnectionManager>,
        pipeline: ChatPipeline,
    ) -> Self {
        Self {
            config,
            db_pool,
            pipeline,
            startup_time: chrono::Utc::now(),
        }
    }
}
