use clap::Parser;
use r2d2::Pool;
use std::sync::Arc;
use tracing::{error, info};

use spendlens::chat::{CatalogSchemaSource, ChatPipeline, PooledQueryRunner};
use spendlens::config::{AppConfig, CliArgs, Command};
use spendlens::db::{self, DuckDbConnectionManager};
use spendlens::ingest;
use spendlens::llm::LlmManager;
use spendlens::util::logging::init_tracing;
use spendlens::web::{self, state::AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Initializing DuckDB connection pool");
    let db_manager = DuckDbConnectionManager::new(config.database.connection_string.clone());
    let pool = Pool::builder()
        .max_size(config.database.pool_size as u32)
        .build(db_manager)?;

    // Make sure the invoice tables exist before anything touches the store
    {
        let conn = pool.get()?;
        db::bootstrap_schema(&conn)?;
    }

    // Seed mode: import the extraction feed and exit
    if let Some(Command::Seed { file }) = &args.command {
        info!("Seeding store from {}", file.display());
        let conn = pool.get()?;
        let summary = ingest::seed_from_file(&conn, file)?;
        info!(
            "Seeding finished: {} invoices created, {} documents skipped",
            summary.created, summary.skipped
        );
        return Ok(());
    }

    // Initialize the LLM manager
    info!("Initializing LLM manager with backend: {}", config.llm.backend);
    let llm_manager = LlmManager::new(&config.llm)?;

    // Wire the chat-with-data pipeline with its production dependencies
    let pipeline = ChatPipeline::new(
        Arc::new(CatalogSchemaSource::new(pool.clone())),
        Arc::new(llm_manager),
        Arc::new(PooledQueryRunner::new(pool.clone())),
        config.llm.explain,
    );

    // Create application state
    let app_state = Arc::new(AppState::new(config.clone(), pool, pipeline));

    // Start the web server
    info!(
        "Starting spendlens server on {}:{}",
        config.web.host, config.web.port
    );
    match web::run_server(&config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e);
        }
    }

    Ok(())
}
