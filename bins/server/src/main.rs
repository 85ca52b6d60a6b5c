//! Schoolplan API Server
//!
//! Main entry point for the budget consolidation and enrollment projection
//! service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use schoolplan_api::{AppState, create_router};
use schoolplan_core::consolidation::{AccountMapping, ConsolidationEngine};
use schoolplan_core::statements::{StatementBuilder, StatementCache};
use schoolplan_db::{MemoryStore, PgStore, connect, demo_dataset};
use schoolplan_shared::{AppConfig, LogFormat, PlanningConfig, StorageBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(config.server.log_format);

    let engine = consolidation_engine(&config.planning)?;
    let statements = StatementBuilder::new(config.planning.period_split);
    let cache = StatementCache::with_config(
        config.planning.statement_cache_capacity,
        config.planning.statement_cache_ttl_secs,
    );

    let state = match config.storage.backend {
        StorageBackend::Memory => {
            let store = MemoryStore::new();
            if config.storage.seed_demo {
                let version = store.load_dataset(demo_dataset())?;
                info!(version_id = %version.id, "Loaded demo school dataset");
            } else {
                warn!("Memory backend selected; data is lost on restart");
            }
            let adapters = store.adapters();
            AppState::new(Arc::new(store), adapters, engine, statements, cache)
        }
        StorageBackend::Postgres => {
            let url = config
                .database
                .url
                .as_deref()
                .context("database.url is required for the postgres backend")?;
            let db = connect(
                url,
                config.database.max_connections,
                config.database.min_connections,
            )
            .await?;
            info!("Connected to database");
            let store = PgStore::new(db);
            let adapters = store.adapters();
            AppState::new(Arc::new(store), adapters, engine, statements, cache)
        }
    };

    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(backend = ?config.storage.backend, "Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "schoolplan=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Builds the engine from the configured mapping file, or the built-in PCG table.
fn consolidation_engine(planning: &PlanningConfig) -> anyhow::Result<ConsolidationEngine> {
    let Some(path) = planning.account_mapping_file.as_deref() else {
        return Ok(ConsolidationEngine::default());
    };
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read account mapping file {path}"))?;
    let mapping = AccountMapping::from_toml_str(&source)
        .with_context(|| format!("Invalid account mapping file {path}"))?;
    info!(path, rules = mapping.rules().len(), "Loaded account mapping");
    Ok(ConsolidationEngine::new(Arc::new(mapping)))
}
