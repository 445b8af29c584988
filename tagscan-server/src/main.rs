//! tagscan-server - Asset tag scanning service
//!
//! Accepts batches of photos, reads the numeric asset tag on each through a
//! vision model, stores the tags and pushes them to live viewers over SSE.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tagscan_common::config::TagscanConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tagscan_server::db::SqliteTagStore;
use tagscan_server::services::VisionClient;
use tagscan_server::AppState;

/// Command-line arguments (highest configuration priority)
#[derive(Debug, Parser)]
#[command(name = "tagscan-server", version, about = "Asset tag scanning service")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "TAGSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite database path
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = TagscanConfig::resolve(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database) = args.database {
        config.database.path = database;
    }

    // RUST_LOG overrides the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting tagscan-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match args.config.clone().or_else(tagscan_common::config::default_config_path) {
        Some(path) if path.exists() => info!("Configuration file: {}", path.display()),
        _ => info!("No configuration file found; using defaults and environment"),
    }
    config.validate()?;

    info!("Database: {}", config.database.path.display());
    let db_pool = tagscan_server::db::init_database_pool(&config.database.path).await?;
    info!("Database connection established");

    if config.vision.api_key.is_none() {
        info!("No vision API key configured; requests will be sent unauthenticated");
    }
    let extractor = Arc::new(VisionClient::new(&config.vision)?);
    let store = Arc::new(SqliteTagStore::new(db_pool.clone()));
    info!(
        model = %config.vision.model,
        timeout_secs = config.vision.timeout_secs,
        max_concurrency = config.pipeline.max_concurrency,
        "Scan pipeline ready"
    );

    let state = AppState::new(&config, db_pool, extractor, store);
    let app = tagscan_server::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
