//! tagscan-server library interface
//!
//! Exposes the router and application state for the binary and for
//! integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tagscan_common::config::TagscanConfig;
use tower_http::trace::TraceLayer;

use crate::db::TagStore;
use crate::services::{BatchCoordinator, ExtractionWorker, SubscriptionRegistry, TagExtractor};

/// Live stream tuning
#[derive(Debug, Clone)]
pub struct LiveSettings {
    pub keep_alive: Duration,
    pub idle_timeout: Option<Duration>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Live listener registry, shared by the gateway and the workers
    pub registry: Arc<SubscriptionRegistry>,
    /// Batch driver
    pub coordinator: Arc<BatchCoordinator>,
    /// HS256 secret for bearer tokens
    pub jwt_secret: Arc<str>,
    pub live: LiveSettings,
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire the pipeline from configuration and injected collaborators
    pub fn new(
        config: &TagscanConfig,
        db: SqlitePool,
        extractor: Arc<dyn TagExtractor>,
        store: Arc<dyn TagStore>,
    ) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new(config.live.channel_capacity));
        let worker = ExtractionWorker::new(
            extractor,
            store,
            registry.clone(),
            Duration::from_secs(config.vision.timeout_secs),
            config.assets.url_template.clone(),
        );
        let coordinator = BatchCoordinator::new(Arc::new(worker), config.pipeline.max_concurrency);

        Self {
            db,
            registry,
            coordinator: Arc::new(coordinator),
            jwt_secret: Arc::from(config.auth.jwt_secret.clone().unwrap_or_default()),
            live: LiveSettings {
                keep_alive: Duration::from_secs(config.live.keep_alive_secs.max(1)),
                idle_timeout: config.live.idle_timeout_secs.map(Duration::from_secs),
            },
            max_upload_bytes: config.pipeline.max_upload_bytes,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .merge(api::scan_routes().layer(DefaultBodyLimit::max(max_upload_bytes)))
        .merge(api::live_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
