//! Database access for tagscan-server
//!
//! SQLite via sqlx. The pipeline only appends to `asset_tags`; editing and
//! exporting records belong to other services sharing the same file.

pub mod asset_tags;

pub use asset_tags::{NewAssetTag, PersistenceError, SqliteTagStore, TagStore};

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory pool (every pooled connection to `:memory:`
/// would otherwise see its own empty database)
pub async fn init_in_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create tables if they don't exist
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS asset_tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            asset_tag TEXT NOT NULL,
            asset_url TEXT NOT NULL,
            scanned_at TEXT NOT NULL,
            source_image_name TEXT,
            owner_user_id INTEGER NOT NULL,
            owner_email TEXT NOT NULL,
            room_number TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_asset_tags_owner ON asset_tags (owner_user_id, scanned_at)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (asset_tags)");

    Ok(())
}
