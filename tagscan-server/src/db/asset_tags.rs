//! Asset tag persistence
//!
//! Append-only: the pipeline inserts one row per normalized tag and never
//! updates or deletes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tagscan_common::{AssetTagRecord, UserId};
use thiserror::Error;

/// Storage write failure for a single record
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored row is invalid: {0}")]
    InvalidRow(String),
}

impl PersistenceError {
    pub fn code(&self) -> &'static str {
        match self {
            PersistenceError::Database(_) => "DATABASE_ERROR",
            PersistenceError::InvalidRow(_) => "INVALID_ROW",
        }
    }
}

/// Record contents before the store assigns an id
#[derive(Debug, Clone)]
pub struct NewAssetTag {
    pub asset_tag: String,
    pub asset_url: String,
    pub scanned_at: DateTime<Utc>,
    pub source_image_name: Option<String>,
    pub owner_user_id: UserId,
    pub owner_email: String,
    pub room_number: Option<String>,
}

impl NewAssetTag {
    fn into_record(self, id: i64) -> AssetTagRecord {
        AssetTagRecord {
            id,
            asset_tag: self.asset_tag,
            asset_url: self.asset_url,
            scanned_at: self.scanned_at,
            source_image_name: self.source_image_name,
            owner_user_id: self.owner_user_id,
            owner_email: self.owner_email,
            room_number: self.room_number,
        }
    }
}

/// Append-only record store
#[async_trait]
pub trait TagStore: Send + Sync {
    async fn insert(&self, tag: NewAssetTag) -> Result<AssetTagRecord, PersistenceError>;
}

/// SQLite-backed [`TagStore`]
#[derive(Clone)]
pub struct SqliteTagStore {
    pool: SqlitePool,
}

impl SqliteTagStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagStore for SqliteTagStore {
    async fn insert(&self, tag: NewAssetTag) -> Result<AssetTagRecord, PersistenceError> {
        let result = sqlx::query(
            r#"
            INSERT INTO asset_tags (
                asset_tag, asset_url, scanned_at, source_image_name,
                owner_user_id, owner_email, room_number
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&tag.asset_tag)
        .bind(&tag.asset_url)
        .bind(tag.scanned_at.to_rfc3339())
        .bind(&tag.source_image_name)
        .bind(tag.owner_user_id)
        .bind(&tag.owner_email)
        .bind(&tag.room_number)
        .execute(&self.pool)
        .await?;

        Ok(tag.into_record(result.last_insert_rowid()))
    }
}

/// Load one record by id
pub async fn load_tag(pool: &SqlitePool, id: i64) -> Result<Option<AssetTagRecord>, PersistenceError> {
    let row = sqlx::query(
        r#"
        SELECT id, asset_tag, asset_url, scanned_at, source_image_name,
               owner_user_id, owner_email, room_number
        FROM asset_tags
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let scanned_at: String = row.get("scanned_at");
    let scanned_at = DateTime::parse_from_rfc3339(&scanned_at)
        .map_err(|e| PersistenceError::InvalidRow(format!("scanned_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(Some(AssetTagRecord {
        id: row.get("id"),
        asset_tag: row.get("asset_tag"),
        asset_url: row.get("asset_url"),
        scanned_at,
        source_image_name: row.get("source_image_name"),
        owner_user_id: row.get("owner_user_id"),
        owner_email: row.get("owner_email"),
        room_number: row.get("room_number"),
    }))
}
