//! Durable asset tag record shared by persistence and live push

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of an authenticated user (the `id` claim of the bearer token)
pub type UserId = i64;

/// A persisted asset tag
///
/// Created exactly once per successfully normalized tag. The pipeline never
/// mutates or deletes a record after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTagRecord {
    /// Storage row id
    pub id: i64,
    /// Digit sequence exactly as normalized (leading zeros preserved)
    pub asset_tag: String,
    /// Canonical deep-link URL derived from the tag value
    pub asset_url: String,
    /// When the image was processed
    pub scanned_at: DateTime<Utc>,
    /// Original upload filename, if the client supplied one
    pub source_image_name: Option<String>,
    /// User who submitted the image
    pub owner_user_id: UserId,
    /// Email of the submitting user at scan time
    pub owner_email: String,
    /// Optional room label supplied with the batch
    pub room_number: Option<String>,
}
