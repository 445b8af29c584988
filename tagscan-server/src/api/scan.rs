//! Batch submission
//!
//! `POST /api/scan` (multipart/form-data)
//! - `images`: one part per image (repeatable)
//! - `roomNumber`: optional room label applied to every record
//! - `detail`: optional `low` / `high`; anything else means `auto`
//!
//! Responds 200 with `{texts, outcomes}` when at least one image produced
//! text, 502 with the same arrays plus an `error` object when none did.

use axum::{
    extract::{multipart::Field, Multipart, State},
    routing::post,
    Json, Router,
};

use crate::api::AuthenticatedUser;
use crate::error::{ApiError, ApiResult};
use crate::models::{BatchResult, DetailLevel, ImageItem, ScanContext};
use crate::AppState;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Parsed multipart body
#[derive(Debug, Default)]
struct ScanForm {
    images: Vec<ImageItem>,
    room_number: Option<String>,
    detail: Option<String>,
}

/// POST /api/scan
pub async fn submit_scan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    multipart: Multipart,
) -> ApiResult<Json<BatchResult>> {
    let form = read_form(multipart).await?;

    let user_id = claims.id;
    let context = ScanContext {
        user_id: claims.id,
        user_email: claims.email,
        room_number: form.room_number,
        detail: DetailLevel::from_hint(form.detail.as_deref()),
    };

    let result = state.coordinator.process_batch(form.images, context).await?;

    if result.had_error {
        tracing::warn!(
            user_id,
            images = result.outcomes.len(),
            "Every image in batch failed"
        );
        return Err(ApiError::BatchFailed(result));
    }

    Ok(Json(result))
}

async fn read_form(mut multipart: Multipart) -> ApiResult<ScanForm> {
    let mut form = ScanForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("images") | Some("image") => form.images.push(read_image(field).await?),
            Some("roomNumber") => {
                let text = read_text(field).await?;
                let text = text.trim();
                if !text.is_empty() {
                    form.room_number = Some(text.to_string());
                }
            }
            Some("detail") => form.detail = Some(read_text(field).await?),
            other => tracing::debug!(field = ?other, "Ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

async fn read_image(field: Field<'_>) -> ApiResult<ImageItem> {
    let filename = field.file_name().map(str::to_string);
    let declared = field
        .content_type()
        .map(str::to_string)
        .filter(|mime| mime != FALLBACK_MIME);

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read image upload: {}", e)))?;

    // Sniff when the client didn't declare a useful type
    let mime_type = declared
        .or_else(|| infer::get(&bytes).map(|kind| kind.mime_type().to_string()))
        .unwrap_or_else(|| FALLBACK_MIME.to_string());

    Ok(ImageItem::new(bytes.to_vec(), mime_type, filename))
}

async fn read_text(field: Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read form field: {}", e)))
}

/// Build scan routes
pub fn scan_routes() -> Router<AppState> {
    Router::new().route("/api/scan", post(submit_scan))
}
