//! Bearer authentication extractor for header-capable endpoints
//!
//! **Implementation Note:** Uses the custom extractor pattern instead of a
//! tower layer: only `/api/scan` needs it, and the live stream authenticates
//! from its query string instead (EventSource cannot send headers).

use axum::{async_trait, extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use tagscan_common::api::{bearer_from_header, verify_token, Claims};

use crate::error::ApiError;
use crate::AppState;

/// Verified caller identity
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());

        let claims = bearer_from_header(header)
            .and_then(|token| verify_token(token, &state.jwt_secret))
            .map_err(|e| {
                tracing::debug!(path = %parts.uri.path(), reason = e.code(), "Rejected bearer credential");
                ApiError::Unauthorized(e)
            })?;

        Ok(Self(claims))
    }
}
