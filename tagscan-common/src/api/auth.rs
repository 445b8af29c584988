//! Bearer credential verification
//!
//! # Architecture
//!
//! Credentials are HS256-signed JWTs issued by the account service (outside
//! this crate). TagScan only verifies them:
//! - Batch submissions carry the token in the `Authorization: Bearer` header
//! - Live streams carry it in the `token` query parameter, because the
//!   browser EventSource API cannot send custom headers
//!
//! Both paths converge on [`verify_token`].

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::models::UserId;

// ========================================
// Error Types
// ========================================

/// Authentication error types
///
/// Each variant maps to a distinct reason code so clients can tell an expired
/// session (re-login) from a forged or corrupted token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No credential supplied, or the client serialized an unset variable
    /// (`"null"` / `"undefined"`)
    MissingToken,

    /// Signature valid but `exp` is in the past
    Expired,

    /// Signature does not match the shared secret
    InvalidSignature,

    /// Not a decodable JWT, or required claims missing
    Malformed(String),
}

impl AuthError {
    /// Stable machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::Expired => "token_expired",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Malformed(_) => "malformed_token",
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Authentication token is required"),
            AuthError::Expired => write!(f, "Authentication token has expired"),
            AuthError::InvalidSignature => write!(f, "Authentication token signature is invalid"),
            AuthError::Malformed(err) => write!(f, "Authentication token is malformed: {}", err),
        }
    }
}

impl std::error::Error for AuthError {}

// ========================================
// Claims
// ========================================

/// Verified token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id of the principal
    pub id: UserId,
    /// Principal's email, copied onto every record they create
    pub email: String,
    /// Expiry as Unix seconds
    pub exp: usize,
}

// ========================================
// Credential Extraction
// ========================================

/// Validate a credential taken from a query string
///
/// Rejects absent and empty values, and the literal strings `"null"` and
/// `"undefined"` that JavaScript clients produce when interpolating an unset
/// token into a URL.
///
/// # Examples
///
/// ```
/// use tagscan_common::api::auth::{credential_from_query, AuthError};
///
/// assert_eq!(credential_from_query(Some("abc.def.ghi")), Ok("abc.def.ghi"));
/// assert_eq!(credential_from_query(Some("undefined")), Err(AuthError::MissingToken));
/// assert_eq!(credential_from_query(None), Err(AuthError::MissingToken));
/// ```
pub fn credential_from_query(raw: Option<&str>) -> Result<&str, AuthError> {
    match raw.map(str::trim) {
        None | Some("") | Some("null") | Some("undefined") => Err(AuthError::MissingToken),
        Some(token) => Ok(token),
    }
}

/// Extract the credential from an `Authorization` header value
///
/// Accepts `Bearer <token>` (scheme is case-insensitive) and then applies the
/// same placeholder rejection as [`credential_from_query`].
pub fn bearer_from_header(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingToken)?.trim();
    let (scheme, token) = header.split_once(' ').ok_or(AuthError::MissingToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingToken);
    }
    credential_from_query(Some(token))
}

// ========================================
// Verification
// ========================================

/// Verify signature and expiry of an HS256 token
///
/// No leeway is applied to `exp`.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            _ => AuthError::Malformed(e.to_string()),
        })
}

// ========================================
// Tests
// ========================================
