//! API module for shared HTTP API functionality
//!
//! # Design Principle
//!
//! This module contains ONLY pure functions and shared types. No HTTP
//! framework dependencies; the server wraps these in Axum extractors.

pub mod auth;

pub use auth::{
    bearer_from_header, credential_from_query, verify_token, AuthError, Claims,
};
