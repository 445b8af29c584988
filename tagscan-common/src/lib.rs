//! # TagScan Common Library
//!
//! Shared code for the TagScan service including:
//! - Error types
//! - Bootstrap configuration loading
//! - Event types pushed to live listeners (TagEvent)
//! - Asset tag record model
//! - Bearer credential verification

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
pub use events::TagEvent;
pub use models::{AssetTagRecord, UserId};
