//! Common error types for TagScan

use thiserror::Error;

/// Common result type for TagScan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across TagScan crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
