//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, TedError>;

/// Errors raised by the shared types
#[derive(Error, Debug)]
pub enum TedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid month '{0}': expected YYYY-MM")]
    InvalidMonth(String),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
