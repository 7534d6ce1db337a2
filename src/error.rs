//! Error types for the throttler.

use thiserror::Error;

/// Main error type for throttler operations.
#[derive(Error, Debug)]
pub enum ThrottlerError {
    /// A limiter was constructed with a non-positive rate limit or period
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for throttler operations.
pub type Result<T> = std::result::Result<T, ThrottlerError>;
