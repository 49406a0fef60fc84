//! # Error Types
//!
//! Custom error types for the gimbal link using `thiserror`.

use thiserror::Error;

/// Main error type for the gimbal link
#[derive(Debug, Error)]
pub enum GimbalLinkError {
    /// Serial port errors (open, reopen, write)
    #[error("Serial error: {0}")]
    Serial(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the gimbal link
pub type Result<T> = std::result::Result<T, GimbalLinkError>;
