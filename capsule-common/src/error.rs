//! Common error types for Capsule Radio

use thiserror::Error;

/// Common result type for Capsule Radio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the library and the proxy service
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required setting absent from config file and environment
    #[error("Missing {0}")]
    MissingSetting(String),

    /// Payload failed a catalog/API contract check
    #[error("Contract violation: {0}")]
    Contract(String),
}
