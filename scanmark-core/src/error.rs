//! Error types for scanmark

use thiserror::Error;

/// Main error type for scanmark operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Truncated payload: {required} bytes required, {available} available")]
    TruncatedPayload { required: usize, available: usize },

    #[error("Invalid exchange document: {0}")]
    InvalidExchangeDocument(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type alias for scanmark operations
pub type Result<T> = std::result::Result<T, Error>;
