//! Error types for smartcart-core

use thiserror::Error;

/// Main error type for the smartcart-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A `from`/`to`/`date` parameter is missing or unparsable
    #[error("invalid date range: {0}")]
    InvalidRange(String),

    /// The record store failed while serving an analytics request
    #[error("record store unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Record not found
    #[error("{collection} record not found: {id}")]
    NotFound { collection: &'static str, id: String },
}

/// Result type alias for smartcart-core
pub type Result<T> = std::result::Result<T, Error>;
