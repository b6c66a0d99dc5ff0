//! Error types for the plot stream service

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Rate limited: retry after {retry_after_ms} ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Delivery failed with status {status}: {body}")]
    Delivery { status: u16, body: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StreamError {
    /// Client-caused errors are reported back to the caller, never logged as faults
    pub fn is_client_error(&self) -> bool {
        matches!(self, StreamError::Validation(_) | StreamError::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
