//! Custom error types for Parley
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for Parley operations
#[derive(Error, Debug)]
pub enum ParleyError {
    /// Non-success response from the completion provider
    #[error("OpenRouter API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    /// Provider-side failure that is not an HTTP status (stream errors, API error records)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Configuration errors (missing prompt, models or credentials)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation not allowed in the current session status
    #[error("{0}")]
    InvalidState(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for Parley operations
pub type Result<T> = std::result::Result<T, ParleyError>;

impl ParleyError {
    /// Create an API error from a status code and response body
    pub fn api(status: u16, detail: impl Into<String>) -> Self {
        Self::Api {
            status,
            detail: detail.into(),
        }
    }

    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid-state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}
