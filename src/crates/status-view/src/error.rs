//! Error types for the status view.

use thiserror::Error;

/// Result type for status view operations.
pub type Result<T> = std::result::Result<T, StatusError>;

/// Errors that can occur while fetching or configuring the status page.
#[derive(Debug, Error)]
pub enum StatusError {
    /// Transport-level HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status.
    #[error("Unexpected response status {status} when fetching {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The server answered with an API error envelope.
    #[error("{error_type}: {message}")]
    Api { error_type: String, message: String },

    /// The response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StatusError {
    fn from(err: serde_json::Error) -> Self {
        StatusError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for StatusError {
    fn from(err: url::ParseError) -> Self {
        StatusError::InvalidUrl(err.to_string())
    }
}
