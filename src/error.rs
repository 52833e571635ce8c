//! Error Handling
//!
//! Only transport-level failures surface as errors. Undecodable lines and
//! envelopes without a delta are skipped by the streaming layer and never
//! reach this type.

use thiserror::Error;

/// Errors that can terminate a chat turn or reject a configuration.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The request could not be sent or the connection failed.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The server answered with a non-success status.
    #[error("API error {code}: {message}")]
    ApiError { code: u16, message: String },

    /// The response body failed while it was being streamed.
    #[error("Stream error: {0}")]
    StreamError(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Local I/O failure (terminal input/output, log files).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ChatError {
    /// Create an API error from a status code and response body.
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
        }
    }

    /// HTTP status code, when the server produced one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the error came from the transport (connection, status, body).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::HttpError(_) | Self::ApiError { .. } | Self::StreamError(_)
        )
    }
}

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, ChatError>;
