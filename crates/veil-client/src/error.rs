//! Error types for the backend boundary.

use thiserror::Error;

/// Errors that can occur while talking to the redaction backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The backend refused the request for lack of the required role (HTTP 403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Any other non-success status.
    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a response (connect, timeout, reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// A URL could not be built from the configured base.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Whether this is an authorization denial rather than a generic failure.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, ClientError::Forbidden(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            ClientError::Status {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(e: url::ParseError) -> Self {
        ClientError::InvalidUrl(e.to_string())
    }
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, ClientError>;
