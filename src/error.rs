//! Error types for Runbox

use thiserror::Error;

/// Result type alias using Runbox's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Runbox
///
/// Only configuration and connectivity problems surface as `Err`. Failures
/// of the code being executed (non-zero exit, compile errors, unsupported
/// languages, backend HTTP errors) are encoded in the returned
/// [`ExecuteResult`](crate::workspace::ExecuteResult) so callers can branch
/// on `exit_code`/`stderr` and still see partial output.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workspace lifecycle error (not initialized, already torn down)
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// Docker/container error
    #[error("Container error: {0}")]
    Container(String),

    /// Remote execution service error
    #[error("Remote sandbox error: {0}")]
    Remote(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Container(_) | Error::Remote(_) | Error::Timeout(_)
        )
    }

    /// Check if error is a client error (user's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::NotFound(_) | Error::Config(_)
        )
    }
}

impl From<bollard::errors::Error> for Error {
    fn from(err: bollard::errors::Error) -> Self {
        Error::Container(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Config(format!("Invalid URL: {}", err))
    }
}
