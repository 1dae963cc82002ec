//! Error types for the quark_transfer crate.

use thiserror::Error;

/// Errors that can occur when interacting with Quark drive.
#[derive(Error, Debug)]
pub enum QuarkError {
    #[error("invalid share link: {0}")]
    InvalidLink(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("share contains no files")]
    NoFilesFound,

    #[error("task {task_id} failed: {message}")]
    JobFailed { task_id: String, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by server (HTTP 429)")]
    RateLimited,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

impl QuarkError {
    /// Whether this error was caused by caller input (bad link, rejected
    /// cookie, an empty share) rather than a server or transport problem.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            QuarkError::InvalidLink(_) | QuarkError::Authentication(_) | QuarkError::NoFilesFound
        )
    }
}

/// Result type alias for QuarkError.
pub type Result<T> = std::result::Result<T, QuarkError>;
