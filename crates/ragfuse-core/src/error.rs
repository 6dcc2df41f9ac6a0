use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("{backend} backend failed: {message}")]
    Backend { backend: String, message: String },

    #[error("{0} timed out after {1:?}")]
    Timeout(String, Duration),

    #[error("{0} was cancelled")]
    Cancelled(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap any displayable backend error under the backend's name.
    pub fn backend(backend: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Backend { backend: backend.into(), message: err.to_string() }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(..))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
