//! Metadata store error types.

use thiserror::Error;

/// Result type for metadata store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur reading or writing video records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record is missing or its stored encoding cannot be read.
    #[error("Video not found: {0}")]
    NotFound(String),

    #[error("Invalid video id: {0:?}")]
    InvalidId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(video_id: impl Into<String>) -> Self {
        Self::NotFound(video_id.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
