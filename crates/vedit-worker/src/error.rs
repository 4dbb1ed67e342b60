//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Pipeline run aborted: {0}")]
    RunAborted(String),

    #[error("Media error: {0}")]
    Media(#[from] vedit_media::MediaError),

    #[error("Store error: {0}")]
    Store(#[from] vedit_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn run_aborted(msg: impl Into<String>) -> Self {
        Self::RunAborted(msg.into())
    }

    /// Check if the video record was missing or unreadable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WorkerError::Store(e) if e.is_not_found())
    }

    /// Short label used for the run outcome metric.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::ConfigError(_) => "config",
            WorkerError::RunAborted(_) => "aborted",
            WorkerError::Media(_) => "media",
            WorkerError::Store(_) => "store",
            WorkerError::Io(_) => "io",
        }
    }
}
