//! Structured run logging utilities.
//!
//! Provides consistent, structured logging for pipeline runs with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};
use uuid::Uuid;
use vedit_models::VideoId;

/// Run logger for structured logging with consistent formatting.
///
/// Every line carries the video ID, the operation and a per-run ID so
/// interleaved runs can be told apart.
#[derive(Debug, Clone)]
pub struct RunLogger {
    video_id: String,
    operation: String,
    run_id: String,
}

impl RunLogger {
    /// Create a new logger for one run of `operation` on `video_id`.
    pub fn new(video_id: &VideoId, operation: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            operation: operation.to_string(),
            run_id: Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            run_id = %self.run_id,
            "Run started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            run_id = %self.run_id,
            "Run progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            video_id = %self.video_id,
            operation = %self.operation,
            run_id = %self.run_id,
            "Run warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            video_id = %self.video_id,
            operation = %self.operation,
            run_id = %self.run_id,
            "Run error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            run_id = %self.run_id,
            "Run completed: {}", message
        );
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Create a tracing span for this run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "pipeline_run",
            video_id = %self.video_id,
            operation = %self.operation,
            run_id = %self.run_id
        )
    }
}
