//! Metadata store interface.

use async_trait::async_trait;
use vedit_models::{ProcessingDetails, VideoId, VideoRecord, VideoStatus};

use crate::error::StoreResult;

/// Persistent home of video records.
///
/// Every write is a whole-record rewrite that readers observe atomically.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Read a record. Missing or unreadable records are `NotFound`.
    async fn read(&self, video_id: &VideoId) -> StoreResult<VideoRecord>;

    /// Set the processing status.
    ///
    /// `processed = true` also completes progress and stamps
    /// `processing_completed`; otherwise the stamp is cleared.
    async fn write_status(
        &self,
        video_id: &VideoId,
        status: VideoStatus,
        processed: bool,
    ) -> StoreResult<()>;

    /// Set overall progress and the running step's details.
    ///
    /// Percentages are clamped to `[0, 100]`.
    async fn write_progress(
        &self,
        video_id: &VideoId,
        progress: f64,
        details: &ProcessingDetails,
    ) -> StoreResult<()>;
}

/// Clamp a percentage into `[0, 100]`.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Apply a status write to `record`.
pub fn apply_status(record: &mut VideoRecord, status: VideoStatus, processed: bool) {
    record.status = status;
    record.processed = processed;
    if processed {
        record.progress = 100.0;
        record.processing_completed = Some(chrono::Utc::now());
    } else {
        record.processing_completed = None;
    }
}

/// Apply a progress write to `record`.
pub fn apply_progress(record: &mut VideoRecord, progress: f64, details: &ProcessingDetails) {
    record.progress = clamp_percent(progress);
    record.processing_details = ProcessingDetails {
        current_step: details.current_step.clone(),
        total_steps: details.total_steps,
        current_step_progress: clamp_percent(details.current_step_progress),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(-3.0), 0.0);
        assert_eq!(clamp_percent(42.5), 42.5);
        assert_eq!(clamp_percent(140.0), 100.0);
        assert_eq!(clamp_percent(f64::NAN), 0.0);
    }

    #[test]
    fn test_apply_status_completed() {
        let mut record = VideoRecord::new(VideoId::from("v"), "mp4");
        apply_status(&mut record, VideoStatus::Completed, true);
        assert!(record.processed);
        assert_eq!(record.progress, 100.0);
        assert!(record.processing_completed.is_some());

        apply_status(&mut record, VideoStatus::Error, false);
        assert!(!record.processed);
        assert!(record.processing_completed.is_none());
    }

    #[test]
    fn test_apply_progress_clamps() {
        let mut record = VideoRecord::new(VideoId::from("v"), "mp4");
        let details = ProcessingDetails {
            current_step: "Silence Removal".to_string(),
            total_steps: 2,
            current_step_progress: 120.0,
        };
        apply_progress(&mut record, 101.0, &details);
        assert_eq!(record.progress, 100.0);
        assert_eq!(record.processing_details.current_step_progress, 100.0);
        assert_eq!(record.processing_details.current_step, "Silence Removal");
    }
}
