//! Video record models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::edit::EditOperation;

/// Unique identifier for an uploaded video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Processing status of a video record.
///
/// Transitions are `uploaded -> processing -> {completed, error}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Stored, no run started yet
    #[default]
    Uploaded,
    /// A pipeline run is in progress
    Processing,
    /// The processed output is available
    Completed,
    /// The last run failed
    Error,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploaded => "uploaded",
            VideoStatus::Processing => "processing",
            VideoStatus::Completed => "completed",
            VideoStatus::Error => "error",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Completed | VideoStatus::Error)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-step progress details shown to pollers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingDetails {
    /// Human-readable name of the running step
    #[serde(default)]
    pub current_step: String,
    /// Number of steps in the run
    #[serde(default)]
    pub total_steps: u32,
    /// Progress of the running step (0-100)
    #[serde(default)]
    pub current_step_progress: f64,
}

/// Transforms requested at upload time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Edit operations, applied strictly in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_operations: Option<Vec<EditOperation>>,
    /// Cut silent stretches out of the video
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub remove_silence: bool,
    /// Crop to 9:16 around the speaker's face
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_crop_face: bool,
}

impl ProcessingOptions {
    /// Edit operations, or an empty slice when none were requested.
    pub fn edits(&self) -> &[EditOperation] {
        self.edit_operations.as_deref().unwrap_or_default()
    }

    /// True when no transform was requested at all.
    pub fn is_empty(&self) -> bool {
        self.edits().is_empty() && !self.remove_silence && !self.auto_crop_face
    }
}

/// Video record as persisted by the metadata store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Unique video ID
    pub video_id: VideoId,

    /// Name of the file as uploaded
    #[serde(default)]
    pub original_filename: String,

    /// Size of the uploaded file in bytes
    #[serde(default)]
    pub file_size: u64,

    /// Container extension without the dot (e.g. "mp4")
    pub extension: String,

    /// Upload timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_timestamp: Option<DateTime<Utc>>,

    /// Processing status
    #[serde(default)]
    pub status: VideoStatus,

    #[serde(default)]
    pub mime_type: Option<String>,

    /// Whether the processed output exists
    #[serde(default)]
    pub processed: bool,

    /// Overall progress percentage (0-100)
    #[serde(default)]
    pub progress: f64,

    #[serde(default)]
    pub processing_details: ProcessingDetails,

    /// Set when `processed` flips to true
    #[serde(default)]
    pub processing_completed: Option<DateTime<Utc>>,

    #[serde(default)]
    pub processing_options: ProcessingOptions,

    /// Fields written by other collaborators, kept verbatim across rewrites
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl VideoRecord {
    /// Create a freshly uploaded record.
    pub fn new(video_id: VideoId, extension: impl Into<String>) -> Self {
        Self {
            video_id,
            original_filename: String::new(),
            file_size: 0,
            extension: extension.into(),
            upload_timestamp: Some(Utc::now()),
            status: VideoStatus::Uploaded,
            mime_type: None,
            processed: false,
            progress: 0.0,
            processing_details: ProcessingDetails::default(),
            processing_completed: None,
            processing_options: ProcessingOptions::default(),
            extra: serde_json::Map::new(),
        }
    }

    /// Builder-style setter for processing options.
    pub fn with_options(mut self, options: ProcessingOptions) -> Self {
        self.processing_options = options;
        self
    }

    /// File name of the uploaded source (`<id>.<ext>`).
    pub fn source_file_name(&self) -> String {
        format!("{}.{}", self.video_id, self.extension)
    }

    /// File name of the processed output (`<prefix><id>.<ext>`).
    pub fn processed_file_name(&self, prefix: &str) -> String {
        format!("{}{}.{}", prefix, self.video_id, self.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_strings() {
        assert_eq!(VideoStatus::Uploaded.as_str(), "uploaded");
        assert_eq!(VideoStatus::Error.to_string(), "error");
        assert!(VideoStatus::Completed.is_terminal());
        assert!(!VideoStatus::Processing.is_terminal());
    }

    #[test]
    fn test_record_parses_stored_json() {
        let stored = json!({
            "video_id": "abc",
            "original_filename": "talk.mp4",
            "file_size": 1024,
            "extension": "mp4",
            "upload_timestamp": "2024-05-01T10:00:00+00:00",
            "status": "uploaded",
            "mime_type": null,
            "processed": false,
            "progress": 0,
            "processing_details": {
                "current_step": "",
                "total_steps": 0,
                "current_step_progress": 0
            },
            "processing_completed": null,
            "processing_options": {
                "edit_operations": [{"type": "trim_start", "seconds": 2}],
                "remove_silence": true
            },
            "share_token": "xyz"
        });

        let record: VideoRecord = serde_json::from_value(stored).unwrap();
        assert_eq!(record.video_id.as_str(), "abc");
        assert_eq!(record.status, VideoStatus::Uploaded);
        assert_eq!(record.processing_options.edits().len(), 1);
        assert!(record.processing_options.remove_silence);
        assert!(!record.processing_options.auto_crop_face);
        assert_eq!(record.extra.get("share_token"), Some(&json!("xyz")));

        // Unknown fields survive a rewrite
        let rewritten = serde_json::to_value(&record).unwrap();
        assert_eq!(rewritten["share_token"], json!("xyz"));
    }

    #[test]
    fn test_empty_options() {
        assert!(ProcessingOptions::default().is_empty());

        let options = ProcessingOptions {
            edit_operations: Some(Vec::new()),
            ..Default::default()
        };
        assert!(options.is_empty());

        let options = ProcessingOptions {
            auto_crop_face: true,
            ..Default::default()
        };
        assert!(!options.is_empty());
    }

    #[test]
    fn test_file_names() {
        let record = VideoRecord::new(VideoId::from("v1"), "mov");
        assert_eq!(record.source_file_name(), "v1.mov");
        assert_eq!(record.processed_file_name("processed_"), "processed_v1.mov");
    }
}
