//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
///
/// Every variant is fatal to the pipeline run that raised it.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Probe failed for {path}: {message}")]
    Probe { path: PathBuf, message: String },

    #[error("FFmpeg command failed (exit code {exit_code:?}): {message}: {diagnostics}")]
    CodecExecution {
        message: String,
        exit_code: Option<i32>,
        diagnostics: String,
    },

    #[error("FFmpeg crop failed (exit code {exit_code:?}): {diagnostics}")]
    CropExecution {
        exit_code: Option<i32>,
        diagnostics: String,
    },

    #[error("Unsupported edit operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid video dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Cannot open video: {0}")]
    SourceUnreadable(PathBuf),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Face detection failed: {0}")]
    DetectionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a probe failure error.
    pub fn probe(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an FFmpeg failure error.
    pub fn codec_failed(
        message: impl Into<String>,
        exit_code: Option<i32>,
        diagnostics: impl Into<String>,
    ) -> Self {
        Self::CodecExecution {
            message: message.into(),
            exit_code,
            diagnostics: diagnostics.into(),
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Re-label a codec failure as a crop failure; other errors pass through.
    pub fn into_crop_failure(self) -> Self {
        match self {
            Self::CodecExecution {
                exit_code,
                diagnostics,
                ..
            } => Self::CropExecution {
                exit_code,
                diagnostics,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_failure_relabelled_as_crop_failure() {
        let err = MediaError::codec_failed("FFmpeg exited with non-zero status", Some(1), "bad crop")
            .into_crop_failure();
        match err {
            MediaError::CropExecution {
                exit_code,
                diagnostics,
            } => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(diagnostics, "bad crop");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_other_errors_not_relabelled() {
        let err = MediaError::Timeout(5).into_crop_failure();
        assert!(matches!(err, MediaError::Timeout(5)));
    }
}
