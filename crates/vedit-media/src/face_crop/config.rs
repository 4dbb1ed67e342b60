//! Configuration for face auto-crop.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for face sampling and the 9:16 crop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceCropConfig {
    /// Frames sampled evenly across the video.
    pub sample_count: usize,

    /// Minimum detector confidence (0.0-1.0).
    pub score_threshold: f32,

    /// YuNet ONNX model; searched in well-known locations when unset.
    pub model_path: Option<PathBuf>,
}

impl Default for FaceCropConfig {
    fn default() -> Self {
        Self {
            sample_count: 60,
            score_threshold: 0.5,
            model_path: None,
        }
    }
}

impl FaceCropConfig {
    /// Builder-style setter for the sample count.
    pub fn with_sample_count(mut self, count: usize) -> Self {
        self.sample_count = count;
        self
    }

    /// Builder-style setter for the detector threshold.
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Builder-style setter for the model path.
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }
}
