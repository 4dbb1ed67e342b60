//! Configuration for silence removal.

use serde::{Deserialize, Serialize};

/// Configuration for `silencedetect`-based silence removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SilenceRemovalConfig {
    /// Noise floor in dB; audio below it counts as silence.
    pub threshold_db: f64,

    /// Minimum silence duration in seconds before it is reported.
    pub min_duration: f64,

    /// Maximum number of kept segments before the filter graph is written
    /// to a script file instead of the command line.
    pub max_inline_segments: usize,
}

impl Default for SilenceRemovalConfig {
    fn default() -> Self {
        Self {
            threshold_db: -30.0,
            min_duration: 0.5,
            max_inline_segments: 100,
        }
    }
}

impl SilenceRemovalConfig {
    /// Builder-style setter for the noise floor.
    pub fn with_threshold_db(mut self, threshold_db: f64) -> Self {
        self.threshold_db = threshold_db;
        self
    }

    /// Builder-style setter for minimum silence duration.
    pub fn with_min_duration(mut self, seconds: f64) -> Self {
        self.min_duration = seconds.max(0.0);
        self
    }

    /// Builder-style setter for the inline graph limit.
    pub fn with_max_inline_segments(mut self, segments: usize) -> Self {
        self.max_inline_segments = segments;
        self
    }

    /// The `silencedetect` filter for this configuration.
    pub fn detect_filter(&self) -> String {
        format!(
            "silencedetect=noise={}dB:d={}",
            self.threshold_db, self.min_duration
        )
    }
}
