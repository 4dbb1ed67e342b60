//! Progress reporting.
//!
//! Two layers live here:
//! - [`FfmpegProgress`], parsed from FFmpeg's `-progress pipe:2` output
//! - [`ProgressReporter`], the value each pipeline step receives to publish
//!   its step-local progress. It knows where the step sits in the run and
//!   composes the overall percentage, so components never see the run shape.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Fraction of `total_duration_secs` written so far, in `[0, 1]`.
    pub fn fraction(&self, total_duration_secs: f64) -> f64 {
        if total_duration_secs <= 0.0 {
            return 0.0;
        }
        let done = self.out_time_ms as f64 / 1000.0 / total_duration_secs;
        done.clamp(0.0, 1.0)
    }
}

/// One progress tick of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Overall run progress (0-100)
    pub overall: f64,
    /// Name of the running step
    pub step_name: String,
    /// Zero-based index of the running step
    pub step_index: usize,
    /// Number of steps in the run
    pub total_steps: usize,
    /// Progress of the running step (0-100)
    pub step_progress: f64,
}

/// Sending half of a run's progress stream.
pub type ProgressSink = mpsc::UnboundedSender<ProgressUpdate>;

/// Progress handle for one pipeline step.
///
/// `report` maps a step-local value in `[0, 100]` onto the overall run:
/// `step_base + sub / 100 * step_weight`, where `step_base = i / n * 100`
/// and `step_weight = 100 / n`.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    step_index: usize,
    total_steps: usize,
    step_name: String,
    sink: Option<ProgressSink>,
}

impl ProgressReporter {
    /// Create a reporter for step `step_index` of `total_steps`.
    pub fn new(
        step_index: usize,
        total_steps: usize,
        step_name: impl Into<String>,
        sink: ProgressSink,
    ) -> Self {
        Self {
            step_index,
            total_steps: total_steps.max(1),
            step_name: step_name.into(),
            sink: Some(sink),
        }
    }

    /// A single-step reporter that publishes nowhere.
    pub fn detached(step_name: impl Into<String>) -> Self {
        Self {
            step_index: 0,
            total_steps: 1,
            step_name: step_name.into(),
            sink: None,
        }
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    /// Overall progress at which this step starts.
    pub fn step_base(&self) -> f64 {
        self.step_index as f64 / self.total_steps as f64 * 100.0
    }

    /// Share of overall progress this step accounts for.
    pub fn step_weight(&self) -> f64 {
        100.0 / self.total_steps as f64
    }

    /// Overall progress for a step-local value.
    pub fn overall(&self, step_progress: f64) -> f64 {
        let sub = step_progress.clamp(0.0, 100.0);
        (self.step_base() + sub / 100.0 * self.step_weight()).min(100.0)
    }

    /// Build the update for a step-local value.
    pub fn update(&self, step_progress: f64) -> ProgressUpdate {
        ProgressUpdate {
            overall: self.overall(step_progress),
            step_name: self.step_name.clone(),
            step_index: self.step_index,
            total_steps: self.total_steps,
            step_progress: step_progress.clamp(0.0, 100.0),
        }
    }

    /// Publish a step-local progress value (0-100).
    pub fn report(&self, step_progress: f64) {
        if let Some(sink) = &self.sink {
            // A closed receiver means nobody is polling any more
            let _ = sink.send(self.update(step_progress));
        }
    }

    /// Publish `fraction` of the way through the step-local band `[from, to]`.
    pub fn report_between(&self, from: f64, to: f64, fraction: f64) {
        self.report(from + (to - from) * fraction.clamp(0.0, 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fraction() {
        let progress = FfmpegProgress {
            out_time_ms: 5000,
            ..Default::default()
        };

        assert!((progress.fraction(10.0) - 0.5).abs() < 1e-9);
        assert!((progress.fraction(2.0) - 1.0).abs() < 1e-9);
        assert_eq!(progress.fraction(0.0), 0.0);
    }

    #[test]
    fn test_step_composition() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(1, 4, "Silence Removal", tx);

        assert!((reporter.step_base() - 25.0).abs() < 1e-9);
        assert!((reporter.step_weight() - 25.0).abs() < 1e-9);
        assert!((reporter.overall(0.0) - 25.0).abs() < 1e-9);
        assert!((reporter.overall(50.0) - 37.5).abs() < 1e-9);
        assert!((reporter.overall(100.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_last_step_reaches_exactly_100() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(2, 3, "Face Auto-Crop", tx);
        assert_eq!(reporter.overall(100.0), 100.0);
    }

    #[test]
    fn test_out_of_range_values_clamped() {
        let reporter = ProgressReporter::detached("step");
        assert_eq!(reporter.overall(150.0), 100.0);
        assert_eq!(reporter.overall(-5.0), 0.0);
        assert_eq!(reporter.update(120.0).step_progress, 100.0);
    }

    #[test]
    fn test_report_publishes_update() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(0, 2, "Natural Language Editing", tx);

        reporter.report(10.0);
        reporter.report_between(50.0, 100.0, 0.5);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.step_name, "Natural Language Editing");
        assert_eq!(first.total_steps, 2);
        assert!((first.overall - 5.0).abs() < 1e-9);

        let second = rx.try_recv().unwrap();
        assert!((second.step_progress - 75.0).abs() < 1e-9);
    }
}
