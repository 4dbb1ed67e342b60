//! Media metrics collection.
//!
//! - FFmpeg invocation latency by outcome
//! - FFmpeg failure counter
//! - Face detection sample counter

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// FFmpeg wall-clock time in seconds by outcome.
    pub const FFMPEG_DURATION_SECONDS: &str = "vedit_ffmpeg_duration_seconds";

    /// FFmpeg invocations that exited non-zero.
    pub const FFMPEG_FAILURES_TOTAL: &str = "vedit_ffmpeg_failures_total";

    /// Sampled frames by detection outcome (`face`, `none`, `skipped`).
    pub const FACE_SAMPLES_TOTAL: &str = "vedit_face_samples_total";
}

/// Record one finished FFmpeg invocation.
pub fn record_ffmpeg_run(elapsed_secs: f64, exited: bool) {
    let outcome = if exited { "exited" } else { "aborted" };
    histogram!(names::FFMPEG_DURATION_SECONDS, "outcome" => outcome).record(elapsed_secs);
}

/// Record an FFmpeg invocation that exited with a failure status.
pub fn record_ffmpeg_failure() {
    counter!(names::FFMPEG_FAILURES_TOTAL).increment(1);
}

/// Record the outcome of sampling one frame.
pub fn record_face_sample(outcome: &'static str) {
    counter!(names::FACE_SAMPLES_TOTAL, "outcome" => outcome).increment(1);
}
