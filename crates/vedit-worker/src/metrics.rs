//! Pipeline run metrics.
//!
//! - Run counters by outcome
//! - Run and step duration histograms
//! - Optional Prometheus exporter

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{WorkerError, WorkerResult};

/// Metric name constants for consistency.
pub mod names {
    /// Total pipeline runs by outcome.
    pub const RUNS_TOTAL: &str = "vedit_pipeline_runs_total";

    /// Pipeline run duration in seconds.
    pub const RUN_DURATION_SECONDS: &str = "vedit_pipeline_run_duration_seconds";

    /// Pipeline step duration in seconds by step and outcome.
    pub const STEP_DURATION_SECONDS: &str = "vedit_pipeline_step_duration_seconds";

    /// Progress writes the store rejected.
    pub const PROGRESS_WRITE_FAILURES_TOTAL: &str = "vedit_progress_write_failures_total";
}

/// Record a finished run. `error_kind` is `None` on success.
pub fn record_run(duration_secs: f64, error_kind: Option<&'static str>) {
    let outcome = if error_kind.is_some() { "error" } else { "completed" };

    counter!(
        names::RUNS_TOTAL,
        "outcome" => outcome,
        "error_kind" => error_kind.unwrap_or("none")
    )
    .increment(1);

    histogram!(names::RUN_DURATION_SECONDS, "outcome" => outcome).record(duration_secs);
}

/// Record the duration of one pipeline step.
pub fn record_step(step: &'static str, success: bool, duration_secs: f64) {
    let outcome = if success { "ok" } else { "error" };
    histogram!(
        names::STEP_DURATION_SECONDS,
        "step" => step,
        "outcome" => outcome
    )
    .record(duration_secs);
}

pub fn record_progress_write_failure() {
    counter!(names::PROGRESS_WRITE_FAILURES_TOTAL).increment(1);
}

/// Install the Prometheus exporter listening on `addr`.
pub fn install_exporter(addr: SocketAddr) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("metrics exporter on {}: {}", addr, e)))
}
