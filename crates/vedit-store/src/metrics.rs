//! Metadata store metrics collection.
//!
//! - Write counters by operation and outcome
//! - Write latency histograms

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total record writes by operation and outcome.
    pub const WRITES_TOTAL: &str = "vedit_store_writes_total";

    /// Record write latency in seconds by operation.
    pub const WRITE_LATENCY_SECONDS: &str = "vedit_store_write_latency_seconds";
}

/// Record metrics for a completed record write.
pub fn record_write(operation: &'static str, success: bool, latency_secs: f64) {
    let outcome = if success { "ok" } else { "error" };

    counter!(
        names::WRITES_TOTAL,
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);

    histogram!(
        names::WRITE_LATENCY_SECONDS,
        "operation" => operation
    )
    .record(latency_secs);
}
