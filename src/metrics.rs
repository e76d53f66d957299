//! Prometheus metrics
//!
//! - operations by name and outcome, with latency
//! - keys examined by list queries
//! - list entries skipped because their value was gone or unreadable

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;
use tracing::{debug, error};

lazy_static::lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Registry = Registry::new();

    pub static ref OPERATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("areadb_operations_total", "Total number of operations"),
        &["op", "status"]
    ).unwrap();

    pub static ref OPERATION_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "areadb_operation_duration_seconds",
            "Operation duration in seconds"
        ).buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["op"]
    ).unwrap();

    pub static ref LIST_KEYS_SCANNED: IntCounter = IntCounter::new(
        "areadb_list_keys_scanned_total",
        "Keys fetched by list queries"
    ).unwrap();

    pub static ref LIST_SKIPPED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("areadb_list_skipped_total", "List entries skipped"),
        &["reason"]
    ).unwrap();
}

/// Register all metrics. Safe to call more than once.
pub fn init_metrics() {
    METRICS_REGISTRY.register(Box::new(OPERATIONS_TOTAL.clone())).ok();
    METRICS_REGISTRY.register(Box::new(OPERATION_DURATION.clone())).ok();
    METRICS_REGISTRY.register(Box::new(LIST_KEYS_SCANNED.clone())).ok();
    METRICS_REGISTRY.register(Box::new(LIST_SKIPPED_TOTAL.clone())).ok();
    debug!("Metrics registered");
}

/// Record one finished operation
pub fn record_operation(op: &str, success: bool, duration: Duration) {
    let status = if success { "success" } else { "error" };
    OPERATIONS_TOTAL.with_label_values(&[op, status]).inc();
    OPERATION_DURATION
        .with_label_values(&[op])
        .observe(duration.as_secs_f64());
}

/// Record a list entry that was skipped. `reason` is `"missing"` or `"unparsable"`.
pub fn record_list_skip(reason: &str) {
    LIST_SKIPPED_TOTAL.with_label_values(&[reason]).inc();
}

/// Export all metrics in Prometheus text format
pub fn export_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|_| String::from("# Error converting metrics\n"))
}
