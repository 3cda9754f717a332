//! Prometheus metrics
//!
//! Features:
//! - HTTP request counts by method and status
//! - Allocator operations per table (insert, delete, remove)
//! - Rows rewritten by compaction passes
//! - Tables currently flagged for repair

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use tracing::{error, info};

lazy_static::lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Registry = Registry::new();

    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("bookfair_http_requests_total", "Total HTTP requests"),
        &["method", "status"]
    ).unwrap();

    pub static ref HTTP_REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "bookfair_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["method"]
    ).unwrap();

    pub static ref ALLOCATOR_OPS: IntCounterVec = IntCounterVec::new(
        Opts::new("bookfair_allocator_operations_total", "Sequence allocator operations"),
        &["table", "op"]
    ).unwrap();

    pub static ref COMPACTION_MOVES: IntCounterVec = IntCounterVec::new(
        Opts::new("bookfair_compaction_moves_total", "Rows renumbered by compaction"),
        &["table"]
    ).unwrap();

    pub static ref TABLES_NEEDING_REPAIR: IntGauge = IntGauge::new(
        "bookfair_tables_needing_repair",
        "Tables left with gaps by a failed compaction"
    ).unwrap();

    pub static ref NOTIFICATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("bookfair_notifications_total", "Order notification emails"),
        &["status"]
    ).unwrap();
}

/// Initialize metrics registry
pub fn init_metrics() {
    info!("Initializing Prometheus metrics");

    METRICS_REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone())).ok();
    METRICS_REGISTRY.register(Box::new(HTTP_REQUEST_DURATION.clone())).ok();
    METRICS_REGISTRY.register(Box::new(ALLOCATOR_OPS.clone())).ok();
    METRICS_REGISTRY.register(Box::new(COMPACTION_MOVES.clone())).ok();
    METRICS_REGISTRY.register(Box::new(TABLES_NEEDING_REPAIR.clone())).ok();
    METRICS_REGISTRY.register(Box::new(NOTIFICATIONS_TOTAL.clone())).ok();
}

/// Record one finished HTTP request
pub fn record_request(method: &str, status: u16, seconds: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method])
        .observe(seconds);
}

/// Export metrics in Prometheus text format
pub fn export_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}
