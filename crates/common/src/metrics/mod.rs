//! Metrics and observability utilities
//!
//! Prometheus-style metrics under a common prefix. Recording is a no-op
//! until a recorder is installed, so library code calls these freely.

use crate::db::models::AnswerState;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all changewatch metrics
pub const METRICS_PREFIX: &str = "changewatch";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Monitoring metrics
    describe_counter!(
        format!("{}_source_checks_total", METRICS_PREFIX),
        Unit::Count,
        "Source checks recorded, by outcome"
    );

    describe_counter!(
        format!("{}_changes_detected_total", METRICS_PREFIX),
        Unit::Count,
        "Detected change rows written"
    );

    // Enquiry metrics
    describe_counter!(
        format!("{}_enquiries_created_total", METRICS_PREFIX),
        Unit::Count,
        "Enquiries stored, by answer state"
    );

    describe_counter!(
        format!("{}_enquiry_reuse_total", METRICS_PREFIX),
        Unit::Count,
        "Stored answers served again"
    );

    describe_histogram!(
        format!("{}_enquiry_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Keyword search latency in seconds"
    );

    describe_gauge!(
        format!("{}_enquiry_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of enquiries returned by the last keyword search"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record one source check
pub fn record_check(changed: bool) {
    let outcome = if changed { "changed" } else { "unchanged" };

    counter!(
        format!("{}_source_checks_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);

    if changed {
        counter!(format!("{}_changes_detected_total", METRICS_PREFIX)).increment(1);
    }
}

pub fn record_enquiry_created(state: AnswerState) {
    counter!(
        format!("{}_enquiries_created_total", METRICS_PREFIX),
        "state" => String::from(state)
    )
    .increment(1);
}

pub fn record_enquiry_reuse() {
    counter!(format!("{}_enquiry_reuse_total", METRICS_PREFIX)).increment(1);
}

/// Helper to record keyword search metrics
pub fn record_enquiry_search(duration_secs: f64, result_count: usize) {
    histogram!(format!("{}_enquiry_search_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    gauge!(format!("{}_enquiry_search_results_count", METRICS_PREFIX)).set(result_count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recording_without_recorder() {
        let metrics = RequestMetrics::start("GET", "/v1/sources");
        metrics.finish(200);
        record_check(true);
        record_check(false);
        record_enquiry_created(AnswerState::Pending);
        record_enquiry_reuse();
        record_enquiry_search(0.002, 3);
    }
}
