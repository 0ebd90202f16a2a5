//! Metrics and observability utilities
//!
//! Prometheus-style metrics with standardized naming for the pipeline
//! stages: rewrite, retrieval, assembly, generation.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Vigil metrics
pub const METRICS_PREFIX: &str = "vigil";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of answered queries"
    );

    describe_histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end query latency in seconds"
    );

    describe_counter!(
        format!("{}_retrieval_records_total", METRICS_PREFIX),
        Unit::Count,
        "Records retained after score filtering, per namespace"
    );

    describe_histogram!(
        format!("{}_retrieval_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Multi-namespace retrieval latency in seconds"
    );

    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total generation API requests"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Generation latency in seconds"
    );

    describe_counter!(
        format!("{}_artifact_fetches_total", METRICS_PREFIX),
        Unit::Count,
        "Code artifact fetch attempts by outcome"
    );

    tracing::info!("Metrics registered");
}

/// Helper to track a whole query
pub struct QueryMetrics {
    start: Instant,
    mode: &'static str,
}

impl QueryMetrics {
    /// Start tracking a query ("sync" or "stream")
    pub fn start(mode: &'static str) -> Self {
        Self {
            start: Instant::now(),
            mode,
        }
    }

    /// Record query completion
    pub fn finish(self, success: bool) {
        let duration = self.start.elapsed().as_secs_f64();
        let status = if success { "success" } else { "error" };

        counter!(
            format!("{}_queries_total", METRICS_PREFIX),
            "mode" => self.mode,
            "status" => status
        )
        .increment(1);

        histogram!(
            format!("{}_query_duration_seconds", METRICS_PREFIX),
            "mode" => self.mode
        )
        .record(duration);
    }
}

/// Helper to record retrieval metrics
pub fn record_retrieval(duration_secs: f64, namespace: &str, kept: usize) {
    counter!(
        format!("{}_retrieval_records_total", METRICS_PREFIX),
        "namespace" => namespace.to_string()
    )
    .increment(kept as u64);

    histogram!(
        format!("{}_retrieval_duration_seconds", METRICS_PREFIX),
        "namespace" => namespace.to_string()
    )
    .record(duration_secs);
}

/// Helper to record generation metrics
pub fn record_generation(duration_secs: f64, mode: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        "mode" => mode.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_generation_duration_seconds", METRICS_PREFIX),
            "mode" => mode.to_string()
        )
        .record(duration_secs);
    }
}

/// Helper to record an artifact fetch outcome
pub fn record_artifact_fetch(hit: bool) {
    let outcome = if hit { "fetched" } else { "degraded" };
    counter!(
        format!("{}_artifact_fetches_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);
}
