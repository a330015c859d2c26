//! Prometheus metrics for video-ranking-service.
//!
//! Exposes engine/store collectors and an HTTP handler for the `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    /// Interactions handled by the engine, by type and outcome.
    pub static ref INTERACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ranking_interactions_total",
        "Interactions processed segmented by type and outcome",
        &["type", "outcome"]
    )
    .expect("failed to register ranking_interactions_total");

    /// Failed store calls by store and reason (timeout/unavailable/backend).
    pub static ref STORE_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ranking_store_failures_total",
        "Store call failures segmented by store and reason",
        &["store", "reason"]
    )
    .expect("failed to register ranking_store_failures_total");

    pub static ref STORE_CALL_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "ranking_store_call_duration_seconds",
        "Store call latency segmented by store and operation",
        &["store", "op"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("failed to register ranking_store_call_duration_seconds");

    pub static ref RECONCILED_ENTITIES_TOTAL: IntCounter = register_int_counter!(
        "ranking_reconciled_entities_total",
        "Ranking store entries rewritten from the durable store"
    )
    .expect("failed to register ranking_reconciled_entities_total");
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
