use std::time::Duration;

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, TextEncoder,
};

use crate::models::{Action, EngineName};

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "recommendation_service_http_requests_total",
            "Total HTTP requests handled by recommendation-service",
        ),
        &["method", "path", "status"],
    )
    .expect("failed to create recommendation_service_http_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register recommendation_service_http_requests_total");
    counter
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "recommendation_service_http_request_duration_seconds",
            "HTTP request latency for recommendation-service",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        &["method", "path", "status"],
    )
    .expect("failed to create recommendation_service_http_request_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register recommendation_service_http_request_duration_seconds");
    histogram
});

static RECOMMENDATIONS_SERVED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "recommendation_service_recommendations_served_total",
            "Recommendation lists served, by engine",
        ),
        &["engine"],
    )
    .expect("failed to create recommendation_service_recommendations_served_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register recommendation_service_recommendations_served_total");
    counter
});

static FEEDBACK_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "recommendation_service_feedback_total",
            "User feedback events, by engine and action",
        ),
        &["engine", "action"],
    )
    .expect("failed to create recommendation_service_feedback_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register recommendation_service_feedback_total");
    counter
});

static RECORDER_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "recommendation_service_recorder_failures_total",
        "Interaction events that could not be appended to the log",
    )
    .expect("failed to create recommendation_service_recorder_failures_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register recommendation_service_recorder_failures_total");
    counter
});

static ADAPTER_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "recommendation_service_adapter_duration_seconds",
            "Scorer adapter latency, by engine and outcome",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["engine", "outcome"],
    )
    .expect("failed to create recommendation_service_adapter_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register recommendation_service_adapter_duration_seconds");
    histogram
});

pub fn observe_http_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    let status_label = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status_label])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path, &status_label])
        .observe(elapsed.as_secs_f64());
}

pub fn record_engine_served(engine: EngineName) {
    RECOMMENDATIONS_SERVED_TOTAL
        .with_label_values(&[engine.as_str()])
        .inc();
}

pub fn record_feedback(engine: EngineName, action: Action) {
    FEEDBACK_TOTAL
        .with_label_values(&[engine.as_str(), action.as_str()])
        .inc();
}

pub fn record_recorder_failure() {
    RECORDER_FAILURES_TOTAL.inc();
}

pub fn observe_adapter_latency(engine: EngineName, ok: bool, elapsed: Duration) {
    let outcome = if ok { "ok" } else { "error" };
    ADAPTER_DURATION_SECONDS
        .with_label_values(&[engine.as_str(), outcome])
        .observe(elapsed.as_secs_f64());
}

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
