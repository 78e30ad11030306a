use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all moodmatch metrics
const PREFIX: &str = "moodmatch";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Matching Metrics
    pub static ref RANKINGS_SERVED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_rankings_served_total"),
        "Total number of similarity rankings computed"
    ).expect("Failed to create rankings_served_total metric");

    pub static ref RANKING_CANDIDATES: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_ranking_candidates"),
            "Number of candidate profiles scored per ranking"
        )
        .buckets(vec![0.0, 1.0, 10.0, 100.0, 1000.0, 10000.0, 100000.0])
    ).expect("Failed to create ranking_candidates metric");

    pub static ref SKIPPED_CANDIDATES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_skipped_candidates_total"),
            "Candidates left out of a ranking, by reason"
        ),
        &["reason"]
    ).expect("Failed to create skipped_candidates_total metric");

    // Playlist Metrics
    pub static ref CURATOR_REJECTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_curator_rejections_total"),
            "Playlist operations refused, by kind"
        ),
        &["kind"]
    ).expect("Failed to create curator_rejections_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Already-registered errors are expected when tests initialize repeatedly.
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(RANKINGS_SERVED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RANKING_CANDIDATES.clone()));
    let _ = REGISTRY.register(Box::new(SKIPPED_CANDIDATES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CURATOR_REJECTIONS_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a completed ranking and how many candidates it looked at
pub fn record_ranking(candidates: usize) {
    RANKINGS_SERVED_TOTAL.inc();
    RANKING_CANDIDATES.observe(candidates as f64);
}

pub fn record_skipped_candidate(reason: &str) {
    SKIPPED_CANDIDATES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_curator_rejection(kind: &str) {
    CURATOR_REJECTIONS_TOTAL.with_label_values(&[kind]).inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
