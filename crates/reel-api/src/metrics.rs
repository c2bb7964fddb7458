//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "reel_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "reel_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "reel_http_requests_in_flight";

    // Progress stream metrics
    pub const SSE_CONNECTIONS_TOTAL: &str = "reel_sse_connections_total";
    pub const SSE_CONNECTIONS_ACTIVE: &str = "reel_sse_connections_active";
    pub const SSE_EVENTS_SENT: &str = "reel_sse_events_sent_total";
}

static UUID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("uuid pattern is valid")
});

static RUN_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(runs|progress)/[a-zA-Z0-9_-]+").expect("run pattern is valid")
});

static FILE_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(clips|outputs)/[a-zA-Z0-9_.-]+").expect("file pattern is valid")
});

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a progress stream being opened.
pub fn record_sse_connected() {
    counter!(names::SSE_CONNECTIONS_TOTAL).increment(1);
    gauge!(names::SSE_CONNECTIONS_ACTIVE).increment(1.0);
}

/// Record a progress stream closing.
pub fn record_sse_disconnected() {
    gauge!(names::SSE_CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record one event frame written to a progress stream.
pub fn record_sse_event(stage: &str) {
    let labels = [("stage", stage.to_string())];
    counter!(names::SSE_EVENTS_SENT, &labels).increment(1);
}

/// Sanitize path for metrics labels (collapse run ids and file names).
fn sanitize_path(path: &str) -> String {
    let path = RUN_SEGMENT.replace_all(path, "/$1/:run_id");
    let path = FILE_SEGMENT.replace_all(&path, "/$1/:file");
    let path = UUID_SEGMENT.replace_all(&path, ":id");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
