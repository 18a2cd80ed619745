//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use jobwave_models::id::is_valid_document_id;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "jobwave_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "jobwave_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "jobwave_http_requests_in_flight";
}

/// Path segments that are route names, never identifiers.
const ROUTE_SEGMENTS: &[&str] = &[
    "jobs",
    "applications",
    "job",
    "jwt",
    "logout",
    "health",
    "healthz",
    "ready",
    "metrics",
];

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

/// Collapse document identifiers in a path to `:id` so labels stay bounded.
fn sanitize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !ROUTE_SEGMENTS.contains(&segment) && is_valid_document_id(segment) {
                ":id"
            } else if segment.is_empty() || ROUTE_SEGMENTS.contains(&segment) {
                segment
            } else {
                ":invalid"
            }
        })
        .collect::<Vec<_>>()
        .join("/")
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/jobs/applications"), "/jobs/applications");
        assert_eq!(sanitize_path("/jobs/AbC123xyz"), "/jobs/:id");
        assert_eq!(
            sanitize_path("/applications/job/AbC123xyz"),
            "/applications/job/:id"
        );
        assert_eq!(sanitize_path("/applications/not%20an%20id"), "/applications/:invalid");
        assert_eq!(sanitize_path("/"), "/");
    }
}
