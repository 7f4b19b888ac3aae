//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Install the Prometheus recorder and return the render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "shopreel_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "shopreel_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "shopreel_http_requests_in_flight";

    // Generation metrics
    pub const GENERATIONS_TOTAL: &str = "shopreel_generations_total";
    pub const JOBS_SUBMITTED_TOTAL: &str = "shopreel_jobs_submitted_total";

    // Job event streams
    pub const JOB_STREAMS_ACTIVE: &str = "shopreel_job_streams_active";
    pub const JOB_STREAMS_TOTAL: &str = "shopreel_job_streams_total";

    // Membership
    pub const REDEEMS_TOTAL: &str = "shopreel_redeems_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "shopreel_rate_limit_hits_total";
}

static UUID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}").unwrap()
});
static NUMERIC_SEGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/[0-9]+(/|$)").unwrap());
static JOB_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/jobs/([a-z_-]+)/[^/]+").unwrap());

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

/// Record a script generation by step and result.
pub fn record_generation(step: &'static str, outcome: &'static str) {
    counter!(names::GENERATIONS_TOTAL, "step" => step, "outcome" => outcome).increment(1);
}

/// Record a remote video job submission.
pub fn record_job_submitted(provider: &'static str) {
    counter!(names::JOBS_SUBMITTED_TOTAL, "provider" => provider).increment(1);
}

/// Track an SSE job stream opening or closing.
pub fn record_job_stream(provider: &'static str, opened: bool) {
    if opened {
        counter!(names::JOB_STREAMS_TOTAL, "provider" => provider).increment(1);
        gauge!(names::JOB_STREAMS_ACTIVE).increment(1.0);
    } else {
        gauge!(names::JOB_STREAMS_ACTIVE).decrement(1.0);
    }
}

pub fn record_redeem(outcome: &'static str) {
    counter!(names::REDEEMS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Replace ids in a path so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    let path = UUID_SEGMENT.replace_all(path, ":id");
    let path = NUMERIC_SEGMENT.replace_all(&path, "/:id$1");
    let path = JOB_SEGMENT.replace_all(&path, "/jobs/$1/:task_id");
    path.into_owned()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
