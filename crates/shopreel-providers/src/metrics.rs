//! Provider call metrics.

use std::time::Duration;

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Outbound provider requests by provider, operation and status.
    pub const REQUESTS_TOTAL: &str = "provider_requests_total";

    /// Outbound request latency in seconds.
    pub const LATENCY_SECONDS: &str = "provider_latency_seconds";
}

/// Record a completed provider request; `status` is 0 when no response arrived.
pub fn record_call(provider: &'static str, operation: &'static str, status: u16, latency: Duration) {
    counter!(
        names::REQUESTS_TOTAL,
        "provider" => provider,
        "operation" => operation,
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "provider" => provider,
        "operation" => operation
    )
    .record(latency.as_secs_f64());
}
