//! PostgREST call metrics.

use std::time::Duration;

use metrics::{counter, histogram};

pub mod names {
    pub const REQUESTS_TOTAL: &str = "supabase_requests_total";
    pub const REQUEST_DURATION_SECONDS: &str = "supabase_request_duration_seconds";
    pub const RETRIES_TOTAL: &str = "supabase_retries_total";
}

/// Status class used as a label: `2xx`, `4xx`, `5xx`.
fn status_class(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

/// One finished call, after retries.
pub fn record_request(table: &str, operation: &str, status: u16, elapsed: Duration) {
    let table = table.to_string();
    let operation = operation.to_string();
    counter!(
        names::REQUESTS_TOTAL,
        "table" => table.clone(),
        "operation" => operation.clone(),
        "status" => status_class(status)
    )
    .increment(1);
    histogram!(names::REQUEST_DURATION_SECONDS, "table" => table, "operation" => operation)
        .record(elapsed.as_secs_f64());
}

/// A retried attempt; `status` is `None` for transport errors.
pub fn record_retry(operation: &str, status: Option<u16>) {
    let cause = match status {
        Some(429) => "rate_limited",
        Some(_) => "server_error",
        None => "network",
    };
    counter!(names::RETRIES_TOTAL, "operation" => operation.to_string(), "cause" => cause)
        .increment(1);
}
