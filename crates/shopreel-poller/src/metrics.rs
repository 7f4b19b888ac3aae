//! Poll metrics.

use std::time::Duration;

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Status checks issued, by source and result.
    pub const POLL_CHECKS_TOTAL: &str = "job_poll_checks_total";

    /// Finished poll runs, by source and outcome.
    pub const POLL_RUNS_TOTAL: &str = "job_poll_runs_total";

    /// Wall-clock duration of a poll run in seconds.
    pub const POLL_DURATION_SECONDS: &str = "job_poll_duration_seconds";
}

/// Record one status check; `result` is `ok`, `error` or `fatal`.
pub fn record_check(source: &'static str, result: &'static str) {
    counter!(names::POLL_CHECKS_TOTAL, "source" => source, "result" => result).increment(1);
}

/// Record the end of a poll run.
pub fn record_run(source: &'static str, outcome: &'static str, elapsed: Duration) {
    counter!(names::POLL_RUNS_TOTAL, "source" => source, "outcome" => outcome).increment(1);
    histogram!(names::POLL_DURATION_SECONDS, "source" => source).record(elapsed.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::POLL_CHECKS_TOTAL.ends_with("_total"));
        assert!(names::POLL_RUNS_TOTAL.ends_with("_total"));
        assert!(names::POLL_DURATION_SECONDS.ends_with("_seconds"));
    }
}
