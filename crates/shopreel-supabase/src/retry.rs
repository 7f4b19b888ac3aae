//! Backoff for transient datastore failures.

use std::time::Duration;

use tracing::{info_span, warn, Instrument};

use crate::error::{SupabaseError, SupabaseResult};
use crate::metrics::record_retry;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay cap (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// `SUPABASE_MAX_RETRIES`, `SUPABASE_RETRY_BASE_MS` and `SUPABASE_RETRY_MAX_MS`
    /// override the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: env_or("SUPABASE_MAX_RETRIES", defaults.max_retries),
            base_delay_ms: env_or("SUPABASE_RETRY_BASE_MS", defaults.base_delay_ms),
            max_delay_ms: env_or("SUPABASE_RETRY_MAX_MS", defaults.max_delay_ms),
        }
    }

    /// No retries; used in tests.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Run `op`, retrying transient PostgREST failures.
///
/// Network errors, 429 (honoring Retry-After) and 5xx are retried; anything
/// else is returned as is.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, op: F) -> SupabaseResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = SupabaseResult<T>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        let span = info_span!("supabase_retry", operation = %operation, attempt = attempt + 1);

        match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = calculate_delay(config, attempt, e.retry_after_ms());
                warn!(
                    operation = %operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Supabase operation failed, retrying: {}",
                    e
                );
                record_retry(operation, e.http_status());
                tokio::time::sleep(delay).await;
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| SupabaseError::invalid_response("retry loop exhausted")))
}

/// Exponential backoff with full jitter, floored at the base delay.
fn calculate_delay(config: &RetryConfig, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
    if let Some(after) = retry_after_ms {
        return Duration::from_millis(after);
    }

    let ceiling = config
        .base_delay_ms
        .saturating_mul(1u64 << attempt.min(20))
        .min(config.max_delay_ms);
    let jittered = (ceiling as f64 * jitter_fraction()) as u64;
    Duration::from_millis(jittered.max(config.base_delay_ms))
}

/// A value in `[0, 1)` taken from the clock's sub-second nanos.
fn jitter_fraction() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    f64::from(nanos % 1000) / 1000.0
}
