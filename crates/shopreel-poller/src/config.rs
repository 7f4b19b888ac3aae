//! Poll budget configuration.

use std::time::Duration;

use shopreel_models::JobProvider;

/// How often and how long to poll one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between two status checks.
    pub interval: Duration,
    /// Ceiling on status checks; every call counts, including failed ones.
    pub max_attempts: u32,
    /// Consecutive check errors tolerated before the poll is failed.
    pub max_consecutive_errors: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::digital_human()
    }
}

impl PollConfig {
    /// Create a config; both counts are clamped to at least one.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
            max_consecutive_errors: 5,
        }
    }

    /// DashScope VideoRetalk: every 3 s, up to 200 checks (10 minutes).
    pub fn digital_human() -> Self {
        Self::new(Duration::from_secs(3), 200)
    }

    /// APIMart Sora: every 4 s, up to 150 checks (10 minutes).
    pub fn sora() -> Self {
        Self::new(Duration::from_secs(4), 150)
    }

    /// Preset for a provider.
    pub fn for_provider(provider: JobProvider) -> Self {
        match provider {
            JobProvider::DashScope => Self::digital_human(),
            JobProvider::Sora => Self::sora(),
        }
    }

    /// Preset for a provider with `POLL_{PROVIDER}_INTERVAL_MS`,
    /// `POLL_{PROVIDER}_MAX_ATTEMPTS` and `POLL_MAX_CONSECUTIVE_ERRORS` overrides.
    pub fn from_env(provider: JobProvider) -> Self {
        let defaults = Self::for_provider(provider);
        let prefix = format!("POLL_{}", provider.as_str().to_uppercase());

        let interval = env_parse::<u64>(&format!("{prefix}_INTERVAL_MS"))
            .map(Duration::from_millis)
            .unwrap_or(defaults.interval);
        let max_attempts =
            env_parse::<u32>(&format!("{prefix}_MAX_ATTEMPTS")).unwrap_or(defaults.max_attempts);
        let max_consecutive_errors = env_parse::<u32>("POLL_MAX_CONSECUTIVE_ERRORS")
            .unwrap_or(defaults.max_consecutive_errors);

        Self::new(interval, max_attempts).with_max_consecutive_errors(max_consecutive_errors)
    }

    pub fn with_max_consecutive_errors(mut self, n: u32) -> Self {
        self.max_consecutive_errors = n.max(1);
        self
    }

    /// Upper bound on wall-clock time spent sleeping between checks.
    pub fn budget(&self) -> Duration {
        self.interval
            .saturating_mul(self.max_attempts.saturating_sub(1))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_presets() {
        let dh = PollConfig::digital_human();
        assert_eq!(dh.interval, Duration::from_secs(3));
        assert_eq!(dh.max_attempts, 200);
        assert_eq!(dh.max_consecutive_errors, 5);

        let sora = PollConfig::for_provider(JobProvider::Sora);
        assert_eq!(sora.interval, Duration::from_secs(4));
        assert_eq!(sora.max_attempts, 150);
    }

    #[test]
    fn test_counts_are_clamped() {
        let config = PollConfig::new(Duration::ZERO, 0).with_max_consecutive_errors(0);
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.max_consecutive_errors, 1);
        assert_eq!(config.budget(), Duration::ZERO);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        std::env::set_var("POLL_SORA_INTERVAL_MS", "250");
        std::env::set_var("POLL_SORA_MAX_ATTEMPTS", "12");
        let config = PollConfig::from_env(JobProvider::Sora);
        std::env::remove_var("POLL_SORA_INTERVAL_MS");
        std::env::remove_var("POLL_SORA_MAX_ATTEMPTS");

        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.max_attempts, 12);
        assert_eq!(config.max_consecutive_errors, 5);
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_garbage() {
        std::env::set_var("POLL_DASHSCOPE_MAX_ATTEMPTS", "lots");
        let config = PollConfig::from_env(JobProvider::DashScope);
        std::env::remove_var("POLL_DASHSCOPE_MAX_ATTEMPTS");

        assert_eq!(config, PollConfig::digital_human());
    }
}
