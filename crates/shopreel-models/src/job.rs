//! Remote async job types.
//!
//! A job is a unit of work submitted to a third-party provider (DashScope
//! VideoRetalk, APIMart Sora). The provider hands back an opaque id and only
//! exposes a pull-based status endpoint, so the local view of a job is built
//! entirely from poll observations.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier returned by a remote provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Provider that owns a remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobProvider {
    /// DashScope VideoRetalk (digital-human video).
    DashScope,
    /// APIMart Sora-2 image-to-video.
    Sora,
}

impl JobProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobProvider::DashScope => "dashscope",
            JobProvider::Sora => "sora",
        }
    }

    /// Parse a provider from a path segment.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dashscope" | "digital-human" | "digital_human" => Some(JobProvider::DashScope),
            "sora" | "apimart" => Some(JobProvider::Sora),
            _ => None,
        }
    }
}

impl fmt::Display for JobProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote job state as observed by a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Accepted by the provider but not started.
    #[default]
    Pending,
    /// Being worked on remotely.
    Running,
    /// Finished with a result.
    Succeeded,
    /// Finished with an error.
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Running => "RUNNING",
            JobState::Succeeded => "SUCCEEDED",
            JobState::Failed => "FAILED",
        }
    }

    /// Check if this is a terminal state (no more polls needed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of a remote job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StatusReport {
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StatusReport {
    pub fn pending() -> Self {
        Self::with_state(JobState::Pending)
    }

    pub fn running() -> Self {
        Self::with_state(JobState::Running)
    }

    pub fn succeeded(url: impl Into<String>) -> Self {
        Self {
            state: JobState::Succeeded,
            result_url: Some(url.into()),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: JobState::Failed,
            result_url: None,
            error_message: Some(message.into()),
        }
    }

    fn with_state(state: JobState) -> Self {
        Self {
            state,
            result_url: None,
            error_message: None,
        }
    }
}

/// Locally cached view of a remote job.
///
/// Only ever written from poll results; the remote side is the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AsyncJob {
    pub job_id: JobId,
    pub provider: JobProvider,
    pub status: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AsyncJob {
    /// Start tracking a freshly submitted job.
    pub fn submitted(job_id: impl Into<String>, provider: JobProvider) -> Self {
        Self {
            job_id: JobId::from_string(job_id),
            provider,
            status: JobState::Pending,
            result_url: None,
            error_message: None,
        }
    }

    /// Cache the last observed status.
    ///
    /// Observations after a terminal state are ignored.
    pub fn observe(&mut self, report: &StatusReport) {
        if self.is_terminal() {
            return;
        }
        self.status = report.state;
        if report.result_url.is_some() {
            self.result_url = report.result_url.clone();
        }
        if report.error_message.is_some() {
            self.error_message = report.error_message.clone();
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_serializes_uppercase() {
        let json = serde_json::to_string(&JobState::Succeeded).unwrap();
        assert_eq!(json, "\"SUCCEEDED\"");
        let parsed: JobState = serde_json::from_str("\"RUNNING\"").unwrap();
        assert_eq!(parsed, JobState::Running);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(JobProvider::parse("sora"), Some(JobProvider::Sora));
        assert_eq!(JobProvider::parse("DashScope"), Some(JobProvider::DashScope));
        assert_eq!(JobProvider::parse("digital-human"), Some(JobProvider::DashScope));
        assert_eq!(JobProvider::parse("runway"), None);
    }

    #[test]
    fn test_async_job_stops_changing_after_terminal() {
        let mut job = AsyncJob::submitted("task-1", JobProvider::DashScope);
        job.observe(&StatusReport::running());
        assert_eq!(job.status, JobState::Running);

        job.observe(&StatusReport::succeeded("https://x/y.mp4"));
        assert!(job.is_terminal());

        job.observe(&StatusReport::failed("late failure"));
        assert_eq!(job.status, JobState::Succeeded);
        assert_eq!(job.result_url.as_deref(), Some("https://x/y.mp4"));
        assert!(job.error_message.is_none());
    }
}
