//! Terminal result of a poll run.

use schemars::JsonSchema;
use serde::Serialize;
use shopreel_models::{JobState, StatusReport};

/// How a poll run ended. Exactly one is produced per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    /// The provider reported success with a result URL.
    Succeeded { result_url: String, attempts: u32 },
    /// The provider reported failure, or checks kept erroring.
    Failed { error: String, attempts: u32 },
    /// Attempt budget exhausted; the remote job may still finish.
    TimedOut { attempts: u32, last_state: JobState },
    /// The consumer lost interest.
    Cancelled { attempts: u32 },
}

impl PollOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Succeeded { attempts, .. }
            | PollOutcome::Failed { attempts, .. }
            | PollOutcome::TimedOut { attempts, .. }
            | PollOutcome::Cancelled { attempts } => *attempts,
        }
    }

    /// Metric / log label.
    pub fn label(&self) -> &'static str {
        match self {
            PollOutcome::Succeeded { .. } => "succeeded",
            PollOutcome::Failed { .. } => "failed",
            PollOutcome::TimedOut { .. } => "timed_out",
            PollOutcome::Cancelled { .. } => "cancelled",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Succeeded { .. })
    }

    /// The remote job's terminal state, when one was observed.
    ///
    /// Timeouts and cancellations say nothing about the remote job.
    pub fn to_report(&self) -> Option<StatusReport> {
        match self {
            PollOutcome::Succeeded { result_url, .. } => Some(StatusReport::succeeded(result_url)),
            PollOutcome::Failed { error, .. } => Some(StatusReport::failed(error)),
            PollOutcome::TimedOut { .. } | PollOutcome::Cancelled { .. } => None,
        }
    }
}
