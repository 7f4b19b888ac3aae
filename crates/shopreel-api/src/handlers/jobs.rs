//! Server-sent job progress.
//!
//! The client subscribes to a submitted job instead of polling the status
//! passthrough itself. Each subscription runs its own poll loop; closing the
//! connection drops the poll handle, which cancels the loop.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::WatchStream;
use tracing::{info, warn};

use shopreel_models::{AsyncJob, JobId, JobProvider};
use shopreel_poller::{PollOutcome, PollProgress};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Payload of the single terminal event.
#[derive(Debug, Serialize)]
pub struct JobTerminalEvent {
    pub job: AsyncJob,
    #[serde(flatten)]
    pub outcome: PollOutcome,
}

/// SSE event name for a finished poll.
pub fn terminal_event_name(outcome: &PollOutcome) -> &'static str {
    match outcome {
        PollOutcome::Succeeded { .. } => "succeeded",
        PollOutcome::Failed { .. } => "failed",
        PollOutcome::TimedOut { .. } => "timeout",
        PollOutcome::Cancelled { .. } => "cancelled",
    }
}

/// Decrements the active-stream gauge however the stream ends.
struct StreamGuard {
    provider: &'static str,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        metrics::record_job_stream(self.provider, false);
    }
}

fn progress_event(progress: &PollProgress) -> Event {
    Event::default()
        .event("progress")
        .json_data(progress)
        .unwrap_or_else(|_| Event::default().event("progress").data(progress.percent.to_string()))
}

fn terminal_event(task_id: &str, provider: JobProvider, outcome: PollOutcome) -> Event {
    let name = terminal_event_name(&outcome);
    let mut job = AsyncJob::submitted(task_id, provider);
    if let Some(report) = outcome.to_report() {
        job.observe(&report);
    }
    let payload = JobTerminalEvent { job, outcome };
    Event::default()
        .event(name)
        .json_data(&payload)
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to encode terminal job event");
            Event::default().event(name)
        })
}

/// `GET /api/jobs/:provider/:task_id/events`.
///
/// Emits `progress` events while the job runs, then exactly one of
/// `succeeded`, `failed`, `timeout` or `cancelled`.
pub async fn job_events(
    State(state): State<AppState>,
    Path((provider, task_id)): Path<(String, String)>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let provider = JobProvider::parse(&provider)
        .ok_or_else(|| ApiError::not_found(format!("Unknown provider: {provider}")))?;
    if task_id.trim().is_empty() {
        return Err(ApiError::bad_request("Missing taskId"));
    }

    let poller = state.poller(provider)?;
    let handle = poller.spawn(JobId::from_string(task_id.clone()));
    let progress = WatchStream::new(handle.progress());

    metrics::record_job_stream(provider.as_str(), true);
    let guard = StreamGuard {
        provider: provider.as_str(),
    };
    info!(provider = %provider, task_id = %task_id, "Job event stream opened");

    // The receiver closes when the poll task ends, which moves on to the outcome.
    let progress_events = progress.map(|p| Ok::<_, Infallible>(progress_event(&p)));
    let terminal = stream::once(async move {
        let _guard = guard;
        let outcome = handle.outcome().await;
        info!(
            provider = %provider,
            task_id = %task_id,
            outcome = outcome.label(),
            attempts = outcome.attempts(),
            "Job event stream finished"
        );
        Ok::<_, Infallible>(terminal_event(&task_id, provider, outcome))
    });

    Ok(Sse::new(progress_events.chain(terminal))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
