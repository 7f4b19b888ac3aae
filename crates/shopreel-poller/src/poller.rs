//! The poll loop.

use std::sync::Arc;
use std::time::Instant;

use shopreel_models::{JobId, JobState};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::PollConfig;
use crate::metrics::{record_check, record_run};
use crate::outcome::PollOutcome;
use crate::progress::PollProgress;
use crate::source::JobStatusSource;

/// Polls one kind of remote job until it settles.
///
/// Cheap to clone; each run is independent and shares no mutable state.
#[derive(Clone)]
pub struct JobPoller {
    source: Arc<dyn JobStatusSource>,
    config: PollConfig,
}

impl JobPoller {
    pub fn new(source: Arc<dyn JobStatusSource>, config: PollConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll `job_id` to a terminal outcome, publishing progress on `progress`.
    ///
    /// The first check is issued immediately. Cancellation is honored before
    /// every check and during the sleep between checks; a check already in
    /// flight when the token fires is awaited but its result is discarded.
    pub async fn run(
        &self,
        job_id: &JobId,
        cancel: &CancellationToken,
        progress: &watch::Sender<PollProgress>,
    ) -> PollOutcome {
        self.run_with(job_id, cancel, |p| {
            progress.send_replace(p);
        })
        .await
    }

    /// Spawn the loop on the runtime.
    ///
    /// Dropping the returned handle cancels the poll.
    pub fn spawn(&self, job_id: JobId) -> PollHandle {
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(PollProgress::initial(self.config.max_attempts));

        let poller = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { poller.run(&job_id, &token, &tx).await });

        PollHandle {
            progress: rx,
            task,
            cancel: cancel.clone(),
            _guard: cancel.drop_guard(),
        }
    }

    async fn run_with<F>(&self, job_id: &JobId, cancel: &CancellationToken, emit: F) -> PollOutcome
    where
        F: FnMut(PollProgress),
    {
        let source = self.source.name();
        let span = info_span!("job_poll", source, job_id = %job_id);
        let started = Instant::now();

        let outcome = self.poll_loop(job_id, cancel, emit).instrument(span).await;

        record_run(source, outcome.label(), started.elapsed());
        info!(
            source,
            job_id = %job_id,
            outcome = outcome.label(),
            attempts = outcome.attempts(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Job poll finished"
        );
        outcome
    }

    async fn poll_loop<F>(&self, job_id: &JobId, cancel: &CancellationToken, mut emit: F) -> PollOutcome
    where
        F: FnMut(PollProgress),
    {
        let source = self.source.name();
        let max_attempts = self.config.max_attempts;
        let mut attempts = 0u32;
        let mut consecutive_errors = 0u32;
        let mut last_state = JobState::Pending;

        loop {
            if cancel.is_cancelled() {
                return PollOutcome::Cancelled { attempts };
            }

            attempts += 1;
            let result = self.source.check_status(job_id).await;

            if cancel.is_cancelled() {
                debug!(attempt = attempts, "Discarding status check that finished after cancellation");
                return PollOutcome::Cancelled { attempts };
            }

            match result {
                Ok(report) => {
                    record_check(source, "ok");
                    consecutive_errors = 0;
                    last_state = report.state;

                    match report.state {
                        JobState::Succeeded => {
                            let url = report.result_url.filter(|u| !u.trim().is_empty());
                            return match url {
                                Some(result_url) => {
                                    emit(PollProgress::complete(attempts, max_attempts));
                                    PollOutcome::Succeeded {
                                        result_url,
                                        attempts,
                                    }
                                }
                                None => PollOutcome::Failed {
                                    error: "job succeeded without a result URL".to_string(),
                                    attempts,
                                },
                            };
                        }
                        JobState::Failed => {
                            return PollOutcome::Failed {
                                error: report
                                    .error_message
                                    .unwrap_or_else(|| "job failed".to_string()),
                                attempts,
                            };
                        }
                        JobState::Pending | JobState::Running => {
                            debug!(attempt = attempts, state = %report.state, "Job not finished");
                        }
                    }
                }
                Err(e) if e.is_fatal() => {
                    record_check(source, "fatal");
                    warn!(attempt = attempts, error = %e, "Status check rejected");
                    return PollOutcome::Failed {
                        error: e.to_string(),
                        attempts,
                    };
                }
                Err(e) => {
                    record_check(source, "error");
                    consecutive_errors += 1;
                    warn!(
                        attempt = attempts,
                        consecutive_errors,
                        error = %e,
                        "Status check failed"
                    );
                    if consecutive_errors >= self.config.max_consecutive_errors {
                        return PollOutcome::Failed {
                            error: e.to_string(),
                            attempts,
                        };
                    }
                }
            }

            emit(PollProgress::observed(attempts, max_attempts, last_state));

            if attempts >= max_attempts {
                return PollOutcome::TimedOut {
                    attempts,
                    last_state,
                };
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled { attempts },
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }
}

/// A poll running on the runtime.
pub struct PollHandle {
    progress: watch::Receiver<PollProgress>,
    task: JoinHandle<PollOutcome>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl PollHandle {
    /// A receiver for progress snapshots; it closes when the poll ends.
    pub fn progress(&self) -> watch::Receiver<PollProgress> {
        self.progress.clone()
    }

    /// Ask the poll to stop. The outcome will be `Cancelled` unless it already finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the outcome.
    ///
    /// Dropping this future before it resolves cancels the poll.
    pub async fn outcome(mut self) -> PollOutcome {
        match (&mut self.task).await {
            Ok(outcome) => outcome,
            Err(e) => PollOutcome::Failed {
                error: format!("poll task aborted: {e}"),
                attempts: self.progress.borrow().attempt,
            },
        }
    }
}
