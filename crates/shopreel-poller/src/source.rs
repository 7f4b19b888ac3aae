//! The seam between the poll loop and a provider.

use std::sync::Arc;

use async_trait::async_trait;
use shopreel_models::{JobId, StatusReport};

use crate::error::PollError;

/// Something that can report the current state of a remote job.
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    /// Perform one status check.
    async fn check_status(&self, job_id: &JobId) -> Result<StatusReport, PollError>;

    /// Label used in logs and metrics.
    fn name(&self) -> &'static str {
        "job"
    }
}

#[async_trait]
impl<T: JobStatusSource + ?Sized> JobStatusSource for Arc<T> {
    async fn check_status(&self, job_id: &JobId) -> Result<StatusReport, PollError> {
        (**self).check_status(job_id).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
