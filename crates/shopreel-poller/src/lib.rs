//! Bounded poll loop for remote async jobs.
//!
//! Providers such as DashScope VideoRetalk and APIMart Sora accept a job,
//! return an opaque id and only expose a pull-based status endpoint. This
//! crate drives that endpoint until the job reaches a terminal state or the
//! attempt budget runs out:
//!
//! - [`JobStatusSource`] is the seam a provider client implements.
//! - [`JobPoller::run`] is the loop; [`JobPoller::spawn`] runs it as a task
//!   and hands back a [`PollHandle`] with a `watch` progress receiver.
//! - [`PollOutcome`] distinguishes success, failure, timeout and cancellation.

pub mod config;
pub mod error;
pub mod metrics;
pub mod outcome;
pub mod poller;
pub mod progress;
pub mod source;

pub use config::PollConfig;
pub use error::PollError;
pub use outcome::PollOutcome;
pub use poller::{JobPoller, PollHandle};
pub use progress::PollProgress;
pub use source::JobStatusSource;
