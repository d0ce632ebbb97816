use crate::error::Result;
use crate::model::{StatusMap, Submission};

/// What became of a control request on a particular backend.
///
/// Distinguishing "the backend cannot do this" from "the backend tried and
/// failed" lets callers stay backend-agnostic without parsing log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Applied,
    Unsupported,
}

/// Client-side adapter for one execution backend.
///
/// The control operations default to [`ControlOutcome::Unsupported`] so a
/// backend only overrides what its native tooling actually offers.
#[async_trait::async_trait]
pub trait JobScheduler: Send + Sync {
    /// Submit the request and return the backend's native job identifier.
    async fn submit(&self, submission: Submission) -> Result<String>;

    /// Snapshot the job's scheduler-reported state. An empty map means the
    /// backend no longer knows the job; this is not an error.
    async fn status(&self, job_id: &str) -> Result<StatusMap>;

    async fn kill(&self, _job_id: &str) -> Result<ControlOutcome> {
        Ok(ControlOutcome::Unsupported)
    }

    async fn hold(&self, _job_id: &str) -> Result<ControlOutcome> {
        Ok(ControlOutcome::Unsupported)
    }

    async fn release(&self, _job_id: &str) -> Result<ControlOutcome> {
        Ok(ControlOutcome::Unsupported)
    }

    async fn alter(&self, _job_id: &str, _priority: Option<i32>) -> Result<ControlOutcome> {
        Ok(ControlOutcome::Unsupported)
    }
}
