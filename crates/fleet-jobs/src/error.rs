//! Job error types.

use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Job-related errors.
///
/// Errors are recorded on the job as its last error and returned from
/// `execute`, `retry` and `run_with_retry`, so they are cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The handler returned an error.
    #[error("Job execution failed: {0}")]
    ExecutionFailed(String),

    /// The per-attempt deadline elapsed before the handler finished.
    #[error("Job deadline exceeded after {0:?}")]
    Timeout(Duration),

    /// The run was aborted by an external cancellation signal.
    #[error("Job was cancelled")]
    Cancelled,
}

impl JobError {
    /// Wraps any displayable error as a handler failure.
    pub fn execution(err: impl Display) -> Self {
        JobError::ExecutionFailed(err.to_string())
    }

    /// Returns true if the job hit its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, JobError::Timeout(_))
    }

    /// Returns true if the job was cancelled from outside.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobError::Cancelled)
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::ExecutionFailed(_) => "execution",
            JobError::Timeout(_) => "timeout",
            JobError::Cancelled => "cancelled",
        }
    }
}

impl From<anyhow::Error> for JobError {
    fn from(err: anyhow::Error) -> Self {
        JobError::ExecutionFailed(format!("{err:#}"))
    }
}

impl From<std::io::Error> for JobError {
    fn from(err: std::io::Error) -> Self {
        JobError::execution(err)
    }
}
