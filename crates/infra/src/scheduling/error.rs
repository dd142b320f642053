//! Scheduler error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler already running")]
    AlreadyRunning,

    #[error("scheduler not running")]
    NotRunning,

    #[error("failed to create scheduler: {0}")]
    CreationFailed(String),

    #[error("failed to start scheduler: {0}")]
    StartFailed(String),

    #[error("failed to stop scheduler: {0}")]
    StopFailed(String),

    #[error("failed to register job: {0}")]
    JobRegistrationFailed(String),

    #[error("operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("task join failed: {0}")]
    TaskJoinFailed(String),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
