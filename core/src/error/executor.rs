use thiserror::Error;

/// Executor-specific errors for batch construction and execution.
///
/// Individual task failures are never errors at this level; they surface as
/// failed [`TaskOutcome`](crate::executor::types::TaskOutcome)s. These
/// variants cover misuse of the engine itself.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Duplicate task ID: {0}")]
    DuplicateTaskId(String),

    #[error("Executor is already running a batch")]
    AlreadyRunning,
}
