//! Executor port - the capability every work item implements.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{ExecutorError, TaskResult};

/// A unit of work the scheduler can run.
///
/// Concrete automation actions (clicks, screen reads, remote calls) implement
/// this trait; the scheduler never looks past it. A task owns its executor
/// exclusively: the scheduler moves it into an attempt and back, it never
/// clones or shares it.
///
/// # Example
/// ```ignore
/// struct Ping;
///
/// #[async_trait]
/// impl TaskExecutor for Ping {
///     fn estimated_time(&self) -> Duration {
///         Duration::from_millis(50)
///     }
///
///     async fn execute_task(&self) -> Result<TaskResult, ExecutorError> {
///         Ok(TaskResult::success("pong"))
///     }
/// }
/// ```
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Advisory duration estimate for UI and telemetry. Must not block.
    fn estimated_time(&self) -> Duration;

    /// Pre-check before dispatch. `false` leaves the task queued; it is
    /// probed again on a later pass.
    async fn can_execute(&self) -> bool {
        true
    }

    /// Perform the work. An `Err` counts as an unsuccessful attempt.
    async fn execute_task(&self) -> Result<TaskResult, ExecutorError>;
}
