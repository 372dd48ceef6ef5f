//! Error types.

use thiserror::Error;

use super::ids::TaskId;
use super::state::TaskStatus;

/// Errors reported synchronously by the scheduler API.
///
/// Per-task execution problems never surface here; they are contained and
/// reported through status and events.
#[derive(Debug, Error, PartialEq)]
pub enum SchedulerError {
    #[error("task {0} already exists")]
    DuplicateTask(TaskId),

    #[error("dependency cycle: {}", format_cycle(.0))]
    DependencyCycle(Vec<TaskId>),

    #[error("invalid transition for task {id}: {from} -> {to}")]
    InvalidTransition {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("scheduler is already running")]
    AlreadyRunning,
}

/// Error raised by an executor. Treated exactly like an unsuccessful result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutorError {
    #[error("execution failed: {0}")]
    Failed(String),

    #[error("{0}")]
    Other(String),
}

impl ExecutorError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

fn format_cycle(ids: &[TaskId]) -> String {
    ids.iter()
        .map(TaskId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_task() {
        let e = SchedulerError::DuplicateTask(TaskId::from("t1"));
        assert_eq!(e.to_string(), "task t1 already exists");

        let e = SchedulerError::DependencyCycle(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(e.to_string(), "dependency cycle: a -> b -> a");

        let e = SchedulerError::InvalidTransition {
            id: "t".into(),
            from: TaskStatus::Completed,
            to: TaskStatus::Queued,
        };
        assert_eq!(
            e.to_string(),
            "invalid transition for task t: COMPLETED -> QUEUED"
        );
    }
}
