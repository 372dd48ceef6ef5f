//! Scheduler events delivered to subscribers.

use serde::{Deserialize, Serialize};

use super::ids::TaskId;
use super::outcome::TaskResult;

/// A lifecycle notification.
///
/// Retries are internal: a failed attempt that is requeued emits nothing
/// beyond the next `TaskStarted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SchedulerEvent {
    /// The task entered RUNNING (once per attempt).
    TaskStarted { id: TaskId },

    /// The task reached COMPLETED.
    TaskCompleted { id: TaskId, result: TaskResult },

    /// The task reached FAILED, after exhausting retries or through a
    /// dependency cascade.
    TaskFailed { id: TaskId, error: String },
}

impl SchedulerEvent {
    pub fn task_id(&self) -> &TaskId {
        match self {
            SchedulerEvent::TaskStarted { id }
            | SchedulerEvent::TaskCompleted { id, .. }
            | SchedulerEvent::TaskFailed { id, .. } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SchedulerEvent::TaskStarted { .. } => "task_started",
            SchedulerEvent::TaskCompleted { .. } => "task_completed",
            SchedulerEvent::TaskFailed { .. } => "task_failed",
        }
    }
}
