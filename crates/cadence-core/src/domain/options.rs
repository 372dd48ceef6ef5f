//! Submission options for a task.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::ids::TaskId;
use super::priority::Priority;

/// Execution policy supplied with `schedule_task`.
///
/// Every field has a default, so `TaskOptions::default()` is a normal
/// priority, run-once task with no dependencies that is eligible now and uses
/// the scheduler's default timeout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOptions {
    pub priority: Priority,

    /// Additional attempts after the first one fails.
    pub max_retries: u32,

    /// Wait before a failed task becomes eligible again.
    pub retry_delay: Duration,

    /// Per-attempt timeout. `None` means the scheduler default.
    pub timeout: Option<Duration>,

    /// Tasks that must complete before this one may run.
    pub dependencies: Vec<TaskId>,

    /// The task is never eligible before this instant.
    pub scheduled_time: Option<DateTime<Utc>>,
}

impl TaskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn depends_on(mut self, id: impl Into<TaskId>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    pub fn dependencies<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TaskId>,
    {
        self.dependencies.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_time = Some(at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_run_once_now() {
        let o = TaskOptions::default();
        assert_eq!(o.priority, Priority::Normal);
        assert_eq!(o.max_retries, 0);
        assert_eq!(o.retry_delay, Duration::ZERO);
        assert!(o.timeout.is_none());
        assert!(o.dependencies.is_empty());
        assert!(o.scheduled_time.is_none());
    }

    #[test]
    fn builder_collects_dependencies() {
        let o = TaskOptions::new()
            .priority(Priority::High)
            .depends_on("a")
            .dependencies(["b", "c"]);
        assert_eq!(o.priority, Priority::High);
        assert_eq!(
            o.dependencies,
            vec![TaskId::from("a"), TaskId::from("b"), TaskId::from("c")]
        );
    }
}
