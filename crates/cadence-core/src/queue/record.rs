//! Task record: identity, policy and status envelope of one task.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{Priority, SchedulerError, TaskId, TaskOptions, TaskResult, TaskStatus};
use crate::ports::TaskExecutor;

/// Single source of truth for a task's state.
///
/// The ready queue and the dependency resolver hold `TaskId`s only; every
/// status change goes through the methods here, which refuse transitions the
/// state machine does not allow.
pub struct TaskRecord {
    pub id: TaskId,
    pub priority: Priority,
    pub dependencies: Vec<TaskId>,
    pub scheduled_time: Option<DateTime<Utc>>,

    pub max_retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,

    /// Attempts dispatched so far, including the current one while running.
    pub attempts_used: u32,

    pub status: TaskStatus,

    /// `None` while the executor is out on a probe or an attempt, or after an
    /// attempt panicked and took it down.
    executor: Option<Box<dyn TaskExecutor>>,

    /// Cached `estimated_time()` so it stays answerable while the executor
    /// is out.
    pub estimated_time: Duration,

    pub last_result: Option<TaskResult>,
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn new(
        id: TaskId,
        executor: Box<dyn TaskExecutor>,
        options: TaskOptions,
        default_timeout: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let estimated_time = executor.estimated_time();
        Self {
            id,
            priority: options.priority,
            dependencies: options.dependencies,
            scheduled_time: options.scheduled_time,
            max_retries: options.max_retries,
            retry_delay: options.retry_delay,
            timeout: options.timeout.unwrap_or(default_timeout),
            attempts_used: 0,
            status: TaskStatus::Queued,
            executor: Some(executor),
            estimated_time,
            last_result: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the executor out for a probe or an attempt.
    pub fn take_executor(&mut self) -> Option<Box<dyn TaskExecutor>> {
        self.executor.take()
    }

    /// Hand the executor back after a probe or an attempt.
    pub fn restore_executor(&mut self, executor: Box<dyn TaskExecutor>) {
        self.executor = Some(executor);
    }

    pub fn has_executor(&self) -> bool {
        self.executor.is_some()
    }

    fn transition(&mut self, to: TaskStatus, now: DateTime<Utc>) -> Result<(), SchedulerError> {
        if !self.status.can_transition_to(to) {
            return Err(SchedulerError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    /// Queued -> Running; counts the attempt.
    pub fn start_attempt(&mut self, now: DateTime<Utc>) -> Result<(), SchedulerError> {
        self.transition(TaskStatus::Running, now)?;
        self.attempts_used += 1;
        Ok(())
    }

    pub fn mark_completed(
        &mut self,
        result: TaskResult,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        self.transition(TaskStatus::Completed, now)?;
        self.last_result = Some(result);
        Ok(())
    }

    /// Running -> Queued after a failed attempt with retries left.
    pub fn requeue(&mut self, result: TaskResult, now: DateTime<Utc>) -> Result<(), SchedulerError> {
        self.transition(TaskStatus::Queued, now)?;
        self.last_error = Some(result.error_summary().to_string());
        self.last_result = Some(result);
        Ok(())
    }

    /// Running -> Failed (retries exhausted) or Queued -> Failed (cascade).
    pub fn mark_failed(
        &mut self,
        error: String,
        result: Option<TaskResult>,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        self.transition(TaskStatus::Failed, now)?;
        self.last_error = Some(error);
        if result.is_some() {
            self.last_result = result;
        }
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), SchedulerError> {
        self.transition(TaskStatus::Cancelled, now)
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("status", &self.status)
            .field("attempts_used", &self.attempts_used)
            .field("max_retries", &self.max_retries)
            .field("dependencies", &self.dependencies)
            .field("has_executor", &self.executor.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::DelayExecutor;

    fn record(max_retries: u32) -> TaskRecord {
        TaskRecord::new(
            TaskId::from("t"),
            Box::new(DelayExecutor::new(Duration::from_millis(5))),
            TaskOptions::new().max_retries(max_retries),
            Duration::from_secs(30),
            Utc::now(),
        )
    }

    #[test]
    fn new_record_is_queued_with_default_timeout() {
        let r = record(0);
        assert_eq!(r.status, TaskStatus::Queued);
        assert_eq!(r.attempts_used, 0);
        assert_eq!(r.timeout, Duration::from_secs(30));
        assert_eq!(r.estimated_time, Duration::from_millis(5));
        assert!(r.has_executor());
    }

    #[test]
    fn attempts_counted_at_dispatch() {
        let mut r = record(2);
        let now = Utc::now();
        r.start_attempt(now).unwrap();
        assert_eq!(r.attempts_used, 1);
        r.requeue(TaskResult::failure("boom"), now).unwrap();
        assert_eq!(r.last_error.as_deref(), Some("boom"));

        r.start_attempt(now).unwrap();
        r.requeue(TaskResult::failure("boom"), now).unwrap();
        r.start_attempt(now).unwrap();
        assert_eq!(r.attempts_used, 3);
        assert_eq!(r.status, TaskStatus::Running);
    }

    #[test]
    fn terminal_record_rejects_further_transitions() {
        let mut r = record(0);
        let now = Utc::now();
        r.start_attempt(now).unwrap();
        r.mark_completed(TaskResult::success("ok"), now).unwrap();

        let err = r.start_attempt(now).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::InvalidTransition {
                from: TaskStatus::Completed,
                to: TaskStatus::Running,
                ..
            }
        ));
        assert_eq!(r.attempts_used, 1);
    }

    #[test]
    fn running_task_cannot_be_cancelled() {
        let mut r = record(0);
        let now = Utc::now();
        r.start_attempt(now).unwrap();
        assert!(r.cancel(now).is_err());
        assert_eq!(r.status, TaskStatus::Running);
    }

    #[test]
    fn executor_moves_out_and_back() {
        let mut r = record(0);
        let exec = r.take_executor().unwrap();
        assert!(!r.has_executor());
        assert!(r.take_executor().is_none());
        r.restore_executor(exec);
        assert!(r.has_executor());
    }
}
