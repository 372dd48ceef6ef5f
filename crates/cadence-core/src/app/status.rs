//! Status reporting: running counts, timing aggregates and query views.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Priority, TaskId};

/// Snapshot returned by `Scheduler::status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub queued_tasks: usize,
    pub running_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub total_execution_time_ms: u64,
    pub average_execution_time_ms: u64,
    pub is_running: bool,
}

impl SchedulerStatus {
    pub fn total_execution_time(&self) -> Duration {
        Duration::from_millis(self.total_execution_time_ms)
    }

    pub fn average_execution_time(&self) -> Duration {
        Duration::from_millis(self.average_execution_time_ms)
    }
}

/// One entry of `Scheduler::queued_tasks`, in dispatch-preference order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedTask {
    pub id: TaskId,
    pub priority: Priority,
    /// Priority after boosting; equal to `priority` when boosting is off.
    pub effective_priority: Priority,
    pub attempts_used: u32,
    /// Not eligible before this instant (scheduled time or retry delay).
    pub not_before: Option<DateTime<Utc>>,
    pub enqueued_at: DateTime<Utc>,
    /// Dependencies that have not resolved yet.
    pub waiting_on: Vec<TaskId>,
}

/// Aggregates over finished tasks. Queued/running counts come from the
/// live queue, not from here.
#[derive(Debug, Default)]
pub struct StatusReporter {
    completed: usize,
    failed: usize,
    total_execution_time: Duration,
}

impl StatusReporter {
    pub fn record_completed(&mut self, execution_time: Duration) {
        self.completed += 1;
        self.total_execution_time = self.total_execution_time.saturating_add(execution_time);
    }

    pub fn record_failed(&mut self) {
        self.failed += 1;
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn total_execution_time(&self) -> Duration {
        self.total_execution_time
    }

    /// Mean execution time over completed tasks; zero when none completed.
    pub fn average_execution_time(&self) -> Duration {
        u32::try_from(self.completed)
            .ok()
            .filter(|n| *n > 0)
            .map(|n| self.total_execution_time / n)
            .unwrap_or(Duration::ZERO)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self, queued: usize, running: usize, is_running: bool) -> SchedulerStatus {
        SchedulerStatus {
            queued_tasks: queued,
            running_tasks: running,
            completed_tasks: self.completed,
            failed_tasks: self.failed,
            total_execution_time_ms: millis(self.total_execution_time),
            average_execution_time_ms: millis(self.average_execution_time()),
            is_running,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_over_completed_only() {
        let mut r = StatusReporter::default();
        assert_eq!(r.average_execution_time(), Duration::ZERO);

        r.record_completed(Duration::from_millis(100));
        r.record_completed(Duration::from_millis(300));
        r.record_failed();

        assert_eq!(r.completed(), 2);
        assert_eq!(r.failed(), 1);
        assert_eq!(r.total_execution_time(), Duration::from_millis(400));
        assert_eq!(r.average_execution_time(), Duration::from_millis(200));
    }

    #[test]
    fn clear_resets_everything() {
        let mut r = StatusReporter::default();
        r.record_completed(Duration::from_millis(50));
        r.record_failed();
        r.clear();

        let s = r.snapshot(3, 1, true);
        assert_eq!(s.completed_tasks, 0);
        assert_eq!(s.failed_tasks, 0);
        assert_eq!(s.total_execution_time_ms, 0);
        assert_eq!(s.average_execution_time_ms, 0);
        assert_eq!(s.queued_tasks, 3);
        assert_eq!(s.running_tasks, 1);
        assert!(s.is_running);
    }
}
