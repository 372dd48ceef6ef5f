//! Task status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a task.
///
/// Transitions:
/// - Queued -> Running (dispatch)
/// - Queued -> Cancelled (explicit cancel before dispatch)
/// - Queued -> Failed (a dependency failed or was cancelled)
/// - Running -> Completed
/// - Running -> Queued (failed attempt, retries remain)
/// - Running -> Failed (failed attempt, no retries remain)
///
/// Running has no cancellation edge: an in-flight attempt always runs to
/// completion or timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Queued, Running)
                | (Queued, Cancelled)
                | (Queued, Failed)
                | (Running, Completed)
                | (Running, Queued)
                | (Running, Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Queued => "QUEUED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::TaskStatus::*;
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Queued, Running, true)]
    #[case(Queued, Cancelled, true)]
    #[case(Queued, Failed, true)]
    #[case(Running, Completed, true)]
    #[case(Running, Queued, true)]
    #[case(Running, Failed, true)]
    #[case(Running, Cancelled, false)]
    #[case(Queued, Completed, false)]
    #[case(Completed, Queued, false)]
    #[case(Failed, Queued, false)]
    #[case(Cancelled, Running, false)]
    fn transitions(#[case] from: TaskStatus, #[case] to: TaskStatus, #[case] allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for terminal in [Completed, Failed, Cancelled] {
            assert!(terminal.is_terminal());
            for next in [Queued, Running, Completed, Failed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert!(!Queued.is_terminal());
        assert!(!Running.is_terminal());
    }
}
