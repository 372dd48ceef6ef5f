//! TracingSink - logs every scheduler event through `tracing`.

use tracing::{info, warn};

use crate::domain::SchedulerEvent;
use crate::ports::EventSink;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &SchedulerEvent) {
        match event {
            SchedulerEvent::TaskStarted { id } => {
                info!(task_id = %id, "task started");
            }
            SchedulerEvent::TaskCompleted { id, result } => {
                info!(
                    task_id = %id,
                    execution_ms = result.execution_time.as_millis() as u64,
                    message = %result.message,
                    "task completed"
                );
            }
            SchedulerEvent::TaskFailed { id, error } => {
                warn!(task_id = %id, error = %error, "task failed");
            }
        }
    }
}
