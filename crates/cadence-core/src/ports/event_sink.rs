//! EventSink port - observers of scheduler events.

use crate::domain::SchedulerEvent;

/// Receives every event the scheduler emits.
///
/// `emit` is called while the scheduler holds its state lock, in the order
/// the transitions happen. Implementations must not block or call back into
/// the scheduler.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SchedulerEvent);
}
