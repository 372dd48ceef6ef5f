//! IdGenerator port - minting task ids for callers that have none.
//!
//! The scheduler itself never invents ids; callers usually supply meaningful
//! ones. This is for front-ends (the CLI, batch submitters) that only need
//! unique, time-sortable ids.

use ulid::Ulid;

use crate::domain::TaskId;
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;
}

/// ULID-based generator: `task-<ulid>`, with the timestamp taken from a
/// [`Clock`] so ids follow the scheduler's notion of time.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> TaskId {
        let timestamp_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        TaskId::new(format!("task-{ulid}"))
    }
}
