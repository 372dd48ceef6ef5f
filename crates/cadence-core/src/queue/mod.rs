//! Queue internals: task records, ready queue, dependency resolution and
//! retry decisions. Everything here is synchronous and lock-free; the
//! scheduler owns these structures behind its single state lock.

mod dependency;
mod ready;
mod record;
mod retry;

pub use dependency::{DependencyResolver, Resolution};
pub use ready::{QueueEntry, ReadyQueue};
pub use record::TaskRecord;
pub use retry::{RetryDecision, RetryPolicy};
