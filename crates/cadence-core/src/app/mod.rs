//! App - the scheduler itself, wired from the queue internals and ports.
//!
//! # Components
//! - **SchedulerBuilder**: configuration and wiring
//! - **Scheduler**: submission, cancellation, lifecycle and queries
//! - **DispatchLoop**: pick → probe → dispatch → settle
//! - **ConcurrencyLimiter**: slots for in-flight attempts
//! - **StatusReporter**: completed/failed counts and timing aggregates

pub mod builder;
pub mod config;
mod dispatch_loop;
pub mod limiter;
pub mod scheduler;
pub mod status;

pub use self::builder::{BuildError, SchedulerBuilder};
pub use self::config::SchedulerConfig;
pub use self::limiter::{ConcurrencyLimiter, SlotPermit};
pub use self::scheduler::Scheduler;
pub use self::status::{QueuedTask, SchedulerStatus, StatusReporter};
