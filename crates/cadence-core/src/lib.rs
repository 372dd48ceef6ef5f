//! cadence-core
//!
//! In-process asynchronous task scheduler: prioritised, dependency-aware,
//! concurrency-limited, with per-attempt timeouts and retries.
//!
//! # Modules
//! - **domain**: ids, priorities, options, results, states, events, errors
//! - **ports**: TaskExecutor, Clock, EventSink, IdGenerator
//! - **queue**: task records, ready queue, dependency resolver, retry policy
//! - **app**: Scheduler, builder, config, dispatch loop, status
//! - **impls**: event bus, tracing sink, ready-made executors

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod queue;

pub use app::{BuildError, QueuedTask, Scheduler, SchedulerBuilder, SchedulerConfig, SchedulerStatus};
pub use domain::{
    ExecutorError, Priority, SchedulerError, SchedulerEvent, TaskId, TaskOptions, TaskResult,
    TaskStatus,
};
pub use impls::{DelayExecutor, EventBus, FnExecutor, Subscription, SubscriptionId, TracingSink};
pub use ports::{Clock, EventSink, FixedClock, IdGenerator, SystemClock, TaskExecutor, UlidGenerator};
