//! Ports - the seams between the scheduler and the outside world.
//!
//! - **TaskExecutor**: the work itself
//! - **Clock**: time, timers, timeouts
//! - **EventSink**: observers of lifecycle events
//! - **IdGenerator**: ids for callers that have none

pub mod clock;
pub mod event_sink;
pub mod executor;
pub mod id_generator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::EventSink;
pub use self::executor::TaskExecutor;
pub use self::id_generator::{IdGenerator, UlidGenerator};
