//! Domain model (ids, priorities, options, results, states, events, errors).
//!
//! Nothing here knows about queues, locks or the runtime.

pub mod errors;
pub mod events;
pub mod ids;
pub mod options;
pub mod outcome;
pub mod priority;
pub mod state;

pub use errors::{ExecutorError, SchedulerError};
pub use events::SchedulerEvent;
pub use ids::TaskId;
pub use options::TaskOptions;
pub use outcome::TaskResult;
pub use priority::Priority;
pub use state::TaskStatus;
