//! Impls - bundled implementations of the ports.

pub mod event_bus;
pub mod executors;
pub mod tracing_sink;

pub use self::event_bus::{EventBus, Subscription, SubscriptionId};
pub use self::executors::{DelayExecutor, FnExecutor};
pub use self::tracing_sink::TracingSink;
