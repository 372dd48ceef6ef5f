//! SchedulerBuilder - wiring and fail-fast validation.

use std::sync::Arc;
use std::time::Duration;

use tracing::Span;

use super::config::SchedulerConfig;
use super::scheduler::Scheduler;
use crate::ports::{Clock, EventSink, SystemClock};

/// Builds a [`Scheduler`].
///
/// # Example
/// ```ignore
/// let scheduler = SchedulerBuilder::new()
///     .max_concurrent_tasks(4)
///     .event_sink(Arc::new(TracingSink))
///     .build()?;
/// ```
///
/// `build()` validates the configuration up front, so a misconfigured
/// scheduler never starts.
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    clock: Option<Arc<dyn Clock>>,
    sinks: Vec<Arc<dyn EventSink>>,
    span: Option<Span>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("max_concurrent_tasks must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
            clock: None,
            sinks: Vec::new(),
            span: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_concurrent_tasks(mut self, n: usize) -> Self {
        self.config.max_concurrent_tasks = n;
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = duration_ms(interval);
        self
    }

    /// Enable priority boosting: one level per `interval` waited.
    pub fn priority_boost(mut self, interval: Duration) -> Self {
        self.config.priority_boost_interval_ms = Some(duration_ms(interval));
        self
    }

    pub fn retry_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.config.retry_backoff_multiplier = multiplier;
        self
    }

    /// Time source for scheduled times, retry delays and timeouts.
    /// Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Additional observer, called alongside the built-in subscriber bus.
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Parent span for everything the scheduler logs.
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn build(self) -> Result<Scheduler, BuildError> {
        self.config.validate()?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let span = self
            .span
            .unwrap_or_else(|| tracing::info_span!("scheduler"));
        Ok(Scheduler::from_parts(self.config, clock, self.sinks, span))
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_success() {
        let scheduler = SchedulerBuilder::new()
            .max_concurrent_tasks(3)
            .default_timeout(Duration::from_secs(5))
            .build();
        assert!(scheduler.is_ok());
        let scheduler = scheduler.unwrap();
        assert_eq!(scheduler.config().max_concurrent_tasks, 3);
        assert_eq!(scheduler.config().default_timeout_ms, 5_000);
    }

    #[test]
    fn test_build_zero_concurrency() {
        let result = SchedulerBuilder::new().max_concurrent_tasks(0).build();
        assert!(matches!(result, Err(BuildError::InvalidConcurrency(0))));
    }

    #[test]
    fn test_build_zero_poll_interval() {
        let result = SchedulerBuilder::new()
            .poll_interval(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(BuildError::InvalidConfig(_))));
    }

    #[test]
    fn test_build_from_config() {
        let config = SchedulerConfig {
            priority_boost_interval_ms: Some(1_000),
            ..Default::default()
        };
        let scheduler = SchedulerBuilder::new().config(config.clone()).build().unwrap();
        assert_eq!(scheduler.config(), &config);
    }
}
