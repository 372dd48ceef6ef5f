//! Scheduler configuration.
//!
//! Plain data with serde defaults, so a partial JSON document is enough:
//! `{"max_concurrent_tasks": 4}` keeps every other field at its default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::builder::BuildError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Upper bound on simultaneously RUNNING tasks.
    pub max_concurrent_tasks: usize,

    /// Per-attempt timeout for tasks submitted without one.
    pub default_timeout_ms: u64,

    /// Longest the dispatch loop sleeps without a wake-up.
    pub poll_interval_ms: u64,

    /// Priority boost: queued tasks gain one level per interval waited.
    /// Absent means off, which keeps dispatch order strictly by submission
    /// priority.
    pub priority_boost_interval_ms: Option<u64>,

    /// Retry delay multiplier per attempt; 1.0 is a constant delay.
    pub retry_backoff_multiplier: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 2,
            default_timeout_ms: 30_000,
            poll_interval_ms: 100,
            priority_boost_interval_ms: None,
            retry_backoff_multiplier: 1.0,
        }
    }
}

impl SchedulerConfig {
    pub fn from_json_str(s: &str) -> Result<Self, BuildError> {
        serde_json::from_str(s).map_err(|e| BuildError::InvalidConfig(e.to_string()))
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn priority_boost_interval(&self) -> Option<Duration> {
        self.priority_boost_interval_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        if self.max_concurrent_tasks == 0 {
            return Err(BuildError::InvalidConcurrency(self.max_concurrent_tasks));
        }
        if self.poll_interval_ms == 0 {
            return Err(BuildError::InvalidConfig(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.priority_boost_interval_ms == Some(0) {
            return Err(BuildError::InvalidConfig(
                "priority_boost_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !self.retry_backoff_multiplier.is_finite() || self.retry_backoff_multiplier < 1.0 {
            return Err(BuildError::InvalidConfig(format!(
                "retry_backoff_multiplier must be >= 1.0, got {}",
                self.retry_backoff_multiplier
            )));
        }
        Ok(())
    }
}
