//! Task result: the common shape produced by one execution attempt.
//!
//! Executors return a `TaskResult` for both successful and unsuccessful
//! attempts. A raised [`ExecutorError`](super::errors::ExecutorError) or a
//! timeout is converted into a `TaskResult` with `success = false`, so the
//! scheduler only ever reasons about this one shape.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,

    pub message: String,

    /// Structured output of the attempt (domain-specific).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Wall time spent in the executor; serialized as milliseconds.
    #[serde(with = "duration_ms", default)]
    pub execution_time: Duration,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl TaskResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            execution_time: Duration::ZERO,
            errors: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            execution_time: Duration::ZERO,
            errors: Vec::new(),
        }
    }

    /// Result recorded when an attempt exceeds its timeout.
    pub fn timed_out(timeout: Duration) -> Self {
        let msg = format!("task timed out after {}ms", timeout.as_millis());
        Self::failure(msg.clone()).with_error(msg)
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn with_execution_time(mut self, execution_time: Duration) -> Self {
        self.execution_time = execution_time;
        self
    }

    /// Human-readable failure reason: the last recorded error, or the message.
    pub fn error_summary(&self) -> &str {
        self.errors.last().map(String::as_str).unwrap_or(&self.message)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
