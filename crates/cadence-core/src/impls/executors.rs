//! Ready-made executors.
//!
//! - **FnExecutor**: wraps an async closure, for ad-hoc work items
//! - **DelayExecutor**: waits a fixed time then succeeds or fails, for demos
//!   and tests

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{ExecutorError, TaskResult};
use crate::ports::TaskExecutor;

type BoxFuture = Pin<Box<dyn Future<Output = Result<TaskResult, ExecutorError>> + Send>>;

/// Executor backed by a closure that produces the attempt future.
///
/// # Example
/// ```ignore
/// let exec = FnExecutor::new(|| async { Ok(TaskResult::success("done")) })
///     .with_estimate(Duration::from_millis(20));
/// ```
pub struct FnExecutor {
    run: Box<dyn Fn() -> BoxFuture + Send + Sync>,
    estimate: Duration,
}

impl FnExecutor {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TaskResult, ExecutorError>> + Send + 'static,
    {
        Self {
            run: Box::new(move || Box::pin(f())),
            estimate: Duration::ZERO,
        }
    }

    pub fn with_estimate(mut self, estimate: Duration) -> Self {
        self.estimate = estimate;
        self
    }
}

#[async_trait]
impl TaskExecutor for FnExecutor {
    fn estimated_time(&self) -> Duration {
        self.estimate
    }

    async fn execute_task(&self) -> Result<TaskResult, ExecutorError> {
        (self.run)().await
    }
}

/// Sleeps for `delay`, then returns a canned result.
#[derive(Debug, Clone)]
pub struct DelayExecutor {
    delay: Duration,
    failure: Option<String>,
}

impl DelayExecutor {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            failure: None,
        }
    }

    /// Every attempt fails with `message` after the delay.
    pub fn failing(delay: Duration, message: impl Into<String>) -> Self {
        Self {
            delay,
            failure: Some(message.into()),
        }
    }
}

#[async_trait]
impl TaskExecutor for DelayExecutor {
    fn estimated_time(&self) -> Duration {
        self.delay
    }

    async fn execute_task(&self) -> Result<TaskResult, ExecutorError> {
        tokio::time::sleep(self.delay).await;
        match &self.failure {
            Some(msg) => Err(ExecutorError::failed(msg.clone())),
            None => Ok(TaskResult::success(format!(
                "waited {}ms",
                self.delay.as_millis()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fn_executor_runs_the_closure_each_time() {
        let exec = FnExecutor::new(|| async { Ok(TaskResult::success("hi")) })
            .with_estimate(Duration::from_millis(7));
        assert_eq!(exec.estimated_time(), Duration::from_millis(7));
        assert!(exec.can_execute().await);
        assert_eq!(exec.execute_task().await.unwrap().message, "hi");
        assert_eq!(exec.execute_task().await.unwrap().message, "hi");
    }

    #[tokio::test]
    async fn delay_executor_success_and_failure() {
        let ok = DelayExecutor::new(Duration::from_millis(5));
        assert!(ok.execute_task().await.unwrap().success);

        let bad = DelayExecutor::failing(Duration::from_millis(5), "no window");
        let err = bad.execute_task().await.unwrap_err();
        assert_eq!(err, ExecutorError::Failed("no window".to_string()));
    }
}
