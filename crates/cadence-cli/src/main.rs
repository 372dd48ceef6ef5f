use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::time::{Duration, sleep};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cadence_core::{
    DelayExecutor, ExecutorError, FnExecutor, IdGenerator, Priority, Scheduler, SchedulerConfig,
    SchedulerEvent, SystemClock, TaskExecutor, TaskOptions, TaskResult, TracingSink,
    UlidGenerator,
};

#[derive(Debug, Deserialize)]
struct GreetPayload {
    name: String,
}

/// Greets someone, failing a fixed number of times first.
struct GreetExecutor {
    payload: Vec<u8>,
    remaining_failures: AtomicU32,
}

impl GreetExecutor {
    fn new(payload: &str, failures: u32) -> Self {
        Self {
            payload: payload.as_bytes().to_vec(),
            remaining_failures: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl TaskExecutor for GreetExecutor {
    fn estimated_time(&self) -> Duration {
        Duration::from_millis(50)
    }

    async fn execute_task(&self) -> Result<TaskResult, ExecutorError> {
        let p: GreetPayload = serde_json::from_slice(&self.payload)
            .map_err(|e| ExecutorError::Other(format!("json decode: {e}")))?;

        sleep(Duration::from_millis(50)).await;
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(ExecutorError::failed(format!(
                "intentional failure (left={left})"
            )));
        }

        Ok(TaskResult::success(format!("Hello, {}!", p.name))
            .with_data(serde_json::json!({ "greeted": p.name })))
    }
}

fn load_config() -> anyhow::Result<SchedulerConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config {path}"))?;
            SchedulerConfig::from_json_str(&raw)
                .with_context(|| format!("invalid config {path}"))
        }
        None => Ok(SchedulerConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    info!(?config, "starting cadence demo");

    let scheduler = Scheduler::builder()
        .config(config)
        .event_sink(Arc::new(TracingSink))
        .build()?;
    let ids = UlidGenerator::new(SystemClock);

    // fetch → (parse, thumbnail) → publish, plus unrelated work at mixed priorities
    scheduler
        .schedule_task(
            "fetch",
            DelayExecutor::new(Duration::from_millis(150)),
            TaskOptions::new().priority(Priority::High),
        )
        .await?;
    scheduler
        .schedule_task(
            "parse",
            DelayExecutor::new(Duration::from_millis(80)),
            TaskOptions::new().depends_on("fetch"),
        )
        .await?;
    scheduler
        .schedule_task(
            "thumbnail",
            DelayExecutor::failing(Duration::from_millis(30), "decoder unavailable"),
            TaskOptions::new().depends_on("fetch").max_retries(1),
        )
        .await?;
    scheduler
        .schedule_task(
            "publish",
            DelayExecutor::new(Duration::from_millis(20)),
            TaskOptions::new().depends_on("parse").depends_on("thumbnail"),
        )
        .await?;
    scheduler
        .schedule_task(
            "greet",
            GreetExecutor::new(r#"{"name":"cadence"}"#, 2),
            TaskOptions::new()
                .priority(Priority::Urgent)
                .max_retries(3)
                .retry_delay(Duration::from_millis(100)),
        )
        .await?;
    for n in 0..3 {
        let id = ids.generate_task_id();
        scheduler
            .schedule_task(
                id,
                FnExecutor::new(move || async move {
                    sleep(Duration::from_millis(40)).await;
                    Ok(TaskResult::success(format!("batch item {n}")))
                })
                .with_estimate(Duration::from_millis(40)),
                TaskOptions::new().priority(Priority::Low),
            )
            .await?;
    }

    let mut events = scheduler.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => error!(error = %e, "cannot encode event"),
            }
            if let SchedulerEvent::TaskFailed { id, error } = &event {
                println!("failed: {id}: {error}");
            }
        }
    });

    scheduler.start().await?;

    loop {
        let status = scheduler.status().await;
        if status.queued_tasks == 0 && status.running_tasks == 0 {
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }
    scheduler.stop().await;

    let status = scheduler.status().await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    if let Some(result) = scheduler.task_result("greet").await {
        println!("greet -> {}", result.message);
    }

    // last handle: dropping it closes the event bus and ends the printer
    drop(scheduler);
    printer.await?;
    Ok(())
}
