//! Scheduler - the public surface of the engine.
//!
//! All mutable state (records, ready queue, dependency resolver, aggregates)
//! sits behind one `tokio::sync::Mutex`. Every transition, together with the
//! queue and resolver updates and the event it emits, happens inside a single
//! critical section, and the lock is never held across an executor await.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, error, info, warn};

use super::builder::SchedulerBuilder;
use super::config::SchedulerConfig;
use super::limiter::ConcurrencyLimiter;
use super::status::{QueuedTask, SchedulerStatus, StatusReporter};
use crate::domain::{
    SchedulerError, SchedulerEvent, TaskId, TaskOptions, TaskResult, TaskStatus,
};
use crate::impls::{EventBus, Subscription, SubscriptionId};
use crate::ports::{Clock, EventSink, TaskExecutor};
use crate::queue::{DependencyResolver, ReadyQueue, Resolution, RetryPolicy, TaskRecord};

/// Built-in subscriber bus plus any sinks injected through the builder.
pub(crate) struct EventFanout {
    bus: EventBus,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EventSink for EventFanout {
    fn emit(&self, event: &SchedulerEvent) {
        self.bus.emit(event);
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

pub(crate) struct SchedulerState {
    pub(crate) records: HashMap<TaskId, TaskRecord>,
    pub(crate) queue: ReadyQueue,
    pub(crate) resolver: DependencyResolver,
    pub(crate) reporter: StatusReporter,
    /// Tasks currently in RUNNING.
    pub(crate) running: usize,
    /// Tasks whose executor declined, and when to ask it again.
    pub(crate) probe_backoff: HashMap<TaskId, DateTime<Utc>>,
}

impl SchedulerState {
    fn new(config: &SchedulerConfig) -> Self {
        Self {
            records: HashMap::new(),
            queue: ReadyQueue::new(config.priority_boost_interval()),
            resolver: DependencyResolver::new(),
            reporter: StatusReporter::default(),
            running: 0,
            probe_backoff: HashMap::new(),
        }
    }

    /// Running -> Failed after the last permitted attempt, then cascade.
    pub(crate) fn finalize_failure(
        &mut self,
        id: &TaskId,
        error: String,
        result: Option<TaskResult>,
        now: DateTime<Utc>,
        events: &dyn EventSink,
    ) {
        let Some(record) = self.records.get_mut(id) else {
            return;
        };
        let attempts = record.attempts_used;
        if let Err(e) = record.mark_failed(error.clone(), result, now) {
            warn!(task_id = %id, error = %e, "cannot mark task failed");
            return;
        }
        self.reporter.record_failed();
        warn!(task_id = %id, attempts, error = %error, "task failed");
        events.emit(&SchedulerEvent::TaskFailed {
            id: id.clone(),
            error,
        });
        self.cascade(id, Resolution::Failed, now, events);
    }

    /// Record a failed or cancelled resolution and fail every queued task
    /// that (transitively) depends on it, without running any of them.
    pub(crate) fn cascade(
        &mut self,
        root: &TaskId,
        resolution: Resolution,
        now: DateTime<Utc>,
        events: &dyn EventSink,
    ) {
        let reason = dependency_failure(root, resolution);
        for waiter in self.resolver.resolve(root, resolution) {
            self.fail_queued(&waiter, reason.clone(), now, events);
        }
    }

    /// Queued -> Failed for `id` and, transitively, its queued dependents.
    fn fail_queued(
        &mut self,
        id: &TaskId,
        error: String,
        now: DateTime<Utc>,
        events: &dyn EventSink,
    ) {
        let mut pending = vec![(id.clone(), error)];
        while let Some((id, error)) = pending.pop() {
            let Some(record) = self.records.get_mut(&id) else {
                continue;
            };
            if record.status != TaskStatus::Queued {
                continue;
            }
            if let Err(e) = record.mark_failed(error.clone(), None, now) {
                warn!(task_id = %id, error = %e, "cannot fail dependent task");
                continue;
            }
            self.queue.remove(&id);
            self.reporter.record_failed();
            warn!(task_id = %id, error = %error, "task failed without running");
            events.emit(&SchedulerEvent::TaskFailed {
                id: id.clone(),
                error,
            });

            let reason = dependency_failure(&id, Resolution::Failed);
            pending.extend(
                self.resolver
                    .resolve(&id, Resolution::Failed)
                    .into_iter()
                    .map(|waiter| (waiter, reason.clone())),
            );
        }
    }
}

fn dependency_failure(dep: &TaskId, resolution: Resolution) -> String {
    match resolution {
        Resolution::Cancelled => format!("dependency {dep} was cancelled"),
        _ => format!("dependency {dep} failed"),
    }
}

pub(crate) struct Inner {
    pub(crate) config: SchedulerConfig,
    pub(crate) state: Mutex<SchedulerState>,
    pub(crate) limiter: ConcurrencyLimiter,
    pub(crate) retry_policy: RetryPolicy,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) events: EventFanout,
    pub(crate) notify: Notify,
    pub(crate) span: Span,
    pub(crate) loop_active: AtomicBool,
}

struct LoopHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// In-process task scheduler.
///
/// Cheap to clone; clones share the same queue and dispatch loop.
///
/// # Example
/// ```ignore
/// let scheduler = Scheduler::builder().max_concurrent_tasks(2).build()?;
/// scheduler
///     .schedule_task("login", LoginAction::new(), TaskOptions::new().priority(Priority::High))
///     .await?;
/// scheduler.start().await?;
/// ```
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
    control: Arc<Mutex<Option<LoopHandle>>>,
}

impl Scheduler {
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    pub(crate) fn from_parts(
        config: SchedulerConfig,
        clock: Arc<dyn Clock>,
        sinks: Vec<Arc<dyn EventSink>>,
        span: Span,
    ) -> Self {
        let inner = Inner {
            state: Mutex::new(SchedulerState::new(&config)),
            limiter: ConcurrencyLimiter::new(config.max_concurrent_tasks),
            retry_policy: RetryPolicy::with_multiplier(config.retry_backoff_multiplier),
            clock,
            events: EventFanout {
                bus: EventBus::new(),
                sinks,
            },
            notify: Notify::new(),
            span,
            loop_active: AtomicBool::new(false),
            config,
        };
        Self {
            inner: Arc::new(inner),
            control: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Submit a task. It starts QUEUED and runs once it is eligible.
    ///
    /// Fails without changing anything if `id` was ever submitted before, or
    /// if its dependencies would form a cycle. A task whose dependency has
    /// already failed is accepted and immediately failed.
    pub async fn schedule_task<E>(
        &self,
        id: impl Into<TaskId>,
        executor: E,
        options: TaskOptions,
    ) -> Result<(), SchedulerError>
    where
        E: TaskExecutor + 'static,
    {
        let id = id.into();
        let now = self.inner.clock.now();
        {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;

            if state.records.contains_key(&id) || state.resolver.resolution(&id).is_some() {
                return Err(SchedulerError::DuplicateTask(id));
            }
            state.resolver.register(&id, &options.dependencies)?;

            let record = TaskRecord::new(
                id.clone(),
                Box::new(executor),
                options,
                self.inner.config.default_timeout(),
                now,
            );
            let blocked_by = state
                .resolver
                .blocking_dependency(&record.dependencies)
                .and_then(|dep| Some((dep.clone(), state.resolver.resolution(dep)?)));

            state
                .queue
                .push(id.clone(), record.priority, record.scheduled_time, now);
            debug!(
                task_id = %id,
                priority = %record.priority,
                dependencies = record.dependencies.len(),
                max_retries = record.max_retries,
                "task queued"
            );
            state.records.insert(id.clone(), record);

            if let Some((dep, resolution)) = blocked_by {
                state.fail_queued(
                    &id,
                    dependency_failure(&dep, resolution),
                    now,
                    &self.inner.events,
                );
            }
        }
        self.inner.notify.notify_one();
        Ok(())
    }

    /// Cancel a task that is still QUEUED. Returns `false` for unknown,
    /// running or finished tasks. Queued dependents fail.
    pub async fn cancel_task(&self, id: &str) -> bool {
        let now = self.inner.clock.now();
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;

        let Some(record) = state.records.get_mut(id) else {
            return false;
        };
        if record.status != TaskStatus::Queued || record.cancel(now).is_err() {
            return false;
        }
        let id = record.id.clone();
        state.queue.remove(&id);
        info!(task_id = %id, "task cancelled");
        state.cascade(&id, Resolution::Cancelled, now, &self.inner.events);
        drop(guard);

        self.inner.notify.notify_one();
        true
    }

    /// Start the dispatch loop.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let mut control = self.control.lock().await;
        if control.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.inner.loop_active.store(true, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let span = self.inner.span.clone();
        let join = tokio::spawn(inner.run(shutdown_rx).instrument(span));
        *control = Some(LoopHandle { shutdown_tx, join });
        Ok(())
    }

    /// Stop dispatching and wait for in-flight attempts to finish.
    ///
    /// Queued tasks stay queued; a later `start()` picks them up.
    pub async fn stop(&self) {
        let mut control = self.control.lock().await;
        let Some(handle) = control.take() else {
            return;
        };
        // ignore send error: the loop may already have exited
        let _ = handle.shutdown_tx.send(true);
        if let Err(e) = handle.join.await {
            error!(error = %e, "dispatch loop ended abnormally");
        }
        self.inner.loop_active.store(false, Ordering::SeqCst);
    }

    pub async fn status(&self) -> SchedulerStatus {
        let is_running = self.inner.loop_active.load(Ordering::SeqCst);
        let state = self.inner.state.lock().await;
        state
            .reporter
            .snapshot(state.queue.len(), state.running, is_running)
    }

    /// Queued tasks in the order the loop would prefer them.
    pub async fn queued_tasks(&self) -> Vec<QueuedTask> {
        let now = self.inner.clock.now();
        let state = self.inner.state.lock().await;
        state
            .queue
            .ordered(now)
            .into_iter()
            .filter_map(|entry| {
                let record = state.records.get(&entry.id)?;
                Some(QueuedTask {
                    id: entry.id.clone(),
                    priority: entry.priority,
                    effective_priority: state.queue.effective_priority(entry, now),
                    attempts_used: record.attempts_used,
                    not_before: entry.not_before,
                    enqueued_at: entry.enqueued_at,
                    waiting_on: state.resolver.pending_dependencies(&entry.id),
                })
            })
            .collect()
    }

    /// Current state of a task, including finished tasks whose records were
    /// dropped by `clear_history`.
    pub async fn task_status(&self, id: &str) -> Option<TaskStatus> {
        let state = self.inner.state.lock().await;
        if let Some(record) = state.records.get(id) {
            return Some(record.status);
        }
        state
            .resolver
            .resolution(&TaskId::from(id))
            .map(TaskStatus::from)
    }

    /// Result of the task's latest attempt, while its record is retained.
    pub async fn task_result(&self, id: &str) -> Option<TaskResult> {
        let state = self.inner.state.lock().await;
        state.records.get(id).and_then(|r| r.last_result.clone())
    }

    /// The executor's advisory duration estimate.
    pub async fn estimated_time(&self, id: &str) -> Option<Duration> {
        let state = self.inner.state.lock().await;
        state.records.get(id).map(|r| r.estimated_time)
    }

    /// Reset completed/failed counts and timing aggregates and drop finished
    /// records. Queued and running tasks and dependency outcomes are kept.
    pub async fn clear_history(&self) {
        let mut state = self.inner.state.lock().await;
        state.reporter.clear();
        let before = state.records.len();
        state.records.retain(|_, r| !r.status.is_terminal());
        info!(dropped = before - state.records.len(), "history cleared");
    }

    pub fn subscribe(&self) -> Subscription {
        self.inner.events.bus.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.events.bus.unsubscribe(id)
    }
}
