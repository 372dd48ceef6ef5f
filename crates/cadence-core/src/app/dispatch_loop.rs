//! DispatchLoop - pick → probe → dispatch → settle.
//!
//! The loop only picks: for every free slot it takes the best eligible task's
//! executor out of its record and hands both to a supervisor in the loop's
//! `JoinSet`. The supervisor asks `can_execute`, starts the attempt, races it
//! against the timeout and settles the outcome (complete, retry, or fail and
//! cascade), then releases the slot. Probes and attempts therefore never
//! hold up the loop or each other.
//!
//! Between passes the loop sleeps until the next gate, the poll interval, a
//! submission or a finished supervisor, whichever comes first.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info, warn};

use super::limiter::SlotPermit;
use super::scheduler::Inner;
use crate::domain::{SchedulerEvent, TaskId, TaskResult, TaskStatus};
use crate::ports::clock::{add_duration, until};
use crate::ports::{Clock, EventSink, TaskExecutor};
use crate::queue::{Resolution, RetryDecision};

impl Inner {
    pub(crate) async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            max_concurrent = self.limiter.limit(),
            poll_interval_ms = self.config.poll_interval_ms,
            "dispatch loop started"
        );
        let mut supervisors: JoinSet<()> = JoinSet::new();

        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            let next_gate = self.dispatch_ready(&mut supervisors, &shutdown_rx).await;
            let poll = self.config.poll_interval();
            let idle = next_gate.map_or(poll, |gate| gate.min(poll));

            tokio::select! {
                _ = self.notify.notified() => {}
                _ = self.clock.sleep(idle) => {}
                Some(joined) = supervisors.join_next(), if !supervisors.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "task supervisor aborted");
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        if !supervisors.is_empty() {
            info!(in_flight = self.limiter.in_use(), "waiting for in-flight tasks");
        }
        while let Some(joined) = supervisors.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "task supervisor aborted");
            }
        }
        info!("dispatch loop stopped");
    }

    /// Hand out free slots to eligible tasks.
    ///
    /// Returns how long until the nearest future gate or probe retry, if any.
    async fn dispatch_ready(
        self: &Arc<Self>,
        supervisors: &mut JoinSet<()>,
        shutdown_rx: &watch::Receiver<bool>,
    ) -> Option<Duration> {
        loop {
            if *shutdown_rx.borrow() {
                return None;
            }
            let Some(permit) = self.limiter.try_acquire() else {
                return None;
            };
            let now = self.clock.now();

            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            state.probe_backoff.retain(|_, retry_at| *retry_at > now);

            let (records, resolver, backoff) =
                (&state.records, &state.resolver, &state.probe_backoff);
            // A task whose executor is out is already being probed or run.
            let picked = state.queue.next_eligible(now, |id| {
                !backoff.contains_key(id)
                    && records.get(id).is_some_and(|r| {
                        r.has_executor() && resolver.is_eligible(&r.dependencies)
                    })
            });
            let Some(id) = picked else {
                let next_probe = state.probe_backoff.values().min().copied();
                return [state.queue.next_gate(now), next_probe]
                    .into_iter()
                    .flatten()
                    .min()
                    .map(|at| until(now, at));
            };
            let Some(record) = state.records.get_mut(&id) else {
                return None;
            };
            let Some(executor) = record.take_executor() else {
                return None;
            };
            let timeout = record.timeout;
            drop(guard);

            let span = tracing::info_span!(parent: &self.span, "task", task_id = %id);
            supervisors.spawn(
                Arc::clone(self)
                    .supervise(id, executor, timeout, permit, shutdown_rx.clone())
                    .instrument(span),
            );
        }
    }

    /// Probe, run and settle one picked task. The slot is held throughout
    /// and released on return.
    async fn supervise(
        self: Arc<Self>,
        id: TaskId,
        executor: Box<dyn TaskExecutor>,
        timeout: Duration,
        permit: SlotPermit,
        shutdown_rx: watch::Receiver<bool>,
    ) {
        let ready = tokio::select! {
            ready = probe(self.clock.as_ref(), executor.as_ref(), timeout) => ready,
            _ = shutdown_signalled(shutdown_rx.clone()) => false,
        };

        if let Some(executor) = self.begin_attempt(&id, executor, ready, &shutdown_rx).await {
            let result = run_attempt(self.clock.as_ref(), executor.as_ref(), timeout).await;
            self.settle(&id, executor, result).await;
        }
        drop(permit);
        self.notify.notify_one();
    }

    /// Queued → Running if the probe agreed and nothing changed meanwhile.
    /// Otherwise the executor goes back into the record and `None` is
    /// returned.
    async fn begin_attempt(
        &self,
        id: &TaskId,
        executor: Box<dyn TaskExecutor>,
        ready: bool,
        shutdown_rx: &watch::Receiver<bool>,
    ) -> Option<Box<dyn TaskExecutor>> {
        let now = self.clock.now();
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let record = state.records.get_mut(id)?;

        if record.status != TaskStatus::Queued {
            // Cancelled or cascaded while the probe was in flight.
            debug!(status = %record.status, "task left the queue during its probe");
            record.restore_executor(executor);
            return None;
        }
        if *shutdown_rx.borrow() {
            debug!("shutting down, task stays queued");
            record.restore_executor(executor);
            return None;
        }
        if !ready {
            record.restore_executor(executor);
            let retry_at = add_duration(now, self.config.poll_interval());
            state.probe_backoff.insert(id.clone(), retry_at);
            debug!("executor not ready, task stays queued");
            return None;
        }
        if let Err(e) = record.start_attempt(now) {
            record.restore_executor(executor);
            warn!(error = %e, "cannot start attempt");
            return None;
        }

        let attempt = record.attempts_used;
        state.queue.remove(id);
        state.running += 1;
        info!(attempt, "task dispatched");
        self.events
            .emit(&SchedulerEvent::TaskStarted { id: id.clone() });
        Some(executor)
    }

    async fn settle(&self, id: &TaskId, executor: Box<dyn TaskExecutor>, result: TaskResult) {
        let now = self.clock.now();
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.running = state.running.saturating_sub(1);

        let Some(record) = state.records.get_mut(id) else {
            warn!("finished attempt has no record");
            return;
        };
        record.restore_executor(executor);

        if result.success {
            let execution_time = result.execution_time;
            if let Err(e) = record.mark_completed(result.clone(), now) {
                warn!(error = %e, "cannot mark task completed");
                return;
            }
            state.reporter.record_completed(execution_time);
            info!(execution_ms = execution_time.as_millis(), "task completed");
            self.events.emit(&SchedulerEvent::TaskCompleted {
                id: id.clone(),
                result,
            });
            state.resolver.resolve(id, Resolution::Completed);
            return;
        }

        let decision =
            self.retry_policy
                .decide(record.attempts_used, record.max_retries, record.retry_delay);
        match decision {
            RetryDecision::Retry { delay } => {
                let (priority, attempt) = (record.priority, record.attempts_used);
                let error = result.error_summary().to_string();
                if let Err(e) = record.requeue(result, now) {
                    warn!(error = %e, "cannot requeue task");
                    return;
                }
                let gate = (!delay.is_zero()).then(|| add_duration(now, delay));
                state.queue.push(id.clone(), priority, gate, now);
                info!(
                    attempt,
                    retry_in_ms = delay.as_millis(),
                    error = %error,
                    "attempt failed, retrying"
                );
            }
            RetryDecision::GiveUp => {
                let error = result.error_summary().to_string();
                state.finalize_failure(id, error, Some(result), now, &self.events);
            }
        }
    }
}

/// Ask the executor whether it can run now. A probe that panics or outlives
/// the task timeout counts as not ready.
async fn probe(clock: &dyn Clock, executor: &dyn TaskExecutor, timeout: Duration) -> bool {
    let check = AssertUnwindSafe(executor.can_execute()).catch_unwind();
    tokio::select! {
        outcome = check => match outcome {
            Ok(ready) => ready,
            Err(panic) => {
                warn!(panic = %panic_message(panic.as_ref()), "readiness check panicked");
                false
            }
        },
        _ = clock.sleep(timeout) => {
            warn!(timeout_ms = timeout.as_millis(), "readiness check timed out");
            false
        }
    }
}

/// Execute once, racing the executor against the attempt timeout. Errors,
/// panics and timeouts all become a failed `TaskResult`.
async fn run_attempt(
    clock: &dyn Clock,
    executor: &dyn TaskExecutor,
    timeout: Duration,
) -> TaskResult {
    let started = Instant::now();
    let execution = AssertUnwindSafe(executor.execute_task()).catch_unwind();
    let mut result = tokio::select! {
        outcome = execution => match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => TaskResult::failure(e.to_string()).with_error(e.to_string()),
            Err(panic) => {
                let reason = format!("executor panicked: {}", panic_message(panic.as_ref()));
                error!(error = %reason, "attempt crashed");
                TaskResult::failure(reason.clone()).with_error(reason)
            }
        },
        _ = clock.sleep(timeout) => TaskResult::timed_out(timeout),
    };
    if result.execution_time.is_zero() {
        result.execution_time = started.elapsed();
    }
    debug!(
        success = result.success,
        execution_ms = result.execution_time.as_millis(),
        "attempt finished"
    );
    result
}

/// Resolves once shutdown has been requested or the loop is gone.
async fn shutdown_signalled(mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        let stopping = *shutdown_rx.borrow_and_update();
        if stopping || shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
