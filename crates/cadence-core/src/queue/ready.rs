//! Priority queue of QUEUED tasks.
//!
//! Ordering: effective priority (highest first), then arrival sequence
//! (earliest first). An entry whose gate (`not_before`) is still in the
//! future is never selected. The gate carries both the caller's scheduled
//! time and retry delays.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{Priority, TaskId};
use crate::ports::clock::until;

#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub id: TaskId,
    pub priority: Priority,
    /// Arrival order; a requeued retry gets a fresh one.
    pub seq: u64,
    pub enqueued_at: DateTime<Utc>,
    pub not_before: Option<DateTime<Utc>>,
}

impl QueueEntry {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.not_before.is_none_or(|t| t <= now)
    }
}

pub struct ReadyQueue {
    entries: HashMap<TaskId, QueueEntry>,
    next_seq: u64,
    /// Priority boost: one level per interval waited. `None` disables it.
    boost_interval: Option<Duration>,
}

impl ReadyQueue {
    pub fn new(boost_interval: Option<Duration>) -> Self {
        Self {
            entries: HashMap::new(),
            next_seq: 0,
            boost_interval: boost_interval.filter(|d| !d.is_zero()),
        }
    }

    /// Insert a task. Returns `false` without touching the queue if the id
    /// is already queued.
    pub fn push(
        &mut self,
        id: TaskId,
        priority: Priority,
        not_before: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            id.clone(),
            QueueEntry {
                id,
                priority,
                seq,
                enqueued_at: now,
                not_before,
            },
        );
        true
    }

    pub fn remove(&mut self, id: &TaskId) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn effective_priority(&self, entry: &QueueEntry, now: DateTime<Utc>) -> Priority {
        let Some(interval) = self.boost_interval else {
            return entry.priority;
        };
        let waited = until(entry.enqueued_at, now);
        let steps = waited.as_nanos() / interval.as_nanos();
        entry
            .priority
            .boosted(u32::try_from(steps).unwrap_or(u32::MAX))
    }

    /// All entries in dispatch-preference order, gated ones included.
    pub fn ordered(&self, now: DateTime<Utc>) -> Vec<&QueueEntry> {
        let mut entries: Vec<(Priority, &QueueEntry)> = self
            .entries
            .values()
            .map(|e| (self.effective_priority(e, now), e))
            .collect();
        entries.sort_by(|(pa, a), (pb, b)| pb.cmp(pa).then_with(|| a.seq.cmp(&b.seq)));
        entries.into_iter().map(|(_, e)| e).collect()
    }

    /// The best due entry for which `eligible` holds.
    pub fn next_eligible<F>(&self, now: DateTime<Utc>, mut eligible: F) -> Option<TaskId>
    where
        F: FnMut(&TaskId) -> bool,
    {
        self.ordered(now)
            .into_iter()
            .filter(|e| e.is_due(now))
            .find(|e| eligible(&e.id))
            .map(|e| e.id.clone())
    }

    /// Earliest gate still in the future, if any.
    pub fn next_gate(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.entries
            .values()
            .filter_map(|e| e.not_before)
            .filter(|t| *t > now)
            .min()
    }
}
