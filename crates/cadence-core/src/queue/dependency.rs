//! Dependency resolver.
//!
//! Design:
//! - Forward edges: task -> unresolved tasks it waits for
//! - Reverse edges: task -> tasks waiting for it
//! - Invariant: edges and reverse_edges are kept in sync
//! - Resolutions (completed / failed / cancelled) are kept for the lifetime
//!   of the scheduler; `clear_history` does not touch them.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::domain::{SchedulerError, TaskId, TaskStatus};

/// Final outcome of a task as far as its dependents are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    Completed,
    Failed,
    Cancelled,
}

impl Resolution {
    pub fn is_success(self) -> bool {
        matches!(self, Resolution::Completed)
    }
}

impl From<Resolution> for TaskStatus {
    fn from(r: Resolution) -> Self {
        match r {
            Resolution::Completed => TaskStatus::Completed,
            Resolution::Failed => TaskStatus::Failed,
            Resolution::Cancelled => TaskStatus::Cancelled,
        }
    }
}

#[derive(Default)]
pub struct DependencyResolver {
    /// Forward edges: task -> tasks it depends on (waits for)
    edges: HashMap<TaskId, HashSet<TaskId>>,

    /// Reverse edges: task -> tasks that depend on it
    reverse_edges: HashMap<TaskId, HashSet<TaskId>>,

    resolved: HashMap<TaskId, Resolution>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the dependencies of a newly submitted task.
    ///
    /// Dependencies that are already resolved get no edge; the caller checks
    /// [`is_blocked`](Self::is_blocked) for failed ones. If the new edges
    /// would close a cycle the graph is left untouched and the cycle is
    /// returned as an error.
    pub fn register(&mut self, task: &TaskId, deps: &[TaskId]) -> Result<(), SchedulerError> {
        let pending: Vec<&TaskId> = deps
            .iter()
            .filter(|d| !self.resolved.contains_key(*d))
            .collect();
        for dep in &pending {
            self.add_dependency(task.clone(), (*dep).clone());
        }
        if let Some(cycle) = self.cycle_through(task) {
            for dep in pending {
                self.remove_dependency(task, dep);
            }
            return Err(SchedulerError::DependencyCycle(cycle));
        }
        Ok(())
    }

    /// Add a dependency: `task` depends on `depends_on`.
    fn add_dependency(&mut self, task: TaskId, depends_on: TaskId) {
        self.edges
            .entry(task.clone())
            .or_default()
            .insert(depends_on.clone());
        self.reverse_edges.entry(depends_on).or_default().insert(task);
    }

    /// Remove a dependency: `task` no longer depends on `depends_on`.
    fn remove_dependency(&mut self, task: &TaskId, depends_on: &TaskId) {
        if let Entry::Occupied(mut e) = self.edges.entry(task.clone()) {
            e.get_mut().remove(depends_on);
            if e.get().is_empty() {
                e.remove_entry();
            }
        }
        if let Entry::Occupied(mut e) = self.reverse_edges.entry(depends_on.clone()) {
            e.get_mut().remove(task);
            if e.get().is_empty() {
                e.remove_entry();
            }
        }
    }

    /// Record the final outcome of `task` and return the tasks that were
    /// waiting for it. The caller re-checks them: a completion may make them
    /// eligible, a failure or cancellation cascades.
    pub fn resolve(&mut self, task: &TaskId, resolution: Resolution) -> Vec<TaskId> {
        self.resolved.insert(task.clone(), resolution);

        // A resolved task no longer waits for anything.
        if let Some(deps) = self.edges.get(task).cloned() {
            for dep in deps {
                self.remove_dependency(task, &dep);
            }
        }

        let mut waiting: Vec<TaskId> = self
            .reverse_edges
            .remove(task)
            .map(|w| w.into_iter().collect())
            .unwrap_or_default();
        for w in &waiting {
            if let Entry::Occupied(mut e) = self.edges.entry(w.clone()) {
                e.get_mut().remove(task);
                if e.get().is_empty() {
                    e.remove_entry();
                }
            }
        }
        waiting.sort();
        waiting
    }

    /// Every dependency has completed.
    pub fn is_eligible(&self, deps: &[TaskId]) -> bool {
        deps.iter()
            .all(|d| self.resolved.get(d).is_some_and(|r| r.is_success()))
    }

    /// First dependency that failed or was cancelled, if any.
    pub fn blocking_dependency<'a>(&self, deps: &'a [TaskId]) -> Option<&'a TaskId> {
        deps.iter()
            .find(|d| self.resolved.get(*d).is_some_and(|r| !r.is_success()))
    }

    pub fn resolution(&self, task: &TaskId) -> Option<Resolution> {
        self.resolved.get(task).copied()
    }

    /// Dependencies of `task` that are still unresolved.
    pub fn pending_dependencies(&self, task: &TaskId) -> Vec<TaskId> {
        let mut deps: Vec<TaskId> = self
            .edges
            .get(task)
            .map(|d| d.iter().cloned().collect())
            .unwrap_or_default();
        deps.sort();
        deps
    }

    /// Find a cycle that passes through `start`, following forward edges.
    ///
    /// The graph is acyclic before each registration, so any new cycle must
    /// contain the task being registered. Iterative DFS with white/gray/black
    /// colouring; the returned path starts and ends with `start`.
    fn cycle_through(&self, start: &TaskId) -> Option<Vec<TaskId>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            Gray,
            Black,
        }

        let mut color: HashMap<&TaskId, Color> = HashMap::new();
        let mut path: Vec<&TaskId> = vec![start];
        let mut stack: Vec<std::vec::IntoIter<&TaskId>> = vec![self.sorted_deps(start)];
        color.insert(start, Color::Gray);

        while let Some(children) = stack.last_mut() {
            match children.next() {
                Some(next) if next == start => {
                    let mut cycle: Vec<TaskId> = path.iter().map(|id| (*id).clone()).collect();
                    cycle.push(start.clone());
                    return Some(cycle);
                }
                Some(next) => {
                    if color.contains_key(next) {
                        continue;
                    }
                    color.insert(next, Color::Gray);
                    path.push(next);
                    stack.push(self.sorted_deps(next));
                }
                None => {
                    stack.pop();
                    if let Some(done) = path.pop() {
                        color.insert(done, Color::Black);
                    }
                }
            }
        }
        None
    }

    fn sorted_deps(&self, task: &TaskId) -> std::vec::IntoIter<&TaskId> {
        let mut deps: Vec<&TaskId> = self
            .edges
            .get(task)
            .map(|d| d.iter().collect())
            .unwrap_or_default();
        deps.sort();
        deps.into_iter()
    }
}
