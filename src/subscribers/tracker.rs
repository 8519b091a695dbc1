//! # Pool-state tracker fed by lifecycle events.
//!
//! Maintains an event-driven view of which worker pids are currently active
//! and how many slots finished cleanly.
//!
//! ```text
//! Supervisor ──► Bus ──► subscriber listener ──► ProcessTracker::update()
//!                                                       │
//!                                                       ▼
//!                                         HashSet<pid> + completed count
//! ```
//!
//! ## Rules
//! - `WorkerSpawned` adds a pid to the active view.
//! - `WorkerCompleted` removes it and bumps the completed count.
//! - `WorkerExited` removes it (the slot will be respawned under a new pid).
//! - Read operations are **eventually consistent**: fan-out is asynchronous,
//!   the authoritative registries live in the supervisor.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event-driven view of the worker pool.
#[derive(Default)]
pub struct ProcessTracker {
    active: RwLock<HashSet<i32>>,
    completed: AtomicUsize,
}

impl ProcessTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event to the tracked state.
    pub fn update(&self, ev: &Event) {
        let Some(pid) = ev.pid else { return };
        match ev.kind {
            EventKind::WorkerSpawned => {
                self.active.write().unwrap_or_else(PoisonError::into_inner).insert(pid);
            }
            EventKind::WorkerCompleted => {
                self.active.write().unwrap_or_else(PoisonError::into_inner).remove(&pid);
                self.completed.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::WorkerExited => {
                self.active.write().unwrap_or_else(PoisonError::into_inner).remove(&pid);
            }
            _ => {}
        }
    }

    /// Returns a sorted snapshot of pids currently believed active.
    pub fn snapshot(&self) -> Vec<i32> {
        let mut pids: Vec<i32> = self
            .active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect();
        pids.sort_unstable();
        pids
    }

    /// Number of workers that finished their own work with code 0.
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Subscribe for ProcessTracker {
    async fn on_event(&self, event: &Event) {
        self.update(event);
    }

    fn name(&self) -> &'static str {
        "ProcessTracker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_then_complete_moves_state() {
        let tracker = ProcessTracker::new();
        tracker.update(&Event::now(EventKind::WorkerSpawned).with_pid(7));
        tracker.update(&Event::now(EventKind::WorkerSpawned).with_pid(9));
        assert_eq!(tracker.snapshot(), vec![7, 9]);

        tracker.update(&Event::now(EventKind::WorkerCompleted).with_pid(7));
        assert_eq!(tracker.snapshot(), vec![9]);
        assert_eq!(tracker.completed_count(), 1);
    }

    #[test]
    fn abnormal_exit_does_not_count_as_completed() {
        let tracker = ProcessTracker::new();
        tracker.update(&Event::now(EventKind::WorkerSpawned).with_pid(3));
        tracker.update(&Event::now(EventKind::WorkerExited).with_pid(3).with_code(1));
        assert!(tracker.snapshot().is_empty());
        assert_eq!(tracker.completed_count(), 0);
    }

    #[test]
    fn events_without_pid_are_ignored() {
        let tracker = ProcessTracker::new();
        tracker.update(&Event::now(EventKind::AllCompleted));
        assert!(tracker.snapshot().is_empty());
    }
}
