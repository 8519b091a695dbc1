//! # Lifecycle events emitted by the supervisor.
//!
//! The [`EventKind`] enum classifies what happened to the pool; the
//! [`Event`] struct carries the metadata (pid, exit code, signal name).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of supervisor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The parent caught a termination signal; the pool is shutting down.
    ///
    /// Sets:
    /// - `signal`: name of the caught signal
    ShutdownRequested,

    /// A worker process was forked and registered as active.
    ///
    /// Sets:
    /// - `pid`: the new worker's process id
    WorkerSpawned,

    /// A worker exited with code 0; it is done and will never be respawned.
    ///
    /// Sets:
    /// - `pid`: the worker's process id
    WorkerCompleted,

    /// A worker exited abnormally (non-zero code or killed by a signal).
    ///
    /// It is dropped from the active set; reconciliation respawns the slot
    /// while the supervisor is running and the target is not met.
    ///
    /// Sets:
    /// - `pid`: the worker's process id
    /// - `code`: exit code (absent when signal-terminated)
    /// - `signal`: terminating signal name (absent on plain exit)
    WorkerExited,

    /// `stop()` signalled the remaining workers and is waiting them out.
    ///
    /// Sets:
    /// - `reason`: comma-separated list of pids still active
    Draining,

    /// Every slot of the pool finished its own work with code 0.
    AllCompleted,
}

/// Supervisor event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Worker process id, if applicable.
    pub pid: Option<i32>,
    /// Worker exit code, if applicable.
    pub code: Option<i32>,
    /// Signal name (caught by the parent or fatal to a worker).
    pub signal: Option<&'static str>,
    /// Human-readable detail (pid lists, error messages).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            pid: None,
            code: None,
            signal: None,
            reason: None,
        }
    }

    /// Attaches a worker pid.
    #[inline]
    pub fn with_pid(mut self, pid: i32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches an exit code.
    #[inline]
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    /// Attaches a signal name.
    #[inline]
    pub fn with_signal(mut self, signal: &'static str) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Attaches a human-readable detail.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_fields() {
        let ev = Event::now(EventKind::WorkerExited)
            .with_pid(42)
            .with_code(1)
            .with_signal("SIGTERM");
        assert_eq!(ev.kind, EventKind::WorkerExited);
        assert_eq!(ev.pid, Some(42));
        assert_eq!(ev.code, Some(1));
        assert_eq!(ev.signal, Some("SIGTERM"));
        assert!(ev.reason.is_none());
    }

    #[test]
    fn seq_is_monotonic() {
        let a = Event::now(EventKind::WorkerSpawned);
        let b = Event::now(EventKind::WorkerSpawned);
        assert!(b.seq > a.seq);
    }
}
