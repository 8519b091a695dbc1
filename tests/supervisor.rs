//! End-to-end pool scenarios: forked workers, restarts, graceful shutdown.
//!
//! These tests fork real child processes and share process-wide state
//! (signal disposition, `waitpid(-1)`), so they are serialized through one
//! mutex and run on current-thread runtimes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use procvisor::{
    Config, Event, EventKind, ProcessTracker, ServiceError, ServiceFn, Subscribe, Supervisor,
};

fn serial() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn test_config(workers: usize) -> Config {
    Config {
        workers,
        interval: Duration::from_millis(5),
        ..Config::default()
    }
}

/// Counts spawn events; enough to detect respawns.
#[derive(Default)]
struct SpawnCounter(AtomicUsize);

impl SpawnCounter {
    fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Subscribe for SpawnCounter {
    async fn on_event(&self, ev: &Event) {
        if ev.kind == EventKind::WorkerSpawned {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn name(&self) -> &'static str {
        "SpawnCounter"
    }
}

/// Records the signal name of every abnormal exit.
#[derive(Default)]
struct ExitRecorder(Mutex<Vec<Option<&'static str>>>);

impl ExitRecorder {
    fn signals(&self) -> Vec<Option<&'static str>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Subscribe for ExitRecorder {
    async fn on_event(&self, ev: &Event) {
        if ev.kind == EventKind::WorkerExited {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(ev.signal);
        }
    }

    fn name(&self) -> &'static str {
        "ExitRecorder"
    }
}

#[tokio::test(flavor = "current_thread")]
async fn zero_workers_completes_on_its_own() {
    let _guard = serial();

    let service = ServiceFn::arc("noop", |_ctx: CancellationToken| async { Ok::<_, ServiceError>(()) });
    let sup = Supervisor::builder(test_config(0)).build(service).unwrap();

    sup.wait().await.unwrap();
    assert_eq!(sup.active_count(), 0);
    assert_eq!(sup.completed_count(), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn one_shot_worker_completes_without_respawn() {
    let _guard = serial();

    let counter = Arc::new(SpawnCounter::default());
    let service = ServiceFn::arc("oneshot", |_ctx: CancellationToken| async { Ok::<_, ServiceError>(()) });
    let sup = Supervisor::builder(test_config(1))
        .with_subscribers(vec![counter.clone()])
        .build(service)
        .unwrap();

    sup.wait().await.unwrap();

    assert_eq!(sup.completed_count(), 1);
    assert_eq!(sup.active_count(), 0);

    // Fan-out is asynchronous; give the subscriber worker a moment.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(counter.count(), 1, "a clean exit must never be respawned");
}

#[tokio::test(flavor = "current_thread")]
async fn pool_of_short_lived_workers_spawns_each_slot_once() {
    let _guard = serial();

    let counter = Arc::new(SpawnCounter::default());
    let service = ServiceFn::arc("short", |_ctx: CancellationToken| async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, ServiceError>(())
    });
    let sup = Supervisor::builder(test_config(2))
        .with_subscribers(vec![counter.clone()])
        .build(service)
        .unwrap();

    sup.wait().await.unwrap();

    assert_eq!(sup.completed_count(), 2);
    assert_eq!(sup.active_count(), 0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(counter.count(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn crashed_worker_is_respawned() {
    let _guard = serial();

    let counter = Arc::new(SpawnCounter::default());
    let service = ServiceFn::arc("crasher", |_ctx: CancellationToken| async {
        Err::<(), _>(ServiceError::Fail {
            error: "boom".into(),
        })
    });
    let sup = Supervisor::builder(test_config(1))
        .with_subscribers(vec![counter.clone()])
        .build(service)
        .unwrap();

    let waiter = tokio::spawn({
        let sup = Arc::clone(&sup);
        async move { sup.wait().await }
    });

    tokio::time::sleep(Duration::from_millis(400)).await;
    sup.stop().await.unwrap();
    waiter.await.unwrap().unwrap();

    assert_eq!(sup.completed_count(), 0, "a crash must never count as completed");
    assert_eq!(sup.active_count(), 0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(
        counter.count() >= 2,
        "expected at least one respawn, saw {} spawn(s)",
        counter.count()
    );
}

#[tokio::test(flavor = "current_thread")]
async fn signal_killed_worker_is_respawned() {
    let _guard = serial();

    let counter = Arc::new(SpawnCounter::default());
    let exits = Arc::new(ExitRecorder::default());
    let tracker = Arc::new(ProcessTracker::new());
    let service = ServiceFn::arc("forever", |ctx: CancellationToken| async move {
        ctx.cancelled().await;
        Ok::<_, ServiceError>(())
    });
    let sup = Supervisor::builder(test_config(1))
        .with_subscribers(vec![counter.clone(), exits.clone(), tracker.clone()])
        .build(service)
        .unwrap();

    let waiter = tokio::spawn({
        let sup = Arc::clone(&sup);
        async move { sup.wait().await }
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    let pids = tracker.snapshot();
    assert_eq!(pids.len(), 1, "pool did not reach target before the kill");
    nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(pids[0]),
        nix::sys::signal::Signal::SIGKILL,
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    sup.stop().await.unwrap();
    waiter.await.unwrap().unwrap();

    assert_eq!(sup.completed_count(), 0, "a killed worker is not a completion");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(
        counter.count() >= 2,
        "killed worker was not respawned, saw {} spawn(s)",
        counter.count()
    );
    assert!(
        exits.signals().contains(&Some("SIGKILL")),
        "no exit event carried the terminating signal"
    );
}

#[tokio::test(flavor = "current_thread")]
async fn external_stop_drains_a_long_running_pool() {
    let _guard = serial();

    let tracker = Arc::new(ProcessTracker::new());
    let service = ServiceFn::arc("forever", |ctx: CancellationToken| async move {
        ctx.cancelled().await;
        Ok::<_, ServiceError>(())
    });
    let sup = Supervisor::builder(test_config(4))
        .with_subscribers(vec![tracker.clone()])
        .build(service)
        .unwrap();

    let waiter = tokio::spawn({
        let sup = Arc::clone(&sup);
        async move { sup.wait().await }
    });

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(sup.active_count(), 4, "pool did not reach target before stop");

    sup.stop().await.unwrap();
    waiter.await.unwrap().unwrap();

    assert!(!sup.is_running());
    assert_eq!(sup.active_count(), 0);
    assert_eq!(sup.completed_count(), 0, "terminated workers are not completions");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(tracker.snapshot().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn sigterm_to_the_supervisor_drains_the_pool() {
    let _guard = serial();

    let service = ServiceFn::arc("forever", |ctx: CancellationToken| async move {
        ctx.cancelled().await;
        Ok::<_, ServiceError>(())
    });
    let sup = Supervisor::builder(test_config(2)).build(service).unwrap();

    tokio::spawn(async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        // The builder installed the shutdown handler; this lands on our own
        // process and is recorded, not fatal.
        nix::sys::signal::kill(nix::unistd::Pid::this(), nix::sys::signal::Signal::SIGTERM)
            .unwrap();
    });

    sup.wait().await.unwrap();

    assert!(!sup.is_running());
    assert_eq!(sup.active_count(), 0);
    assert_eq!(
        procvisor::signals::pending(),
        Some(nix::sys::signal::Signal::SIGTERM)
    );
}

#[tokio::test(flavor = "current_thread")]
async fn stop_is_idempotent() {
    let _guard = serial();

    let service = ServiceFn::arc("noop", |_ctx: CancellationToken| async { Ok::<_, ServiceError>(()) });
    let sup = Supervisor::builder(test_config(0)).build(service).unwrap();

    sup.stop().await.unwrap();
    sup.stop().await.unwrap();
    assert!(!sup.is_running());
}
