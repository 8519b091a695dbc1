//! # WorkerProcess: one forked OS process running one service.
//!
//! The wrapper owns everything that happens at the process boundary:
//! forking, wiring the inherited liveness pipe, child-side signal handling,
//! and translating the service's outcome into an exit code.
//!
//! ## Child lifecycle
//! ```text
//! fork()
//!   │ parent: record pid, return immediately
//!   ▼ child:
//!   ├─► close inherited pipe write end (only the parent keeps it alive)
//!   ├─► reinstall shutdown handler (keeps a flag already recorded by the
//!   │     inherited handler; set only when the pool is already draining)
//!   ├─► spawn watcher thread: blocking read on pipe read end
//!   │        EOF ─► "parent died" ─► exit(1)
//!   ├─► spawn worker thread with a NEW current-thread runtime
//!   │     (the parent's scheduler and its event fd are not fork-safe)
//!   │        select! {
//!   │          service.run() ─► Ok  ─► exit(0)
//!   │                        ─► Err ─► log, exit(1)
//!   │          shutdown flag ─► log signal, service.stop(), exit(1)
//!   │        }
//!   └─► process::exit(code)  (never returns to the parent's executor)
//! ```
//!
//! ## Exit-code contract
//! - `0`: the service finished its own work; the supervisor marks the slot
//!   completed and never respawns it.
//! - non-zero (or death by signal): abnormal; the slot is respawned while
//!   the supervisor is running and the target is not met. A failing `run()`
//!   is logged and exits non-zero, never silently reported as success.

use std::fs::File;
use std::io::Read;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::process;
use std::sync::Arc;
use std::thread;

use nix::unistd::{ForkResult, Pid, fork};

use crate::error::SupervisorError;
use crate::services::ServiceRef;
use crate::signals;

/// The service finished on purpose.
pub(crate) const WORKER_EXIT_OK: i32 = 0;
/// Any abnormal ending: run() error, caught signal, orphaned, internal fault.
pub(crate) const WORKER_EXIT_ABNORMAL: i32 = 1;

/// One spawned worker process.
///
/// Created by the supervisor when the pool grows; dropped when the exit
/// status is reaped. Holds the service reference and the pipe descriptors
/// the child was given at spawn time.
pub(crate) struct WorkerProcess {
    service: ServiceRef,
    lifeline_read: RawFd,
    lifeline_write: RawFd,
}

impl WorkerProcess {
    pub(crate) fn new(service: ServiceRef, lifeline_read: RawFd, lifeline_write: RawFd) -> Self {
        Self {
            service,
            lifeline_read,
            lifeline_write,
        }
    }

    /// Forks the worker.
    ///
    /// In the parent this returns the child's pid immediately. The child
    /// never returns from here: it runs the service and exits the process.
    ///
    /// # Safety notes
    /// `fork` duplicates only the calling thread. The child must not touch
    /// the parent's async runtime, which is why the service runs on a fresh
    /// OS thread with its own scheduler.
    pub(crate) fn start(&self) -> Result<Pid, SupervisorError> {
        match unsafe { fork() }.map_err(|errno| SupervisorError::os("fork", errno))? {
            ForkResult::Parent { child } => Ok(child),
            ForkResult::Child => self.child_main(),
        }
    }

    /// Entry point of the freshly forked child. Never returns.
    fn child_main(&self) -> ! {
        // Our copy of the write end must not keep the pipe alive; from here
        // on only the parent holds one. The parent's Lifeline struct also
        // "owns" this fd in our copied memory, but the child exits through
        // process::exit and never runs that destructor.
        drop(unsafe { OwnedFd::from_raw_fd(self.lifeline_write) });

        // Re-arm our own restore-default-on-first-catch handler. The
        // inherited flag is deliberately NOT cleared: a signal landing
        // between the fork and this install was recorded by the inherited
        // handler, and wiping it would strand a worker its parent already
        // believes it signalled. A nonzero inherited flag only happens
        // while the pool is draining, where a prompt exit is the right
        // outcome anyway.
        if let Err(e) = signals::install_shutdown_handler() {
            tracing::error!(error = %e, "worker could not install signal handler");
            process::exit(WORKER_EXIT_ABNORMAL);
        }

        let read_fd = self.lifeline_read;
        let watcher = thread::Builder::new()
            .name("lifeline-watcher".into())
            .spawn(move || {
                wait_for_eof(read_fd);
                tracing::warn!("parent process died unexpectedly, worker exiting");
                process::exit(WORKER_EXIT_ABNORMAL);
            });
        if watcher.is_err() {
            tracing::error!("worker could not spawn lifeline watcher");
            process::exit(WORKER_EXIT_ABNORMAL);
        }

        // The service runs on a new thread with a new current-thread runtime:
        // the parent's runtime (and its epoll fd) is shared memory after the
        // fork and must not be reused.
        let service = Arc::clone(&self.service);
        let worker = thread::Builder::new()
            .name("worker".into())
            .spawn(move || worker_main(service));

        let code = match worker.map(|h| h.join()) {
            Ok(Ok(code)) => code,
            Ok(Err(_panic)) => {
                tracing::error!("worker thread panicked");
                WORKER_EXIT_ABNORMAL
            }
            Err(e) => {
                tracing::error!(error = %e, "worker could not spawn service thread");
                WORKER_EXIT_ABNORMAL
            }
        };
        process::exit(code)
    }
}

/// Runs the service to completion on a private scheduler and maps the
/// outcome to an exit code.
fn worker_main(service: ServiceRef) -> i32 {
    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "worker could not build runtime");
            return WORKER_EXIT_ABNORMAL;
        }
    };

    rt.block_on(async move {
        tokio::select! {
            res = service.run() => match res {
                Ok(()) => WORKER_EXIT_OK,
                Err(e) => {
                    tracing::error!(service = service.name(), error = %e, "service run failed");
                    WORKER_EXIT_ABNORMAL
                }
            },
            sig = signals::wait_for_shutdown() => {
                tracing::info!(service = service.name(), signal = sig.as_str(), "worker caught signal");
                if let Err(e) = service.stop().await {
                    tracing::error!(service = service.name(), error = %e, "service raised while stopping");
                }
                WORKER_EXIT_ABNORMAL
            }
        }
    })
}

/// Blocks until the fd reaches end-of-stream.
///
/// Takes ownership of `fd`. Nothing is ever written into the lifeline, so a
/// successful read is a stray byte to tolerate; EOF means the last write end
/// (the parent's) is gone. Read errors other than EINTR are treated the same
/// way — either way there is no parent left to watch.
fn wait_for_eof(fd: RawFd) {
    let mut pipe = unsafe { File::from_raw_fd(fd) };
    let mut buf = [0u8; 1];
    loop {
        match pipe.read(&mut buf) {
            Ok(0) => return,
            Ok(_) => continue,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::IntoRawFd;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn eof_wait_unblocks_when_write_end_closes() {
        let (read, write) = nix::unistd::pipe().unwrap();
        let read_fd = read.into_raw_fd();

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            wait_for_eof(read_fd);
            let _ = tx.send(());
        });

        // Watcher must still be blocked while the write end is open.
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        drop(write);
        rx.recv_timeout(Duration::from_secs(2))
            .expect("watcher did not observe EOF after write end closed");
    }

    #[test]
    fn eof_wait_tolerates_stray_bytes() {
        let (read, write) = nix::unistd::pipe().unwrap();
        let read_fd = read.into_raw_fd();

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            wait_for_eof(read_fd);
            let _ = tx.send(());
        });

        nix::unistd::write(&write, b"x").unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        drop(write);
        rx.recv_timeout(Duration::from_secs(2))
            .expect("watcher did not observe EOF");
    }
}
