//! # procvisor
//!
//! **Procvisor** is a forking worker-process supervisor for Unix.
//!
//! A parent process maintains a fixed-size pool of worker OS processes, each
//! running one caller-supplied [`Service`]. Workers that exit abnormally are
//! restarted; workers that finish their own work (exit code 0) are retired
//! for good; the whole pool is torn down cleanly on a termination signal or
//! an explicit [`Supervisor::stop`]. Workers detect parent death through an
//! inherited pipe and never outlive the supervisor.
//!
//! ## Architecture
//! ```text
//!        ┌───────────────────────────────────────────────────────┐
//!        │  Supervisor (parent process)                          │
//!        │  - active / completed registries (pid → worker)       │
//!        │  - reconciliation loop: fork-if-needed / reap / sleep │
//!        │  - Bus ──► SubscriberSet (event fan-out)              │
//!        │  - lifeline pipe write end (held open, never written) │
//!        └──────┬──────────────────┬──────────────────┬──────────┘
//!          fork │             fork │             fork │
//!               ▼                  ▼                  ▼
//!        ┌────────────┐     ┌────────────┐     ┌────────────┐
//!        │  worker 1  │     │  worker 2  │     │  worker N  │
//!        │ Service::  │     │ Service::  │     │ Service::  │
//!        │   run()    │     │   run()    │     │   run()    │
//!        │ + watcher  │     │ + watcher  │     │ + watcher  │
//!        │   thread   │     │   thread   │     │   thread   │
//!        └────────────┘     └────────────┘     └────────────┘
//!          watcher: blocking read on the pipe read end;
//!          EOF ⇒ parent died ⇒ exit immediately
//! ```
//!
//! ### Lifecycle
//! ```text
//! Supervisor::wait()
//!
//! loop {
//!   ├─► while active+completed < workers: fork, throttle
//!   ├─► reap one exited child (WNOHANG)
//!   │      ├─ exit 0 ─► completed (never respawned)
//!   │      └─ other  ─► dropped, slot refilled next pass
//!   ├─► all slots completed? ─► done
//!   └─► sleep(interval)
//! }
//! exit conditions: shutdown signal caught, stop() called, pool completed
//! on exit: stop() — SIGTERM the stragglers once, reap until empty
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                  |
//! |-------------------|--------------------------------------------------------------|-------------------------------------|
//! | **Worker contract** | Define the unit of work a worker process runs.             | [`Service`], [`ServiceFn`], [`ServiceRef`] |
//! | **Supervision**   | Keep the pool at target, restart crashes, drain on shutdown. | [`Supervisor`], [`Config`]          |
//! | **Subscriber API**| Hook into pool lifecycle events (logging, tracking, custom). | [`Subscribe`], [`SubscriberSet`]    |
//! | **Signals**       | SIGINT/SIGTERM/SIGHUP → one shutdown flag, name lookup.      | [`signals`]                         |
//! | **Errors**        | Typed errors for the runtime and for services.               | [`SupervisorError`], [`ServiceError`] |
//!
//! ## Example
//! ```no_run
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use procvisor::{Config, LogWriter, ServiceError, ServiceFn, Subscribe, Supervisor};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         workers: 4,
//!         interval: Duration::from_millis(10),
//!         ..Config::default()
//!     };
//!
//!     // Each worker process runs its own copy of this service after fork.
//!     let service = ServiceFn::arc("http-worker", |ctx: CancellationToken| async move {
//!         while !ctx.is_cancelled() {
//!             // serve requests...
//!             tokio::time::sleep(Duration::from_millis(250)).await;
//!         }
//!         Ok::<_, ServiceError>(())
//!     });
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let sup = Supervisor::builder(cfg).with_subscribers(subs).build(service)?;
//!
//!     // Runs until SIGINT/SIGTERM/SIGHUP, sup.stop(), or pool completion.
//!     sup.wait().await?;
//!     Ok(())
//! }
//! ```

#[cfg(not(unix))]
compile_error!("procvisor requires a Unix platform: it is built on fork(2), pipes and POSIX signals");

mod config;
mod core;
mod error;
mod events;
mod services;
mod subscribers;

pub mod signals;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{Supervisor, SupervisorBuilder};
pub use error::{ServiceError, SupervisorError};
pub use events::{Bus, Event, EventKind};
pub use services::{Service, ServiceFn, ServiceRef};
pub use subscribers::{LogWriter, ProcessTracker, Subscribe, SubscriberSet};
