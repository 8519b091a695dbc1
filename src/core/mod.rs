//! Runtime core: process orchestration and lifecycle.
//!
//! The public API from this module is [`Supervisor`] (plus its builder);
//! everything at the process boundary stays internal:
//! - [`supervisor`]: reconciliation loop, registries, graceful shutdown;
//! - [`worker`]: fork + child-side wiring (pipe watcher, signals, exit codes);
//! - [`pipe`]: the liveness pipe shared between parent and workers;
//! - [`builder`]: construction and observability wiring.

mod builder;
mod pipe;
mod supervisor;
mod worker;

pub use builder::SupervisorBuilder;
pub use supervisor::Supervisor;
