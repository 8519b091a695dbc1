//! # Worker contract.
//!
//! [`Service`] is the interface a caller-supplied unit of work must satisfy
//! to be run inside worker processes. The common handle type is
//! [`ServiceRef`], an `Arc<dyn Service>` suitable for sharing.
//!
//! The parent holds one instance and shares it by reference across all
//! spawned workers; after a fork each worker process continues with its own
//! copy-on-write copy of that instance.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ServiceError;

/// Shared handle to a [`Service`].
pub type ServiceRef = Arc<dyn Service>;

/// # A unit of work run by one worker process.
///
/// `run()` blocks (asynchronously) until the work this process exists to do
/// is finished, or until [`stop`](Service::stop) has been invoked and the
/// work honors it. `stop()` requests cooperative termination and must not
/// block indefinitely.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use procvisor::{Service, ServiceError};
///
/// struct Demo {
///     cancel: CancellationToken,
/// }
///
/// #[async_trait]
/// impl Service for Demo {
///     fn name(&self) -> &str { "demo" }
///
///     async fn run(&self) -> Result<(), ServiceError> {
///         self.cancel.cancelled().await;
///         Ok(())
///     }
///
///     async fn stop(&self) -> Result<(), ServiceError> {
///         self.cancel.cancel();
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Returns a stable, human-readable service name.
    fn name(&self) -> &str;

    /// Executes the work until completion or until a stop request is honored.
    ///
    /// Returning `Ok(())` makes the worker process exit with code 0, which
    /// the supervisor treats as "done, never respawn". Any `Err` makes the
    /// process exit non-zero and the slot is respawned.
    async fn run(&self) -> Result<(), ServiceError>;

    /// Requests cooperative termination of a running [`run`](Service::run).
    async fn stop(&self) -> Result<(), ServiceError>;
}
