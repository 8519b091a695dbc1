//! # Function-backed service (`ServiceFn`)
//!
//! [`ServiceFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing
//! a fresh future per `run()`. The token is cancelled by `stop()`, so a
//! closure that awaits `ctx.cancelled()` gets the cooperative-termination
//! contract for free.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use procvisor::{ServiceFn, ServiceRef, ServiceError};
//!
//! let s: ServiceRef = ServiceFn::arc("worker", |ctx: CancellationToken| async move {
//!     if ctx.is_cancelled() {
//!         return Ok(());
//!     }
//!     // do work...
//!     Ok::<_, ServiceError>(())
//! });
//!
//! assert_eq!(s.name(), "worker");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::services::service::Service;

/// Function-backed service implementation.
///
/// Wraps a closure that *creates* a new future per `run()`; shared state, if
/// needed, goes into an explicit `Arc` inside the closure.
pub struct ServiceFn<F> {
    name: Cow<'static, str>,
    cancel: CancellationToken,
    f: F,
}

impl<F> ServiceFn<F> {
    /// Creates a new function-backed service.
    ///
    /// Prefer [`ServiceFn::arc`] when you immediately need a [`ServiceRef`](crate::ServiceRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            cancel: CancellationToken::new(),
            f,
        }
    }

    /// Creates the service and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Service for ServiceFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<(), ServiceError> {
        (self.f)(self.cancel.clone()).await
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        self.cancel.cancel();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_cancels_the_run_token() {
        let svc = ServiceFn::arc("ticker", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(ServiceError::Canceled)
        });

        let runner = tokio::spawn({
            let svc = Arc::clone(&svc);
            async move { svc.run().await }
        });
        svc.stop().await.unwrap();

        let res = runner.await.unwrap();
        assert!(matches!(res, Err(ServiceError::Canceled)));
    }

    #[tokio::test]
    async fn run_returns_closure_result() {
        let svc =
            ServiceFn::new("oneshot", |_ctx: CancellationToken| async { Ok::<_, ServiceError>(()) });
        assert!(svc.run().await.is_ok());
        assert_eq!(svc.name(), "oneshot");
    }
}
