//! Error types used by the supervisor runtime and worker services.
//!
//! Two enums cover the two sides of the process boundary:
//!
//! - [`SupervisorError`] — errors raised in the parent process by the
//!   orchestration runtime itself (bad configuration, fatal OS calls).
//! - [`ServiceError`] — errors raised by a [`Service`](crate::Service)
//!   running inside a worker process.
//!
//! Transient OS conditions are deliberately **not** represented here:
//! `ECHILD`/`EINTR` during child reaping and `ESRCH` while signalling an
//! already-gone worker are swallowed at the call site and retried or ignored.

use nix::errno::Errno;
use thiserror::Error;

/// # Errors produced by the supervisor runtime.
///
/// These represent failures of the orchestration system in the parent
/// process. Any OS error that is not a known-benign race is fatal and
/// propagated to the caller of `wait()`/`stop()`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The supplied [`Config`](crate::Config) is unusable.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What exactly was rejected.
        reason: String,
    },

    /// An OS call failed in a way the supervisor cannot recover from.
    #[error("{op} failed: {errno}")]
    Os {
        /// The failing call, e.g. `"fork"`, `"waitpid"`, `"kill"`.
        op: &'static str,
        /// The underlying errno.
        #[source]
        errno: Errno,
    },
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::InvalidConfig { .. } => "supervisor_invalid_config",
            SupervisorError::Os { .. } => "supervisor_os_error",
        }
    }

    pub(crate) fn os(op: &'static str, errno: Errno) -> Self {
        SupervisorError::Os { op, errno }
    }
}

/// # Errors produced by a worker service.
///
/// Returned from [`Service::run`](crate::Service::run) or
/// [`Service::stop`](crate::Service::stop). Any error from `run()` makes the
/// worker process exit non-zero, which the parent observes as an abnormal
/// exit subject to respawn.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The service's own work failed.
    #[error("service failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The service observed a stop request and unwound early.
    #[error("service canceled")]
    Canceled,
}

impl ServiceError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Fail { .. } => "service_failed",
            ServiceError::Canceled => "service_canceled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let err = SupervisorError::InvalidConfig {
            reason: "workers".into(),
        };
        assert_eq!(err.as_label(), "supervisor_invalid_config");
        assert_eq!(
            SupervisorError::os("fork", Errno::EAGAIN).as_label(),
            "supervisor_os_error"
        );
        assert_eq!(ServiceError::Canceled.as_label(), "service_canceled");
    }

    #[test]
    fn os_error_names_the_call() {
        let err = SupervisorError::os("waitpid", Errno::EPERM);
        assert!(err.to_string().starts_with("waitpid failed"));
    }
}
