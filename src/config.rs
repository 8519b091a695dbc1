//! # Global supervisor configuration.
//!
//! Provides [`Config`], the centralized settings for a supervisor instance.
//!
//! ## Sentinel values
//! - `workers = 0` → the pool is considered complete immediately; `wait()`
//!   returns without spawning anything.
//! - `bus_capacity` is clamped to a minimum of 1 by the event bus.
//!
//! The target worker count is immutable for the lifetime of a supervisor:
//! there is no runtime retarget, a pool is sized once at construction.

use std::time::Duration;

use crate::error::SupervisorError;

/// Configuration for a [`Supervisor`](crate::Supervisor).
///
/// ## Field semantics
/// - `workers`: target number of worker processes kept alive
/// - `interval`: one period used both as the reconciliation sleep **and** as
///   the spawn throttle between consecutive forks (a burst of forks without a
///   pause would stampede the OS)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by the bus)
#[derive(Clone, Debug)]
pub struct Config {
    /// Target number of worker processes.
    ///
    /// The reconciliation loop keeps `active + completed` at this value
    /// while the supervisor is running. Workers that exit with code 0 count
    /// as completed and are never respawned.
    pub workers: usize,

    /// Reconciliation period and spawn throttle.
    ///
    /// Must be non-zero: a zero interval would turn the reconciliation loop
    /// into a busy spin on `waitpid`.
    pub interval: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` events skip
    /// the oldest items.
    pub bus_capacity: usize,
}

impl Config {
    /// Validates the configuration at build time.
    ///
    /// A negative worker count is unrepresentable by construction; the one
    /// rejected value is a zero `interval`.
    pub fn validate(&self) -> Result<(), SupervisorError> {
        if self.interval.is_zero() {
            return Err(SupervisorError::InvalidConfig {
                reason: "interval must be non-zero".into(),
            });
        }
        Ok(())
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `workers = 1`
    /// - `interval = 10ms` (matches a comfortable fork throttle)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            workers: 1,
            interval: Duration::from_millis(10),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let cfg = Config {
            interval: Duration::ZERO,
            ..Config::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.as_label(), "supervisor_invalid_config");
    }

    #[test]
    fn zero_workers_is_allowed() {
        let cfg = Config {
            workers: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bus_capacity_clamps_to_one() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
