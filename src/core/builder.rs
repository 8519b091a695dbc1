//! Builder wiring for [`Supervisor`].

use std::sync::Arc;

use crate::config::Config;
use crate::core::pipe::Lifeline;
use crate::core::supervisor::Supervisor;
use crate::error::SupervisorError;
use crate::events::Bus;
use crate::services::ServiceRef;
use crate::signals;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`Supervisor`].
///
/// `build()` has side effects beyond allocation: it creates the liveness
/// pipe and installs process-wide signal disposition for SIGINT/SIGTERM/
/// SIGHUP. It must run inside a Tokio runtime (subscriber fan-out workers
/// are spawned here).
pub struct SupervisorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive pool lifecycle events (spawns, exits, shutdown)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor.
    ///
    /// Fails on invalid configuration or when the pipe / signal setup OS
    /// calls fail.
    pub fn build(self, service: ServiceRef) -> Result<Arc<Supervisor>, SupervisorError> {
        self.cfg.validate()?;

        let lifeline = Lifeline::new()?;
        signals::clear();
        signals::install_shutdown_handler()?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers));

        let sup = Arc::new(Supervisor::new_internal(
            self.cfg, service, bus, subs, lifeline,
        ));
        sup.spawn_subscriber_listener();
        Ok(sup)
    }
}
