//! # LogWriter — simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [spawned] pid=4711
//! [exited] pid=4711 code=1
//! [exited] pid=4712 signal=SIGKILL
//! [completed] pid=4713
//! [shutdown-requested] signal=SIGTERM
//! [draining] pids=4714, 4715
//! [all-completed]
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested] signal={}", e.signal.unwrap_or("UNKNOWN"));
            }
            EventKind::WorkerSpawned => {
                println!("[spawned] pid={}", e.pid.unwrap_or(-1));
            }
            EventKind::WorkerCompleted => {
                println!("[completed] pid={}", e.pid.unwrap_or(-1));
            }
            EventKind::WorkerExited => match e.signal {
                Some(sig) => println!("[exited] pid={} signal={sig}", e.pid.unwrap_or(-1)),
                None => println!(
                    "[exited] pid={} code={}",
                    e.pid.unwrap_or(-1),
                    e.code.unwrap_or(-1)
                ),
            },
            EventKind::Draining => {
                println!("[draining] pids={}", e.reason.as_deref().unwrap_or(""));
            }
            EventKind::AllCompleted => {
                println!("[all-completed]");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
