//! # Signal translation: OS termination signals → one shutdown flag.
//!
//! All process-wide signal disposition lives here, with an explicit
//! install / restore-to-default lifecycle. SIGINT, SIGTERM and SIGHUP are
//! mapped to a single logical "shutdown requested" event; every other signal
//! keeps its default OS behavior.
//!
//! ## How it works
//! The installed handler does exactly two async-signal-safe things: it stores
//! the signal number in a process-wide atomic and re-arms the **default**
//! disposition for all three signals. Re-arming means a second identical
//! signal is not intercepted and can force-kill the process — deliberate, so
//! a hung shutdown never leaves an unkillable supervisor.
//!
//! Nothing else happens in handler context. The reconciliation loop (parent)
//! and the worker entry point (child) observe [`pending`] cooperatively, in
//! their own time.

use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use nix::libc::c_int;
use nix::sys::signal::{self, SigHandler, Signal};

use crate::error::SupervisorError;

/// Signals translated into the shutdown flag.
pub(crate) const SHUTDOWN_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP];

/// Last caught shutdown signal number; 0 = none.
static SHUTDOWN_SIGNO: AtomicI32 = AtomicI32::new(0);

/// How often async observers poll the flag.
const POLL: Duration = Duration::from_millis(10);

extern "C" fn record_shutdown(signo: c_int) {
    SHUTDOWN_SIGNO.store(signo, Ordering::SeqCst);
    // Re-arm default disposition right away; a repeated signal must be able
    // to kill the process even if shutdown hangs.
    unsafe {
        let _ = install(SigHandler::SigDfl);
    }
}

/// Installs `handler` for all shutdown signals.
///
/// # Safety
/// Replaces process-wide signal disposition; `handler` must be
/// async-signal-safe.
unsafe fn install(handler: SigHandler) -> nix::Result<()> {
    for sig in SHUTDOWN_SIGNALS {
        signal::signal(sig, handler)?;
    }
    Ok(())
}

/// Installs the shutdown handler for SIGINT/SIGTERM/SIGHUP.
///
/// Called by the supervisor at build time and by each worker process right
/// after the fork (the worker re-arms its own copy of the disposition,
/// keeping any flag the inherited handler already recorded).
pub fn install_shutdown_handler() -> Result<(), SupervisorError> {
    unsafe { install(SigHandler::Handler(record_shutdown)) }
        .map_err(|errno| SupervisorError::Os { op: "signal", errno })
}

/// Returns the caught shutdown signal, if any.
pub fn pending() -> Option<Signal> {
    match SHUTDOWN_SIGNO.load(Ordering::SeqCst) {
        0 => None,
        signo => Signal::try_from(signo).ok(),
    }
}

/// Clears the shutdown flag.
///
/// Called when a supervisor is built, so a flag left over from an earlier
/// supervisor in the same process does not trigger an instant shutdown.
/// Forked workers do NOT clear: a flag recorded between the fork and the
/// worker's own handler install must survive, or the parent's termination
/// signal would be lost.
pub fn clear() {
    SHUTDOWN_SIGNO.store(0, Ordering::SeqCst);
}

/// Completes when a shutdown signal has been caught.
///
/// Cooperative: polls the flag, never blocks the runtime.
pub async fn wait_for_shutdown() -> Signal {
    loop {
        if let Some(sig) = pending() {
            return sig;
        }
        tokio::time::sleep(POLL).await;
    }
}

/// Name of a signal number for logging; `"UNKNOWN"` for anything that is not
/// a recognized signal.
pub fn name(signo: i32) -> &'static str {
    Signal::try_from(signo).map(Signal::as_str).unwrap_or("UNKNOWN")
}
