//! # Lifeline: the parent-death detector.
//!
//! One pipe, created before any fork. The parent keeps the write end open for
//! its whole life and every worker inherits it; nobody ever writes a byte.
//! The only use is descriptor closure: when the parent dies — voluntarily or
//! by a fatal signal — the OS closes the last write end, and every worker's
//! blocking read on the read end returns end-of-stream: "orphaned, exit now".

use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use crate::error::SupervisorError;

/// The liveness pipe, owned by the supervisor.
///
/// Both ends stay open in the parent for its entire lifetime; workers close
/// their inherited write end immediately after the fork so that only the
/// parent's copy keeps the pipe alive.
pub(crate) struct Lifeline {
    read: OwnedFd,
    write: OwnedFd,
}

impl Lifeline {
    /// Creates the pipe.
    pub(crate) fn new() -> Result<Self, SupervisorError> {
        let (read, write) =
            nix::unistd::pipe().map_err(|errno| SupervisorError::os("pipe", errno))?;
        Ok(Self { read, write })
    }

    /// Raw read end, handed to workers at spawn time.
    pub(crate) fn read_fd(&self) -> RawFd {
        self.read.as_raw_fd()
    }

    /// Raw write end, handed to workers so they can close their copy.
    pub(crate) fn write_fd(&self) -> RawFd {
        self.write.as_raw_fd()
    }
}
