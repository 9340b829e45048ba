// SPDX-License-Identifier: GPL-3.0-only
//! Cooperative shutdown
//!
//! A Unix socket pair acts as a self-pipe: SIGINT/SIGTERM (or a
//! [`ShutdownTrigger`]) write a byte into it, and every blocking wait in the
//! daemon polls the read end next to whatever else it waits on. The byte is
//! never consumed, so a signal that lands between a check and the next wait
//! still wakes that wait.

use std::io::{self, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use signal_hook::consts::{SIGINT, SIGTERM};

use crate::error::{AppError, Result};

#[derive(Debug)]
pub struct ShutdownSignal {
    reader: UnixStream,
    writer: UnixStream,
}

/// Raises a [`ShutdownSignal`] from another thread
#[derive(Debug)]
pub struct ShutdownTrigger {
    writer: UnixStream,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // A full buffer means shutdown is already pending.
        let _ = (&self.writer).write(&[1]);
    }
}

impl ShutdownSignal {
    /// A token that only fires through [`ShutdownTrigger`]
    pub fn new() -> io::Result<Self> {
        let (reader, writer) = UnixStream::pair()?;
        reader.set_nonblocking(true)?;
        writer.set_nonblocking(true)?;
        Ok(Self { reader, writer })
    }

    /// A token that fires on SIGINT and SIGTERM
    pub fn install() -> Result<Self> {
        let signal = Self::new().map_err(AppError::Signal)?;
        for sig in [SIGINT, SIGTERM] {
            let writer = signal.writer.try_clone().map_err(AppError::Signal)?;
            signal_hook::low_level::pipe::register(sig, writer).map_err(AppError::Signal)?;
        }
        Ok(signal)
    }

    pub fn trigger_handle(&self) -> io::Result<ShutdownTrigger> {
        Ok(ShutdownTrigger {
            writer: self.writer.try_clone()?,
        })
    }

    #[cfg(test)]
    pub fn is_triggered(&self) -> io::Result<bool> {
        self.wait_timeout(Duration::ZERO)
    }

    /// Sleep for up to `timeout`, returning early with `true` on shutdown
    pub fn wait_timeout(&self, timeout: Duration) -> io::Result<bool> {
        let timeout_ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);
        let mut poll_fd = libc::pollfd {
            fd: self.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };

        loop {
            let poll_result = unsafe { libc::poll(&mut poll_fd, 1, timeout_ms) };
            if poll_result < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    // the handler's byte is readable by now
                    continue;
                }
                return Err(err);
            }
            return Ok(poll_result > 0 && poll_fd.revents != 0);
        }
    }
}

impl AsRawFd for ShutdownSignal {
    fn as_raw_fd(&self) -> RawFd {
        self.reader.as_raw_fd()
    }
}
