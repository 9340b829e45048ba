// SPDX-License-Identifier: GPL-3.0-only
use std::io;
use std::os::fd::AsRawFd;

use crate::bays::{BayIndex, BayNumber, IndexOffset, LedProjector, TopologyNode, TopologyResolver};
use crate::error::{AppError, Result};
use crate::shutdown::ShutdownSignal;

use super::{DeviceAction, EventSource, Notification};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    NotStarted,
    Running,
    Stopped,
}

/// Turns live device notifications into LED updates
///
/// Built once enumeration has frozen the offset and the subscription is
/// active; runs until the shutdown signal fires.
pub struct HotplugLoop<'a, S: EventSource> {
    source: S,
    resolver: &'a TopologyResolver,
    offset: IndexOffset,
    projector: LedProjector<'a>,
    shutdown: &'a ShutdownSignal,
    state: LoopState,
}

impl<'a, S: EventSource> HotplugLoop<'a, S> {
    pub fn new(
        source: S,
        resolver: &'a TopologyResolver,
        offset: IndexOffset,
        projector: LedProjector<'a>,
        shutdown: &'a ShutdownSignal,
    ) -> Self {
        Self {
            source,
            resolver,
            offset,
            projector,
            shutdown,
            state: LoopState::NotStarted,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Block on notifications until shutdown
    ///
    /// Returns `Ok(())` on shutdown and an error only when the wait itself
    /// fails. The loop cannot be restarted once stopped.
    pub fn run(&mut self) -> Result<()> {
        if self.state != LoopState::NotStarted {
            warn!("Hotplug loop already {:?}", self.state);
            return Ok(());
        }

        self.state = LoopState::Running;
        info!("Monitoring drive bays (offset {})", self.offset.value());
        let result = self.wait_loop();
        self.state = LoopState::Stopped;
        result
    }

    fn wait_loop(&mut self) -> Result<()> {
        loop {
            let mut poll_fds = [
                libc::pollfd {
                    fd: self.shutdown.as_raw_fd(),
                    events: libc::POLLIN,
                    revents: 0,
                },
                libc::pollfd {
                    fd: self.source.as_raw_fd(),
                    events: libc::POLLIN,
                    revents: 0,
                },
            ];

            trace!("Waiting for udev events...");

            // Block until either descriptor is readable (negative timeout = wait forever)
            let poll_result = unsafe { libc::poll(poll_fds.as_mut_ptr(), poll_fds.len() as libc::nfds_t, -1) };

            if poll_result < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                error!("Poll error: {}", err);
                return Err(AppError::Wait(err));
            }

            if poll_result == 0 {
                continue;
            }

            // Shutdown wins over pending device events
            if poll_fds[0].revents != 0 {
                info!("Exiting on signal");
                return Ok(());
            }

            let revents = poll_fds[1].revents;
            if revents & libc::POLLIN != 0 {
                if let Some(notification) = self.source.receive() {
                    self.handle(notification);
                    continue;
                }
                debug!("Poll indicated ready but no event available");
            }

            // A hung up or invalid socket never becomes quiet again
            if revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
                let err = io::Error::other(format!("notification socket failed (revents {revents:#x})"));
                error!("{}", err);
                return Err(AppError::Wait(err));
            }
        }
    }

    fn handle(&mut self, notification: Notification<S::Device>) {
        let Notification { action, device } = notification;

        let present = match action {
            DeviceAction::Add => true,
            DeviceAction::Remove => false,
            DeviceAction::Other(action) => {
                debug!("Ignoring '{}' on {}", action, device.syspath());
                return;
            }
            DeviceAction::Missing => {
                debug!("Ignoring notification without action on {}", device.syspath());
                return;
            }
        };

        match self.resolver.resolve(&device, self.offset) {
            BayIndex::Confirmed(raw) => match BayNumber::new(raw) {
                Some(bay) => self.projector.project(&device, bay, present),
                None => debug!("{}: slot {} is not a chassis bay", device.syspath(), raw),
            },
            BayIndex::Decoy(raw) => debug!("{}: slot {} is not behind the internal bus", device.syspath(), raw),
            BayIndex::Unresolved => debug!("{}: not in a bay", device.syspath()),
        }
    }
}
