// SPDX-License-Identifier: GPL-3.0-only
use std::os::fd::{AsRawFd, RawFd};

use crate::config::TopologyConfig;
use crate::error::{AppError, Result};

use super::{DeviceAction, EventSource, Notification};

/// udev monitor socket filtered to the drive devices
///
/// Bound before the startup scan so that nothing plugged in during the scan
/// is lost; those events simply queue up on the socket.
pub struct UdevMonitor {
    socket: udev::MonitorSocket,
}

impl UdevMonitor {
    /// Subscribe to add/remove notifications for `subsystem`/`devtype`
    pub fn new(config: &TopologyConfig) -> Result<Self> {
        let subscribe = |stage: &'static str| move |source: std::io::Error| AppError::Subscribe { stage, source };

        let socket = udev::MonitorBuilder::new()
            .map_err(subscribe("context"))?
            .match_subsystem_devtype(&config.device_subsystem, &config.device_devtype)
            .map_err(subscribe("filter"))?
            .listen()
            .map_err(subscribe("listen"))?;

        info!(
            "Drive hotplug monitoring started ({} subsystem, {} devices)",
            config.device_subsystem, config.device_devtype
        );

        Ok(Self { socket })
    }
}

impl AsRawFd for UdevMonitor {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

impl EventSource for UdevMonitor {
    type Device = udev::Device;

    fn receive(&mut self) -> Option<Notification<udev::Device>> {
        let event = self.socket.iter().next()?;
        let device = event.device();
        let action = DeviceAction::parse(device.action().map(|a| a.to_string_lossy()).as_deref());

        debug!(
            "udev event: type={:?}, subsystem={:?}, devtype={:?}, syspath={:?}",
            event.event_type(),
            device.subsystem(),
            device.devtype(),
            device.syspath()
        );

        Some(Notification { action, device })
    }
}

impl std::fmt::Debug for UdevMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdevMonitor").field("fd", &self.socket.as_raw_fd()).finish()
    }
}
