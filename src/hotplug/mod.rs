// SPDX-License-Identifier: GPL-3.0-only
//! Drive hotplug detection using udev
//!
//! Watches the SCSI subsystem for devices coming and going and hands each
//! notification to the bay projector until shutdown is requested.

mod event_loop;
mod udev_monitor;

use std::os::fd::AsRawFd;

use crate::bays::TopologyNode;

pub use event_loop::HotplugLoop;
pub use udev_monitor::UdevMonitor;

/// What happened to a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceAction {
    Add,
    Remove,
    /// Any other action reported by the kernel (`change`, `bind`, ...)
    Other(String),
    /// The notification carried no action at all
    Missing,
}

impl DeviceAction {
    pub fn parse(action: Option<&str>) -> Self {
        match action {
            None => DeviceAction::Missing,
            Some(action) if action.eq_ignore_ascii_case("add") => DeviceAction::Add,
            Some(action) if action.eq_ignore_ascii_case("remove") => DeviceAction::Remove,
            Some(action) => DeviceAction::Other(action.to_string()),
        }
    }
}

/// One device notification
#[derive(Debug)]
pub struct Notification<D> {
    pub action: DeviceAction,
    pub device: D,
}

/// Source of device notifications with a pollable descriptor
///
/// The descriptor becomes readable when [`EventSource::receive`] has
/// something to return.
pub trait EventSource: AsRawFd {
    type Device: TopologyNode;

    /// Take the next pending notification without blocking
    fn receive(&mut self) -> Option<Notification<Self::Device>>;
}
