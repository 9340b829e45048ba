// SPDX-License-Identifier: GPL-3.0-only
//! Bay resolution from udev device topology
//!
//! The chassis exposes no bay number. Each bay sits behind its own SCSI host
//! adapter and the kernel instantiates those adapters in physical bay order,
//! so the adapter's sysnum is the bay number once leading non-bay adapters
//! (an internal USB stick, for instance) are accounted for by the offset.

use std::borrow::Cow;

use crate::config::TopologyConfig;

/// Read-only view of one node in the OS device tree
///
/// Ancestors are returned by value and only live for the duration of a
/// single resolution.
pub trait TopologyNode: Sized {
    fn syspath(&self) -> Cow<'_, str>;
    fn subsystem(&self) -> Option<Cow<'_, str>>;
    fn sysnum(&self) -> Option<usize>;
    fn attribute(&self, name: &str) -> Option<Cow<'_, str>>;
    fn parent(&self) -> Option<Self>;
    fn parent_matching(&self, subsystem: &str, devtype: &str) -> Option<Self>;
}

impl TopologyNode for udev::Device {
    fn syspath(&self) -> Cow<'_, str> {
        udev::Device::syspath(self).to_string_lossy()
    }

    fn subsystem(&self) -> Option<Cow<'_, str>> {
        udev::Device::subsystem(self).map(|s| s.to_string_lossy())
    }

    fn sysnum(&self) -> Option<usize> {
        udev::Device::sysnum(self)
    }

    fn attribute(&self, name: &str) -> Option<Cow<'_, str>> {
        self.attribute_value(name).map(|v| v.to_string_lossy())
    }

    fn parent(&self) -> Option<Self> {
        udev::Device::parent(self)
    }

    fn parent_matching(&self, subsystem: &str, devtype: &str) -> Option<Self> {
        match self.parent_with_subsystem_devtype(subsystem, devtype) {
            Ok(parent) => parent,
            Err(e) => {
                debug!("parent lookup ({}/{}) failed for {}: {}", subsystem, devtype, TopologyNode::syspath(self), e);
                None
            }
        }
    }
}

/// Correction subtracted from a host adapter sysnum so that the first real
/// bay lands on 1
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOffset(u32);

impl IndexOffset {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

/// Outcome of resolving one device against the chassis topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BayIndex {
    /// No host adapter or no sysnum, outside bay scope entirely
    Unresolved,
    /// Host adapter hangs off the internal bus
    Confirmed(i64),
    /// Host adapter consumed a slot number but is not a chassis bay
    Decoy(i64),
}

impl BayIndex {
    /// Signed view: positive for confirmed bays, negative for decoy slots,
    /// zero when unresolved
    pub fn signed(self) -> i64 {
        match self {
            BayIndex::Unresolved => 0,
            BayIndex::Confirmed(raw) => raw,
            BayIndex::Decoy(raw) => -raw,
        }
    }

    pub fn magnitude(self) -> u64 {
        self.signed().unsigned_abs()
    }
}

/// Maps a device to the bay it occupies
#[derive(Debug, Clone)]
pub struct TopologyResolver {
    config: TopologyConfig,
}

impl TopologyResolver {
    pub fn new(config: TopologyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    /// Resolve `device` to a bay index using `offset`
    pub fn resolve<D: TopologyNode>(&self, device: &D, offset: IndexOffset) -> BayIndex {
        let Some(host) = device.parent_matching(&self.config.host_subsystem, &self.config.host_devtype) else {
            debug!("{}: no {} ancestor", device.syspath(), self.config.host_devtype);
            return BayIndex::Unresolved;
        };

        debug!(" {}: '{}' ({:?})", self.config.host_devtype, host.syspath(), host.subsystem());

        let Some(sysnum) = host.sysnum() else {
            debug!("{}: host adapter has no sysnum", host.syspath());
            return BayIndex::Unresolved;
        };

        debug!(" sysnum: {}", sysnum);
        let raw = sysnum as i64 - i64::from(offset.value()) + 1;

        let Some(host_parent) = host.parent() else {
            debug!("{}: host adapter has no parent, assuming bay {}", host.syspath(), raw);
            return BayIndex::Confirmed(raw);
        };

        debug!(" host parent: '{}'", host_parent.syspath());

        // Some adapters report no subsystem on their parent (seen on the
        // Acer H340 with kernel 3.5), treat those as on the internal bus.
        let Some(subsystem) = host_parent.subsystem() else {
            debug!("{}: host parent has no subsystem, assuming bay {}", host.syspath(), raw);
            return BayIndex::Confirmed(raw);
        };

        debug!(" subsystem: {}", subsystem);

        if subsystem == self.config.internal_bus.as_str() {
            BayIndex::Confirmed(raw)
        } else {
            BayIndex::Decoy(raw)
        }
    }
}
