// SPDX-License-Identifier: GPL-3.0-only
//! Which bay a drive sits in, and what that means for the LEDs

mod enumeration;
mod projector;
mod topology;

pub use enumeration::DeviceEnumerator;
pub use projector::{BayNumber, LedProjector};
pub use topology::{BayIndex, IndexOffset, TopologyNode, TopologyResolver};

#[cfg(test)]
pub(crate) use topology::fake;
