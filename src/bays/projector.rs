// SPDX-License-Identifier: GPL-3.0-only
//! Bay presence to LED state

use crate::leds::{LedColor, LedControl, MAX_BAYS};

use super::topology::TopologyNode;

/// 1-based physical bay number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BayNumber(u8);

impl BayNumber {
    /// `None` unless `n` names one of the chassis bays
    pub fn new(n: i64) -> Option<Self> {
        if (1..=MAX_BAYS as i64).contains(&n) {
            Some(Self(n as u8))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// 0-based index used by the LED drivers
    pub fn driver_index(self) -> usize {
        usize::from(self.0) - 1
    }
}

impl std::fmt::Display for BayNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Single path from "bay N has / lost a drive" to the LED driver
///
/// Without a driver every call is a no-op.
pub struct LedProjector<'a> {
    leds: Option<&'a mut dyn LedControl>,
    color: LedColor,
}

impl<'a> LedProjector<'a> {
    pub fn new(leds: Option<&'a mut dyn LedControl>, color: LedColor) -> Self {
        Self { leds, color }
    }

    pub fn apply(&mut self, bay: BayNumber, present: bool) {
        let Some(leds) = self.leds.as_deref_mut() else {
            return;
        };

        if let Err(e) = leds.set_bay(self.color, bay.driver_index(), present) {
            error!("Failed to set LED for bay {}: {:#}", bay, e);
        }
    }

    /// Report a drive arriving in or leaving `bay` and update its LED
    pub fn project<D: TopologyNode>(&mut self, device: &D, bay: BayNumber, present: bool) {
        let model = device.attribute("model");
        info!(
            "{} [{}] '{}'",
            if present { "ADDED" } else { "REMOVED" },
            bay,
            model.as_deref().map(str::trim).unwrap_or("")
        );
        debug!(" syspath: {}", device.syspath());

        self.apply(bay, present);
    }
}

impl std::fmt::Debug for LedProjector<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedProjector")
            .field("leds", &self.leds.as_ref().map(|leds| leds.describe()))
            .field("color", &self.color)
            .finish()
    }
}
