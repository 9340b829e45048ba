// SPDX-License-Identifier: GPL-3.0-only
//! Front panel LED drivers
//!
//! Each chassis reaches its LEDs through a different path. The rest of the
//! daemon only sees [`LedControl`].

pub mod dry_run;
pub mod hp_ex48x;
pub mod port_io;
mod sch5127;

use anyhow::Result;
use bitflags::bitflags;

use dry_run::DryRunLeds;
use hp_ex48x::HpEx48x;
use port_io::RawPorts;

/// Number of drive bays with their own LED
pub const MAX_BAYS: usize = 4;

bitflags! {
    /// Which colour(s) of a dual-colour LED to drive
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LedColor: u8 {
        const BLUE = 1 << 0;
        const RED = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedState {
    Off,
    On,
    Blink,
}

impl From<bool> for LedState {
    fn from(on: bool) -> Self {
        if on { LedState::On } else { LedState::Off }
    }
}

/// Capability set of a front panel LED driver
pub trait LedControl: std::fmt::Debug {
    /// Human readable name of the hardware
    fn describe(&self) -> &'static str;

    /// Turn the given colour(s) of one bay LED on or off
    ///
    /// `index` is 0-based; indices past the last bay are ignored.
    fn set_bay(&mut self, colors: LedColor, index: usize, on: bool) -> Result<()>;

    /// Set the overall LED brightness level
    fn set_brightness(&mut self, level: u8) -> Result<()>;

    /// Set the system status LED
    fn set_system_led(&mut self, colors: LedColor, state: LedState) -> Result<()>;

    /// Connect or disconnect the internal USB mass storage device
    fn mount_usb(&mut self, on: bool) -> Result<()>;
}

/// Driver selected at startup
#[derive(Debug)]
pub enum LedBackend {
    /// HP MediaSmart Server EX48X
    HpEx48x(HpEx48x<RawPorts>),
    /// No hardware access, log only
    DryRun(DryRunLeds),
}

impl LedBackend {
    /// Find the first driver whose hardware answers
    ///
    /// Returns `Ok(None)` when nothing matched.
    pub fn probe() -> Result<Option<Self>> {
        match HpEx48x::probe(RawPorts::new()) {
            Ok(Some(leds)) => return Ok(Some(LedBackend::HpEx48x(leds))),
            Ok(None) => debug!("{} not detected", hp_ex48x::DESCRIPTION),
            Err(e) => return Err(e),
        }

        Ok(None)
    }
}

impl LedControl for LedBackend {
    fn describe(&self) -> &'static str {
        match self {
            LedBackend::HpEx48x(leds) => leds.describe(),
            LedBackend::DryRun(leds) => leds.describe(),
        }
    }

    fn set_bay(&mut self, colors: LedColor, index: usize, on: bool) -> Result<()> {
        match self {
            LedBackend::HpEx48x(leds) => leds.set_bay(colors, index, on),
            LedBackend::DryRun(leds) => leds.set_bay(colors, index, on),
        }
    }

    fn set_brightness(&mut self, level: u8) -> Result<()> {
        match self {
            LedBackend::HpEx48x(leds) => leds.set_brightness(level),
            LedBackend::DryRun(leds) => leds.set_brightness(level),
        }
    }

    fn set_system_led(&mut self, colors: LedColor, state: LedState) -> Result<()> {
        match self {
            LedBackend::HpEx48x(leds) => leds.set_system_led(colors, state),
            LedBackend::DryRun(leds) => leds.set_system_led(colors, state),
        }
    }

    fn mount_usb(&mut self, on: bool) -> Result<()> {
        match self {
            LedBackend::HpEx48x(leds) => leds.mount_usb(on),
            LedBackend::DryRun(leds) => leds.mount_usb(on),
        }
    }
}

#[cfg(test)]
pub(crate) mod recording {
    //! LED driver that remembers every call

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Bay { colors: LedColor, index: usize, on: bool },
        Brightness(u8),
        System { colors: LedColor, state: LedState },
        Usb(bool),
    }

    #[derive(Debug, Default)]
    pub struct RecordingLeds {
        pub calls: Vec<Call>,
    }

    impl RecordingLeds {
        pub fn bay_calls(&self) -> Vec<(usize, bool)> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    Call::Bay { index, on, .. } => Some((*index, *on)),
                    _ => None,
                })
                .collect()
        }
    }

    impl LedControl for RecordingLeds {
        fn describe(&self) -> &'static str {
            "recording"
        }

        fn set_bay(&mut self, colors: LedColor, index: usize, on: bool) -> Result<()> {
            self.calls.push(Call::Bay { colors, index, on });
            Ok(())
        }

        fn set_brightness(&mut self, level: u8) -> Result<()> {
            self.calls.push(Call::Brightness(level));
            Ok(())
        }

        fn set_system_led(&mut self, colors: LedColor, state: LedState) -> Result<()> {
            self.calls.push(Call::System { colors, state });
            Ok(())
        }

        fn mount_usb(&mut self, on: bool) -> Result<()> {
            self.calls.push(Call::Usb(on));
            Ok(())
        }
    }
}
