// SPDX-License-Identifier: GPL-3.0-only
//! LED driver that touches no hardware
//!
//! Used with `--dry-run` to watch bay resolution on machines without a
//! supported front panel.

use anyhow::Result;

use super::{LedColor, LedControl, LedState};

#[derive(Debug, Default)]
pub struct DryRunLeds;

impl LedControl for DryRunLeds {
    fn describe(&self) -> &'static str {
        "dry run (no LED hardware)"
    }

    fn set_bay(&mut self, colors: LedColor, index: usize, on: bool) -> Result<()> {
        debug!("bay LED {} {:?} -> {}", index, colors, if on { "on" } else { "off" });
        Ok(())
    }

    fn set_brightness(&mut self, level: u8) -> Result<()> {
        debug!("brightness -> {}", level);
        Ok(())
    }

    fn set_system_led(&mut self, colors: LedColor, state: LedState) -> Result<()> {
        debug!("system LED {:?} -> {:?}", colors, state);
        Ok(())
    }

    fn mount_usb(&mut self, on: bool) -> Result<()> {
        debug!("USB device -> {}", if on { "mounted" } else { "unmounted" });
        Ok(())
    }
}
