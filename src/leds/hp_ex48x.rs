// SPDX-License-Identifier: GPL-3.0-only
//! HP MediaSmart Server EX48X front panel

use anyhow::{Context, Result};

use super::port_io::PortIo;
use super::sch5127::{GP_LVL, GP_LVL2, GPO_BLINK, REG_HWM_DATA, REG_HWM_INDEX, Sch5127};
use super::{LedColor, LedControl, LedState, MAX_BAYS};

pub const DESCRIPTION: &str = "HP MediaSmart Server 48X";

/// ISA bridge: Intel 82801IR (ICH9R) LPC Interface Controller [8086:2916]
const LPC_DID_VID: u32 = 0x2916_8086;

/// GPIO numbers wired to the front panel
const OUT_BLUE: [u32; MAX_BAYS] = [22, 21, 13, 57];
const OUT_RED: [u32; MAX_BAYS] = [4, 5, 38, 39];
const OUT_USB_DEVICE: u32 = 7;
const OUT_SYSTEM_BLUE: u32 = 28;
const OUT_SYSTEM_RED: u32 = 27;

/// SCH5127 hardware monitor register driving the LED PWM
const HWM_PWM3_DUTY_CYCLE: u8 = 0x32;

/// Duty cycle per brightness level
const LED_BRIGHTNESS: [u8; 10] = [0x00, 0xbe, 0xc3, 0xcb, 0xd3, 0xdb, 0xe3, 0xeb, 0xf3, 0xff];

#[derive(Debug)]
pub struct HpEx48x<P> {
    chip: Sch5127<P>,
}

impl<P: PortIo> HpEx48x<P> {
    /// Initialise the chassis if this is an EX48X
    pub fn probe(ports: P) -> Result<Option<Self>> {
        let Some(mut chip) = Sch5127::init(ports, LPC_DID_VID).context("Failed to access LPC/SuperI/O registers")? else {
            return Ok(None);
        };

        chip.grant_runtime(REG_HWM_INDEX, 1)?;
        chip.grant_runtime(REG_HWM_DATA, 1)?;
        chip.grant_gpio(GPO_BLINK, 4)?;
        chip.grant_gpio(GP_LVL, 4)?;
        chip.grant_gpio(GP_LVL2, 4)?;

        let mut leds = Self { chip };
        leds.enable_outputs()?;

        info!("Initialised {}", DESCRIPTION);
        Ok(Some(leds))
    }

    fn enable_outputs(&mut self) -> Result<()> {
        let (mut low, mut high) = (0u32, 0u32);
        let bits = OUT_BLUE
            .into_iter()
            .chain(OUT_RED)
            .chain([OUT_USB_DEVICE, OUT_SYSTEM_BLUE, OUT_SYSTEM_RED]);
        for bit in bits {
            if bit < 32 {
                low |= 1 << bit;
            } else {
                high |= 1 << (bit - 32);
            }
        }

        self.chip.select_gpio_outputs(low, high).context("Failed to configure LED GPIOs")?;
        Ok(())
    }

    #[cfg(test)]
    fn chip(&self) -> &Sch5127<P> {
        &self.chip
    }
}

impl<P: PortIo> LedControl for HpEx48x<P> {
    fn describe(&self) -> &'static str {
        DESCRIPTION
    }

    fn set_bay(&mut self, colors: LedColor, index: usize, on: bool) -> Result<()> {
        if index >= MAX_BAYS {
            return Ok(());
        }

        // LEDs are active low
        if colors.contains(LedColor::BLUE) {
            self.chip.set_gpio_level(OUT_BLUE[index], !on);
        }
        if colors.contains(LedColor::RED) {
            self.chip.set_gpio_level(OUT_RED[index], !on);
        }
        Ok(())
    }

    fn set_brightness(&mut self, level: u8) -> Result<()> {
        let level = usize::from(level).min(LED_BRIGHTNESS.len() - 1);
        self.chip.write_hwm(HWM_PWM3_DUTY_CYCLE, LED_BRIGHTNESS[level]);
        Ok(())
    }

    fn set_system_led(&mut self, colors: LedColor, state: LedState) -> Result<()> {
        let on = state == LedState::On;
        let mut blink_bits = 0;
        if colors.contains(LedColor::BLUE) {
            self.chip.set_gpio_level(OUT_SYSTEM_BLUE, !on);
            blink_bits |= 1 << OUT_SYSTEM_BLUE;
        }
        if colors.contains(LedColor::RED) {
            self.chip.set_gpio_level(OUT_SYSTEM_RED, !on);
            blink_bits |= 1 << OUT_SYSTEM_RED;
        }

        if blink_bits != 0 {
            self.chip.set_gpio_blink(blink_bits, state == LedState::Blink);
        }
        Ok(())
    }

    fn mount_usb(&mut self, on: bool) -> Result<()> {
        self.chip.set_gpio_level(OUT_USB_DEVICE, on);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::sch5127::tests::board;
    use super::*;

    const GPIO_BASE: u16 = 0x0500;
    const RUNTIME_BASE: u16 = 0x0a00;

    fn leds() -> HpEx48x<super::super::port_io::fake::FakePorts> {
        HpEx48x::probe(board(u32::from(GPIO_BASE), RUNTIME_BASE, false)).unwrap().unwrap()
    }

    fn level(leds: &HpEx48x<super::super::port_io::fake::FakePorts>, bit: u32) -> bool {
        let (reg, bit) = if bit < 32 { (GP_LVL, bit) } else { (GP_LVL2, bit - 32) };
        let value = leds.chip().ports().longs.get(&(GPIO_BASE + reg)).copied().unwrap_or(0);
        value & (1 << bit) != 0
    }

    #[test]
    fn test_probe_selects_all_led_gpios_as_outputs() {
        let leds = leds();
        let ports = leds.chip().ports();
        let use_sel = ports.longs[&GPIO_BASE];
        for bit in [22, 21, 13, 4, 5, 7, 28, 27] {
            assert!(use_sel & (1 << bit) != 0, "GPIO {bit} not selected");
        }
        let use_sel2 = ports.longs[&(GPIO_BASE + 0x30)];
        for bit in [57, 38, 39] {
            assert!(use_sel2 & (1 << (bit - 32)) != 0, "GPIO {bit} not selected");
        }
    }

    #[test]
    fn test_bay_leds_are_active_low() {
        let mut leds = leds();
        leds.set_bay(LedColor::BLUE, 0, true).unwrap();
        assert!(!level(&leds, 22));
        leds.set_bay(LedColor::BLUE, 0, false).unwrap();
        assert!(level(&leds, 22));

        leds.set_bay(LedColor::RED, 3, false).unwrap();
        assert!(level(&leds, 39));
        assert!(!level(&leds, 57));
    }

    #[test]
    fn test_both_colors_drive_both_gpios() {
        let mut leds = leds();
        leds.set_bay(LedColor::BLUE | LedColor::RED, 2, false).unwrap();
        assert!(level(&leds, 13));
        assert!(level(&leds, 38));
    }

    #[test]
    fn test_bay_out_of_range_ignored() {
        let mut leds = leds();
        let before = leds.chip().ports().writes.len();
        leds.set_bay(LedColor::BLUE, MAX_BAYS, true).unwrap();
        assert_eq!(leds.chip().ports().writes.len(), before);
    }

    #[test]
    fn test_brightness_is_clamped() {
        let mut leds = leds();
        leds.set_brightness(4).unwrap();
        assert_eq!(leds.chip().ports().bytes[&(RUNTIME_BASE + REG_HWM_INDEX)], HWM_PWM3_DUTY_CYCLE);
        assert_eq!(leds.chip().ports().bytes[&(RUNTIME_BASE + REG_HWM_DATA)], 0xd3);

        leds.set_brightness(200).unwrap();
        assert_eq!(leds.chip().ports().bytes[&(RUNTIME_BASE + REG_HWM_DATA)], 0xff);
    }

    #[test]
    fn test_system_led_blink() {
        let mut leds = leds();
        leds.set_system_led(LedColor::BLUE, LedState::Blink).unwrap();
        let blink = leds.chip().ports().longs[&(GPIO_BASE + GPO_BLINK)];
        assert_eq!(blink, 1 << OUT_SYSTEM_BLUE);

        leds.set_system_led(LedColor::BLUE, LedState::On).unwrap();
        let blink = leds.chip().ports().longs[&(GPIO_BASE + GPO_BLINK)];
        assert_eq!(blink, 0);
        assert!(!level(&leds, OUT_SYSTEM_BLUE));
    }

    #[test]
    fn test_mount_usb_is_active_high() {
        let mut leds = leds();
        leds.mount_usb(true).unwrap();
        assert!(level(&leds, OUT_USB_DEVICE));
    }
}
