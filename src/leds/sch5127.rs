// SPDX-License-Identifier: GPL-3.0-only
//! Chassis plumbing shared by boards built around the ICH9 LPC bridge and an
//! SMSC SCH5127 SuperI/O
//!
//! LEDs hang off ICH9 GPIOs, brightness is a PWM duty cycle in the SCH5127
//! hardware monitor, and the SCH5127 watchdog has to be disabled or it
//! resets the box.

use std::io;

use super::port_io::PortIo;

/// PCI configuration mechanism #1
const PCI_CONFIG_ADDRESS: u16 = 0x0cf8;
const PCI_CONFIG_DATA: u16 = 0x0cfc;

/// LPC bridge lives at bus 0, device 31, function 0
const CONF_VENDOR_ID: u32 = 0x8000_f800;
const CONF_GPIOBASE: u32 = 0x8000_f848;

/// ICH9 general purpose I/O registers, relative to GPIOBASE
pub const GPIO_USE_SEL: u16 = 0x00;
pub const GP_IO_SEL: u16 = 0x04;
pub const GP_LVL: u16 = 0x0c;
pub const GPO_BLINK: u16 = 0x18;
pub const GPIO_USE_SEL2: u16 = 0x30;
pub const GP_IO_SEL2: u16 = 0x34;
pub const GP_LVL2: u16 = 0x38;

/// SCH5127 runtime registers, relative to the runtime base
const REG_WDT_TIME_OUT: u16 = 0x65;
const REG_WDT_VAL: u16 = 0x66;
const REG_WDT_CFG: u16 = 0x67;
const REG_WDT_CTRL: u16 = 0x68;
pub const REG_HWM_INDEX: u16 = 0x70;
pub const REG_HWM_DATA: u16 = 0x71;

/// SuperI/O configuration index registers
const SIO_PRIMARY: u16 = 0x2e;
const SIO_ALTERNATE: u16 = 0x4e;
const IDX_LDN: u8 = 0x07;
const IDX_ID: u8 = 0x20;
const IDX_ALTERNATE: u8 = 0x26;
const IDX_BASE_MSB: u8 = 0x60;
const IDX_BASE_LSB: u8 = 0x61;
const SIO_ENTER: u8 = 0x55;
const SIO_EXIT: u8 = 0xaa;
const LDN_RUNTIME: u8 = 0x0a;

/// Initialised ICH9 + SCH5127 register access
#[derive(Debug)]
pub struct Sch5127<P> {
    ports: P,
    gpio_base: u16,
    runtime_base: u16,
}

impl<P: PortIo> Sch5127<P> {
    /// Locate the GPIO and runtime register blocks
    ///
    /// Returns `Ok(None)` when the LPC bridge is not the expected part.
    /// Permission failures are errors.
    pub fn init(mut ports: P, expected_did_vid: u32) -> io::Result<Option<Self>> {
        let Some(gpio_base) = Self::init_pci_lpc(&mut ports, expected_did_vid)? else {
            return Ok(None);
        };
        let runtime_base = Self::init_superio(&mut ports)?;

        let mut chip = Self {
            ports,
            gpio_base,
            runtime_base,
        };
        chip.disable_watchdog()?;

        Ok(Some(chip))
    }

    fn init_pci_lpc(ports: &mut P, expected_did_vid: u32) -> io::Result<Option<u16>> {
        ports.grant(PCI_CONFIG_DATA, 4)?;
        ports.grant(PCI_CONFIG_ADDRESS, 4)?;

        ports.outl(CONF_VENDOR_ID, PCI_CONFIG_ADDRESS);
        let did_vid = ports.inl(PCI_CONFIG_DATA);
        if did_vid != expected_did_vid {
            debug!("LPC bridge is {:#010x}, expected {:#010x}", did_vid, expected_did_vid);
            ports.release(PCI_CONFIG_DATA, 4);
            ports.release(PCI_CONFIG_ADDRESS, 4);
            return Ok(None);
        }

        ports.outl(CONF_GPIOBASE, PCI_CONFIG_ADDRESS);
        let gpio_base = ports.inl(PCI_CONFIG_DATA);

        ports.release(PCI_CONFIG_DATA, 4);
        ports.release(PCI_CONFIG_ADDRESS, 4);

        // only bits 15:6 carry the address, bit 0 is hardwired to 1 (I/O space)
        if gpio_base & 0xffff_007f != 0x1 {
            warn!("Unexpected GPIOBASE {:#010x}", gpio_base);
            return Ok(None);
        }

        Ok(Some((gpio_base & !0x1) as u16))
    }

    fn init_superio(ports: &mut P) -> io::Result<u16> {
        let mut sio_addr = SIO_PRIMARY;
        ports.grant(sio_addr, 2)?;

        ports.outb(SIO_ENTER, sio_addr);

        ports.outb(IDX_ID, sio_addr);
        let device_id = ports.inb(sio_addr + 1);
        debug!("SuperI/O device {:#04x}", device_id);

        ports.outb(IDX_ALTERNATE, sio_addr);
        if ports.inb(sio_addr + 1) == SIO_ALTERNATE as u8 {
            ports.outb(SIO_EXIT, sio_addr);
            ports.release(sio_addr, 2);

            debug!("SuperI/O configuration moved to {:#04x}", SIO_ALTERNATE);
            sio_addr = SIO_ALTERNATE;
            ports.grant(sio_addr, 2)?;
            ports.outb(SIO_ENTER, sio_addr);
        }

        ports.outb(IDX_LDN, sio_addr);
        ports.outb(LDN_RUNTIME, sio_addr + 1);

        ports.outb(IDX_BASE_MSB, sio_addr);
        let msb = ports.inb(sio_addr + 1);
        ports.outb(IDX_BASE_LSB, sio_addr);
        let lsb = ports.inb(sio_addr + 1);

        ports.outb(SIO_EXIT, sio_addr);
        ports.release(sio_addr, 2);

        Ok((u16::from(msb) << 8) | u16::from(lsb))
    }

    fn disable_watchdog(&mut self) -> io::Result<()> {
        let regs = [REG_WDT_VAL, REG_WDT_TIME_OUT, REG_WDT_CFG, REG_WDT_CTRL];
        let first = REG_WDT_TIME_OUT;
        let count = REG_WDT_CTRL - REG_WDT_TIME_OUT + 1;

        self.ports.grant(self.runtime_base + first, count)?;
        for reg in regs {
            self.ports.outb(0, self.runtime_base + reg);
        }
        self.ports.release(self.runtime_base + first, count);

        Ok(())
    }

    #[cfg(test)]
    pub fn gpio_base(&self) -> u16 {
        self.gpio_base
    }

    #[cfg(test)]
    pub fn runtime_base(&self) -> u16 {
        self.runtime_base
    }

    /// Keep `len` GPIO registers starting at `reg` accessible
    pub fn grant_gpio(&mut self, reg: u16, len: u16) -> io::Result<()> {
        self.ports.grant(self.gpio_base + reg, len)
    }

    /// Keep `len` runtime registers starting at `reg` accessible
    pub fn grant_runtime(&mut self, reg: u16, len: u16) -> io::Result<()> {
        self.ports.grant(self.runtime_base + reg, len)
    }

    /// Set or clear `bits` in the 32-bit register at `port`, writing only on change
    fn update_bits(&mut self, bits: u32, port: u16, state: bool) {
        let value = self.ports.inl(port);
        let new_value = if state { value | bits } else { value & !bits };
        if value != new_value {
            self.ports.outl(new_value, port);
        }
    }

    /// Drive GPIO `bit` (0..64) high or low
    pub fn set_gpio_level(&mut self, bit: u32, state: bool) {
        let reg = if bit < 32 { GP_LVL } else { GP_LVL2 };
        self.update_bits(1 << (bit % 32), self.gpio_base + reg, state);
    }

    /// Enable or disable hardware blinking for GPIOs in `bits` (0..32)
    pub fn set_gpio_blink(&mut self, bits: u32, state: bool) {
        self.update_bits(bits, self.gpio_base + GPO_BLINK, state);
    }

    /// Switch the GPIOs in `low`/`high` (bits 0..32 and 32..64) to GPIO outputs
    pub fn select_gpio_outputs(&mut self, low: u32, high: u32) -> io::Result<()> {
        let use_sel = self.gpio_base + GPIO_USE_SEL;
        let use_sel2 = self.gpio_base + GPIO_USE_SEL2;
        self.ports.grant(use_sel, 4)?;
        self.ports.grant(use_sel2, 4)?;
        let value = self.ports.inl(use_sel);
        self.ports.outl(value | low, use_sel);
        let value = self.ports.inl(use_sel2);
        self.ports.outl(value | high, use_sel2);
        self.ports.release(use_sel, 4);
        self.ports.release(use_sel2, 4);

        let io_sel = self.gpio_base + GP_IO_SEL;
        let io_sel2 = self.gpio_base + GP_IO_SEL2;
        self.ports.grant(io_sel, 4)?;
        self.ports.grant(io_sel2, 4)?;
        let value = self.ports.inl(io_sel);
        self.ports.outl(value & !low, io_sel);
        let value = self.ports.inl(io_sel2);
        self.ports.outl(value & !high, io_sel2);
        self.ports.release(io_sel, 4);
        self.ports.release(io_sel2, 4);

        Ok(())
    }

    /// Write a hardware monitor register through the index/data pair
    pub fn write_hwm(&mut self, reg: u8, value: u8) {
        self.ports.outb(reg, self.runtime_base + REG_HWM_INDEX);
        self.ports.outb(value, self.runtime_base + REG_HWM_DATA);
    }

    #[cfg(test)]
    pub fn ports(&self) -> &P {
        &self.ports
    }
}
