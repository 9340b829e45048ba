// SPDX-License-Identifier: GPL-3.0-only
//! x86 I/O port access
//!
//! Drivers talk to chipset registers through [`PortIo`] so the register
//! logic can run against a fake port space in tests.

use std::io;

/// Access to the x86 I/O port space
pub trait PortIo: std::fmt::Debug {
    /// Request access to `len` ports starting at `port`
    fn grant(&mut self, port: u16, len: u16) -> io::Result<()>;

    /// Give up access to `len` ports starting at `port`
    fn release(&mut self, port: u16, len: u16);

    fn inb(&mut self, port: u16) -> u8;
    fn outb(&mut self, value: u8, port: u16);
    fn inl(&mut self, port: u16) -> u32;
    fn outl(&mut self, value: u32, port: u16);
}

/// Real port I/O through `ioperm(2)` and `in`/`out` instructions
///
/// Only available on x86_64 Linux; elsewhere every grant fails with
/// `Unsupported` and no instruction is ever issued.
#[derive(Debug, Default)]
pub struct RawPorts {
    _private: (),
}

impl RawPorts {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
impl PortIo for RawPorts {
    fn grant(&mut self, port: u16, len: u16) -> io::Result<()> {
        let res = unsafe { libc::ioperm(libc::c_ulong::from(port), libc::c_ulong::from(len), 1) };
        if res != 0 {
            let err = io::Error::last_os_error();
            return Err(io::Error::new(err.kind(), format!("ioperm({port:#06x}, {len}): {err}")));
        }
        Ok(())
    }

    fn release(&mut self, port: u16, len: u16) {
        unsafe {
            libc::ioperm(libc::c_ulong::from(port), libc::c_ulong::from(len), 0);
        }
    }

    fn inb(&mut self, port: u16) -> u8 {
        let value: u8;
        // Safety: the port range was granted with ioperm before use.
        unsafe {
            std::arch::asm!("in al, dx", out("al") value, in("dx") port, options(nomem, nostack, preserves_flags));
        }
        value
    }

    fn outb(&mut self, value: u8, port: u16) {
        unsafe {
            std::arch::asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
        }
    }

    fn inl(&mut self, port: u16) -> u32 {
        let value: u32;
        unsafe {
            std::arch::asm!("in eax, dx", out("eax") value, in("dx") port, options(nomem, nostack, preserves_flags));
        }
        value
    }

    fn outl(&mut self, value: u32, port: u16) {
        unsafe {
            std::arch::asm!("out dx, eax", in("dx") port, in("eax") value, options(nomem, nostack, preserves_flags));
        }
    }
}

#[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
impl PortIo for RawPorts {
    fn grant(&mut self, port: u16, _len: u16) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("port I/O at {port:#06x} is only supported on x86_64 Linux"),
        ))
    }

    fn release(&mut self, _port: u16, _len: u16) {}

    fn inb(&mut self, _port: u16) -> u8 {
        0xff
    }

    fn outb(&mut self, _value: u8, _port: u16) {}

    fn inl(&mut self, _port: u16) -> u32 {
        0xffff_ffff
    }

    fn outl(&mut self, _value: u32, _port: u16) {}
}
