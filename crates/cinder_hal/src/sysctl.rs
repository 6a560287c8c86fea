//! System-level clock and reset control.
//!
//! The SYSTEM block gates peripheral clocks and drives peripheral reset
//! lines through two shared registers, one bit per peripheral. A peripheral
//! whose clock is off ignores register accesses, and one left with reset
//! asserted is non-functional, so every driver goes through this module
//! before touching its own block.

use cinder_common::mmio;
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::register_structs;
use tock_registers::registers::ReadWrite;

register_structs! {
    /// The window of the SYSTEM block this kernel uses.
    pub SystemRegisters {
        (0x000 => _reserved0),
        (0x010 => perip_clk_en0: ReadWrite<u32>),
        (0x014 => _reserved1),
        (0x018 => perip_rst_en0: ReadWrite<u32>),
        (0x01c => @END),
    }
}

/// Controllable hardware peripherals.
///
/// Each variant names the bit assigned to the peripheral in both
/// `PERIP_CLK_EN0` and `PERIP_RST_EN0`. The set is closed: the hardware
/// defines it, and no other value can be constructed, so an unrecognized
/// peripheral cannot reach the registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peripheral {
    Uart0,
    Uart1,
    Timg0,
    Timg1,
}

impl Peripheral {
    /// All controllable peripherals, in bit order.
    pub const ALL: [Peripheral; 4] = [
        Peripheral::Uart0,
        Peripheral::Uart1,
        Peripheral::Timg0,
        Peripheral::Timg1,
    ];

    /// The peripheral's bit in the clock-enable and reset registers.
    pub const fn mask(self) -> u32 {
        match self {
            Peripheral::Uart0 => 1 << 2,
            Peripheral::Uart1 => 1 << 5,
            Peripheral::Timg0 => 1 << 13,
            Peripheral::Timg1 => 1 << 15,
        }
    }
}

/// Clock/reset gate over the SYSTEM register block.
pub struct SystemControl {
    regs: *const SystemRegisters,
}

impl SystemControl {
    /// Builds a gate over the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point at the SYSTEM register block layout, either the
    /// hardware block or a writable stand-in, valid for the lifetime of the
    /// returned value.
    pub const unsafe fn from_base(base: *const SystemRegisters) -> Self {
        Self { regs: base }
    }

    /// The gate at the hardware's fixed bus address.
    ///
    /// # Safety
    ///
    /// Must only be called on the target SoC, where the SYSTEM block is
    /// mapped at [`mmio::SYSTEM_BASE`].
    pub unsafe fn system() -> Self {
        unsafe { Self::from_base(mmio::SYSTEM_BASE as *const SystemRegisters) }
    }

    fn regs(&self) -> &SystemRegisters {
        unsafe { &*self.regs }
    }

    /// Gates the peripheral's clock on.
    ///
    /// Idempotent: the bit is ORed in, so repeating the call leaves the
    /// register unchanged. Must complete before any access to the
    /// peripheral's own registers.
    pub fn enable_clock(&self, peripheral: Peripheral) {
        let regs = self.regs();
        regs.perip_clk_en0
            .set(regs.perip_clk_en0.get() | peripheral.mask());
    }

    /// Pulses the peripheral's reset line.
    ///
    /// Asserts then immediately de-asserts the reset bit, returning the
    /// peripheral's internal state to hardware defaults. The bit is never
    /// left asserted. The peripheral's clock must already be enabled.
    pub fn reset_peripheral(&self, peripheral: Peripheral) {
        let regs = self.regs();
        regs.perip_rst_en0
            .set(regs.perip_rst_en0.get() | peripheral.mask());
        regs.perip_rst_en0
            .set(regs.perip_rst_en0.get() & !peripheral.mask());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLK_EN0: usize = 0x10 / 4;
    const RST_EN0: usize = 0x18 / 4;

    fn gate(mem: &mut [u32; 8]) -> SystemControl {
        unsafe { SystemControl::from_base(mem.as_mut_ptr().cast()) }
    }

    #[test]
    fn enable_clock_sets_exactly_the_assigned_bit() {
        for peripheral in Peripheral::ALL {
            let mut mem = [0u32; 8];
            gate(&mut mem).enable_clock(peripheral);
            assert_eq!(mem[CLK_EN0], peripheral.mask());
            assert_eq!(mem[RST_EN0], 0);
        }
    }

    #[test]
    fn enable_clock_is_idempotent() {
        let mut mem = [0u32; 8];
        let sysctl = gate(&mut mem);
        sysctl.enable_clock(Peripheral::Timg0);
        let once = mem[CLK_EN0];
        sysctl.enable_clock(Peripheral::Timg0);
        assert_eq!(mem[CLK_EN0], once);
    }

    #[test]
    fn enable_clock_preserves_other_peripherals() {
        let mut mem = [0u32; 8];
        let sysctl = gate(&mut mem);
        sysctl.enable_clock(Peripheral::Uart0);
        sysctl.enable_clock(Peripheral::Timg1);
        assert_eq!(
            mem[CLK_EN0],
            Peripheral::Uart0.mask() | Peripheral::Timg1.mask()
        );
    }

    #[test]
    fn reset_never_leaves_the_bit_asserted() {
        for peripheral in Peripheral::ALL {
            let mut mem = [0u32; 8];
            gate(&mut mem).reset_peripheral(peripheral);
            assert_eq!(mem[RST_EN0] & peripheral.mask(), 0);
        }
    }

    #[test]
    fn reset_preserves_unrelated_reset_bits() {
        let mut mem = [0u32; 8];
        mem[RST_EN0] = 0x8000_0001;
        gate(&mut mem).reset_peripheral(Peripheral::Timg0);
        assert_eq!(mem[RST_EN0], 0x8000_0001);
    }

    #[test]
    fn peripheral_bits_are_distinct() {
        for a in Peripheral::ALL {
            for b in Peripheral::ALL {
                if a != b {
                    assert_eq!(a.mask() & b.mask(), 0);
                }
            }
        }
    }
}
