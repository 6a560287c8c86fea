//! ESP32-C3 interrupt matrix driver.
//!
//! The matrix maps hardware interrupt sources onto the core's 32 interrupt
//! lines: one 32-bit mapping word per source, written with the destination
//! line number, plus a single enable bitmask for the lines themselves. The
//! driver has no state of its own beyond these registers.

use cinder_common::interrupt::CPU_INT_LINES;
use cinder_common::mmio;
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::register_structs;
use tock_registers::registers::ReadWrite;

register_structs! {
    /// Core 0 interrupt matrix registers.
    pub IntMatrixRegisters {
        (0x000 => source_map: [ReadWrite<u32>; 62]),
        (0x0f8 => _reserved0),
        (0x104 => cpu_int_enable: ReadWrite<u32>),
        (0x108 => @END),
    }
}

/// Hardware interrupt sources, by their TRM source numbers.
///
/// Defined by the hardware; members are added as the kernel starts caring
/// about them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum InterruptSource {
    /// Timer group 0, timer 0.
    Timg0T0 = 32,
}

/// Router over the interrupt matrix registers.
pub struct InterruptMatrix {
    regs: *const IntMatrixRegisters,
}

impl InterruptMatrix {
    /// Builds a router over the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point at the interrupt matrix register layout, valid for
    /// the lifetime of the returned value.
    pub const unsafe fn from_base(base: *const IntMatrixRegisters) -> Self {
        Self { regs: base }
    }

    /// The core 0 matrix at its fixed bus address.
    ///
    /// # Safety
    ///
    /// Must only be called on the target SoC, where the matrix is mapped at
    /// [`mmio::INTERRUPT_MATRIX_BASE`].
    pub unsafe fn core0() -> Self {
        unsafe { Self::from_base(mmio::INTERRUPT_MATRIX_BASE as *const IntMatrixRegisters) }
    }

    fn regs(&self) -> &IntMatrixRegisters {
        unsafe { &*self.regs }
    }

    /// Routes a hardware interrupt source to a CPU interrupt line.
    ///
    /// Takes effect immediately. Re-routing a source while its line is
    /// enabled may race an in-flight interrupt; callers that need a quiet
    /// switchover must disable the line first.
    pub fn route(&self, source: InterruptSource, cpu_line: u32) {
        self.regs().source_map[source as usize].set(cpu_line);
    }

    /// Unmasks a CPU interrupt line.
    ///
    /// Lines outside [0, 31] are silently ignored and the register is left
    /// untouched. That mirrors the hardware bitmask width; whether it should
    /// instead be a hard failure is an open product question, so the
    /// behavior is kept as-is.
    pub fn enable(&self, cpu_line: u32) {
        if cpu_line >= CPU_INT_LINES {
            return;
        }
        let regs = self.regs();
        regs.cpu_int_enable
            .set(regs.cpu_int_enable.get() | (1 << cpu_line));
    }

    /// Masks a CPU interrupt line.
    ///
    /// Same silent-ignore policy as [`InterruptMatrix::enable`] for lines
    /// outside [0, 31].
    pub fn disable(&self, cpu_line: u32) {
        if cpu_line >= CPU_INT_LINES {
            return;
        }
        let regs = self.regs();
        regs.cpu_int_enable
            .set(regs.cpu_int_enable.get() & !(1 << cpu_line));
    }
}
