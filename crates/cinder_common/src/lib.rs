//! Common definitions and constants shared across the cinder kernel.
//!
//! This crate pins down the ESP32-C3 memory map, the clocking parameters the
//! tick generator is derived from, and the interrupt wiring between the
//! timer hardware and the CPU. Firmware, peripheral drivers, and host tools
//! all read these values from here so that the hardware contract lives in
//! exactly one place.

#![no_std]

/// Memory-mapped I/O address space for the ESP32-C3 system-on-chip.
///
/// Base addresses for the peripheral blocks the kernel touches. These come
/// straight from the technical reference manual's memory map and must not
/// drift from it; every driver computes its register addresses relative to
/// one of these.
pub mod mmio {
    /// Base address of the SYSTEM register block.
    ///
    /// Hosts the peripheral clock-enable and reset registers. A peripheral's
    /// clock must be gated on here before any of its own registers are
    /// accessible.
    pub const SYSTEM_BASE: usize = 0x600C_0000;

    /// Base address of the interrupt matrix.
    ///
    /// The matrix maps hardware interrupt sources onto the 32 CPU interrupt
    /// lines. One 32-bit mapping word per source starting at this address,
    /// followed by the per-core enable bitmask.
    pub const INTERRUPT_MATRIX_BASE: usize = 0x600C_2000;

    /// Base address of timer group 0.
    ///
    /// Carries the general-purpose timer used as the kernel tick source and
    /// the main watchdog, which shares the same register block.
    pub const TIMG0_BASE: usize = 0x6001_F000;

    /// Base address of timer group 1.
    pub const TIMG1_BASE: usize = 0x6002_0000;

    /// Base address of UART0, the debug console.
    pub const UART0_BASE: usize = 0x6000_0000;
}

/// Clocking parameters the tick generator and console are derived from.
pub mod clock {
    /// APB bus clock feeding the timer groups and UARTs, in hertz.
    pub const APB_CLK_HZ: u32 = 80_000_000;

    /// Prescaler programmed into the timer's divider field.
    ///
    /// The timer counts at `APB_CLK_HZ / TICK_PRESCALER`. The hardware field
    /// is 16 bits wide and treats 0 and 1 as reserved encodings.
    pub const TICK_PRESCALER: u32 = 1600;

    /// Target kernel tick rate, in hertz.
    pub const TICK_HZ: u32 = 100;

    /// Console baud rate for UART0.
    pub const BAUD_RATE: u32 = 115_200;
}

/// Interrupt wiring between peripherals and the CPU.
pub mod interrupt {
    /// Number of interrupt lines the core can individually mask.
    pub const CPU_INT_LINES: u32 = 32;

    /// CPU interrupt line the tick timer is routed to.
    ///
    /// The trap dispatcher matches the `mcause` interrupt identifier against
    /// this value; it must agree with the line the interrupt matrix routes
    /// the timer source to.
    pub const TICK_CPU_LINE: u32 = 6;
}
