//! Timer group driver: the kernel's periodic tick source.
//!
//! Timer 0 of a timer group runs as a free-running counter with a periodic
//! alarm. `init` brings the whole delivery path up in dependency order;
//! `handle_interrupt` services one alarm firing from the trap dispatcher.
//! The main watchdog lives in the same register block and is fed on every
//! tick so it never resets the system from under a healthy kernel.

use core::mem;
use core::sync::atomic::{AtomicUsize, Ordering};

use cinder_common::{clock, mmio};
use tock_registers::interfaces::{ReadWriteable, Writeable};
use tock_registers::registers::{ReadOnly, ReadWrite, WriteOnly};
use tock_registers::{register_bitfields, register_structs};

use crate::intmatrix::{InterruptMatrix, InterruptSource};
use crate::sysctl::{Peripheral, SystemControl};

register_bitfields![u32,
    pub T0CONFIG [
        EN OFFSET(31) NUMBITS(1) [],
        INCREASE OFFSET(30) NUMBITS(1) [],
        AUTORELOAD OFFSET(29) NUMBITS(1) [],
        DIVIDER OFFSET(13) NUMBITS(16) [],
        ALARM_EN OFFSET(10) NUMBITS(1) [],
    ],
    pub INT [
        T0 OFFSET(0) NUMBITS(1) [],
        WDT OFFSET(1) NUMBITS(1) [],
    ],
];

register_structs! {
    /// One timer group's register block (timer 0 plus the watchdog).
    pub TimgRegisters {
        (0x000 => t0config: ReadWrite<u32, T0CONFIG::Register>),
        (0x004 => t0lo: ReadOnly<u32>),
        (0x008 => t0hi: ReadOnly<u32>),
        (0x00c => t0update: WriteOnly<u32>),
        (0x010 => t0alarmlo: ReadWrite<u32>),
        (0x014 => t0alarmhi: ReadWrite<u32>),
        (0x018 => t0loadlo: ReadWrite<u32>),
        (0x01c => t0loadhi: ReadWrite<u32>),
        (0x020 => t0load: WriteOnly<u32>),
        (0x024 => _reserved0),
        (0x048 => wdtconfig0: ReadWrite<u32>),
        (0x04c => _reserved1),
        (0x060 => wdtfeed: WriteOnly<u32>),
        (0x064 => wdtwprotect: ReadWrite<u32>),
        (0x068 => _reserved2),
        (0x070 => int_ena: ReadWrite<u32, INT::Register>),
        (0x074 => int_raw: ReadOnly<u32, INT::Register>),
        (0x078 => int_st: ReadOnly<u32, INT::Register>),
        (0x07c => int_clr: WriteOnly<u32, INT::Register>),
        (0x080 => _reserved3),
        (0x100 => @END),
    }
}

/// Alarm threshold in prescaled counts for one period of `tick_hz`.
///
/// The counter increments at `apb_hz / prescaler`, so one tick period spans
/// `apb_hz / prescaler / tick_hz` counts. 80 MHz through a prescaler of
/// 1600 at 100 Hz gives exactly 500.
pub const fn alarm_ticks(apb_hz: u32, prescaler: u32, tick_hz: u32) -> u64 {
    apb_hz as u64 / prescaler as u64 / tick_hz as u64
}

/// The tick-callback slot.
///
/// A single pointer-sized atomic cell holding an optional `fn()`. Written
/// from normal context via [`TickSlot::set`], read from interrupt context
/// on every alarm. Replacing the callback while interrupts are live is an
/// accepted race: a concurrent reader observes either the old or the new
/// value, never a torn one. The stored function must not block and must not
/// cause a re-entrant trap.
pub struct TickSlot(AtomicUsize);

impl TickSlot {
    /// An empty slot; no callback is invoked until one is registered.
    pub const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    /// Unconditionally overwrites the slot. Last write wins.
    ///
    /// `None` disables tick notification without stopping the hardware
    /// timer.
    pub fn set(&self, callback: Option<fn()>) {
        let raw = match callback {
            Some(f) => f as usize,
            None => 0,
        };
        self.0.store(raw, Ordering::Relaxed);
    }

    /// The currently registered callback, if any.
    pub fn get(&self) -> Option<fn()> {
        let raw = self.0.load(Ordering::Relaxed);
        if raw == 0 {
            None
        } else {
            // Non-zero values only ever come from `set`, which stored a
            // valid fn pointer.
            Some(unsafe { mem::transmute::<usize, fn()>(raw) })
        }
    }
}

impl Default for TickSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Driver over one timer group, bound to its peripheral identity and its
/// interrupt matrix source number.
pub struct TimerGroup {
    regs: *const TimgRegisters,
    peripheral: Peripheral,
    source: InterruptSource,
}

impl TimerGroup {
    /// Builds a driver over the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point at a timer group register layout, valid for the
    /// lifetime of the returned value, and `peripheral`/`source` must be
    /// the identity of that block.
    pub const unsafe fn from_base(
        base: *const TimgRegisters,
        peripheral: Peripheral,
        source: InterruptSource,
    ) -> Self {
        Self {
            regs: base,
            peripheral,
            source,
        }
    }

    /// Timer group 0 at its fixed bus address.
    ///
    /// # Safety
    ///
    /// Must only be called on the target SoC, where the block is mapped at
    /// [`mmio::TIMG0_BASE`].
    pub unsafe fn timg0() -> Self {
        unsafe {
            Self::from_base(
                mmio::TIMG0_BASE as *const TimgRegisters,
                Peripheral::Timg0,
                InterruptSource::Timg0T0,
            )
        }
    }

    fn regs(&self) -> &TimgRegisters {
        unsafe { &*self.regs }
    }

    /// Brings timer 0 up as the periodic tick source on `cpu_line`.
    ///
    /// The sequence is order-sensitive: the divider and alarm threshold are
    /// programmed while the counter is stopped, and the matrix route plus
    /// line enable are in place before the timer's own interrupt is
    /// unmasked. Violating either order loses the first alarm into a
    /// stopped counter or a masked line.
    pub fn init(&self, sysctl: &SystemControl, matrix: &InterruptMatrix, cpu_line: u32) {
        sysctl.enable_clock(self.peripheral);
        sysctl.reset_peripheral(self.peripheral);

        let regs = self.regs();
        regs.t0config.set(0);

        let ticks = alarm_ticks(clock::APB_CLK_HZ, clock::TICK_PRESCALER, clock::TICK_HZ);
        regs.t0alarmlo.set(ticks as u32);
        // High word pinned to zero: a 32-bit alarm space is ample for the
        // configured tick rates.
        regs.t0alarmhi.set(0);

        regs.t0config.modify(
            T0CONFIG::DIVIDER.val(clock::TICK_PRESCALER)
                + T0CONFIG::INCREASE::SET
                + T0CONFIG::AUTORELOAD::SET,
        );

        matrix.route(self.source, cpu_line);
        matrix.enable(cpu_line);
        regs.int_ena.modify(INT::T0::SET);

        regs.t0loadlo.set(0);
        regs.t0loadhi.set(0);
        regs.t0load.set(1);

        regs.t0config
            .modify(T0CONFIG::EN::SET + T0CONFIG::ALARM_EN::SET);
    }

    /// Services one alarm firing.
    ///
    /// Only meaningful from the trap dispatcher once the classified
    /// interrupt identifier matches the tick line. The watchdog sharing
    /// this block is fed first, before anything that could run long; the
    /// status bit must be cleared before returning or the trap re-fires;
    /// ALARM_EN self-clears on fire even though the counter auto-reloads,
    /// so it is re-asserted last.
    pub fn handle_interrupt(&self, slot: &TickSlot) {
        let regs = self.regs();

        regs.wdtfeed.set(1);
        regs.int_clr.write(INT::T0::SET);

        if let Some(callback) = slot.get() {
            callback();
        }

        regs.t0config.modify(T0CONFIG::ALARM_EN::SET);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    const WORDS: usize = 0x100 / 4;
    const T0CONFIG_W: usize = 0x00 / 4;
    const T0ALARMLO: usize = 0x10 / 4;
    const T0ALARMHI: usize = 0x14 / 4;
    const T0LOADLO: usize = 0x18 / 4;
    const T0LOADHI: usize = 0x1c / 4;
    const T0LOAD: usize = 0x20 / 4;
    const WDTFEED: usize = 0x60 / 4;
    const INT_ENA: usize = 0x70 / 4;
    const INT_CLR: usize = 0x7c / 4;

    const EN: u32 = 1 << 31;
    const INCREASE: u32 = 1 << 30;
    const AUTORELOAD: u32 = 1 << 29;
    const ALARM_EN: u32 = 1 << 10;

    fn timer(mem: &mut [u32; WORDS]) -> TimerGroup {
        unsafe {
            TimerGroup::from_base(
                mem.as_mut_ptr().cast(),
                Peripheral::Timg0,
                InterruptSource::Timg0T0,
            )
        }
    }

    #[test]
    fn alarm_ticks_matches_the_reference_configuration() {
        assert_eq!(alarm_ticks(80_000_000, 1600, 100), 500);
    }

    #[test]
    fn alarm_ticks_truncates() {
        assert_eq!(alarm_ticks(80_000_000, 1600, 3), 16_666);
    }

    #[test]
    fn init_programs_the_full_delivery_path() {
        let mut timg_mem = [0u32; WORDS];
        let mut sys_mem = [0u32; 8];
        let mut matrix_mem = [0u32; 0x108 / 4];

        let sysctl = unsafe { SystemControl::from_base(sys_mem.as_mut_ptr().cast()) };
        let matrix = unsafe { InterruptMatrix::from_base(matrix_mem.as_mut_ptr().cast()) };
        timer(&mut timg_mem).init(&sysctl, &matrix, 6);

        // Clock gated on, reset released.
        assert_eq!(sys_mem[0x10 / 4], Peripheral::Timg0.mask());
        assert_eq!(sys_mem[0x18 / 4], 0);

        // Source 32 routed to line 6 and the line unmasked.
        assert_eq!(matrix_mem[32], 6);
        assert_eq!(matrix_mem[0x104 / 4], 1 << 6);

        // Threshold 500 in the low word only.
        assert_eq!(timg_mem[T0ALARMLO], 500);
        assert_eq!(timg_mem[T0ALARMHI], 0);

        // Counter zeroed through the load registers.
        assert_eq!(timg_mem[T0LOADLO], 0);
        assert_eq!(timg_mem[T0LOADHI], 0);
        assert_ne!(timg_mem[T0LOAD], 0, "load trigger was written");

        let config = timg_mem[T0CONFIG_W];
        assert_eq!(config & EN, EN);
        assert_eq!(config & INCREASE, INCREASE);
        assert_eq!(config & AUTORELOAD, AUTORELOAD);
        assert_eq!(config & ALARM_EN, ALARM_EN);
        assert_eq!((config >> 13) & 0xffff, 1600);

        assert_eq!(timg_mem[INT_ENA], 1, "timer 0 interrupt unmasked");
    }

    #[test]
    fn handle_interrupt_feeds_clears_and_rearms() {
        let mut mem = [0u32; WORDS];
        // Running counter with the alarm already consumed by the hardware.
        mem[T0CONFIG_W] = EN | INCREASE | AUTORELOAD;

        let slot = TickSlot::new();
        timer(&mut mem).handle_interrupt(&slot);

        assert_ne!(mem[WDTFEED], 0, "watchdog was fed");
        assert_eq!(mem[INT_CLR], 1, "timer 0 status bit cleared");
        assert_eq!(mem[T0CONFIG_W] & ALARM_EN, ALARM_EN, "alarm re-armed");
        assert_eq!(
            mem[T0CONFIG_W] & (EN | INCREASE | AUTORELOAD),
            EN | INCREASE | AUTORELOAD,
            "running configuration untouched"
        );
    }

    #[test]
    fn handle_interrupt_invokes_the_callback_exactly_once() {
        static HITS: AtomicUsize = AtomicUsize::new(0);
        fn tick() {
            HITS.fetch_add(1, Ordering::Relaxed);
        }

        let mut mem = [0u32; WORDS];
        let slot = TickSlot::new();
        slot.set(Some(tick));
        timer(&mut mem).handle_interrupt(&slot);
        assert_eq!(HITS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn last_registered_callback_wins() {
        static HITS_A: AtomicUsize = AtomicUsize::new(0);
        static HITS_B: AtomicUsize = AtomicUsize::new(0);
        fn tick_a() {
            HITS_A.fetch_add(1, Ordering::Relaxed);
        }
        fn tick_b() {
            HITS_B.fetch_add(1, Ordering::Relaxed);
        }

        let mut mem = [0u32; WORDS];
        let slot = TickSlot::new();
        slot.set(Some(tick_a));
        slot.set(Some(tick_b));
        timer(&mut mem).handle_interrupt(&slot);

        assert_eq!(HITS_A.load(Ordering::Relaxed), 0, "no queuing of old callbacks");
        assert_eq!(HITS_B.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn clearing_the_slot_stops_notification_but_not_servicing() {
        static HITS: AtomicUsize = AtomicUsize::new(0);
        fn tick() {
            HITS.fetch_add(1, Ordering::Relaxed);
        }

        let mut mem = [0u32; WORDS];
        let slot = TickSlot::new();
        slot.set(Some(tick));
        slot.set(None);
        timer(&mut mem).handle_interrupt(&slot);

        assert_eq!(HITS.load(Ordering::Relaxed), 0);
        assert_eq!(mem[INT_CLR], 1, "the alarm is still serviced");
        assert_eq!(mem[T0CONFIG_W] & ALARM_EN, ALARM_EN);
    }

    #[test]
    fn tick_slot_starts_empty() {
        assert!(TickSlot::new().get().is_none());
    }
}
