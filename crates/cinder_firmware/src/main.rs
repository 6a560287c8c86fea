//! cinder kernel image for the ESP32-C3.
//!
//! Boot brings the tick heartbeat up in dependency order: console first so
//! later stages can report, then the timer (which gates its own clock and
//! wires the interrupt matrix), then the trap vector, and only then the
//! global interrupt enable. After that the core idles and every further
//! action is interrupt-driven.

#![no_std]
#![no_main]

use cinder_common::clock;
use cinder_common::interrupt::TICK_CPU_LINE;
use cinder_hal::intmatrix::InterruptMatrix;
use cinder_hal::sysctl::SystemControl;
use cinder_hal::timg::{TickSlot, TimerGroup};

mod console;
mod trap;

use core::arch::global_asm;
global_asm!(include_str!("entry.S"));

/// The kernel's tick-callback slot.
///
/// Written from boot (and any later normal-context re-registration), read
/// by the trap path on every alarm.
pub static TICK_SLOT: TickSlot = TickSlot::new();

/// Tick handler registered at boot.
fn kernel_tick() {
    console::println!("tick");
}

#[unsafe(no_mangle)]
pub extern "C" fn kmain() -> ! {
    console::init();

    let sysctl = unsafe { SystemControl::system() };
    let matrix = unsafe { InterruptMatrix::core0() };
    let timg0 = unsafe { TimerGroup::timg0() };
    timg0.init(&sysctl, &matrix, TICK_CPU_LINE);

    trap::init();
    TICK_SLOT.set(Some(kernel_tick));
    trap::enable_interrupts();

    console::println!("cinder: up, {} Hz tick on line {}", clock::TICK_HZ, TICK_CPU_LINE);

    loop {
        core::hint::spin_loop();
    }
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    console::println!("PANIC: {}", info);
    loop {
        core::hint::spin_loop();
    }
}
