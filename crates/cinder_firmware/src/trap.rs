//! Trap vector installation and machine-level dispatch.
//!
//! The assembly stub in `trap.S` saves the caller-saved register file,
//! hands off to [`trap_handler_c`], restores, and `mret`s. Global interrupt
//! enable is cleared by hardware on entry and restored by `mret`; nested
//! interrupts are not supported and nothing here re-enables them mid-trap.

use cinder_hal::timg::TimerGroup;
use cinder_hal::trap::{TrapKind, classify};
use riscv::register::{mcause, mstatus, mtvec};

use crate::TICK_SLOT;
use crate::console;

use core::arch::global_asm;
global_asm!(include_str!("trap.S"));

unsafe extern "C" {
    fn _trap_vector();
}

/// Installs the trap vector.
///
/// Points `mtvec` (direct mode) at the assembly entry stub. Must run before
/// [`enable_interrupts`]; taking a trap with a stale vector is
/// unrecoverable.
pub fn init() {
    unsafe {
        mtvec::write(_trap_vector as usize, mtvec::TrapMode::Direct);
    }
}

/// Sets the global machine interrupt enable.
///
/// From this point on the CPU accepts whatever the interrupt matrix
/// delivers. No disable is exposed at this layer; the effect is
/// system-wide and permanent.
pub fn enable_interrupts() {
    unsafe {
        mstatus::set_mie();
    }
}

/// Machine trap dispatch, called from the assembly stub.
///
/// Classifies `mcause` and routes: the tick line goes to the timer
/// handler, everything else gets a one-line diagnostic. All paths return
/// normally and the stub resumes the interrupted context.
#[unsafe(no_mangle)]
pub extern "C" fn trap_handler_c() {
    let cause = mcause::read().bits() as u32;
    match classify(cause) {
        TrapKind::Tick => {
            let timg0 = unsafe { TimerGroup::timg0() };
            timg0.handle_interrupt(&TICK_SLOT);
        }
        TrapKind::UnhandledInterrupt(id) => {
            console::println!("unhandled interrupt {}", id);
        }
        TrapKind::Exception(code) => {
            console::println!("exception {}", code);
        }
    }
}
