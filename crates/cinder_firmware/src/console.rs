//! Formatted text output over UART0.
//!
//! A thin `fmt::Write` shim over the HAL's polling UART driver, with LF to
//! CRLF conversion for serial terminals. There is deliberately no lock
//! here: the core is single-hart and the trap path prints too, so a lock
//! held by interrupted code would deadlock the handler. Interleaved output
//! under that race is accepted.

use cinder_hal::uart::Uart;
use core::fmt;

/// Console endpoint for formatted output.
pub struct Console;

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let uart = unsafe { Uart::uart0() };
        for byte in s.bytes() {
            if byte == b'\n' {
                uart.write_byte(b'\r');
            }
            uart.write_byte(byte);
        }
        Ok(())
    }
}

/// Brings UART0 up for console output. Call once, before the first print.
pub fn init() {
    unsafe { Uart::uart0() }.init();
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use fmt::Write;
    let _ = Console.write_fmt(args);
}

/// Prints a formatted line to the console.
#[macro_export]
macro_rules! println {
    ($($arg:tt)*) => ({
        $crate::console::_print(format_args!($($arg)*));
        $crate::console::_print(format_args!("\n"));
    });
}
pub use println;
