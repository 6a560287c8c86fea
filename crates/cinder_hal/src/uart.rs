//! UART0 byte sink.
//!
//! Polling transmit driver for the debug console: 8N1 at the configured
//! baud rate off the APB clock, blocking on TX FIFO space. Receive is not
//! wired up; the kernel only talks, it does not listen.

use cinder_common::{clock, mmio};
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::registers::{ReadOnly, ReadWrite, WriteOnly};
use tock_registers::{register_bitfields, register_structs};

register_bitfields![u32,
    pub CLKDIV [
        DIV_INT OFFSET(0) NUMBITS(12) [],
        DIV_FRAG OFFSET(20) NUMBITS(4) [],
    ],
    pub STATUS [
        TXFIFO_CNT OFFSET(16) NUMBITS(9) [],
    ],
    pub CONF0 [
        PARITY_EN OFFSET(1) NUMBITS(1) [],
        BIT_NUM OFFSET(2) NUMBITS(2) [],
        STOP_BIT_NUM OFFSET(4) NUMBITS(2) [],
        RXFIFO_RST OFFSET(17) NUMBITS(1) [],
        TXFIFO_RST OFFSET(18) NUMBITS(1) [],
    ],
];

register_structs! {
    /// The UART register window this driver uses.
    pub UartRegisters {
        (0x000 => fifo: ReadWrite<u32>),
        (0x004 => _reserved0),
        (0x010 => int_clr: WriteOnly<u32>),
        (0x014 => clkdiv: ReadWrite<u32, CLKDIV::Register>),
        (0x018 => _reserved1),
        (0x01c => status: ReadOnly<u32, STATUS::Register>),
        (0x020 => conf0: ReadWrite<u32, CONF0::Register>),
        (0x024 => @END),
    }
}

const FIFO_DEPTH: u32 = 128;
const FIFO_THRESHOLD: u32 = FIFO_DEPTH - 1;

const DATA_BITS_8: u32 = 3;
const STOP_BITS_1: u32 = 1;
const INT_CLEAR_ALL: u32 = 0x3f_ffff;

/// Polling transmit driver over one UART.
pub struct Uart {
    regs: *const UartRegisters,
}

impl Uart {
    /// Builds a driver over the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point at a UART register layout, valid for the lifetime
    /// of the returned value.
    pub const unsafe fn from_base(base: *const UartRegisters) -> Self {
        Self { regs: base }
    }

    /// UART0 at its fixed bus address.
    ///
    /// # Safety
    ///
    /// Must only be called on the target SoC, where UART0 is mapped at
    /// [`mmio::UART0_BASE`].
    pub unsafe fn uart0() -> Self {
        unsafe { Self::from_base(mmio::UART0_BASE as *const UartRegisters) }
    }

    fn regs(&self) -> &UartRegisters {
        unsafe { &*self.regs }
    }

    /// Configures the port for 8N1 at [`clock::BAUD_RATE`].
    ///
    /// Programs the integer and 1/16th-fractional baud divisor from the APB
    /// clock, pulses both FIFO resets, and clears any pending interrupt
    /// state left over from the boot ROM.
    pub fn init(&self) {
        let regs = self.regs();

        let div_int = clock::APB_CLK_HZ / clock::BAUD_RATE;
        let div_frag = (clock::APB_CLK_HZ % clock::BAUD_RATE) * 16 / clock::BAUD_RATE;
        regs.clkdiv
            .write(CLKDIV::DIV_INT.val(div_int) + CLKDIV::DIV_FRAG.val(div_frag));

        regs.conf0.write(
            CONF0::BIT_NUM.val(DATA_BITS_8)
                + CONF0::STOP_BIT_NUM.val(STOP_BITS_1)
                + CONF0::PARITY_EN::CLEAR,
        );

        regs.conf0
            .modify(CONF0::TXFIFO_RST::SET + CONF0::RXFIFO_RST::SET);
        regs.conf0
            .modify(CONF0::TXFIFO_RST::CLEAR + CONF0::RXFIFO_RST::CLEAR);

        regs.int_clr.set(INT_CLEAR_ALL);
    }

    /// Sends one byte, blocking until the TX FIFO has room.
    pub fn write_byte(&self, byte: u8) {
        let regs = self.regs();
        while regs.status.read(STATUS::TXFIFO_CNT) >= FIFO_THRESHOLD {
            core::hint::spin_loop();
        }
        regs.fifo.set(byte as u32);
    }

    /// Sends every byte of `s`, blocking as needed.
    ///
    /// Empty input performs no register access at all.
    pub fn puts(&self, s: &str) {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDS: usize = 0x24 / 4;
    const FIFO: usize = 0x00 / 4;
    const INT_CLR: usize = 0x10 / 4;
    const CLKDIV_W: usize = 0x14 / 4;
    const CONF0_W: usize = 0x20 / 4;

    fn uart(mem: &mut [u32; WORDS]) -> Uart {
        unsafe { Uart::from_base(mem.as_mut_ptr().cast()) }
    }

    #[test]
    fn init_programs_the_115200_divisor() {
        let mut mem = [0u32; WORDS];
        uart(&mut mem).init();
        // 80 MHz / 115200 = 694 + 7/16.
        assert_eq!(mem[CLKDIV_W] & 0xfff, 694);
        assert_eq!((mem[CLKDIV_W] >> 20) & 0xf, 7);
    }

    #[test]
    fn init_sets_8n1_and_releases_the_fifo_resets() {
        let mut mem = [0u32; WORDS];
        uart(&mut mem).init();
        let conf0 = mem[CONF0_W];
        assert_eq!((conf0 >> 2) & 0x3, DATA_BITS_8);
        assert_eq!((conf0 >> 4) & 0x3, STOP_BITS_1);
        assert_eq!(conf0 & (1 << 1), 0, "parity off");
        assert_eq!(conf0 & (0b11 << 17), 0, "fifo resets released");
        assert_eq!(mem[INT_CLR], INT_CLEAR_ALL);
    }

    #[test]
    fn write_byte_lands_in_the_fifo() {
        let mut mem = [0u32; WORDS];
        uart(&mut mem).write_byte(b'x');
        assert_eq!(mem[FIFO], b'x' as u32);
    }

    #[test]
    fn puts_sends_the_final_byte_last() {
        let mut mem = [0u32; WORDS];
        uart(&mut mem).puts("ok");
        assert_eq!(mem[FIFO], b'k' as u32);
    }

    #[test]
    fn empty_input_touches_no_registers() {
        let mut mem = [0u32; WORDS];
        uart(&mut mem).puts("");
        assert_eq!(mem, [0u32; WORDS]);
    }
}
