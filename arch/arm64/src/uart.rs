// =============================================================================
// Pulse - PL011 UART Driver
// =============================================================================
// Driver for the ARM PL011 UART (Universal Asynchronous Receiver/Transmitter).
// This is the serial console on QEMU's virt machine and on the Raspberry Pi
// boards (UART0).
//
// Only the transmit side is used; RX is enabled but never read.
//
// Reference: ARM PrimeCell UART (PL011) Technical Reference Manual
// =============================================================================

use bitflags::bitflags;

use crate::console::Transmit;
use crate::cpu;
use crate::mmio::RegisterBlock;

// =============================================================================
// PL011 Register Definitions
// =============================================================================

/// UART Register Offsets from base address
mod regs {
    /// Data Register - read/write data here
    pub const DR: usize = 0x00;

    /// Flag Register - contains UART status flags
    pub const FR: usize = 0x18;

    /// Integer Baud Rate Register
    pub const IBRD: usize = 0x24;

    /// Fractional Baud Rate Register
    pub const FBRD: usize = 0x28;

    /// Line Control Register
    pub const LCR_H: usize = 0x2C;

    /// Control Register
    pub const CR: usize = 0x30;

    /// Interrupt Mask Set/Clear Register
    pub const IMSC: usize = 0x38;

    /// Interrupt Clear Register (write 1 to clear)
    pub const ICR: usize = 0x44;
}

bitflags! {
    /// Flag Register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u32 {
        /// UART busy transmitting
        const BUSY = 1 << 3;
        /// Receive FIFO empty
        const RXFE = 1 << 4;
        /// Transmit FIFO full
        const TXFF = 1 << 5;
        /// Transmit FIFO empty
        const TXFE = 1 << 7;
    }
}

bitflags! {
    /// Line Control Register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LineControl: u32 {
        /// Enable FIFOs
        const FEN = 1 << 4;
        /// Word length: 8 bits (bits 5-6 = 0b11)
        const WLEN_8 = 0b11 << 5;
    }
}

bitflags! {
    /// Control Register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Control: u32 {
        /// UART enable
        const UARTEN = 1 << 0;
        /// Transmit enable
        const TXE = 1 << 8;
        /// Receive enable
        const RXE = 1 << 9;
    }
}

/// Every interrupt source bit in IMSC/ICR.
const ALL_INTERRUPTS: u32 = 0x7FF;

/// Console line rate. Fixed; not configurable at run time.
pub const BAUD_RATE: u32 = 115_200;

/// Baud rate divisor split the way IBRD/FBRD want it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divisor {
    pub integer: u32,
    pub fraction: u32,
}

impl Divisor {
    /// Divisor for `baud` from a `clock_hz` reference clock.
    ///
    /// The PL011 divides by 16 * (IBRD + FBRD / 64); work in 64ths and round
    /// to nearest.
    pub const fn for_baud(clock_hz: u32, baud: u32) -> Self {
        let sixty_fourths = (clock_hz as u64 * 4 + baud as u64 / 2) / baud as u64;
        Self {
            integer: (sixty_fourths >> 6) as u32,
            fraction: (sixty_fourths & 0x3F) as u32,
        }
    }
}

// =============================================================================
// UART Driver Implementation
// =============================================================================

/// PL011 UART driver
#[derive(Debug)]
pub struct Pl011 {
    regs: RegisterBlock,
    divisor: Divisor,
}

impl Pl011 {
    /// Create a driver for the UART at `base` clocked from `clock_hz`.
    ///
    /// # Safety
    /// `base` must point at a PL011 register block, and no other code may
    /// drive the same UART.
    pub const unsafe fn new(base: usize, clock_hz: u32) -> Self {
        Self {
            regs: RegisterBlock::new(base),
            divisor: Divisor::for_baud(clock_hz, BAUD_RATE),
        }
    }

    fn flags(&self) -> Flags {
        Flags::from_bits_retain(self.regs.reg(regs::FR).read())
    }

    /// Initialize the UART.
    ///
    /// Configures 8-N-1 at [`BAUD_RATE`] with FIFOs enabled and all UART
    /// interrupts masked.
    pub fn init(&self) {
        // Disable UART while configuring
        self.regs.reg(regs::CR).write(0);
        cpu::dsb();
        cpu::isb();

        // Mask and clear all interrupts
        self.regs.reg(regs::IMSC).write(0);
        self.regs.reg(regs::ICR).write(ALL_INTERRUPTS);

        self.regs.reg(regs::IBRD).write(self.divisor.integer);
        self.regs.reg(regs::FBRD).write(self.divisor.fraction);

        // LCR_H must be written after the divisors to latch them
        self.regs.reg(regs::LCR_H).write((LineControl::WLEN_8 | LineControl::FEN).bits());

        self.regs
            .reg(regs::CR)
            .write((Control::UARTEN | Control::TXE | Control::RXE).bits());
        cpu::dsb();
        cpu::isb();
    }
}

impl Transmit for Pl011 {
    fn is_busy(&self) -> bool {
        self.flags().contains(Flags::TXFF)
    }

    fn write_byte(&self, byte: u8) {
        self.regs.reg(regs::DR).write(byte as u32);
    }
}
