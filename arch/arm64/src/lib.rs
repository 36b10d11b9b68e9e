// =============================================================================
// Pulse - ARM64 Architecture Module
// =============================================================================
// This module contains all ARM64-specific code:
// - Typed MMIO register access
// - PL011 UART and console for output
// - GPIO pin multiplexing (Raspberry Pi)
// - CPU utilities
// - Exception handling and IRQ handler registration
// - Interrupt controllers (BCM2836 local controller, GICv2)
// - Generic Timer
//
// SPDX-License-Identifier: GPL-2.0
// =============================================================================

#![cfg_attr(not(test), no_std)]

pub mod mmio;
pub mod error;
pub mod console;
pub mod uart;
pub mod gpio;
pub mod cpu;
pub mod exception;
pub mod irq;
pub mod local_intc;
pub mod gic;
pub mod timer;
pub mod logger;

pub use error::{Error, Result};
