// =============================================================================
// Pulse - Exception Handling (Rust)
// =============================================================================
// Rust handlers for the exceptions defined in exception.S, and the IRQ
// handler registration point.
// =============================================================================

use spin::Once;

use crate::error::{Error, Result};
#[cfg(target_arch = "aarch64")]
use crate::{cpu, println};

/// Something that services the core's IRQ line.
///
/// Runs with IRQs masked, to completion, on the interrupted core's stack.
pub trait IrqHandler: Sync {
    fn handle_irq(&self);
}

static IRQ_HANDLER: Once<&'static dyn IrqHandler> = Once::new();

/// Install the handler invoked for every IRQ. Only one may ever be installed.
pub fn register_irq_handler(handler: &'static dyn IrqHandler) -> Result<()> {
    let mut installed = false;
    IRQ_HANDLER.call_once(|| {
        installed = true;
        handler
    });
    if installed {
        Ok(())
    } else {
        Err(Error::HandlerAlreadyRegistered)
    }
}

/// Run the registered handler. Returns false if none is registered, in which
/// case the IRQ is dropped.
pub fn dispatch_irq() -> bool {
    match IRQ_HANDLER.get() {
        Some(handler) => {
            handler.handle_irq();
            true
        }
        None => false,
    }
}

/// Initialize exceptions.
/// Sets the VBAR_EL1 register to point to our vector table.
///
/// # Safety
/// Must run at EL1 before IRQs are unmasked.
#[cfg(target_arch = "aarch64")]
pub unsafe fn init() {
    extern "C" {
        static exception_vector_table: u8;
    }

    let vector_addr = core::ptr::addr_of!(exception_vector_table) as u64;

    // Set VBAR_EL1 (Vector Base Address Register)
    core::arch::asm!("msr vbar_el1, {}", "isb", in(reg) vector_addr, options(nostack));
}

/// Handler for IRQ Exceptions (Hardware Interrupts).
#[cfg(target_arch = "aarch64")]
#[no_mangle]
pub extern "C" fn handle_irq_exception() {
    dispatch_irq();
}

/// Handler for Synchronous Exceptions (Data Abort, undefined instruction, ...).
/// Nothing here issues SVCs, so every one of these is fatal.
#[cfg(target_arch = "aarch64")]
#[no_mangle]
pub extern "C" fn handle_sync_exception() -> ! {
    let esr: u64;
    let elr: u64;
    let far: u64;
    unsafe {
        core::arch::asm!("mrs {}, esr_el1", out(reg) esr, options(nomem, nostack));
        core::arch::asm!("mrs {}, elr_el1", out(reg) elr, options(nomem, nostack));
        core::arch::asm!("mrs {}, far_el1", out(reg) far, options(nomem, nostack));
    }

    // SAFETY: this path halts; the interrupted holder never runs again
    unsafe { crate::console::break_lock() };

    println!("\n!!! SYNCHRONOUS EXCEPTION !!!");
    println!("ESR_EL1: {:#018x} (EC {:#04x})", esr, (esr >> 26) & 0x3F);
    println!("ELR_EL1: {:#018x}", elr);
    println!("FAR_EL1: {:#018x}", far);
    println!("System halted.");

    cpu::halt();
}

/// Handler for vectors that should never be taken (FIQ, SError, lower EL).
#[cfg(target_arch = "aarch64")]
#[no_mangle]
pub extern "C" fn handle_unexpected_exception(vector: u64) -> ! {
    // SAFETY: this path halts
    unsafe { crate::console::break_lock() };

    println!("\n!!! UNEXPECTED EXCEPTION (vector {}) !!!", vector);
    println!("System halted.");

    cpu::halt();
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};

    struct Counting(AtomicU32);

    impl IrqHandler for Counting {
        fn handle_irq(&self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    static FIRST: Counting = Counting(AtomicU32::new(0));
    static SECOND: Counting = Counting(AtomicU32::new(0));

    // The registration slot is process-wide, so the whole lifecycle is one test.
    #[test]
    fn single_registration_and_dispatch() {
        assert!(!dispatch_irq());

        assert_eq!(register_irq_handler(&FIRST), Ok(()));
        assert_eq!(register_irq_handler(&SECOND), Err(Error::HandlerAlreadyRegistered));

        assert!(dispatch_irq());
        assert!(dispatch_irq());
        assert_eq!(FIRST.0.load(Ordering::Relaxed), 2);
        assert_eq!(SECOND.0.load(Ordering::Relaxed), 0);
    }
}
