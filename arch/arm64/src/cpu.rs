// =============================================================================
// Pulse - CPU Utilities
// =============================================================================
// ARM64 CPU control: interrupt masking, barriers, idling and busy-waits.
// Instruction-level helpers compile to no-ops or compiler fences off-target
// so the drivers built on them can be unit tested on the host.
// =============================================================================

#[cfg(target_arch = "aarch64")]
use core::arch::asm;

/// Halt the CPU in a low-power state.
///
/// This function never returns. It's used when a fatal error occurs.
#[inline(always)]
pub fn halt() -> ! {
    disable_interrupts();
    loop {
        wait_for_event();
    }
}

/// Enable IRQs at the processor level.
///
/// # Safety
/// The vector table must be installed and every interrupt source that can
/// fire must have a handler ready.
#[inline(always)]
pub unsafe fn enable_interrupts() {
    #[cfg(target_arch = "aarch64")]
    asm!("msr daifclr, #2", "isb", options(nostack)); // Clear IRQ mask
}

/// Disable IRQs at the processor level.
#[inline(always)]
pub fn disable_interrupts() {
    #[cfg(target_arch = "aarch64")]
    unsafe {
        asm!("msr daifset, #2", "isb", options(nostack)); // Set IRQ mask
    }
}

/// Sleep until an interrupt (or a debug event) wakes the core.
#[inline(always)]
pub fn wait_for_interrupt() {
    #[cfg(target_arch = "aarch64")]
    unsafe {
        asm!("wfi", options(nomem, nostack));
    }
    #[cfg(not(target_arch = "aarch64"))]
    core::hint::spin_loop();
}

#[inline(always)]
fn wait_for_event() {
    #[cfg(target_arch = "aarch64")]
    unsafe {
        asm!("wfe", options(nomem, nostack));
    }
    #[cfg(not(target_arch = "aarch64"))]
    core::hint::spin_loop();
}

/// Full-system data synchronization barrier.
#[inline(always)]
pub fn dsb() {
    #[cfg(target_arch = "aarch64")]
    unsafe {
        asm!("dsb sy", options(nostack));
    }
    #[cfg(not(target_arch = "aarch64"))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}

/// Instruction synchronization barrier.
#[inline(always)]
pub fn isb() {
    #[cfg(target_arch = "aarch64")]
    unsafe {
        asm!("isb", options(nostack));
    }
    #[cfg(not(target_arch = "aarch64"))]
    core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
}

/// Spin for roughly `count` instructions.
///
/// Used where the hardware wants a settle time measured in cycles (the
/// BCM2837 pull-up/down clocking sequence) and no timer is running yet.
#[inline(never)]
pub fn delay_cycles(count: u32) {
    for _ in 0..count {
        #[cfg(target_arch = "aarch64")]
        unsafe {
            asm!("nop", options(nomem, nostack));
        }
        #[cfg(not(target_arch = "aarch64"))]
        core::hint::spin_loop();
    }
}

/// Get the current exception level (0-3).
#[cfg(target_arch = "aarch64")]
#[inline(always)]
pub fn current_el() -> u8 {
    let el: u64;
    unsafe {
        asm!("mrs {}, CurrentEL", out(reg) el, options(nomem, nostack));
    }
    ((el >> 2) & 0x3) as u8
}
