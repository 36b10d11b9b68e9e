// =============================================================================
// Pulse - BCM2836 Core-Local Interrupt Controller
// =============================================================================
// The "QA7" block at 0x4000_0000 on the Raspberry Pi 2/3/Zero 2. Each core has
// a timer interrupt control register choosing which generic timer outputs
// reach its IRQ line, and an IRQ source register saying which are pending.
//
// There is no acknowledge step: a timer source stays pending until the timer
// itself is re-armed (writing TVAL clears ISTATUS).
// =============================================================================

use bitflags::bitflags;

use crate::irq::{Claim, InterruptController, InterruptLine};
use crate::mmio::RegisterBlock;

/// Core 0 register offsets
mod regs {
    /// Core 0 timers interrupt control: one enable bit per timer source
    pub const CORE0_TIMER_IRQCNTL: usize = 0x40;

    /// Core 0 IRQ source: pending bits (read-only)
    pub const CORE0_IRQ_SOURCE: usize = 0x60;
}

bitflags! {
    /// Bits of the per-core IRQ source register. The low four also form the
    /// IRQ half of the timer interrupt control register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CoreIrqSources: u32 {
        /// Secure physical timer
        const CNTPS = 1 << 0;
        /// Non-secure physical timer
        const CNTPNS = 1 << 1;
        /// Hypervisor physical timer
        const CNTHP = 1 << 2;
        /// Virtual timer
        const CNTV = 1 << 3;
        const MAILBOX0 = 1 << 4;
        const MAILBOX1 = 1 << 5;
        const MAILBOX2 = 1 << 6;
        const MAILBOX3 = 1 << 7;
        /// GPU interrupt (core 0 only by default)
        const GPU = 1 << 8;
        const PMU = 1 << 9;
        const AXI = 1 << 10;
        const LOCAL_TIMER = 1 << 11;
    }
}

impl CoreIrqSources {
    /// The sources the timer interrupt control register can route.
    pub const TIMERS: Self = Self::CNTPS
        .union(Self::CNTPNS)
        .union(Self::CNTHP)
        .union(Self::CNTV);
}

/// Core-local controller, as seen by core 0.
#[derive(Debug)]
pub struct LocalIntc {
    regs: RegisterBlock,
}

impl LocalIntc {
    /// # Safety
    /// `base` must point at the BCM2836 local peripheral block.
    pub const unsafe fn new(base: usize) -> Self {
        Self { regs: RegisterBlock::new(base) }
    }

    /// Sources currently pending on core 0.
    pub fn pending(&self) -> CoreIrqSources {
        CoreIrqSources::from_bits_retain(self.regs.reg(regs::CORE0_IRQ_SOURCE).read())
    }
}

impl InterruptController for LocalIntc {
    fn enable_line(&self, line: InterruptLine, _priority: u8) {
        // No priorities here; the routing mask is the whole configuration
        if let InterruptLine::Local(sources) = line {
            self.regs
                .reg(regs::CORE0_TIMER_IRQCNTL)
                .write(sources.intersection(CoreIrqSources::TIMERS).bits());
        }
    }

    fn claim(&self) -> Claim {
        Claim::Sources(self.pending())
    }

    fn complete(&self, _claim: Claim) {
        // Re-arming the timer already dropped the line
    }
}
