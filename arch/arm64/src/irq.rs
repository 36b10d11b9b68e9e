// =============================================================================
// Pulse - Interrupt Routing
// =============================================================================
// The capability set shared by both interrupt controllers: enable a line,
// identify what is pending, acknowledge it. The board picks the controller at
// bring-up through `Router`; interrupt handlers only ever see the trait.
// =============================================================================

use crate::error::{Error, Result};
use crate::gic::{self, GicV2};
use crate::local_intc::{CoreIrqSources, LocalIntc};

/// One physical interrupt line, in the controller's own terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptLine {
    /// Source bit(s) of the BCM2836 core-local controller.
    Local(CoreIrqSources),
    /// GIC interrupt ID.
    Id(u32),
}

impl InterruptLine {
    /// A local-controller line. Only the four timer sources can be routed.
    pub fn local(sources: CoreIrqSources) -> Result<Self> {
        if sources.is_empty() || !CoreIrqSources::TIMERS.contains(sources) {
            return Err(Error::InvalidSourceMask(sources.bits()));
        }
        Ok(InterruptLine::Local(sources))
    }

    /// A GIC line. IDs 1020-1023 are reserved.
    pub fn gic(id: u32) -> Result<Self> {
        if id >= gic::MAX_ID {
            return Err(Error::InvalidInterruptId(id));
        }
        Ok(InterruptLine::Id(id))
    }
}

/// What a controller reported when asked for the pending source.
///
/// A `Claim` obtained from [`InterruptController::claim`] must be passed to
/// [`InterruptController::complete`] exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// Pending source bits (local controller).
    Sources(CoreIrqSources),
    /// Raw acknowledge register value (GIC); the interrupt is now active.
    Acknowledged(u32),
}

impl Claim {
    /// Whether this claim identifies `line`.
    pub fn matches(&self, line: InterruptLine) -> bool {
        match (*self, line) {
            (Claim::Sources(pending), InterruptLine::Local(sources)) => pending.intersects(sources),
            (Claim::Acknowledged(iar), InterruptLine::Id(id)) => iar & gic::IAR_ID_MASK == id,
            _ => false,
        }
    }

    /// Interrupt ID carried by a GIC claim.
    pub fn id(&self) -> Option<u32> {
        match *self {
            Claim::Acknowledged(iar) => Some(iar & gic::IAR_ID_MASK),
            Claim::Sources(_) => None,
        }
    }
}

/// An interrupt controller as the timer subsystem uses it.
pub trait InterruptController {
    /// One-time controller-wide setup.
    fn init(&self) {}

    /// Let `line` reach this core. `priority` is ignored by controllers
    /// without priorities.
    fn enable_line(&self, line: InterruptLine, priority: u8);

    /// Identify the pending source. On controllers with an acknowledge
    /// register this also acknowledges it.
    fn claim(&self) -> Claim;

    /// Finish handling `claim`.
    fn complete(&self, claim: Claim);
}

/// The controller variant chosen by the board.
pub enum Router {
    Local(LocalIntc),
    Gic(GicV2),
}

impl Router {
    pub fn kind(&self) -> &'static str {
        match self {
            Router::Local(_) => "BCM2836 local controller",
            Router::Gic(_) => "GICv2",
        }
    }
}

impl InterruptController for Router {
    fn init(&self) {
        match self {
            Router::Local(intc) => intc.init(),
            Router::Gic(gic) => gic.init(),
        }
    }

    fn enable_line(&self, line: InterruptLine, priority: u8) {
        match self {
            Router::Local(intc) => intc.enable_line(line, priority),
            Router::Gic(gic) => gic.enable_line(line, priority),
        }
    }

    fn claim(&self) -> Claim {
        match self {
            Router::Local(intc) => intc.claim(),
            Router::Gic(gic) => gic.claim(),
        }
    }

    fn complete(&self, claim: Claim) {
        match self {
            Router::Local(intc) => intc.complete(claim),
            Router::Gic(gic) => gic.complete(claim),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmio::fake::FakeRegisters;

    #[test]
    fn local_line_rejects_empty_and_non_timer_masks() {
        assert_eq!(
            InterruptLine::local(CoreIrqSources::empty()),
            Err(Error::InvalidSourceMask(0))
        );
        assert_eq!(
            InterruptLine::local(CoreIrqSources::CNTV | CoreIrqSources::GPU),
            Err(Error::InvalidSourceMask((1 << 3) | (1 << 8)))
        );
        assert_eq!(
            InterruptLine::local(CoreIrqSources::CNTV),
            Ok(InterruptLine::Local(CoreIrqSources::CNTV))
        );
    }

    #[test]
    fn gic_line_rejects_reserved_ids() {
        assert_eq!(InterruptLine::gic(27), Ok(InterruptLine::Id(27)));
        assert_eq!(InterruptLine::gic(1019), Ok(InterruptLine::Id(1019)));
        assert_eq!(InterruptLine::gic(1020), Err(Error::InvalidInterruptId(1020)));
        assert_eq!(InterruptLine::gic(1023), Err(Error::InvalidInterruptId(1023)));
    }

    #[test]
    fn claims_never_match_the_other_controller_kind() {
        let sources = Claim::Sources(CoreIrqSources::CNTV);
        assert!(!sources.matches(InterruptLine::Id(3)));
        assert_eq!(sources.id(), None);

        let ack = Claim::Acknowledged(3);
        assert!(!ack.matches(InterruptLine::Local(CoreIrqSources::CNTV)));
    }

    #[test]
    fn gic_router_acknowledges_and_ends_through_the_gic() {
        let dist = FakeRegisters::new(0x1000);
        let cpu = FakeRegisters::new(0x1000);
        let router = Router::Gic(unsafe { GicV2::new(dist.base(), cpu.base()) });
        assert_eq!(router.kind(), "GICv2");

        router.init();
        router.enable_line(InterruptLine::Id(27), 0xA0);
        assert_eq!(dist.get(0x000), 1); // GICD_CTLR
        assert_eq!(cpu.get(0x004), 0xFF); // GICC_PMR
        assert_eq!(dist.get(0x100), 1 << 27); // GICD_ISENABLER0

        cpu.set(0x00C, (1 << 10) | 27); // GICC_IAR
        let claim = router.claim();
        assert_eq!(claim, Claim::Acknowledged((1 << 10) | 27));
        assert!(claim.matches(InterruptLine::Id(27)));
        router.complete(claim);
        assert_eq!(cpu.get(0x010), (1 << 10) | 27); // GICC_EOIR
    }

    #[test]
    fn local_router_routes_and_reads_core0_sources() {
        let regs = FakeRegisters::new(0x100);
        let router = Router::Local(unsafe { LocalIntc::new(regs.base()) });
        assert_eq!(router.kind(), "BCM2836 local controller");

        router.init();
        router.enable_line(InterruptLine::Local(CoreIrqSources::CNTV), 0xA0);
        assert_eq!(regs.get(0x40), 1 << 3); // CORE0_TIMER_IRQCNTL

        regs.set(0x60, (1 << 3) | (1 << 8)); // CORE0_IRQ_SOURCE
        let claim = router.claim();
        assert_eq!(claim, Claim::Sources(CoreIrqSources::CNTV | CoreIrqSources::GPU));
        assert!(claim.matches(InterruptLine::Local(CoreIrqSources::CNTV)));

        // Nothing to acknowledge on this controller
        router.complete(claim);
        assert_eq!(regs.get(0x40), 1 << 3);
        assert_eq!(regs.get(0x60), (1 << 3) | (1 << 8));
    }
}
