// =============================================================================
// Pulse - ARM Generic Timer
// =============================================================================
// Driver for the ARMv8 Generic Timer countdown registers. Either the virtual
// (CNTV_*) or the non-secure physical (CNTP_*) timer can drive the tick; the
// board configuration picks one.
//
// How the expiry reaches the core (local controller bit or GIC PPI) is the
// interrupt router's business, not this module's.
// =============================================================================

use bitflags::bitflags;

use crate::local_intc::CoreIrqSources;

/// Countdown timer register set.
pub trait TimerSource {
    /// Counter frequency in ticks per second, as reported by the hardware.
    fn frequency(&self) -> u64;

    /// Fire after `reload` counter ticks from now.
    fn arm(&self, reload: u32);

    /// Start counting with the interrupt unmasked.
    fn enable(&self);

    /// Stop counting.
    fn disable(&self);
}

bitflags! {
    /// CNTV_CTL_EL0 / CNTP_CTL_EL0 bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TimerControl: u64 {
        /// Timer enabled
        const ENABLE = 1 << 0;
        /// Interrupt masked
        const IMASK = 1 << 1;
        /// Condition met (read-only)
        const ISTATUS = 1 << 2;
    }
}

/// Which of the EL1-accessible generic timers drives the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerChannel {
    /// CNTV: virtual timer, counts CNTVCT = CNTPCT - CNTVOFF.
    Virtual,
    /// CNTP: non-secure EL1 physical timer.
    Physical,
}

impl TimerChannel {
    /// Private peripheral interrupt the GIC uses for this timer.
    pub const fn gic_ppi(self) -> u32 {
        match self {
            TimerChannel::Virtual => 27,
            TimerChannel::Physical => 30,
        }
    }

    /// Source bit the BCM2836 local controller uses for this timer.
    pub const fn local_source(self) -> CoreIrqSources {
        match self {
            TimerChannel::Virtual => CoreIrqSources::CNTV,
            TimerChannel::Physical => CoreIrqSources::CNTPNS,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            TimerChannel::Virtual => "virtual (CNTV)",
            TimerChannel::Physical => "physical (CNTP)",
        }
    }
}

/// Largest countdown TVAL can hold. The register is a signed 32-bit
/// downcounter, so anything above this would be read back as negative and
/// fire immediately.
pub const MAX_RELOAD: u32 = i32::MAX as u32;

/// Counter ticks per interrupt period. Never zero, never above [`MAX_RELOAD`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadValue(u32);

impl ReloadValue {
    /// Ticks per period for `hz` interrupts per second on a counter running
    /// at `frequency`.
    ///
    /// Clamped to at least 1 (a zero countdown fires continuously) and to
    /// at most [`MAX_RELOAD`]. A zero frequency or rate yields 1.
    pub const fn compute(frequency: u64, hz: u32) -> Self {
        if frequency == 0 || hz == 0 {
            return Self(1);
        }
        let ticks = frequency / hz as u64;
        if ticks == 0 {
            Self(1)
        } else if ticks > MAX_RELOAD as u64 {
            Self(MAX_RELOAD)
        } else {
            Self(ticks as u32)
        }
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Program `timer` to fire `hz` times per second and start it.
///
/// The timer is disabled before the countdown is written so a stale value
/// can't fire in between.
pub fn start_periodic<T: TimerSource + ?Sized>(timer: &T, hz: u32) -> ReloadValue {
    let reload = ReloadValue::compute(timer.frequency(), hz);
    timer.disable();
    timer.arm(reload.get());
    timer.enable();
    reload
}

// =============================================================================
// System register implementation
// =============================================================================

/// The generic timer of the executing core.
#[cfg(target_arch = "aarch64")]
#[derive(Debug, Clone, Copy)]
pub struct GenericTimer {
    channel: TimerChannel,
}

#[cfg(target_arch = "aarch64")]
impl GenericTimer {
    pub const fn new(channel: TimerChannel) -> Self {
        Self { channel }
    }

    fn write_control(&self, ctl: TimerControl) {
        use core::arch::asm;
        let bits = ctl.bits();
        unsafe {
            match self.channel {
                TimerChannel::Virtual => asm!("msr cntv_ctl_el0, {}", in(reg) bits, options(nostack)),
                TimerChannel::Physical => asm!("msr cntp_ctl_el0, {}", in(reg) bits, options(nostack)),
            }
            asm!("isb", options(nostack));
        }
    }
}

#[cfg(target_arch = "aarch64")]
impl TimerSource for GenericTimer {
    fn frequency(&self) -> u64 {
        let freq: u64;
        unsafe {
            core::arch::asm!("mrs {}, cntfrq_el0", out(reg) freq, options(nomem, nostack));
        }
        freq
    }

    fn arm(&self, reload: u32) {
        use core::arch::asm;
        // TVAL is a signed 32-bit downcounter; writing it also clears ISTATUS
        // and with it the level-triggered interrupt.
        let tval = reload.min(MAX_RELOAD) as u64;
        unsafe {
            match self.channel {
                TimerChannel::Virtual => asm!("msr cntv_tval_el0, {}", in(reg) tval, options(nostack)),
                TimerChannel::Physical => asm!("msr cntp_tval_el0, {}", in(reg) tval, options(nostack)),
            }
        }
    }

    fn enable(&self) {
        // IMASK clear: the expiry raises the interrupt
        self.write_control(TimerControl::ENABLE);
    }

    fn disable(&self) {
        self.write_control(TimerControl::empty());
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::TimerSource;
    use core::cell::RefCell;
    use std::vec::Vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TimerOp {
        Arm(u32),
        Enable,
        Disable,
    }

    /// Timer that records every operation.
    pub struct MockTimer {
        pub frequency: u64,
        pub ops: RefCell<Vec<TimerOp>>,
    }

    impl MockTimer {
        pub fn new(frequency: u64) -> Self {
            Self { frequency, ops: RefCell::new(Vec::new()) }
        }
    }

    impl TimerSource for MockTimer {
        fn frequency(&self) -> u64 {
            self.frequency
        }

        fn arm(&self, reload: u32) {
            self.ops.borrow_mut().push(TimerOp::Arm(reload));
        }

        fn enable(&self) {
            self.ops.borrow_mut().push(TimerOp::Enable);
        }

        fn disable(&self) {
            self.ops.borrow_mut().push(TimerOp::Disable);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{MockTimer, TimerOp};
    use super::*;

    #[test]
    fn reload_is_frequency_over_rate() {
        assert_eq!(ReloadValue::compute(1_000_000, 1).get(), 1_000_000);
        assert_eq!(ReloadValue::compute(62_500_000, 1).get(), 62_500_000);
        assert_eq!(ReloadValue::compute(19_200_000, 100).get(), 192_000);
        assert_eq!(ReloadValue::compute(10, 3).get(), 3);
    }

    #[test]
    fn reload_never_zero() {
        assert_eq!(ReloadValue::compute(0, 1).get(), 1);
        assert_eq!(ReloadValue::compute(1_000_000, 0).get(), 1);
        assert_eq!(ReloadValue::compute(0, 0).get(), 1);
        // rate faster than the counter
        assert_eq!(ReloadValue::compute(5, 1000).get(), 1);
    }

    #[test]
    fn reload_saturates_at_signed_register_width() {
        assert_eq!(ReloadValue::compute(u64::MAX, 1).get(), MAX_RELOAD);
        assert_eq!(ReloadValue::compute(u32::MAX as u64 + 1, 1).get(), MAX_RELOAD);
        assert_eq!(ReloadValue::compute(i32::MAX as u64, 1).get(), MAX_RELOAD);
        assert_eq!(ReloadValue::compute(i32::MAX as u64 - 1, 1).get(), MAX_RELOAD - 1);
    }

    #[test]
    fn reload_stays_positive_as_signed_countdown() {
        // 3 GHz at 1 Hz does not fit TVAL's 31 magnitude bits
        let reload = ReloadValue::compute(3_000_000_000, 1).get();
        assert!(reload as i32 > 0);
        assert_eq!(reload, MAX_RELOAD);

        for frequency in [1, 19_200_000, 62_500_000, 1 << 31, 1 << 40, u64::MAX] {
            assert!(ReloadValue::compute(frequency, 1).get() as i32 > 0);
        }
    }

    #[test]
    fn start_disables_before_arming() {
        let timer = MockTimer::new(1_000_000);
        let reload = start_periodic(&timer, 1);
        assert_eq!(reload.get(), 1_000_000);
        assert_eq!(
            *timer.ops.borrow(),
            [TimerOp::Disable, TimerOp::Arm(1_000_000), TimerOp::Enable]
        );
    }

    #[test]
    fn timer_lines_per_channel() {
        assert_eq!(TimerChannel::Virtual.gic_ppi(), 27);
        assert_eq!(TimerChannel::Physical.gic_ppi(), 30);
        assert_eq!(TimerChannel::Virtual.local_source().bits(), 1 << 3);
        assert_eq!(TimerChannel::Physical.local_source().bits(), 1 << 1);
    }
}
