// =============================================================================
// Pulse - Periodic Tick Subsystem
// =============================================================================
// Owns the tick state (reload value, tick counter, timer line) together with
// the timer and interrupt controller that produce it. Bring-up constructs one
// `TickTimer` and registers it as the IRQ handler; after that the interrupt
// path is its only user.
//
// Servicing one interrupt:
//
//   Idle --IRQ--> Dispatching --claim matches line--> Servicing --> Done --> Idle
//                      |                                            ^
//                      +------------- claim does not match ---------+
//
// Servicing re-arms the timer first, then counts and reports the tick. Done
// always completes the claim, so a GIC sees one EOI per acknowledge even for
// IDs we don't own.
// =============================================================================

use core::sync::atomic::{AtomicU64, Ordering};

use spin::Mutex;

use pulse_arch_arm64::console::{Console, Transmit};
use pulse_arch_arm64::exception::IrqHandler;
use pulse_arch_arm64::gic::SPURIOUS_ID;
use pulse_arch_arm64::irq::{InterruptController, InterruptLine};
use pulse_arch_arm64::timer::{self, ReloadValue, TimerSource};

/// The timer's interrupt line and the priority to give it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    pub line: InterruptLine,
    pub priority: u8,
}

/// Line printed for every serviced tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickMessage {
    /// `tick <n>`
    Counted,
    /// `[tick]`
    Marker,
}

/// Result of one pass through the interrupt service routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Serviced {
    /// The timer fired; carries the tick count after incrementing.
    Tick(u64),
    /// Something other than the timer was pending.
    Ignored,
}

pub struct TickTimer<'c, T, R, P> {
    timer: T,
    router: R,
    console: &'c Mutex<Console<P>>,
    line: LineConfig,
    reload: ReloadValue,
    message: TickMessage,
    ticks: AtomicU64,
}

impl<'c, T, R, P> TickTimer<'c, T, R, P>
where
    T: TimerSource,
    R: InterruptController,
    P: Transmit,
{
    /// Start `timer` at `hz` and route its interrupt through `router`.
    ///
    /// The timer is programmed before the controller lets its line through.
    /// Processor-level IRQs must stay masked until the returned value is
    /// registered as the IRQ handler.
    pub fn bring_up(
        timer: T,
        router: R,
        console: &'c Mutex<Console<P>>,
        line: LineConfig,
        hz: u32,
        message: TickMessage,
    ) -> Self {
        let reload = timer::start_periodic(&timer, hz);

        router.init();
        router.enable_line(line.line, line.priority);

        Self {
            timer,
            router,
            console,
            line,
            reload,
            message,
            ticks: AtomicU64::new(0),
        }
    }

    /// Service one interrupt.
    pub fn service(&self) -> Serviced {
        let claim = self.router.claim();

        let outcome = if claim.matches(self.line.line) {
            // Re-arm before anything else to keep the period tight
            self.timer.arm(self.reload.get());
            let count = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
            self.report(count);
            Serviced::Tick(count)
        } else {
            match claim.id() {
                Some(SPURIOUS_ID) => log::trace!("spurious interrupt"),
                Some(id) => log::debug!("ignoring interrupt {}", id),
                None => log::debug!("ignoring {:?}", claim),
            }
            Serviced::Ignored
        };

        self.router.complete(claim);
        outcome
    }

    fn report(&self, count: u64) {
        let console = self.console.lock();
        match self.message {
            TickMessage::Counted => {
                console.put_str("tick ");
                console.put_u64(count);
            }
            TickMessage::Marker => console.put_str("[tick]"),
        }
        // Bare line feed, no CR expansion
        console.put_char(b'\n');
    }

    /// Ticks serviced so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn reload(&self) -> ReloadValue {
        self.reload
    }

    pub fn router(&self) -> &R {
        &self.router
    }
}

impl<'c, T, R, P> IrqHandler for TickTimer<'c, T, R, P>
where
    T: TimerSource + Sync,
    R: InterruptController + Sync,
    P: Transmit + Send,
{
    fn handle_irq(&self) {
        self.service();
    }
}
