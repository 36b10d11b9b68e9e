// =============================================================================
// Pulse - Board Configuration
// =============================================================================
// Everything that differs between targets lives in one `Board` value. The
// Cargo feature resolves to a board in `current()` and nowhere else.
// =============================================================================

use log::LevelFilter;

use pulse_arch_arm64::gpio::{Gpio, PullScheme};
use pulse_arch_arm64::gic::GicV2;
use pulse_arch_arm64::irq::{InterruptLine, Router};
use pulse_arch_arm64::local_intc::LocalIntc;
use pulse_arch_arm64::timer::TimerChannel;
use pulse_arch_arm64::uart::Pl011;
use pulse_arch_arm64::Result;

use crate::tick::{LineConfig, TickMessage};

/// Timer interrupts per second.
pub const TICK_HZ: u32 = 1;

/// Priority given to the timer line on controllers that have priorities.
pub const TIMER_PRIORITY: u8 = 0xA0;

/// Console log level.
pub const LOG_LEVEL: LevelFilter = if cfg!(feature = "log-debug") {
    LevelFilter::Debug
} else {
    LevelFilter::Info
};

/// Pin multiplexing needed before the UART can drive its pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioConfig {
    pub base: usize,
    pub pulls: PullScheme,
}

/// Interrupt controller present on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterConfig {
    /// BCM2836 core-local controller at `base`.
    Local { base: usize },
    /// GICv2 distributor and CPU interface.
    Gic { dist_base: usize, cpu_base: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    pub name: &'static str,
    pub uart_base: usize,
    pub uart_clock_hz: u32,
    pub gpio: Option<GpioConfig>,
    pub router: RouterConfig,
    pub timer: TimerChannel,
    pub tick_message: TickMessage,
    /// Status line printed once the console is up.
    pub banner: &'static str,
}

/// Raspberry Pi 3B / Zero 2W (BCM2837), virtual timer.
pub const RASPI3: Board = Board {
    name: "raspi3",
    uart_base: 0x3F20_1000,
    uart_clock_hz: 48_000_000,
    gpio: Some(GpioConfig { base: 0x3F20_0000, pulls: PullScheme::Legacy }),
    router: RouterConfig::Local { base: 0x4000_0000 },
    timer: TimerChannel::Virtual,
    tick_message: TickMessage::Counted,
    banner: "PL011 ready on Raspberry Pi Zero 2 / QEMU raspi3b.",
};

/// Raspberry Pi 3B / Zero 2W (BCM2837), non-secure physical timer.
pub const RASPI3_PHYS: Board = Board {
    name: "raspi3-phys",
    timer: TimerChannel::Physical,
    ..RASPI3
};

/// Raspberry Pi 4B (BCM2711) with the GIC-400 enabled by the firmware.
pub const RASPI4: Board = Board {
    name: "raspi4",
    uart_base: 0xFE20_1000,
    uart_clock_hz: 48_000_000,
    gpio: Some(GpioConfig { base: 0xFE20_0000, pulls: PullScheme::Bcm2711 }),
    router: RouterConfig::Gic { dist_base: 0xFF84_1000, cpu_base: 0xFF84_2000 },
    timer: TimerChannel::Physical,
    tick_message: TickMessage::Counted,
    banner: "PL011 ready on Raspberry Pi 4.",
};

/// QEMU `virt` machine with GICv2.
pub const VIRT: Board = Board {
    name: "virt",
    uart_base: 0x0900_0000,
    uart_clock_hz: 24_000_000,
    gpio: None,
    router: RouterConfig::Gic { dist_base: 0x0800_0000, cpu_base: 0x0801_0000 },
    timer: TimerChannel::Virtual,
    tick_message: TickMessage::Counted,
    banner: "PL011 ready on QEMU virt.",
};

/// The board this image was built for.
pub const fn current() -> &'static Board {
    if cfg!(feature = "board-virt") {
        &VIRT
    } else if cfg!(feature = "board-raspi4") {
        &RASPI4
    } else if cfg!(feature = "board-raspi3-phys") {
        &RASPI3_PHYS
    } else {
        &RASPI3
    }
}

impl Board {
    /// Interrupt line the configured timer raises on this board's controller.
    pub fn timer_line(&self) -> Result<InterruptLine> {
        match self.router {
            RouterConfig::Local { .. } => InterruptLine::local(self.timer.local_source()),
            RouterConfig::Gic { .. } => InterruptLine::gic(self.timer.gic_ppi()),
        }
    }

    pub fn line_config(&self) -> Result<LineConfig> {
        Ok(LineConfig {
            line: self.timer_line()?,
            priority: TIMER_PRIORITY,
        })
    }

    /// # Safety
    /// The board description must match the hardware the image runs on.
    pub unsafe fn uart(&self) -> Pl011 {
        Pl011::new(self.uart_base, self.uart_clock_hz)
    }

    /// # Safety
    /// See [`Board::uart`].
    pub unsafe fn gpio(&self) -> Option<Gpio> {
        match self.gpio {
            Some(cfg) => Some(Gpio::new(cfg.base, cfg.pulls)),
            None => None,
        }
    }

    /// # Safety
    /// See [`Board::uart`].
    pub unsafe fn router(&self) -> Router {
        match self.router {
            RouterConfig::Local { base } => Router::Local(LocalIntc::new(base)),
            RouterConfig::Gic { dist_base, cpu_base } => Router::Gic(GicV2::new(dist_base, cpu_base)),
        }
    }
}
