// =============================================================================
// Pulse - BCM283x / BCM2711 GPIO Pin Multiplexing
// =============================================================================
// Just enough GPIO to hand pins 14/15 to UART0 on the Raspberry Pi boards.
// The QEMU virt machine has no GPIO block in the console path.
// =============================================================================

use crate::cpu;
use crate::mmio::RegisterBlock;

/// GPIO Register Offsets from base address
mod regs {
    /// Function Select 0 (3 bits per pin, 10 pins per register)
    pub const GPFSEL0: usize = 0x00;

    /// Legacy pull-up/down enable (BCM2835-BCM2837)
    pub const GPPUD: usize = 0x94;

    /// Legacy pull-up/down clock for pins 0-31
    pub const GPPUDCLK0: usize = 0x98;

    /// Pull-up/down control for pins 0-15 (BCM2711, 2 bits per pin)
    pub const GPIO_PUP_PDN_CNTRL_REG0: usize = 0xE4;
}

/// Cycles the legacy pull sequence needs between steps.
const PULL_SETTLE_CYCLES: u32 = 150;

/// UART0 transmit / receive pins.
pub const UART0_TX_PIN: u32 = 14;
pub const UART0_RX_PIN: u32 = 15;

/// Pin function select values (3 bits each)
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Alt0 = 0b100,
}

/// How the SoC configures pin pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullScheme {
    /// GPPUD + GPPUDCLKn clocking sequence (BCM2835/6/7)
    Legacy,
    /// Direct 2-bit fields in GPIO_PUP_PDN_CNTRL_REGn (BCM2711)
    Bcm2711,
}

pub struct Gpio {
    regs: RegisterBlock,
    pulls: PullScheme,
}

impl Gpio {
    /// # Safety
    /// `base` must point at the GPIO register block of a SoC using `pulls`.
    pub const unsafe fn new(base: usize, pulls: PullScheme) -> Self {
        Self { regs: RegisterBlock::new(base), pulls }
    }

    /// Select the function of a single pin.
    pub fn set_function(&self, pin: u32, function: Function) {
        let offset = regs::GPFSEL0 + (pin / 10) as usize * 4;
        let shift = (pin % 10) * 3;
        self.regs
            .reg(offset)
            .modify(|v| (v & !(0b111 << shift)) | ((function as u32) << shift));
    }

    /// Disable the pull-up/down resistors on every pin in `mask` (pins 0-31).
    pub fn disable_pulls(&self, mask: u32) {
        match self.pulls {
            PullScheme::Legacy => {
                self.regs.reg(regs::GPPUD).write(0);
                cpu::delay_cycles(PULL_SETTLE_CYCLES);
                self.regs.reg(regs::GPPUDCLK0).write(mask);
                cpu::delay_cycles(PULL_SETTLE_CYCLES);
                self.regs.reg(regs::GPPUDCLK0).write(0);
            }
            PullScheme::Bcm2711 => {
                for pin in (0..32u32).filter(|&p| mask & (1 << p) != 0) {
                    let offset = regs::GPIO_PUP_PDN_CNTRL_REG0 + (pin / 16) as usize * 4;
                    let shift = (pin % 16) * 2;
                    // 0b00 = no resistor
                    self.regs.reg(offset).modify(|v| v & !(0b11 << shift));
                }
            }
        }
    }

    /// Route UART0 to pins 14/15 (ALT0) with pulls disabled.
    pub fn route_uart0(&self) {
        self.set_function(UART0_TX_PIN, Function::Alt0);
        self.set_function(UART0_RX_PIN, Function::Alt0);
        self.disable_pulls((1 << UART0_TX_PIN) | (1 << UART0_RX_PIN));
    }
}
