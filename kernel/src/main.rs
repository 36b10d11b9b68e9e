// =============================================================================
// Pulse - Kernel Entry Point
// =============================================================================
// This is the main Rust entry point for Pulse.
// Called from boot.S after basic hardware initialization.
//
// SPDX-License-Identifier: GPL-2.0
// Copyright (c) 2025 APRK
// =============================================================================

#![no_std]
#![no_main]

use core::panic::PanicInfo;

use spin::Once;

use pulse_arch_arm64::{console, cpu, exception, logger, println};
use pulse_arch_arm64::irq::Router;
use pulse_arch_arm64::timer::GenericTimer;
use pulse_arch_arm64::uart::Pl011;
use pulse_kernel::board::{self, Board, TICK_HZ};
use pulse_kernel::tick::TickTimer;

/// Pulse version
const VERSION: &str = "0.0.1";

type BoardTicker = TickTimer<'static, GenericTimer, Router, Pl011>;

/// The timer subsystem, built once during bring-up and owned by the IRQ path
/// afterwards.
static TICKER: Once<BoardTicker> = Once::new();

// =============================================================================
// Kernel Entry Point
// =============================================================================

/// Kernel main entry point.
///
/// This function is called from assembly boot code after:
/// - Core 0 is selected (other cores are parked)
/// - The core runs at EL1 with IRQs masked
/// - Stack is initialized
/// - BSS section is zeroed
#[no_mangle]
pub extern "C" fn kernel_main() -> ! {
    let board = board::current();

    // 1. No interrupts until the router is fully configured
    cpu::disable_interrupts();

    // 2. Console
    let console = init_console(board);
    logger::init(board::LOG_LEVEL);
    println!("{}", board.banner);
    print_system_info(board);

    // SAFETY: IRQs are masked
    unsafe { exception::init() };

    // 3 + 4. Timer, then router
    let line = board
        .line_config()
        .unwrap_or_else(|err| panic!("timer line for {}: {}", board.name, err));
    // SAFETY: the board table describes this machine
    let router = unsafe { board.router() };
    log::debug!("router: {}, line {:?}, priority {:#x}", router.kind(), line.line, line.priority);

    let ticker = TICKER.call_once(|| {
        TickTimer::bring_up(
            GenericTimer::new(board.timer),
            router,
            console,
            line,
            TICK_HZ,
            board.tick_message,
        )
    });
    log::info!(
        "{} timer at {} Hz, reload {} ticks",
        board.timer.name(),
        TICK_HZ,
        ticker.reload().get()
    );

    if let Err(err) = exception::register_irq_handler(ticker) {
        panic!("registering tick handler: {}", err);
    }

    println!("Timer IRQ enabled: {}.", board.timer.name());

    // 5. Unmask
    // SAFETY: vectors installed, handler registered, router configured
    unsafe { cpu::enable_interrupts() };

    // 6. Idle; every wake-up is an interrupt that has already been serviced
    loop {
        cpu::wait_for_interrupt();
    }
}

/// Mux the UART pins if needed, bring up the PL011 and install it as the
/// global console.
fn init_console(board: &Board) -> &'static spin::Mutex<console::Console<Pl011>> {
    // SAFETY: the board table describes this machine
    unsafe {
        if let Some(gpio) = board.gpio() {
            gpio.route_uart0();
        }
        let uart = board.uart();
        uart.init();
        console::init(uart)
    }
}

/// Print system information.
fn print_system_info(board: &Board) {
    log::info!("Pulse v{} on {}", VERSION, board.name);
    log::debug!("exception level: EL{}", cpu::current_el());
    log::debug!("UART0 at {:#x}, {} Hz reference clock", board.uart_base, board.uart_clock_hz);
}

// =============================================================================
// Panic Handler
// =============================================================================

/// Panic handler.
///
/// Bring-up turns configuration errors into panics; we print diagnostic
/// information and halt the CPU.
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    cpu::disable_interrupts();

    // The panic may have hit while the console was held (e.g. inside the
    // tick ISR); this path halts, so nobody resumes the holder.
    unsafe { console::break_lock() };

    println!();
    println!("!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!");
    println!("!!                     KERNEL PANIC                        !!");
    println!("!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!");
    println!();

    if let Some(location) = info.location() {
        println!("Location: {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        );
    }

    println!("Message: {}", info.message());

    println!();
    println!("System halted.");

    cpu::halt();
}
