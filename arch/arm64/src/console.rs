// =============================================================================
// Pulse - Console
// =============================================================================
// Blocking character output on top of any byte transport. No buffering and
// no interrupts: every call spins on the transport's busy flag.
// =============================================================================

use core::fmt::{self, Write};
use spin::{Mutex, Once};

use crate::uart::Pl011;

/// A serial transmitter the console can drive.
pub trait Transmit {
    /// True while the transmitter cannot accept another byte.
    fn is_busy(&self) -> bool;

    /// Hand one byte to the transmitter. Only called when not busy.
    fn write_byte(&self, byte: u8);
}

/// Longest decimal rendering of a `u64` (18446744073709551615).
pub const MAX_DECIMAL_DIGITS: usize = 20;

/// Render `value` as decimal ASCII without leading zeros.
///
/// The digits are written right-aligned into `buf` and the returned slice
/// covers exactly them.
pub fn render_decimal(mut value: u64, buf: &mut [u8; MAX_DECIMAL_DIGITS]) -> &[u8] {
    let mut start = buf.len();
    loop {
        start -= 1;
        buf[start] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    &buf[start..]
}

/// Character console over a [`Transmit`] port.
pub struct Console<T> {
    port: T,
}

impl<T: Transmit> Console<T> {
    pub const fn new(port: T) -> Self {
        Self { port }
    }

    pub fn port(&self) -> &T {
        &self.port
    }

    /// Write one byte, blocking until the transmitter has room.
    pub fn put_char(&self, byte: u8) {
        while self.port.is_busy() {
            core::hint::spin_loop();
        }
        self.port.write_byte(byte);
    }

    /// Write a string, expanding every `\n` to `\r\n`.
    pub fn put_str(&self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.put_char(b'\r');
            }
            self.put_char(byte);
        }
    }

    /// Write `value` in decimal with no leading zeros.
    pub fn put_u64(&self, value: u64) {
        let mut buf = [0u8; MAX_DECIMAL_DIGITS];
        for &digit in render_decimal(value, &mut buf) {
            self.put_char(digit);
        }
    }
}

impl<T: Transmit> Write for Console<T> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.put_str(s);
        Ok(())
    }
}

// =============================================================================
// Global Console Instance
// =============================================================================

/// The board console, installed once during bring-up.
///
/// Until [`init`] runs, printing is silently discarded.
static CONSOLE: Once<Mutex<Console<Pl011>>> = Once::new();

/// Install `uart` as the global console and return it.
///
/// The UART must already be initialized. Later calls return the console
/// installed by the first one.
pub fn init(uart: Pl011) -> &'static Mutex<Console<Pl011>> {
    CONSOLE.call_once(|| Mutex::new(Console::new(uart)))
}

/// Release `console` if something holds it.
///
/// # Safety
/// Whoever holds the lock must never touch the console again. Only fatal
/// paths that end in a halt may call this.
pub unsafe fn force_release<T>(console: &Mutex<Console<T>>) {
    if console.is_locked() {
        console.force_unlock();
    }
}

/// Make the global console printable from a fatal path, even when the
/// interrupted code was in the middle of a print.
///
/// # Safety
/// See [`force_release`].
pub unsafe fn break_lock() {
    if let Some(console) = CONSOLE.get() {
        force_release(console);
    }
}

/// Print a formatted string to the console.
pub fn _print(args: fmt::Arguments) {
    if let Some(console) = CONSOLE.get() {
        // Console::write_str never fails
        let _ = console.lock().write_fmt(args);
    }
}

// =============================================================================
// Print Macros
// =============================================================================

/// Print to the console.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::console::_print(format_args!($($arg)*))
    };
}

/// Print to the console with a newline.
#[macro_export]
macro_rules! println {
    () => {
        $crate::print!("\n")
    };
    ($($arg:tt)*) => {
        $crate::print!("{}\n", format_args!($($arg)*))
    };
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Transmit;
    use core::cell::{Cell, RefCell};
    use std::vec::Vec;

    /// Transport that records every byte and reports busy for a fixed
    /// number of polls before each byte is accepted.
    #[derive(Default)]
    pub struct CapturePort {
        pub bytes: RefCell<Vec<u8>>,
        pub busy_polls: Cell<u32>,
        pub busy_per_byte: u32,
        pub polls: Cell<u32>,
    }

    impl CapturePort {
        pub fn with_busy_polls(busy_per_byte: u32) -> Self {
            Self { busy_polls: Cell::new(busy_per_byte), busy_per_byte, ..Self::default() }
        }

        pub fn output(&self) -> Vec<u8> {
            self.bytes.borrow().clone()
        }
    }

    impl Transmit for CapturePort {
        fn is_busy(&self) -> bool {
            self.polls.set(self.polls.get() + 1);
            let left = self.busy_polls.get();
            if left > 0 {
                self.busy_polls.set(left - 1);
                true
            } else {
                false
            }
        }

        fn write_byte(&self, byte: u8) {
            assert_eq!(self.busy_polls.get(), 0, "byte written while transmitter busy");
            self.bytes.borrow_mut().push(byte);
            self.busy_polls.set(self.busy_per_byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::CapturePort;
    use super::*;

    fn render(value: u64) -> std::string::String {
        let mut buf = [0u8; MAX_DECIMAL_DIGITS];
        std::string::String::from_utf8(render_decimal(value, &mut buf).to_vec()).unwrap()
    }

    #[test]
    fn zero_renders_as_single_digit() {
        assert_eq!(render(0), "0");
    }

    #[test]
    fn renders_without_leading_zeros() {
        assert_eq!(render(123), "123");
        assert_eq!(render(100), "100");
        assert_eq!(render(7), "7");
        assert_eq!(render(u64::MAX), "18446744073709551615");
    }

    #[test]
    fn rendered_length_is_digit_count() {
        let mut value = 1u64;
        for digits in 1..=MAX_DECIMAL_DIGITS {
            assert_eq!(render(value).len(), digits);
            assert_eq!(render(value - 1).len(), (digits - 1).max(1));
            value = value.saturating_mul(10);
            if value == u64::MAX {
                break;
            }
        }
    }

    #[test]
    fn every_newline_is_expanded() {
        let console = Console::new(CapturePort::default());
        console.put_str("A\nB");
        assert_eq!(console.port().output(), b"A\r\nB");

        let console = Console::new(CapturePort::default());
        console.put_str("\n\nx\n");
        assert_eq!(console.port().output(), b"\r\n\r\nx\r\n");
    }

    #[test]
    fn put_char_waits_for_busy_to_clear() {
        let console = Console::new(CapturePort::with_busy_polls(3));
        console.put_char(b'Z');
        console.put_char(b'!');
        assert_eq!(console.port().output(), b"Z!");
        // three busy polls plus the one that saw it clear, per byte
        assert_eq!(console.port().polls.get(), 8);
    }

    #[test]
    fn put_char_does_not_translate() {
        let console = Console::new(CapturePort::default());
        console.put_char(b'\n');
        assert_eq!(console.port().output(), b"\n");
    }

    #[test]
    fn put_u64_writes_digits() {
        let console = Console::new(CapturePort::default());
        console.put_u64(0);
        console.put_char(b' ');
        console.put_u64(4096);
        assert_eq!(console.port().output(), b"0 4096");
    }

    #[test]
    fn force_release_frees_a_lock_left_held() {
        let console = Mutex::new(Console::new(CapturePort::default()));
        // Holder interrupted mid-print and never resumed
        core::mem::forget(console.lock());
        assert!(console.try_lock().is_none());

        unsafe { force_release(&console) };
        console.lock().put_str("panic\n");
        assert_eq!(console.lock().port().output(), b"panic\r\n");
    }

    #[test]
    fn force_release_of_a_free_console_is_harmless() {
        let console = Mutex::new(Console::new(CapturePort::default()));
        unsafe { force_release(&console) };
        assert!(!console.is_locked());
        console.lock().put_char(b'x');
        assert_eq!(console.lock().port().output(), b"x");
    }

    #[test]
    fn fmt_write_goes_through_newline_expansion() {
        let mut console = Console::new(CapturePort::default());
        write!(console, "tick {}\n", 5).unwrap();
        assert_eq!(console.port().output(), b"tick 5\r\n");
    }
}
