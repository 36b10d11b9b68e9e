// =============================================================================
// Pulse - Console Logger
// =============================================================================
// `log` facade backend writing `[LEVEL] message` lines to the console.
// =============================================================================

use log::{LevelFilter, Log, Metadata, Record};

use crate::println;

struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("[{:>5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Install the console logger at `level`. Call after the console is up.
///
/// A second call only changes the level.
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
