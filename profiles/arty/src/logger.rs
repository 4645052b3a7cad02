//! # Console Logger
//!
//! Implements the `log::Log` trait to route log messages to the board
//! console. The console itself is supplied by the platform as a sink
//! function.

use core::fmt;

use log::{LevelFilter, Metadata, Record, SetLoggerError};
use spin::Once;

/// Console output function
pub type ConsoleSink = fn(fmt::Arguments<'_>);

/// Formats `[LEVEL] message` lines for the console sink
#[derive(Debug)]
pub struct ConsoleLogger {
    sink: Once<ConsoleSink>,
}

static LOGGER: ConsoleLogger = ConsoleLogger { sink: Once::new() };

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(sink) = self.sink.get() {
            sink(format_args!("[{}] {}\n", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

/// Install the console logger
///
/// Only the first call succeeds.
pub fn init(sink: ConsoleSink, max_level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    LOGGER.sink.call_once(|| sink);
    log::set_max_level(max_level);
    Ok(())
}
