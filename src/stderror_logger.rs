// SPDX-License-Identifier: MIT OR Apache-2.0
use crate::Level;
use crate::formatter::Formatter;
use crate::log_record::LogRecord;
use crate::logger::Logger;

/**
A logger that writes one formatted line per record to stderr.

On wasm32 the line goes to the browser console instead, at the console method
matching the record's level.
 */
#[derive(Debug, Clone, Default)]
pub struct StdErrorLogger {
    formatter: Formatter,
    level: Level,
}

impl StdErrorLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_formatter(formatter: Formatter, level: Level) -> Self {
        Self { formatter, level }
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }
}

impl Logger for StdErrorLogger {
    fn finish_log_record(&self, record: &LogRecord) {
        let line = self.formatter.format(record);
        #[cfg(not(target_arch = "wasm32"))]
        {
            use std::io::Write;
            let mut lock = std::io::stderr().lock();
            // Nowhere left to report a failing stderr.
            let _ = lock.write_all(line.as_bytes());
            let _ = lock.write_all(b"\n");
        }
        #[cfg(target_arch = "wasm32")]
        {
            let msg = line.into();
            match record.level() {
                Level::Debug => web_sys::console::debug_1(&msg),
                Level::Info | Level::Grpc => web_sys::console::info_1(&msg),
                Level::Warning => web_sys::console::warn_1(&msg),
                Level::Error | Level::Critical => web_sys::console::error_1(&msg),
            }
        }
    }

    fn level(&self) -> Level {
        self.level
    }

    fn prepare_to_die(&self) {
        //nothing to do since we are unbuffered
    }
}

// ============================================================================
// BOILERPLATE TRAIT IMPLEMENTATIONS
// ============================================================================
//
// Design decisions for StdErrorLogger trait implementations:
//
// - Debug/Clone: Derived - the formatter is plain data
// - Default: Derived - default template, accepts every level
// - PartialEq/Eq/Hash: NOT implemented - loggers are compared by Arc identity
// - Display: NOT implemented - no meaningful string representation for stderr logger
// - Send/Sync: Automatically implemented
