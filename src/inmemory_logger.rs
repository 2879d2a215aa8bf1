// SPDX-License-Identifier: MIT OR Apache-2.0

//! # In-Memory Logger
//!
//! This module provides an in-memory logger for testing and debugging purposes.
//! The `InMemoryLogger` keeps every record it receives rather than writing it
//! anywhere, making it ideal for:
//!
//! - Unit testing code that logs through a [`LogSink`](crate::LogSink)
//! - Checking how many timing or exception reports a call produced
//! - Inspecting the structured payloads the decorators emit
//!
//! ## Architecture
//!
//! Records are kept in a `Mutex<Vec<LogRecord>>` in arrival order. Accessors
//! select by level and render messages the same way a plain handler would.

use crate::Level;
use crate::log_record::{Fields, LogRecord, Message};
use crate::logger::Logger;
use std::sync::Mutex;

/// A logger that stores the records it receives.
///
/// # Thread Safety
///
/// The `InMemoryLogger` is thread-safe and can be shared across multiple threads using
/// `Arc`. All operations on the internal buffer are protected by a mutex.
///
/// # Example
///
/// ```rust
/// use timewise::{Backend, InMemoryLogger, Level};
/// use std::sync::Arc;
///
/// let backend = Backend::bare();
/// let store = Arc::new(InMemoryLogger::new());
/// backend.console().add_handler(store.clone());
///
/// backend.console().warning("Something suspicious happened");
/// backend.console().error("An error occurred: 404");
///
/// assert_eq!(store.count_levels(Some(Level::Warning)), 1);
/// let logs = store.drain_logs();
/// assert!(logs.contains("An error occurred: 404"));
/// assert!(store.is_empty());
/// ```
#[derive(Debug)]
pub struct InMemoryLogger {
    records: Mutex<Vec<LogRecord>>,
    level: Level,
}

// ============================================================================
// BOILERPLATE TRAIT IMPLEMENTATIONS
// ============================================================================
//
// Design decisions for InMemoryLogger trait implementations:
//
// - Debug: Derived for diagnostic purposes and required by Logger trait
// - Default: Implemented with obvious zero-value (empty buffer)
// - Clone: NOT implemented - a clone would silently stop receiving records
// - PartialEq/Eq/Hash: NOT implemented - sinks compare loggers by Arc identity
// - Display: NOT implemented - no meaningful display representation
// - Send/Sync: Automatically implemented due to Mutex usage (required for Logger trait)

impl Default for InMemoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLogger {
    /// Creates a new `InMemoryLogger` with an empty buffer.
    pub fn new() -> Self {
        Self::with_level(Level::Debug)
    }

    /// Creates a logger that only keeps records at `level` or above.
    pub fn with_level(level: Level) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            level,
        }
    }

    fn with_records<R>(&self, f: impl FnOnce(&mut Vec<LogRecord>) -> R) -> R {
        // A panic while holding the lock leaves the Vec itself intact.
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut records)
    }

    /// Drains all messages into a single string, one per line, clearing the buffer.
    pub fn drain_logs(&self) -> String {
        self.with_records(|records| {
            let joined = records
                .iter()
                .map(|record| record.message().to_string())
                .collect::<Vec<_>>()
                .join("\n");
            records.clear();
            joined
        })
    }

    /// Rendered messages of every record at `level`, oldest first.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.with_records(|records| {
            records
                .iter()
                .filter(|record| record.level() == level)
                .map(|record| record.message().to_string())
                .collect()
        })
    }

    /// Messages of every record at `level`, oldest first.
    pub fn raw_messages(&self, level: Level) -> Vec<Message> {
        self.with_records(|records| {
            records
                .iter()
                .filter(|record| record.level() == level)
                .map(|record| record.message().clone())
                .collect()
        })
    }

    /// Structured messages at `level`; text messages are skipped.
    pub fn structured(&self, level: Level) -> Vec<Fields> {
        self.raw_messages(level)
            .into_iter()
            .filter_map(|message| match message {
                Message::Structured(fields) => Some(fields),
                Message::Text(_) => None,
            })
            .collect()
    }

    /// Every record received, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        self.with_records(|records| records.clone())
    }

    /// Number of records at `level`, or of all records for `None`.
    pub fn count_levels(&self, level: Option<Level>) -> usize {
        self.with_records(|records| match level {
            Some(level) => records.iter().filter(|record| record.level() == level).count(),
            None => records.len(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.count_levels(None) == 0
    }

    pub fn reset(&self) {
        self.with_records(|records| records.clear());
    }
}

impl Logger for InMemoryLogger {
    fn finish_log_record(&self, record: &LogRecord) {
        let record = record.clone();
        self.with_records(|records| records.push(record));
    }

    fn level(&self) -> Level {
        self.level
    }

    /// No-op for in-memory logger.
    fn prepare_to_die(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[cfg_attr(not(target_arch = "wasm32"), test)]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn counts_and_selects_by_level() {
        let logger = InMemoryLogger::new();
        assert!(logger.is_empty());
        logger.finish_log_record(&LogRecord::new(Level::Info, "t", Message::from("one")));
        logger.finish_log_record(&LogRecord::new(
            Level::Warning,
            "t",
            Message::from(json!({"message": "two"})),
        ));
        logger.finish_log_record(&LogRecord::new(Level::Warning, "t", Message::from("three")));

        assert_eq!(logger.count_levels(Some(Level::Warning)), 2);
        assert_eq!(logger.count_levels(None), 3);
        assert_eq!(logger.messages(Level::Info), vec!["one".to_string()]);
        assert_eq!(logger.structured(Level::Warning).len(), 1);

        logger.reset();
        assert!(logger.is_empty());
    }
}
