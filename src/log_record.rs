// SPDX-License-Identifier: MIT OR Apache-2.0

//! Log record type.
//!
//! A [`LogRecord`] is created by a [`LogSink`](crate::LogSink) for every call that
//! passes the sink's level check. It carries the [`Message`] (plain text or a
//! structured mapping) together with the identity of the thread that emitted it,
//! runs through the sink's filters, and is finally handed to each
//! [`Logger`](crate::Logger) attached to the sink.
//!
//! Every record owns its message. Filters that enrich a structured message modify
//! the record's own copy, so a mapping the caller keeps around is never touched.
//!
//! # Example
//!
//! ```rust
//! use timewise::{Level, LogRecord, Message};
//!
//! let record = LogRecord::new(Level::Info, "console", Message::from("Processing request #42"));
//! assert_eq!(record.to_string(), "Processing request #42");
//! assert_eq!(record.thread(), timewise::thread_ident());
//! ```

use crate::Level;
use serde_json::{Map, Value};
use std::fmt::{Debug, Display};
use std::sync::OnceLock;

/// Structured log payload.
pub type Fields = Map<String, Value>;

static INITIAL_TIMESTAMP: OnceLock<crate::sys::Instant> = OnceLock::new();

fn initial_timestamp() -> crate::sys::Instant {
    *INITIAL_TIMESTAMP.get_or_init(crate::sys::Instant::now)
}

/// The message of a log record.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A plain string; filters pass it through untouched.
    Text(String),
    /// A key/value mapping; the context filter merges into these.
    Structured(Fields),
}

impl Message {
    pub fn as_structured(&self) -> Option<&Fields> {
        match self {
            Message::Structured(fields) => Some(fields),
            Message::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(text) => Some(text),
            Message::Structured(_) => None,
        }
    }

    /// Value of a structured field, `None` for text messages.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_structured().and_then(|fields| fields.get(key))
    }
}

/// Text is rendered as-is, structured messages as a single JSON object.
impl Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::Text(text) => f.write_str(text),
            Message::Structured(fields) => {
                let rendered = serde_json::to_string(fields).map_err(|_| std::fmt::Error)?;
                f.write_str(&rendered)
            }
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

impl From<Fields> for Message {
    fn from(fields: Fields) -> Self {
        Message::Structured(fields)
    }
}

impl From<&Fields> for Message {
    fn from(fields: &Fields) -> Self {
        Message::Structured(fields.clone())
    }
}

/// JSON objects become structured messages, strings become text, and any other
/// value is rendered to text.
impl From<Value> for Message {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Message::Structured(fields),
            Value::String(text) => Message::Text(text),
            other => Message::Text(other.to_string()),
        }
    }
}

/**
A log record.

Records are built by the sink at the moment of logging, so the thread identity they
carry is always the identity of the emitting thread.
*/
#[derive(Debug, Clone)]
pub struct LogRecord {
    level: Level,
    logger: String,
    pub(crate) message: Message,
    thread: u64,
    thread_name: String,
    created: crate::sys::Instant,
}

impl LogRecord {
    /// Creates a record stamped with the calling thread's identity and the current time.
    pub fn new(level: Level, logger: &str, message: Message) -> Self {
        initial_timestamp();
        Self {
            level,
            logger: logger.to_string(),
            message,
            thread: crate::sys::thread_ident(),
            thread_name: crate::sys::thread_name(),
            created: crate::sys::Instant::now(),
        }
    }

    /// Overrides the thread identity, for records relayed on behalf of another thread.
    pub fn with_thread(mut self, thread: u64, thread_name: impl Into<String>) -> Self {
        self.thread = thread;
        self.thread_name = thread_name.into();
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Name of the sink that created the record.
    pub fn logger(&self) -> &str {
        &self.logger
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }

    pub fn into_message(self) -> Message {
        self.message
    }

    pub fn thread(&self) -> u64 {
        self.thread
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Time since the first record of the process.
    pub fn relative_created(&self) -> crate::sys::Duration {
        self.created
            .checked_duration_since(initial_timestamp())
            .unwrap_or_default()
    }
}

impl Display for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.message, f)
    }
}

/*
Boilerplate notes for LogRecord:

IMPLEMENTED:
- Debug: Derived - essential for diagnostics
- Clone: Derived - a sink hands one copy to each handler
- Display: Implemented - the message, the way handlers without a formatter print it

NOT IMPLEMENTED:
- PartialEq/Eq/Hash: the creation instant makes two records practically never equal
- Default: a record without a sink name or level is meaningless
- Copy: heap-allocated data

AUTOMATIC:
- Send/Sync: all fields are Send + Sync
*/

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[cfg_attr(not(target_arch = "wasm32"), test)]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn structured_messages_render_as_json() {
        let message = Message::from(json!({"message": "hello", "ctx": 123}));
        assert_eq!(message.to_string(), r#"{"message":"hello","ctx":123}"#);
        assert_eq!(message.get("ctx"), Some(&json!(123)));
    }

    #[cfg_attr(not(target_arch = "wasm32"), test)]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn non_object_values_become_text() {
        assert_eq!(Message::from(json!("hello")), Message::Text("hello".into()));
        assert_eq!(Message::from(json!(3)), Message::Text("3".into()));
        assert!(Message::from("plain").get("message").is_none());
    }
}
