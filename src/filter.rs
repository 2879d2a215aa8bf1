// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record filters.
//!
//! A [`Filter`] attached to a [`LogSink`](crate::LogSink) sees every record the sink
//! creates before any handler does. Returning `false` drops the record; a filter may
//! also rewrite the record it is given.

use crate::log_record::{Fields, LogRecord, Message};
use std::fmt::Debug;

pub trait Filter: Debug + Send + Sync {
    /// Returns whether the record should be logged, possibly modifying it first.
    fn filter(&self, record: &mut LogRecord) -> bool;
}

/**
Adds a fixed context mapping to structured records logged from one thread.

The thread is the one that constructed the filter. A record counts as coming from
that thread when its identifier matches, or when the constructing thread's
identifier appears in the record's thread name, so that workers named after their
parent (`sub-thread-<ident>`) share the parent's context.

The filter never drops a record. Text messages pass through unchanged; structured
messages get the context merged in, with context keys winning on conflict.

```
use timewise::{Filter, LogRecord, Level, Message, ThreadContextFilter};
use serde_json::json;

let filter = ThreadContextFilter::new(json!({"ctx": 123}).as_object().unwrap().clone());
let mut record = LogRecord::new(Level::Info, "console", Message::from(json!({"message": "hello"})));
assert!(filter.filter(&mut record));
assert_eq!(record.message().get("ctx"), Some(&json!(123)));
```
*/
#[derive(Debug, Clone)]
pub struct ThreadContextFilter {
    thread: u64,
    context: Fields,
}

impl ThreadContextFilter {
    pub fn new(context: Fields) -> Self {
        Self {
            thread: crate::sys::thread_ident(),
            context,
        }
    }

    /// Identifier of the thread the filter was constructed on.
    pub fn thread(&self) -> u64 {
        self.thread
    }

    pub fn context(&self) -> &Fields {
        &self.context
    }

    fn is_same_thread(&self, record: &LogRecord) -> bool {
        record.thread() == self.thread || record.thread_name().contains(&self.thread.to_string())
    }
}

impl Default for ThreadContextFilter {
    fn default() -> Self {
        Self::new(Fields::new())
    }
}

impl Filter for ThreadContextFilter {
    fn filter(&self, record: &mut LogRecord) -> bool {
        if !self.is_same_thread(record) {
            return true;
        }
        // The record owns its message, so merging here never reaches the caller's mapping.
        if let Message::Structured(fields) = record.message_mut() {
            for (key, value) in &self.context {
                fields.insert(key.clone(), value.clone());
            }
        }
        true
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::Level;
    use serde_json::json;

    fn context(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap_or_default()
    }

    fn structured(value: serde_json::Value) -> LogRecord {
        LogRecord::new(Level::Info, "test", Message::from(value))
    }

    #[test]
    fn plain_text_passes_through() {
        let filter = ThreadContextFilter::new(context(json!({"ctx": 123})));
        let mut record = LogRecord::new(Level::Info, "test", Message::from("hello"));
        assert!(filter.filter(&mut record));
        assert_eq!(record.message(), &Message::from("hello"));
    }

    #[test]
    fn empty_context_changes_nothing() {
        let filter = ThreadContextFilter::default();
        let mut record = structured(json!({"message": "hello"}));
        assert!(filter.filter(&mut record));
        assert_eq!(record.message(), &Message::from(json!({"message": "hello"})));
    }

    #[test]
    fn context_keys_win_on_conflict() {
        let filter = ThreadContextFilter::new(context(json!({"message": "hi"})));
        let mut record = structured(json!({"message": "hello"}));
        filter.filter(&mut record);
        assert_eq!(record.message(), &Message::from(json!({"message": "hi"})));
    }

    #[test]
    fn other_threads_are_untouched() {
        let filter = ThreadContextFilter::new(context(json!({"ctx": 1})));
        let mut record = std::thread::spawn(|| structured(json!({"message": "elsewhere"})))
            .join()
            .unwrap();
        filter.filter(&mut record);
        assert_eq!(record.message().get("ctx"), None);
    }

    #[test]
    fn threads_named_after_the_owner_match() {
        let filter = ThreadContextFilter::new(context(json!({"ctx": 2})));
        let name = format!("sub-thread-{}", filter.thread());
        let mut record = std::thread::Builder::new()
            .name(name)
            .spawn(|| structured(json!({"message": "child"})))
            .unwrap()
            .join()
            .unwrap();
        filter.filter(&mut record);
        assert_eq!(record.message().get("ctx"), Some(&json!(2)));
    }

    #[test]
    fn caller_mapping_is_not_modified() {
        let filter = ThreadContextFilter::new(context(json!({"ctx": 3})));
        let original = context(json!({"message": "shared"}));
        let mut record = LogRecord::new(Level::Info, "test", Message::from(&original));
        filter.filter(&mut record);
        assert_eq!(original.get("ctx"), None);
        assert_eq!(record.message().get("ctx"), Some(&json!(3)));
    }
}
