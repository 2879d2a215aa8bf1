// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Per-thread context for structured logs.

A [ThreadContext] owns one [ThreadContextFilter] and the [LogSink] it belongs on.
While the context is entered, structured messages logged to that sink *from the thread
that built the context* carry the context's fields. Other threads are unaffected, so
scopes on different threads can be open at the same time.

```
use timewise::{Backend, InMemoryLogger, Level, ThreadContext};
use serde_json::json;
use std::sync::Arc;

let backend = Backend::bare();
let store = Arc::new(InMemoryLogger::new());
backend.console().add_handler(store.clone());

let context = ThreadContext::new(backend.console().clone(), json!({"ctx": 123}));
{
    let _entered = context.enter();
    backend.console().info(json!({"message": "hello"}));
}
backend.console().info(json!({"message": "after"}));

let logs = store.structured(Level::Info);
assert_eq!(logs[0]["ctx"], json!(123));
assert_eq!(logs[1].get("ctx"), None);
```
*/

use crate::filter::{Filter, ThreadContextFilter};
use crate::log_record::Fields;
use crate::log_sink::LogSink;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ThreadContext {
    sink: Arc<LogSink>,
    filter: Arc<ThreadContextFilter>,
}

impl ThreadContext {
    /// Builds the context on the current thread. `context` should be a JSON object;
    /// anything else counts as an empty context.
    pub fn new(sink: Arc<LogSink>, context: Value) -> Self {
        let context = match context {
            Value::Object(fields) => fields,
            _ => Fields::new(),
        };
        Self::from_fields(sink, context)
    }

    pub fn from_fields(sink: Arc<LogSink>, context: Fields) -> Self {
        Self {
            sink,
            filter: Arc::new(ThreadContextFilter::new(context)),
        }
    }

    pub fn filter(&self) -> &Arc<ThreadContextFilter> {
        &self.filter
    }

    pub fn sink(&self) -> &Arc<LogSink> {
        &self.sink
    }

    /// Attaches the filter until the returned guard drops.
    pub fn enter(&self) -> EnteredContext<'_> {
        let filter: Arc<dyn Filter> = self.filter.clone();
        self.sink.add_filter(filter);
        EnteredContext { context: self }
    }

    /// Runs `f` with the context entered.
    pub fn wrap<R>(&self, f: impl FnOnce() -> R) -> R {
        let _entered = self.enter();
        f()
    }
}

/// Guard returned by [ThreadContext::enter]; detaches the filter on drop.
#[derive(Debug)]
#[must_use = "the context is detached when the guard drops"]
pub struct EnteredContext<'a> {
    context: &'a ThreadContext,
}

impl Drop for EnteredContext<'_> {
    fn drop(&mut self) {
        self.context.sink.remove_filter(&self.context.filter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryLogger, Level};
    use serde_json::json;

    fn sink() -> (Arc<LogSink>, Arc<InMemoryLogger>) {
        let sink = Arc::new(LogSink::new("console", Level::Debug));
        let store = Arc::new(InMemoryLogger::new());
        sink.add_handler(store.clone());
        (sink, store)
    }

    #[cfg_attr(not(target_arch = "wasm32"), test)]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn wrap_attaches_for_the_call_only() {
        let (sink, store) = sink();
        let context = ThreadContext::new(sink.clone(), json!({"ctx": 1}));
        let out = context.wrap(|| {
            assert_eq!(sink.filters().len(), 1);
            sink.info(json!({"message": "inside"}));
            7
        });
        assert_eq!(out, 7);
        assert!(sink.filters().is_empty());
        assert_eq!(store.structured(Level::Info)[0]["ctx"], json!(1));
    }

    #[cfg_attr(not(target_arch = "wasm32"), test)]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn entering_twice_attaches_once() {
        let (sink, _store) = sink();
        let context = ThreadContext::new(sink.clone(), json!({"ctx": 1}));
        let first = context.enter();
        let second = context.enter();
        assert_eq!(sink.filters().len(), 1);
        drop(second);
        drop(first);
        assert!(sink.filters().is_empty());
    }

    #[cfg_attr(not(target_arch = "wasm32"), test)]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn non_object_context_is_empty() {
        let (sink, _store) = sink();
        let context = ThreadContext::new(sink, json!("not a map"));
        assert!(context.filter().context().is_empty());
    }
}
