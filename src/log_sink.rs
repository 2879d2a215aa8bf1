// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named, leveled log sinks.
//!
//! A [`LogSink`] is the thing application code logs *to*. It owns a minimum
//! [`Level`], a list of [`Filter`]s and a list of handlers ([`Logger`]s), and turns
//! each accepted call into one [`LogRecord`].
//!
//! # Dispatch
//!
//! 1. Calls below the sink's level are dropped before a record is built.
//! 2. The record runs through every filter in attachment order. A filter may rewrite
//!    the record or drop it by returning `false`.
//! 3. Every handler whose own level admits the record receives it.
//!
//! # Thread Safety
//!
//! Handler and filter lists live behind `parking_lot::RwLock`s. Attaching and
//! detaching take the write lock; dispatch takes the read lock only long enough to
//! clone the list of `Arc`s, so a handler that itself logs cannot deadlock the sink.
//!
//! # Example
//!
//! ```
//! use timewise::{InMemoryLogger, Level, LogSink};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(LogSink::new("console", Level::Info));
//! let store = Arc::new(InMemoryLogger::new());
//! sink.add_handler(store.clone());
//!
//! sink.debug("dropped by the sink level");
//! sink.info("kept");
//! let warn = sink.emitter(Level::Warning);
//! warn.emit("through an emitter");
//!
//! assert_eq!(store.count_levels(None), 2);
//! assert_eq!(store.messages(Level::Warning), vec!["through an emitter".to_string()]);
//! ```

use crate::filter::Filter;
use crate::level::Level;
use crate::log_record::{LogRecord, Message};
use crate::logger::Logger;
use parking_lot::RwLock;
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug)]
pub struct LogSink {
    name: String,
    level: AtomicU8,
    handlers: RwLock<Vec<Arc<dyn Logger>>>,
    filters: RwLock<Vec<Arc<dyn Filter>>>,
}

fn same_allocation<A: ?Sized, B: ?Sized>(a: &Arc<A>, b: &Arc<B>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

impl LogSink {
    /// Creates a sink with no handlers and no filters.
    pub fn new(name: impl Into<String>, level: Level) -> Self {
        Self {
            name: name.into(),
            level: AtomicU8::new(level.as_u8()),
            handlers: RwLock::new(Vec::new()),
            filters: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level.as_u8(), Ordering::Relaxed);
    }

    pub fn is_enabled_for(&self, level: Level) -> bool {
        level >= self.level()
    }

    pub fn add_handler(&self, handler: Arc<dyn Logger>) {
        self.handlers.write().push(handler);
    }

    /// Detaches `handler`, compared by identity. Returns whether it was attached.
    pub fn remove_handler<L: Logger + ?Sized>(&self, handler: &Arc<L>) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|attached| !same_allocation(attached, handler));
        handlers.len() != before
    }

    pub fn handlers(&self) -> Vec<Arc<dyn Logger>> {
        self.handlers.read().clone()
    }

    /// Attaches `filter`. Attaching a filter that is already attached does nothing.
    pub fn add_filter(&self, filter: Arc<dyn Filter>) {
        let mut filters = self.filters.write();
        if !filters.iter().any(|attached| same_allocation(attached, &filter)) {
            filters.push(filter);
        }
    }

    /// Detaches `filter`, compared by identity. Returns whether it was attached.
    pub fn remove_filter<F: Filter + ?Sized>(&self, filter: &Arc<F>) -> bool {
        let mut filters = self.filters.write();
        let before = filters.len();
        filters.retain(|attached| !same_allocation(attached, filter));
        filters.len() != before
    }

    pub fn filters(&self) -> Vec<Arc<dyn Filter>> {
        self.filters.read().clone()
    }

    pub fn log(&self, level: Level, message: impl Into<Message>) {
        if !self.is_enabled_for(level) {
            return;
        }
        let mut record = LogRecord::new(level, &self.name, message.into());
        let filters = self.filters();
        for filter in &filters {
            if !filter.filter(&mut record) {
                return;
            }
        }
        for handler in &self.handlers() {
            if record.level() >= handler.level() {
                handler.finish_log_record(&record);
            }
        }
    }

    pub fn debug(&self, message: impl Into<Message>) {
        self.log(Level::Debug, message)
    }

    pub fn info(&self, message: impl Into<Message>) {
        self.log(Level::Info, message)
    }

    pub fn warning(&self, message: impl Into<Message>) {
        self.log(Level::Warning, message)
    }

    pub fn error(&self, message: impl Into<Message>) {
        self.log(Level::Error, message)
    }

    pub fn critical(&self, message: impl Into<Message>) {
        self.log(Level::Critical, message)
    }

    /**
    Logs an RPC-shaped payload at [Level::Grpc].

    Payloads whose `message` announces a request (`Got request (type <class '...'>)`)
    are rewritten: the request's JSON body is flattened to [crate::grpc::DEFAULT_GRPC_DEPTH]
    levels, and the result is tagged `grpc`. See [crate::grpc::rewrite_grpc].
    */
    pub fn grpc(&self, payload: impl Into<Message>) {
        self.grpc_with_depth(payload, crate::grpc::DEFAULT_GRPC_DEPTH)
    }

    /// Like [LogSink::grpc], flattening the request body to `max_level` levels.
    pub fn grpc_with_depth(&self, payload: impl Into<Message>, max_level: usize) {
        if !self.is_enabled_for(Level::Grpc) {
            return;
        }
        let message = crate::grpc::rewrite_grpc(payload.into(), max_level);
        self.log(Level::Grpc, message)
    }

    /// A callback that logs to this sink at `level`.
    pub fn emitter(self: &Arc<Self>, level: Level) -> Emitter {
        let sink = Arc::clone(self);
        Emitter::new(move |message| sink.log(level, message))
    }

    /// Asks every handler to flush.
    pub fn prepare_to_die(&self) {
        for handler in &self.handlers() {
            handler.prepare_to_die();
        }
    }
}

/**
A cloneable "log this" callback.

Timers and the stand-alone wrappers report through an `Emitter` rather than a
sink, so a report can go to any sink at any level, or to an arbitrary closure.

```
use timewise::{Emitter, Message};
use std::sync::{Arc, Mutex};

let seen = Arc::new(Mutex::new(Vec::new()));
let sink = seen.clone();
let emitter = Emitter::new(move |message: Message| sink.lock().unwrap().push(message.to_string()));
emitter.emit("hello");
assert_eq!(seen.lock().unwrap().as_slice(), ["hello"]);
```
*/
#[derive(Clone)]
pub struct Emitter(Arc<dyn Fn(Message) + Send + Sync>);

impl Emitter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        Emitter(Arc::new(f))
    }

    pub fn emit(&self, message: impl Into<Message>) {
        (self.0)(message.into())
    }
}

impl Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Emitter")
    }
}

/*
Boilerplate notes.

# LogSink

Not Clone: a sink is shared by Arc, and a clone that silently stopped seeing the original's
filters would be surprising.
No PartialEq; sinks are looked up by name through the backend.
No Default: a sink needs a name.

# Emitter

Clone is cheap (Arc). Debug is opaque since the closure can't be printed.
*/
