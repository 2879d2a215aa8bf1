// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
The call timer.

A [Timer] measures wall-clock time around function calls and code blocks and reports
each measurement through an [Emitter]. One timer may be shared by many threads and
many concurrent calls: every open measurement is stored under its own [CallKey], in
concurrent maps, so concurrent spans never see each other.

# Three ways to time

```
use timewise::{Backend, Level, Timer, call_args};

let backend = Backend::bare();
let timer = Timer::builder()
    .logger(backend.console().emitter(Level::Warning))
    .build();

// a call, with its arguments logged
let sum = timer.call("add", call_args!(1, 2), || 1 + 2).unwrap();
assert_eq!(sum, 3);

// a block, closed when the guard drops
{
    let _scope = timer.scope();
}

// a block that can swallow a panic, given suppress_exceptions
let value = timer.time_block(|| "done");
assert_eq!(value.unwrap(), "done");
```

Functions can also be timed with the [`#[timed]`](crate::timed) attribute.

# Report payloads

Every finished span emits `{message, duration, tags: ["timing"], timer}`. The message
comes from the timer's template (see [format_positional]), filled with the elapsed
seconds, the function name (or `ContextManager` for blocks) and the thread identifier.
A template that does not fit those arguments leaves `message` out; `duration` is always
present.

# Recursion

By default each call is timed on its own, so a function that calls itself produces one
report per level. With [TimerBuilder::recursive], all spans share one key: reentrant
calls log `Recursing, depth=N`, and only the outermost call reports, with the time of
the whole recursion.
*/

mod call_key;
mod template;

pub use call_key::CallKey;
pub use template::{FormatError, TemplateArg, format_positional};

use crate::arguments::{
    CallArgs, DEFAULT_ARGUMENT_MAX_LENGTH, EXCEPTION_RESULT, log_args_kwargs_results,
    max_length_from_i64,
};
use crate::exception::{Failure, PANIC_KIND, log_exception};
use crate::log_record::Fields;
use crate::log_sink::Emitter;
use crate::loggable::{Loggable, UNLOGGABLE};
use crate::sys::Instant;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::{Value, json};
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::Arc;

/// Default report template.
pub const FINISH: &str = "Elapsed time: {:0.4f} seconds. Finished {!r} in thread {}.";

/// Name reported for scoped blocks.
pub const CONTEXT: &str = "ContextManager";

#[derive(Debug)]
pub struct Timer {
    name: String,
    message: String,
    logger: Option<Emitter>,
    exception_logger: Option<Emitter>,
    log_arguments: bool,
    suppress_exceptions: bool,
    recursive: bool,
    argument_max_length: Option<usize>,
    start_times: DashMap<CallKey, Instant>,
    recurse_depths: DashMap<CallKey, u32>,
}

/// Configures a [Timer].
#[derive(Debug, Clone)]
pub struct TimerBuilder {
    name: Option<String>,
    message: String,
    logger: Option<Emitter>,
    exception_logger: Option<Emitter>,
    log_arguments: bool,
    suppress_exceptions: bool,
    recursive: bool,
    argument_max_length: i64,
}

impl Default for TimerBuilder {
    fn default() -> Self {
        Self {
            name: None,
            message: FINISH.to_string(),
            logger: None,
            exception_logger: None,
            log_arguments: true,
            suppress_exceptions: false,
            recursive: false,
            argument_max_length: DEFAULT_ARGUMENT_MAX_LENGTH,
        }
    }
}

impl TimerBuilder {
    /// Defaults to a fresh uuid.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The report template. Defaults to [FINISH].
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Where start, report and argument logs go. Without one, nothing is logged.
    pub fn logger(mut self, logger: Emitter) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Where exception reports go. Defaults to the [TimerBuilder::logger].
    pub fn exception_logger(mut self, logger: Emitter) -> Self {
        self.exception_logger = Some(logger);
        self
    }

    pub fn log_arguments(mut self, log_arguments: bool) -> Self {
        self.log_arguments = log_arguments;
        self
    }

    /// Whether a panicking call returns `Err` instead of resuming the panic.
    pub fn suppress_exceptions(mut self, suppress_exceptions: bool) -> Self {
        self.suppress_exceptions = suppress_exceptions;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Character limit for logged arguments and results; negative means unlimited.
    pub fn argument_max_length(mut self, argument_max_length: i64) -> Self {
        self.argument_max_length = argument_max_length;
        self
    }

    pub fn build(self) -> Timer {
        Timer {
            name: self
                .name
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            message: self.message,
            logger: self.logger,
            exception_logger: self.exception_logger,
            log_arguments: self.log_arguments,
            suppress_exceptions: self.suppress_exceptions,
            recursive: self.recursive,
            argument_max_length: max_length_from_i64(self.argument_max_length),
            start_times: DashMap::new(),
            recurse_depths: DashMap::new(),
        }
    }
}

enum StartOutcome {
    Started,
    Recursing(u32),
    AlreadyOpen,
}

impl Timer {
    pub fn builder() -> TimerBuilder {
        TimerBuilder::default()
    }

    /// A timer with default settings and no logger.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn suppresses_exceptions(&self) -> bool {
        self.suppress_exceptions
    }

    pub fn argument_max_length(&self) -> Option<usize> {
        self.argument_max_length
    }

    /// Number of spans currently open.
    pub fn open_spans(&self) -> usize {
        self.start_times.len()
    }

    fn exception_emitter(&self) -> Option<&Emitter> {
        self.exception_logger.as_ref().or(self.logger.as_ref())
    }

    /// The key a call to `name` with `args` on the current thread is timed under.
    pub fn call_key(&self, name: &str, args: &CallArgs) -> CallKey {
        if self.recursive {
            CallKey::Recursive
        } else {
            CallKey::for_call(name, args)
        }
    }

    /// The key a scoped block on the current thread is timed under.
    pub fn scope_key(&self) -> CallKey {
        if self.recursive {
            CallKey::Recursive
        } else {
            CallKey::for_scope()
        }
    }

    /**
    Opens the span for `key`.

    With a `callable` name, logs that the call started. If `key` is already open, the
    original start time is kept: a recursive timer counts one more level of depth and
    logs it, any other timer leaves the span alone.
    */
    pub fn start(&self, callable: Option<&str>, key: &CallKey) {
        if let (Some(name), Some(logger)) = (callable, &self.logger) {
            logger.emit(json!({
                "message": format!("Starting '{}' in thread {}.", name, crate::sys::thread_ident())
            }));
        }
        let outcome = match self.start_times.entry(*key) {
            Entry::Occupied(_) if self.recursive => {
                let mut depth = self.recurse_depths.entry(*key).or_insert(0);
                *depth += 1;
                StartOutcome::Recursing(*depth)
            }
            Entry::Occupied(_) => StartOutcome::AlreadyOpen,
            Entry::Vacant(vacant) => {
                vacant.insert(Instant::now());
                StartOutcome::Started
            }
        };
        if let (StartOutcome::Recursing(depth), Some(logger)) = (outcome, &self.logger) {
            logger.emit(format!("Recursing, depth={depth}"));
        }
    }

    /**
    Closes the span for `key` and reports it. Returns the elapsed seconds.

    A recursive timer closing an inner level only counts the depth down and returns
    `0.0`. A key that was never started yields `0.0`.
    */
    pub fn stop(&self, name: Option<&str>, key: &CallKey) -> f64 {
        let inner_level = match self.recurse_depths.get_mut(key) {
            Some(mut depth) if *depth > 0 => {
                *depth -= 1;
                true
            }
            _ => false,
        };
        self.recurse_depths.remove_if(key, |_, depth| *depth == 0);
        if inner_level && self.recursive {
            return 0.0;
        }

        let elapsed = self
            .start_times
            .remove(key)
            .map(|(_, started)| started.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        if self.logger.is_some() {
            self.report(elapsed, name, Some(crate::sys::thread_ident()));
        }
        elapsed
    }

    /// Builds the report payload without emitting it.
    pub fn report_payload(&self, elapsed: f64, name: Option<&str>, thread: Option<u64>) -> Fields {
        let name = name.unwrap_or(CONTEXT);
        let thread = thread.map(TemplateArg::Int).unwrap_or(TemplateArg::None);
        let mut payload = Fields::new();
        if let Ok(message) = format_positional(
            &self.message,
            &[TemplateArg::Float(elapsed), TemplateArg::Str(name), thread],
        ) {
            payload.insert("message".to_string(), Value::String(message));
        }
        payload.insert("duration".to_string(), json!(elapsed));
        payload.insert("tags".to_string(), json!(["timing"]));
        payload.insert("timer".to_string(), Value::String(self.name.clone()));
        payload
    }

    /// Emits a timing report, if the timer has a logger.
    pub fn report(&self, elapsed: f64, name: Option<&str>, thread: Option<u64>) {
        if let Some(logger) = &self.logger {
            logger.emit(self.report_payload(elapsed, name, thread));
        }
    }

    /// Times `f` as a call to `name`, logging its result through [Loggable].
    ///
    /// See [Timer::call_described].
    pub fn call<R: Loggable>(
        &self,
        name: &str,
        args: CallArgs,
        f: impl FnOnce() -> R,
    ) -> Result<R, Failure> {
        self.call_described(name, args, f, |result| result.to_log_string())
    }

    /**
    Times `f` as a call to `name` with `args`.

    1. The span is opened under [Timer::call_key].
    2. `f` runs. A panic is reported through the exception logger; unless the timer
       suppresses exceptions, the span is closed and the panic resumes.
    3. Arguments and the result rendered by `describe` are logged, if enabled. A
       suppressed panic is logged as `An exception occurred!`.
    4. The span is closed and reported.

    Returns `Err` only for a suppressed panic.
    */
    pub fn call_described<R>(
        &self,
        name: &str,
        args: CallArgs,
        f: impl FnOnce() -> R,
        describe: impl FnOnce(&R) -> String,
    ) -> Result<R, Failure> {
        let key = self.call_key(name, &args);
        self.start(Some(name), &key);
        let (value, rendered) = match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => {
                let rendered = if self.log_arguments {
                    // A rendering that panics must not fail a call that succeeded.
                    catch_unwind(AssertUnwindSafe(|| describe(&value)))
                        .unwrap_or_else(|_| UNLOGGABLE.to_string())
                } else {
                    String::new()
                };
                (Ok(value), rendered)
            }
            Err(payload) => {
                let failure = Failure::from_panic(payload.as_ref());
                if let Some(logger) = self.exception_emitter() {
                    log_exception(&failure, name, logger);
                }
                if !self.suppress_exceptions {
                    self.stop(Some(name), &key);
                    resume_unwind(payload);
                }
                (Err(failure), EXCEPTION_RESULT.to_string())
            }
        };
        if self.log_arguments {
            let logged = catch_unwind(AssertUnwindSafe(|| {
                log_args_kwargs_results(
                    name,
                    &rendered,
                    self.argument_max_length,
                    self.logger.as_ref(),
                    &args,
                )
            }));
            // A handler that panics loses this log line; the span still closes below.
            drop(logged);
        }
        self.stop(Some(name), &key);
        value
    }

    /**
    Wraps a one-argument function so that every call is timed.

    ```
    use timewise::Timer;
    use std::sync::Arc;

    let timer = Arc::new(Timer::new());
    let double = timer.wrap("double", |x: u32| x * 2);
    assert_eq!(double(21).unwrap(), 42);
    ```
    */
    pub fn wrap<A, R, F>(
        self: &Arc<Self>,
        name: &str,
        f: F,
    ) -> impl Fn(A) -> Result<R, Failure> + use<A, R, F>
    where
        A: Loggable,
        R: Loggable,
        F: Fn(A) -> R,
    {
        let timer = Arc::clone(self);
        let name = name.to_string();
        move |arg: A| {
            let args = CallArgs::new().arg(&arg);
            timer.call(&name, args, || f(arg))
        }
    }

    /**
    Times the enclosing block until the returned guard drops.

    A panic unwinding through the guard is reported before the span closes, but the
    guard never sees the panic payload, so the report carries a generic description
    instead of the panic message. The guard cannot stop the unwinding either.
    [Timer::time_block] reports the real panic message and can suppress it.
    */
    pub fn scope(&self) -> TimerScope<'_> {
        let key = self.scope_key();
        self.start(None, &key);
        TimerScope { timer: self, key }
    }

    /// Times `f` as a block. A panic is reported, then resumed unless the timer
    /// suppresses exceptions, in which case it becomes `Err`.
    pub fn time_block<R>(&self, f: impl FnOnce() -> R) -> Result<R, Failure> {
        let key = self.scope_key();
        self.start(None, &key);
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => {
                self.stop(None, &key);
                Ok(value)
            }
            Err(payload) => {
                let failure = Failure::from_panic(payload.as_ref());
                if let Some(logger) = self.exception_emitter() {
                    log_exception(&failure, CONTEXT, logger);
                }
                self.stop(None, &key);
                if !self.suppress_exceptions {
                    resume_unwind(payload);
                }
                Err(failure)
            }
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard returned by [Timer::scope].
#[derive(Debug)]
#[must_use = "the block is timed until the guard drops"]
pub struct TimerScope<'a> {
    timer: &'a Timer,
    key: CallKey,
}

impl TimerScope<'_> {
    pub fn key(&self) -> CallKey {
        self.key
    }
}

impl Drop for TimerScope<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            if let Some(logger) = self.timer.exception_emitter() {
                let failure = Failure::new(PANIC_KIND, "panic unwound through a timed block");
                log_exception(&failure, CONTEXT, logger);
            }
        }
        self.timer.stop(None, &self.key);
    }
}

/*
boilerplate notes.

# Timer

Not Clone: a clone would not share the open spans, and two timers reporting one call is
worse than an Arc. Debug is derived; DashMap and Emitter both print.
Default is `Timer::new()`, the same as the builder defaults.

# TimerScope

Borrowing guard; nothing to clone or compare.
*/
