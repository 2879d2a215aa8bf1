//SPDX-License-Identifier: MIT OR Apache-2.0
/*!
# timewise

timewise wraps function calls and code blocks with timing, argument/result logging,
panic reporting and per-thread context, on top of a small leveled logging backend.

# The problem

Finding out how long a function takes, what it was called with and what it returned
usually means writing the same boilerplate around every call site:

```rust
# fn work(x: u32) -> u32 { x }
let start = std::time::Instant::now();
let out = work(3);
eprintln!("work(3) = {out} took {:?}", start.elapsed());
```

Once there are threads, the boilerplate also has to tell concurrent calls apart, and
once a call can panic it has to report that too.

# The pieces

| Piece              | What it does                                                        |
|--------------------|---------------------------------------------------------------------|
| [Timer]            | times calls and blocks, logs arguments and results, reports panics |
| [`#[timed]`](timed)| rewrites a function so every call goes through a [Timer]          |
| [ThreadContext]    | adds fields to structured logs from one thread while entered      |
| [exception_handling], [exception_silencing], [log_arguments] | report without timing |
| [flatten], [LogSink::grpc] | flatten nested request payloads into one level          |
| [Backend]          | the named sinks everything logs to, built from YAML + environment  |

# The backend

There is no global logger. A [Backend] is built once, from `./logging.yaml` (or the
built-in configuration) and the `MODULE_NAME`, `GIT_REPO_NAME` and `DOCKER_IMAGE_NAME`
environment variables, and handed to whatever needs it. Each [LogSink] has the levels
`debug`, `info`, `grpc`, `warning`, `error` and `critical`, and accepts either plain text
or a structured JSON mapping.

# Timing a function

```rust
use timewise::{Backend, InMemoryLogger, Level, Timer, timed};
use std::sync::{Arc, LazyLock};

static BACKEND: LazyLock<Backend> = LazyLock::new(Backend::bare);
static TIMER: LazyLock<Timer> = LazyLock::new(|| BACKEND.timer().build());

#[timed(TIMER)]
fn concat_two_strings(a: &str, b: &str) -> String {
    format!("{a}{b}")
}

let store = Arc::new(InMemoryLogger::new());
BACKEND.console().add_handler(store.clone());

assert_eq!(concat_two_strings("dog", "cat"), "dogcat");
let logs = store.structured(Level::Warning);
// started, arguments, report
assert_eq!(logs.len(), 3);
assert_eq!(logs[1]["result"], "dogcat");
assert!(logs[2].contains_key("duration"));
```

# Panics

A panic inside a timed call is reported with its message, then resumes. A timer built
with `suppress_exceptions(true)` returns `Err(`[Failure]`)` from [Timer::call] instead.

# Multithreading

Timers and sinks are `Send + Sync`. Each open timing span is keyed by the calling thread
(see [CallKey]), so one timer serves any number of threads. A [ThreadContext] only
enriches records from the thread that built it, and from threads whose name contains
that thread's [thread_ident].
*/

mod arguments;
mod backend;
pub mod config;
mod error;
mod exception;
mod filter;
mod flatten;
mod formatter;
pub mod grpc;
mod inmemory_logger;
mod level;
mod log_record;
mod log_sink;
mod logger;
pub mod loggable;
mod stderror_logger;
mod sys;
mod thread_context;
mod timer;

pub use arguments::{
    ARGUMENTS_PREFIX, CallArgs, DEFAULT_ARGUMENT_MAX_LENGTH, EXCEPTION_RESULT, arguments_payload,
    log_args_kwargs_results, max_length_from_i64, truncate,
};
pub use backend::Backend;
pub use error::Error;
pub use exception::{
    Failure, exception_handling, exception_payload, exception_silencing, log_arguments,
    log_exception,
};
pub use filter::{Filter, ThreadContextFilter};
pub use flatten::{FlattenError, TRUNCATED, flatten};
pub use formatter::Formatter;
pub use grpc::{DEFAULT_GRPC_DEPTH, rewrite_grpc};
pub use inmemory_logger::InMemoryLogger;
pub use level::{Level, ParseLevelError};
pub use log_record::{Fields, LogRecord, Message};
pub use log_sink::{Emitter, LogSink};
pub use loggable::{LogBuilder, LogIt, Loggable, UNLOGGABLE};
pub use logger::Logger;
pub use stderror_logger::StdErrorLogger;
pub use sys::{Duration, Instant, thread_ident, thread_name};
pub use thread_context::{EnteredContext, ThreadContext};
pub use timer::{
    CONTEXT, CallKey, FINISH, FormatError, TemplateArg, Timer, TimerBuilder, TimerScope,
    format_positional,
};

pub use timewise_proc::timed;

#[doc(hidden)]
pub mod hidden {
    pub use crate::loggable::{Describe, ViaDebug, ViaDisplay, ViaLoggable, ViaOpaque};
}
extern crate self as timewise;
