// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argument/result logging.
//!
//! A timed call records its arguments as a [CallArgs]: positional values and named
//! ("keyword") values, each already rendered to a string. After the call,
//! [log_args_kwargs_results] turns them and the rendered result into one structured
//! payload:
//!
//! ```json
//! {
//!   "message": "Function arguments log: {\"function\":\"concat\",...}",
//!   "function": "concat",
//!   "args": ["dog", "cat"],
//!   "kwargs": {"sep": "-"},
//!   "sep": "-",
//!   "result": "dog-cat"
//! }
//! ```
//!
//! Each named argument also appears at the top level, unless its name collides with
//! one of the payload's own keys.

use crate::log_record::Fields;
use crate::log_sink::Emitter;
use crate::loggable::Loggable;
use crate::flatten::TRUNCATED;
use serde_json::Value;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Prefix of the `message` field of an argument payload.
pub const ARGUMENTS_PREFIX: &str = "Function arguments log: ";

/// Result recorded for a call that panicked and was not re-raised.
pub const EXCEPTION_RESULT: &str = "An exception occurred!";

/// Default character limit for rendered arguments.
pub const DEFAULT_ARGUMENT_MAX_LENGTH: i64 = 10000;

const RESERVED_KEYS: [&str; 5] = ["message", "function", "args", "kwargs", "result"];

/// Rendered arguments of one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CallArgs {
    args: Vec<String>,
    kwargs: Vec<(String, String)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg<T: Loggable + ?Sized>(self, value: &T) -> Self {
        self.arg_rendered(value.to_log_string())
    }

    pub fn kwarg<T: Loggable + ?Sized>(self, name: impl Into<String>, value: &T) -> Self {
        self.kwarg_rendered(name, value.to_log_string())
    }

    pub fn arg_rendered(mut self, rendered: impl Into<String>) -> Self {
        self.args.push(rendered.into());
        self
    }

    /// Adds a named value. A later value for the same name replaces the earlier one.
    pub fn kwarg_rendered(mut self, name: impl Into<String>, rendered: impl Into<String>) -> Self {
        let name = name.into();
        let rendered = rendered.into();
        match self.kwargs.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = rendered,
            None => self.kwargs.push((name, rendered)),
        }
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn kwargs(&self) -> &[(String, String)] {
        &self.kwargs
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }

    /// Hash of every rendered value, used to tell concurrent calls apart.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Converts a configured limit to a character count; any negative value means unlimited.
pub fn max_length_from_i64(limit: i64) -> Option<usize> {
    usize::try_from(limit).ok()
}

/// Cuts `text` to `max_length` characters and appends the truncation marker.
///
/// ```
/// use timewise::truncate;
/// assert_eq!(truncate("long", Some(3)), "lon<TRUNCATED!>");
/// assert_eq!(truncate("long", Some(4)), "long");
/// assert_eq!(truncate("long", None), "long");
/// ```
pub fn truncate(text: &str, max_length: Option<usize>) -> String {
    match max_length {
        Some(limit) if text.chars().count() > limit => {
            let mut cut: String = text.chars().take(limit).collect();
            cut.push_str(TRUNCATED);
            cut
        }
        _ => text.to_string(),
    }
}

/// Builds the argument payload without emitting it.
pub fn arguments_payload(
    function: &str,
    result: &str,
    max_length: Option<usize>,
    args: &CallArgs,
) -> Fields {
    let positional: Vec<Value> = args
        .args()
        .iter()
        .map(|arg| Value::String(truncate(arg, max_length)))
        .collect();
    let named: Fields = args
        .kwargs()
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(truncate(value, max_length))))
        .collect();

    let mut rest = Fields::new();
    rest.insert("function".to_string(), Value::String(function.to_string()));
    rest.insert("args".to_string(), Value::Array(positional));
    rest.insert("kwargs".to_string(), Value::Object(named.clone()));
    for (name, value) in named {
        if !RESERVED_KEYS.contains(&name.as_str()) {
            rest.insert(name, value);
        }
    }
    rest.insert("result".to_string(), Value::String(truncate(result, max_length)));

    let mut payload = Fields::new();
    payload.insert(
        "message".to_string(),
        Value::String(format!("{ARGUMENTS_PREFIX}{}", Value::Object(rest.clone()))),
    );
    payload.extend(rest);
    payload
}

/// Logs the arguments and result of a call. Does nothing without an emitter.
pub fn log_args_kwargs_results(
    function: &str,
    result: &str,
    max_length: Option<usize>,
    emitter: Option<&Emitter>,
    args: &CallArgs,
) {
    if let Some(emitter) = emitter {
        emitter.emit(arguments_payload(function, result, max_length, args));
    }
}
