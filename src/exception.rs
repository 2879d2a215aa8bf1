// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exception reporting.
//!
//! A panic inside a timed call, or an error a caller chooses to report, is described
//! by a [Failure]: a `kind` label, a `detail` message and an optional traceback. No
//! live error value travels into the log payload, only these strings.
//!
//! The stand-alone wrappers in this module report failures without timing anything:
//!
//! * [exception_handling] catches a panic, reports it with its traceback and returns `None`
//! * [exception_silencing] does the same with the traceback left out
//! * [log_arguments] logs arguments and result of a call that is expected to succeed

use crate::arguments::{CallArgs, log_args_kwargs_results};
use crate::log_record::Fields;
use crate::log_sink::Emitter;
use crate::loggable::Loggable;
use serde_json::{Value, json};
use std::any::Any;
use std::fmt::Display;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Kind recorded for a caught panic.
pub const PANIC_KIND: &str = "panic";

/// A reported failure, as strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    kind: String,
    detail: String,
    traceback: Option<String>,
}

impl Failure {
    pub fn new(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: detail.into(),
            traceback: None,
        }
    }

    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = Some(traceback.into());
        self
    }

    pub fn without_traceback(mut self) -> Self {
        self.traceback = None;
        self
    }

    /**
    Describes a caught panic payload.

    The detail is the panic message when the payload is a string, as it is for every
    `panic!` with a message. The traceback names the panicking thread.
    */
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let detail = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "Box<dyn Any>".to_string()
        };
        let traceback = format!("thread '{}' panicked: {}", crate::sys::thread_name(), detail);
        Failure::new(PANIC_KIND, detail).with_traceback(traceback)
    }

    /// Describes an error value. The traceback lists its `source()` chain, if any.
    pub fn from_error<E: std::error::Error + ?Sized>(error: &E) -> Self {
        let failure = Failure::new(std::any::type_name::<E>(), error.to_string());
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(format!("  {}: {}", causes.len(), cause));
            source = cause.source();
        }
        if causes.is_empty() {
            failure
        } else {
            failure.with_traceback(format!("Caused by:\n{}", causes.join("\n")))
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn traceback(&self) -> Option<&str> {
        self.traceback.as_deref()
    }

    /// Panics again with this failure's detail as the payload.
    pub fn resume(self) -> ! {
        std::panic::resume_unwind(Box::new(self.detail))
    }
}

impl Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl std::error::Error for Failure {}

impl Loggable for Failure {
    fn log_to<Builder: crate::loggable::LogBuilder>(&self, builder: &mut Builder) {
        builder.write(&self.to_string());
    }
}

/// Builds the exception payload without emitting it.
pub fn exception_payload(failure: &Failure, name: &str) -> Fields {
    let message = format!(
        "An exception '{}' occurred, with message '{}'. Traceback is in debug log. Finished '{}'.",
        failure.kind, failure.detail, name
    );
    let mut payload = Fields::new();
    payload.insert("message".to_string(), Value::String(message));
    payload.insert("exception_type".to_string(), Value::String(failure.kind.clone()));
    payload.insert("exception_value".to_string(), Value::String(failure.detail.clone()));
    payload.insert(
        "traceback".to_string(),
        failure.traceback.clone().map(Value::String).unwrap_or(Value::Null),
    );
    payload.insert("tags".to_string(), json!(["timing", "exception"]));
    payload
}

/// Reports `failure` as having ended the call or block called `name`.
pub fn log_exception(failure: &Failure, name: &str, emitter: &Emitter) {
    emitter.emit(exception_payload(failure, name));
}

fn catch_and_report<R>(
    name: &str,
    args: &CallArgs,
    emitter: &Emitter,
    with_traceback: bool,
    f: impl FnOnce() -> R,
) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let mut failure = Failure::from_panic(payload.as_ref());
            if !with_traceback {
                failure = failure.without_traceback();
            }
            log_exception(&failure, name, emitter);
            log_args_kwargs_results(name, "None", None, Some(emitter), args);
            None
        }
    }
}

/**
Runs `f`, turning a panic into a report and `None`.

Useful on worker threads, where a panic would otherwise only end the thread.

```
use timewise::{Emitter, call_args, exception_handling};
use std::sync::{Arc, Mutex};

let seen = Arc::new(Mutex::new(Vec::new()));
let sink = seen.clone();
let emitter = Emitter::new(move |m| sink.lock().unwrap().push(m));

let value: Option<u32> = exception_handling("parse", &call_args!("x"), &emitter, || panic!("bad input"));
assert_eq!(value, None);
// exception report, then the argument log
assert_eq!(seen.lock().unwrap().len(), 2);
```
*/
pub fn exception_handling<R>(
    name: &str,
    args: &CallArgs,
    emitter: &Emitter,
    f: impl FnOnce() -> R,
) -> Option<R> {
    catch_and_report(name, args, emitter, true, f)
}

/// Like [exception_handling], without the traceback.
pub fn exception_silencing<R>(
    name: &str,
    args: &CallArgs,
    emitter: &Emitter,
    f: impl FnOnce() -> R,
) -> Option<R> {
    catch_and_report(name, args, emitter, false, f)
}

/// Runs `f` and logs its arguments and result. Panics propagate unreported.
pub fn log_arguments<R: Loggable>(
    name: &str,
    args: &CallArgs,
    emitter: &Emitter,
    f: impl FnOnce() -> R,
) -> R {
    let result = f();
    log_args_kwargs_results(name, &result.to_log_string(), None, Some(emitter), args);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_args;
    use crate::log_record::Message;
    use std::sync::{Arc, Mutex};

    fn capture() -> (Emitter, Arc<Mutex<Vec<Message>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (Emitter::new(move |m| sink.lock().unwrap().push(m)), seen)
    }

    #[derive(Debug, thiserror::Error)]
    #[error("outer failed")]
    struct Outer(#[source] std::io::Error);

    #[cfg_attr(not(target_arch = "wasm32"), test)]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn payload_names_kind_detail_and_function() {
        let failure = Failure::new("ValueError", "bad value").with_traceback("tb");
        let payload = exception_payload(&failure, "compute");
        assert_eq!(
            payload["message"],
            json!("An exception 'ValueError' occurred, with message 'bad value'. Traceback is in debug log. Finished 'compute'.")
        );
        assert_eq!(payload["exception_type"], json!("ValueError"));
        assert_eq!(payload["exception_value"], json!("bad value"));
        assert_eq!(payload["traceback"], json!("tb"));
        assert_eq!(payload["tags"], json!(["timing", "exception"]));
    }

    #[cfg_attr(not(target_arch = "wasm32"), test)]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn errors_carry_their_source_chain() {
        let error = Outer(std::io::Error::other("disk gone"));
        let failure = Failure::from_error(&error);
        assert!(failure.kind().ends_with("Outer"));
        assert_eq!(failure.detail(), "outer failed");
        assert_eq!(failure.traceback(), Some("Caused by:\n  0: disk gone"));
    }

    #[cfg_attr(not(target_arch = "wasm32"), test)]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn panic_payloads_become_details() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(Failure::from_panic(owned.as_ref()).detail(), "owned");
        let fixed: Box<dyn Any + Send> = Box::new("fixed");
        let failure = Failure::from_panic(fixed.as_ref());
        assert_eq!(failure.kind(), PANIC_KIND);
        assert!(failure.traceback().unwrap().contains("fixed"));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn silencing_drops_the_traceback() {
        let (emitter, seen) = capture();
        let value: Option<()> = exception_silencing("quiet", &call_args!(), &emitter, || panic!("hush"));
        assert!(value.is_none());
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].get("traceback"), Some(&Value::Null));
        assert_eq!(seen[1].get("result"), Some(&json!("None")));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn handling_passes_values_through() {
        let (emitter, seen) = capture();
        assert_eq!(exception_handling("fine", &call_args!(), &emitter, || 5), Some(5));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[cfg_attr(not(target_arch = "wasm32"), test)]
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test::wasm_bindgen_test)]
    fn log_arguments_records_the_result() {
        let (emitter, seen) = capture();
        let joined = log_arguments("join", &call_args!("a", "b"), &emitter, || "ab".to_string());
        assert_eq!(joined, "ab");
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].get("result"), Some(&json!("ab")));
        assert_eq!(seen[0].get("args"), Some(&json!(["a", "b"])));
    }
}
