// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_json::json;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use timewise::{
    Backend, EXCEPTION_RESULT, Fields, InMemoryLogger, Level, LogBuilder, LogRecord, LogSink,
    Loggable, Logger, Message, TRUNCATED, Timer, TimerBuilder, UNLOGGABLE, call_args,
};

fn capture(configure: impl FnOnce(TimerBuilder) -> TimerBuilder) -> (Arc<Timer>, Arc<InMemoryLogger>) {
    let backend = Backend::bare();
    let store = Arc::new(InMemoryLogger::new());
    backend.console().add_handler(store.clone());
    (Arc::new(configure(backend.timer()).build()), store)
}

fn reports(store: &InMemoryLogger) -> Vec<Fields> {
    store
        .structured(Level::Warning)
        .into_iter()
        .filter(|fields| fields.contains_key("duration"))
        .collect()
}

fn text_messages(store: &InMemoryLogger) -> Vec<String> {
    store
        .raw_messages(Level::Warning)
        .into_iter()
        .filter_map(|message| match message {
            Message::Text(text) => Some(text),
            Message::Structured(_) => None,
        })
        .collect()
}

fn argument_logs(store: &InMemoryLogger) -> Vec<Fields> {
    store
        .structured(Level::Warning)
        .into_iter()
        .filter(|fields| fields.contains_key("result"))
        .collect()
}

#[test]
fn sleeping_call_reports_its_duration() {
    let (timer, store) = capture(|b| b.name("sleepy"));
    timer
        .call("nap", call_args!(), || thread::sleep(Duration::from_millis(10)))
        .unwrap();

    let reports = reports(&store);
    assert_eq!(reports.len(), 1);
    let duration = reports[0]["duration"].as_f64().unwrap();
    assert!(duration >= 0.0099, "duration was {duration}");
    assert!(duration < 0.1, "duration was {duration}");
    assert_eq!(reports[0]["timer"], json!("sleepy"));
    assert_eq!(reports[0]["tags"], json!(["timing"]));
    assert!(
        reports[0]["message"]
            .as_str()
            .unwrap()
            .starts_with("Elapsed time: 0.01")
    );
    assert_eq!(timer.open_spans(), 0);
}

#[test]
fn every_call_reports_once() {
    let (timer, store) = capture(|b| b);
    for i in 0..5 {
        timer.call("count", call_args!(i), || i * 2).unwrap();
    }
    assert_eq!(reports(&store).len(), 5);
    let results: Vec<_> = argument_logs(&store)
        .iter()
        .map(|fields| fields["result"].clone())
        .collect();
    assert_eq!(results, [json!("0"), json!("2"), json!("4"), json!("6"), json!("8")]);
}

fn factorial(timer: &Timer, n: u64) -> u64 {
    timer
        .call("factorial", call_args!(n), || {
            if n <= 1 { 1 } else { n * factorial(timer, n - 1) }
        })
        .unwrap()
}

#[test]
fn recursive_timer_reports_the_outermost_call_only() {
    let (timer, store) = capture(|b| b.recursive(true));
    assert_eq!(factorial(&timer, 4), 24);

    assert_eq!(reports(&store).len(), 1);
    assert_eq!(
        text_messages(&store),
        ["Recursing, depth=1", "Recursing, depth=2", "Recursing, depth=3"]
    );
    assert_eq!(timer.open_spans(), 0);

    // the timer is usable again afterwards
    factorial(&timer, 2);
    assert_eq!(reports(&store).len(), 2);
}

#[test]
fn plain_timer_reports_every_level_of_recursion() {
    let (timer, store) = capture(|b| b);
    assert_eq!(factorial(&timer, 4), 24);

    assert_eq!(reports(&store).len(), 4);
    assert!(text_messages(&store).is_empty());
    assert_eq!(timer.open_spans(), 0);
}

#[test]
fn nested_functions_are_timed_separately() {
    let (timer, store) = capture(|b| b);
    let outer = timer
        .call("outer", call_args!(), || {
            thread::sleep(Duration::from_millis(5));
            timer.call("inner", call_args!(), || "inner done").unwrap()
        })
        .unwrap();
    assert_eq!(outer, "inner done");

    let reports = reports(&store);
    assert_eq!(reports.len(), 2);
    // inner finishes first
    assert!(reports[0]["message"].as_str().unwrap().contains("'inner'"));
    assert!(reports[1]["message"].as_str().unwrap().contains("'outer'"));
    assert!(reports[1]["duration"].as_f64().unwrap() >= reports[0]["duration"].as_f64().unwrap());
}

#[test]
fn concurrent_calls_keep_separate_spans() {
    let (timer, store) = capture(|b| b);
    let handles: Vec<_> = (0..10u64)
        .map(|i| {
            let timer = timer.clone();
            thread::spawn(move || {
                timer
                    .call("worker", call_args!(i), || {
                        thread::sleep(Duration::from_millis(10));
                        i
                    })
                    .unwrap()
            })
        })
        .collect();
    let mut results: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    results.sort();
    assert_eq!(results, (0..10).collect::<Vec<_>>());

    let reports = reports(&store);
    assert_eq!(reports.len(), 10);
    for report in &reports {
        let duration = report["duration"].as_f64().unwrap();
        assert!(duration >= 0.0099, "duration was {duration}");
        assert!(duration < 0.1, "duration was {duration}");
    }
    assert_eq!(timer.open_spans(), 0);
}

#[test]
fn long_arguments_are_truncated() {
    let (timer, store) = capture(|b| b.argument_max_length(8));
    let long = "abcdefghijklmnop".to_string();
    timer
        .call("echo", call_args!(long, label = "short"), || long.clone())
        .unwrap();

    let log = &argument_logs(&store)[0];
    assert_eq!(log["args"], json!([format!("abcdefgh{TRUNCATED}")]));
    assert_eq!(log["kwargs"], json!({"label": "short"}));
    assert_eq!(log["label"], json!("short"));
    assert_eq!(log["result"], json!(format!("abcdefgh{TRUNCATED}")));
}

#[test]
fn negative_limit_disables_truncation() {
    let (timer, store) = capture(|b| b.argument_max_length(-1));
    let long = "x".repeat(20_000);
    timer.call("echo", call_args!(long), || long.len()).unwrap();

    let log = &argument_logs(&store)[0];
    assert_eq!(log["args"][0].as_str().unwrap().len(), 20_000);
    assert_eq!(log["result"], json!("20000"));
}

#[test]
fn panics_are_reported_then_resumed() {
    let (timer, store) = capture(|b| b);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        timer.call("explode", call_args!(), || -> u32 { panic!("boom") })
    }));
    assert!(outcome.is_err());

    let logs = store.structured(Level::Warning);
    let exception = logs
        .iter()
        .find(|fields| fields.contains_key("exception_type"))
        .expect("an exception log");
    assert_eq!(exception["exception_value"], json!("boom"));
    assert_eq!(exception["tags"], json!(["timing", "exception"]));
    assert_eq!(reports(&store).len(), 1);
    // the argument log is skipped when the panic resumes
    assert!(argument_logs(&store).is_empty());
    assert_eq!(timer.open_spans(), 0);
}

#[test]
fn suppressed_panics_become_errors() {
    let (timer, store) = capture(|b| b.suppress_exceptions(true));
    let failure = timer
        .call("explode", call_args!(7), || -> u32 { panic!("boom") })
        .unwrap_err();
    assert_eq!(failure.detail(), "boom");

    let logs = store.structured(Level::Warning);
    assert!(logs.iter().any(|fields| fields.contains_key("exception_type")));
    assert_eq!(argument_logs(&store)[0]["result"], json!(EXCEPTION_RESULT));
    assert_eq!(reports(&store).len(), 1);
}

#[test]
fn exception_logger_takes_exception_reports() {
    let backend = Backend::bare();
    let timing = Arc::new(InMemoryLogger::new());
    let errors = Arc::new(InMemoryLogger::new());
    backend.console().add_handler(timing.clone());
    backend.debug().add_handler(errors.clone());
    let timer = backend
        .timer()
        .exception_logger(backend.debug().emitter(Level::Error))
        .suppress_exceptions(true)
        .build();

    let _ = timer.call("explode", call_args!(), || -> u32 { panic!("boom") });
    assert_eq!(errors.structured(Level::Error).len(), 1);
    assert!(
        timing
            .structured(Level::Warning)
            .iter()
            .all(|fields| !fields.contains_key("exception_type"))
    );
}

#[test]
fn time_block_times_and_suppresses() {
    let (timer, store) = capture(|b| b.suppress_exceptions(true));
    assert_eq!(timer.time_block(|| 5).unwrap(), 5);
    assert!(timer.time_block(|| -> u32 { panic!("inside") }).is_err());

    let reports = reports(&store);
    assert_eq!(reports.len(), 2);
    assert!(reports[0]["message"].as_str().unwrap().contains("'ContextManager'"));
}

#[test]
fn time_block_reports_the_panic_message() {
    let (timer, store) = capture(|b| b.suppress_exceptions(true));
    let failure = timer.time_block(|| -> u32 { panic!("disk full") }).unwrap_err();
    assert_eq!(failure.detail(), "disk full");

    let logs = store.structured(Level::Warning);
    let exception = logs
        .iter()
        .find(|fields| fields.contains_key("exception_type"))
        .expect("an exception log");
    assert_eq!(exception["exception_value"], json!("disk full"));
    assert_eq!(timer.open_spans(), 0);
}

struct Unrenderable;

impl Loggable for Unrenderable {
    fn log_to<Builder: LogBuilder>(&self, _builder: &mut Builder) {
        panic!("cannot render");
    }
}

#[test]
fn panicking_result_rendering_keeps_the_call_alive() {
    let (timer, store) = capture(|b| b);
    let outcome = timer.call("render", call_args!(1), || Unrenderable);
    assert!(outcome.is_ok());
    assert_eq!(timer.open_spans(), 0);

    assert_eq!(argument_logs(&store)[0]["result"], json!(UNLOGGABLE));
    assert_eq!(reports(&store).len(), 1);
}

#[derive(Debug)]
struct PanickingHandler;

impl Logger for PanickingHandler {
    fn finish_log_record(&self, record: &LogRecord) {
        if record.message().get("result").is_some() {
            panic!("handler failed");
        }
    }

    fn prepare_to_die(&self) {}
}

#[test]
fn panicking_argument_handler_still_closes_the_span() {
    let sink = Arc::new(LogSink::new("failing", Level::Debug));
    sink.add_handler(Arc::new(PanickingHandler));
    let timer = Timer::builder().logger(sink.emitter(Level::Warning)).build();

    let value = timer.call("add", call_args!(1, 2), || 1 + 2).unwrap();
    assert_eq!(value, 3);
    assert_eq!(timer.open_spans(), 0);
}

#[test]
fn scope_reports_when_the_guard_drops() {
    let (timer, store) = capture(|b| b);
    {
        let _scope = timer.scope();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(timer.open_spans(), 1);
    }
    assert_eq!(timer.open_spans(), 0);
    let reports = reports(&store);
    assert_eq!(reports.len(), 1);
    assert!(reports[0]["duration"].as_f64().unwrap() >= 0.0099);
}

#[test]
fn scope_reports_a_panic_unwinding_through_it() {
    let (timer, store) = capture(|b| b);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _scope = timer.scope();
        panic!("unwinding");
    }));
    assert!(outcome.is_err());
    let logs = store.structured(Level::Warning);
    assert!(logs.iter().any(|fields| fields.contains_key("exception_type")));
    assert_eq!(reports(&store).len(), 1);
}

#[test]
fn wrapped_functions_are_timed() {
    let (timer, store) = capture(|b| b);
    let shout = timer.wrap("shout", |word: String| word.to_uppercase());
    assert_eq!(shout("hey".to_string()).unwrap(), "HEY");
    assert_eq!(shout("you".to_string()).unwrap(), "YOU");
    assert_eq!(reports(&store).len(), 2);
    assert_eq!(argument_logs(&store)[1]["args"], json!(["you"]));
}

#[test]
fn custom_template_fills_the_message() {
    let (timer, store) = capture(|b| b.message("{1} took {0:.1f}s"));
    timer.call("quick", call_args!(), || ()).unwrap();
    assert_eq!(reports(&store)[0]["message"], json!("quick took 0.0s"));
}
