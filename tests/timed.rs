// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_json::json;
use std::panic::catch_unwind;
use std::sync::{Arc, LazyLock, Mutex};
use timewise::{Backend, Fields, InMemoryLogger, Level, Timer, timed};

static BACKEND: LazyLock<Backend> = LazyLock::new(|| {
    let backend = Backend::bare();
    backend.console().add_handler(STORE.clone());
    backend
});
static STORE: LazyLock<Arc<InMemoryLogger>> = LazyLock::new(|| Arc::new(InMemoryLogger::new()));
static TIMER: LazyLock<Timer> = LazyLock::new(|| BACKEND.timer().name("timed").build());
static RECURSIVE: LazyLock<Timer> =
    LazyLock::new(|| BACKEND.timer().name("recursive").recursive(true).build());

// every test here shares one store
static SERIAL: Mutex<()> = Mutex::new(());

fn fresh_logs<R>(f: impl FnOnce() -> R) -> (R, Vec<Fields>) {
    let _guard = SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    LazyLock::force(&BACKEND);
    STORE.reset();
    let value = f();
    (value, STORE.structured(Level::Warning))
}

#[derive(Debug)]
struct Point {
    x: i32,
    y: i32,
}

#[timed(TIMER)]
fn concat(a: &str, mut b: String) -> String {
    b.insert_str(0, a);
    b
}

#[timed(TIMER)]
fn distance(p: &Point) -> f64 {
    f64::from(p.x * p.x + p.y * p.y).sqrt()
}

#[timed(TIMER)]
fn nothing_returned(_ignored: u8) {}

#[timed(TIMER)]
fn first<'a>(items: &'a [u32]) -> Option<&'a u32> {
    items.first()
}

#[timed(TIMER)]
fn generic<T: std::fmt::Display, F: Fn(u32) -> u32>(label: T, f: F) -> String {
    format!("{label}={}", f(2))
}

#[timed(TIMER)]
fn fails(limit: u32) -> u32 {
    if limit > 0 {
        panic!("limit exceeded");
    }
    limit
}

#[timed(RECURSIVE)]
fn fib(n: u64) -> u64 {
    if n < 2 { n } else { fib(n - 1) + fib(n - 2) }
}

struct Counter {
    base: u32,
}

impl Counter {
    #[timed(TIMER)]
    fn add(&self, amount: u32) -> u32 {
        self.base + amount
    }
}

#[test]
fn arguments_and_result_are_logged() {
    let (value, logs) = fresh_logs(|| concat("dog", "cat".to_string()));
    assert_eq!(value, "dogcat");
    assert_eq!(logs.len(), 3);
    assert!(
        logs[0]["message"]
            .as_str()
            .unwrap()
            .starts_with("Starting 'concat' in thread ")
    );
    assert_eq!(logs[1]["function"], json!("concat"));
    assert_eq!(logs[1]["args"], json!(["dog", "cat"]));
    assert_eq!(logs[1]["result"], json!("dogcat"));
    assert_eq!(logs[2]["timer"], json!("timed"));
}

#[test]
fn debug_only_arguments_use_debug() {
    let (_, logs) = fresh_logs(|| distance(&Point { x: 3, y: 4 }));
    assert_eq!(logs[1]["args"], json!(["Point { x: 3, y: 4 }"]));
    assert_eq!(logs[1]["result"], json!("5.0"));
}

#[test]
fn unit_and_borrowed_returns() {
    let (_, logs) = fresh_logs(|| nothing_returned(1));
    assert_eq!(logs[1]["result"], json!("()"));
    // underscore parameters are still single names
    assert_eq!(logs[1]["args"], json!(["1"]));

    let (found, logs) = fresh_logs(|| first(&[7, 8]).copied());
    assert_eq!(found, Some(7));
    assert_eq!(logs[1]["result"], json!("Some(7)"));
}

#[test]
fn generics_are_untouched() {
    let (value, logs) = fresh_logs(|| generic("n", |x| x * 10));
    assert_eq!(value, "n=20");
    // the closure has no rendering
    assert_eq!(logs[1]["args"], json!(["n", "<unloggable>"]));
}

#[test]
fn panics_are_logged_and_resumed() {
    let (outcome, logs) = fresh_logs(|| catch_unwind(|| fails(1)));
    assert!(outcome.is_err());
    let exception = logs
        .iter()
        .find(|fields| fields.contains_key("exception_type"))
        .expect("an exception log");
    assert_eq!(exception["exception_value"], json!("limit exceeded"));

    let (value, _) = fresh_logs(|| fails(0));
    assert_eq!(value, 0);
}

#[test]
fn recursive_functions_report_once() {
    let (value, logs) = fresh_logs(|| fib(5));
    assert_eq!(value, 5);
    let reports = logs.iter().filter(|fields| fields.contains_key("duration")).count();
    assert_eq!(reports, 1);
}

#[test]
fn methods_skip_the_receiver() {
    let counter = Counter { base: 40 };
    let (value, logs) = fresh_logs(|| counter.add(2));
    assert_eq!(value, 42);
    assert_eq!(logs[1]["args"], json!(["2"]));
}
