//SPDX-License-Identifier: MIT OR Apache-2.0

//! # Timewise Procedural Macros
//!
//! This crate provides the `#[timed]` attribute for the timewise library. The attribute
//! rewrites a function body into a call to `Timer::call_described`, so that every call of
//! the function is timed, its named parameters and result are logged, and a panic in the
//! body is reported before it resumes.
//!
//! ## Expansion
//!
//! ```rust
//! # use std::sync::LazyLock;
//! # static TIMER: LazyLock<timewise::Timer> = LazyLock::new(|| timewise::Timer::builder().build());
//! #[timewise::timed(TIMER)]
//! fn add(a: u32, b: u32) -> u32 {
//!     a + b
//! }
//! // expands to approximately:
//! // fn add(a: u32, b: u32) -> u32 {
//! //     (TIMER).call_described(
//! //         "add",
//! //         ::timewise::call_args!(a, b),
//! //         || -> u32 { a + b },
//! //         |__timewise_result: &u32| ::timewise::describe!(__timewise_result),
//! //     )
//! //     .unwrap_or_else(|__timewise_failure| __timewise_failure.resume())
//! // }
//! assert_eq!(add(1, 2), 3);
//! ```
//!
//! ## Parameters
//!
//! Only parameters that bind a single name are logged. Receivers and destructuring
//! patterns are left out. Values render through `Loggable`, then `Display`, then `Debug`,
//! and as `<unloggable>` when none apply.

use proc_macro::TokenStream;

mod timed;

/**
Times every call of the annotated function with the given timer.

The attribute takes any expression that derefs to a `timewise::Timer`, usually a
`static` behind a `LazyLock`:

```rust
use std::sync::LazyLock;
use timewise::{Timer, timed};

static TIMER: LazyLock<Timer> = LazyLock::new(|| Timer::builder().build());

#[timed(TIMER)]
fn greet(name: &str) -> String {
    format!("hello {name}")
}

assert_eq!(greet("world"), "hello world");
```

`async fn` is rejected; time the future's work with `Timer::scope` instead.
A panic in the body is logged and then resumed, whatever the timer's
`suppress_exceptions` setting.
*/
#[proc_macro_attribute]
pub fn timed(attr: TokenStream, item: TokenStream) -> TokenStream {
    timed::timed_impl(attr, item)
}
