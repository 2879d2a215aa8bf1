// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform-specific time types and thread identity.
//!
//! On native platforms [`Instant`] and [`Duration`] come from `std::time`, while on
//! WASM they come from `web_time`.
//!
//! `std::thread::ThreadId` is opaque, and the context filter needs a number it can
//! look for inside a thread *name* (so that a worker named `sub-thread-<ident>`
//! is recognised as belonging to the thread that spawned it). Each thread is
//! therefore assigned an identifier of its own the first time it asks for one.

#[cfg(not(target_arch = "wasm32"))]
pub use std::time::{Duration, Instant};
#[cfg(target_arch = "wasm32")]
pub use web_time::{Duration, Instant};

use std::sync::atomic::{AtomicU64, Ordering};

/// Offset so every identifier has the same number of decimal digits; no identifier
/// is then a substring of another one embedded in a thread name.
const THREAD_IDENT_BASE: u64 = 1 << 40;

static NEXT_THREAD_IDENT: AtomicU64 = AtomicU64::new(THREAD_IDENT_BASE);

thread_local! {
    static THREAD_IDENT: u64 = NEXT_THREAD_IDENT.fetch_add(1, Ordering::Relaxed);
}

/// Returns the identifier of the calling thread.
///
/// Identifiers are unique for the life of the process and never reused.
///
/// ```
/// let here = timewise::thread_ident();
/// let there = std::thread::spawn(timewise::thread_ident).join().unwrap();
/// assert_ne!(here, there);
/// assert_eq!(here, timewise::thread_ident());
/// ```
#[inline]
pub fn thread_ident() -> u64 {
    THREAD_IDENT.with(|ident| *ident)
}

/// Returns the display name of the calling thread, `Thread-<ident>` if it has none.
pub fn thread_name() -> String {
    match std::thread::current().name() {
        Some(name) => name.to_string(),
        None => format!("Thread-{}", thread_ident()),
    }
}
