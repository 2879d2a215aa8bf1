// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
Rendering of argument and result values for log payloads.

Timed calls record their arguments and result as strings. [Loggable] is the trait
that decides what those strings look like: strings render without quotes, numbers
as themselves, containers element by element. Implement it for your own types, or
wrap a `Debug` value in [LogIt].

Inside the crate's macros, values are rendered through a fallback chain instead, so
that any argument can be logged:

1. [Loggable], if implemented
2. `Display`, if implemented
3. `Debug`, if implemented
4. the literal `<unloggable>`

```
use timewise::describe;

#[derive(Debug)]
struct Point { x: i32 }
struct Opaque;

assert_eq!(describe!("dog"), "dog");
assert_eq!(describe!(vec![1, 2]), "[1, 2]");
assert_eq!(describe!(Point { x: 1 }), "Point { x: 1 }");
assert_eq!(describe!(Opaque), "<unloggable>");
```
*/

use crate::log_record::{Fields, Message};
use std::fmt::{Debug, Display};

/// An in-progress rendering.
pub trait LogBuilder {
    fn write(&mut self, text: &str);
}

impl LogBuilder for String {
    #[inline]
    fn write(&mut self, text: &str) {
        self.push_str(text);
    }
}

pub trait Loggable {
    /**
    Writes the value's log representation to the builder.

    When implementing this, use of `#[inline]` is recommended.
    */
    fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder);

    /// The value's log representation as an owned string.
    fn to_log_string(&self) -> String {
        let mut rendered = String::new();
        self.log_to(&mut rendered);
        rendered
    }
}

macro_rules! loggable_via_display {
    ($($t:ty),* $(,)?) => {
        $(
            impl Loggable for $t {
                #[inline]
                fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder) {
                    builder.write(&self.to_string());
                }
            }
        )*
    };
}

loggable_via_display!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, bool, char, str, String,
);

/**
Floats keep their fractional part, so `1.0` stays `1.0`.
*/
impl Loggable for f32 {
    #[inline]
    fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder) {
        builder.write(&format!("{:?}", self));
    }
}

impl Loggable for f64 {
    #[inline]
    fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder) {
        builder.write(&format!("{:?}", self));
    }
}

impl Loggable for () {
    #[inline]
    fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder) {
        builder.write("()");
    }
}

impl<T: Loggable + ?Sized> Loggable for &T {
    #[inline]
    fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder) {
        (**self).log_to(builder);
    }
}

impl<T: Loggable + ?Sized> Loggable for Box<T> {
    #[inline]
    fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder) {
        (**self).log_to(builder);
    }
}

impl<T: Loggable + ?Sized> Loggable for std::sync::Arc<T> {
    #[inline]
    fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder) {
        (**self).log_to(builder);
    }
}

/**
slices render element by element.
*/
impl<T: Loggable> Loggable for [T] {
    #[inline]
    fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder) {
        builder.write("[");
        for (index, item) in self.iter().enumerate() {
            if index > 0 {
                builder.write(", ");
            }
            item.log_to(builder);
        }
        builder.write("]");
    }
}

impl<T: Loggable> Loggable for Vec<T> {
    #[inline]
    fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder) {
        self.as_slice().log_to(builder);
    }
}

impl<T: Loggable, const N: usize> Loggable for [T; N] {
    #[inline]
    fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder) {
        self.as_slice().log_to(builder);
    }
}

/**
Option depends on the underlying type.
*/
impl<T: Loggable> Loggable for Option<T> {
    #[inline]
    fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder) {
        match self {
            Some(t) => {
                builder.write("Some(");
                t.log_to(builder);
                builder.write(")");
            }
            None => builder.write("None"),
        }
    }
}

impl<T: Loggable, E: Loggable> Loggable for Result<T, E> {
    #[inline]
    fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder) {
        match self {
            Ok(t) => {
                builder.write("Ok(");
                t.log_to(builder);
            }
            Err(e) => {
                builder.write("Err(");
                e.log_to(builder);
            }
        }
        builder.write(")");
    }
}

/**
JSON strings render without quotes, like any other string; everything else renders as JSON.
*/
impl Loggable for serde_json::Value {
    #[inline]
    fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder) {
        match self {
            serde_json::Value::String(text) => builder.write(text),
            other => builder.write(&other.to_string()),
        }
    }
}

impl Loggable for Fields {
    #[inline]
    fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder) {
        builder.write(&serde_json::Value::Object(self.clone()).to_string());
    }
}

impl Loggable for Message {
    #[inline]
    fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder) {
        builder.write(&self.to_string());
    }
}

/**
Escape hatch: log any `Debug` value through its `Debug` representation.

```
use timewise::{LogIt, Loggable};

#[derive(Debug)]
struct Request { id: u32 }

assert_eq!(LogIt(Request { id: 7 }).to_log_string(), "Request { id: 7 }");
```
*/
pub struct LogIt<T>(pub T);

impl<T: Debug> Loggable for LogIt<T> {
    #[inline]
    fn log_to<Builder: LogBuilder>(&self, builder: &mut Builder) {
        builder.write(&format!("{:?}", self.0));
    }
}

/*
Fallback chain used by `describe!`.

Each step is implemented one reference level apart, so method resolution on
`&&&&Describe(..)` settles on the first step whose bound holds.
*/

/// Rendering of a value that has no representation, or whose rendering panicked.
pub const UNLOGGABLE: &str = "<unloggable>";

#[doc(hidden)]
pub struct Describe<'a, T: ?Sized>(pub &'a T);

#[doc(hidden)]
pub trait ViaLoggable {
    fn describe(&self) -> String;
}

impl<T: Loggable + ?Sized> ViaLoggable for &&&Describe<'_, T> {
    fn describe(&self) -> String {
        self.0.to_log_string()
    }
}

#[doc(hidden)]
pub trait ViaDisplay {
    fn describe(&self) -> String;
}

impl<T: Display + ?Sized> ViaDisplay for &&Describe<'_, T> {
    fn describe(&self) -> String {
        self.0.to_string()
    }
}

#[doc(hidden)]
pub trait ViaDebug {
    fn describe(&self) -> String;
}

impl<T: Debug + ?Sized> ViaDebug for &Describe<'_, T> {
    fn describe(&self) -> String {
        format!("{:?}", self.0)
    }
}

#[doc(hidden)]
pub trait ViaOpaque {
    fn describe(&self) -> String;
}

impl<T: ?Sized> ViaOpaque for Describe<'_, T> {
    fn describe(&self) -> String {
        UNLOGGABLE.to_string()
    }
}

/// Renders any value to a string, see the [module documentation](crate::loggable).
#[macro_export]
macro_rules! describe {
    ($value:expr) => {{
        #[allow(unused_imports)]
        use $crate::hidden::{ViaDebug as _, ViaDisplay as _, ViaLoggable as _, ViaOpaque as _};
        (&&&&$crate::hidden::Describe(&$value)).describe()
    }};
}

/**
Builds [CallArgs](crate::CallArgs) from positional values and `name = value` pairs.

Every value is rendered with [describe!].

```
use timewise::call_args;

let args = call_args!("dog", 3, sep = "-");
assert_eq!(args.args(), ["dog", "3"]);
assert_eq!(args.kwargs(), [("sep".to_string(), "-".to_string())]);
```
*/
#[macro_export]
macro_rules! call_args {
    (@acc $acc:expr ;) => { $acc };
    (@acc $acc:expr ; $name:ident = $value:expr $(, $($rest:tt)*)?) => {
        $crate::call_args!(@acc $acc.kwarg_rendered(stringify!($name), $crate::describe!($value)) ; $($($rest)*)?)
    };
    (@acc $acc:expr ; $value:expr $(, $($rest:tt)*)?) => {
        $crate::call_args!(@acc $acc.arg_rendered($crate::describe!($value)) ; $($($rest)*)?)
    };
    ($($tokens:tt)*) => {
        $crate::call_args!(@acc $crate::CallArgs::new() ; $($tokens)*)
    };
}
