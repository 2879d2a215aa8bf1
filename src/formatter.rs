// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering of records for handlers.
//!
//! Two shapes are supported, matching the two shapes a `format` entry can take in
//! the YAML configuration:
//!
//! * a **template** string, rendered to one line of text:
//!
//!   ```yaml
//!   brief:
//!     format: "[{relative}] {level} {name}: {message}"
//!   ```
//!
//! * a **fluent** mapping, rendered to one JSON object per record. Every value is
//!   itself a template; keys without placeholders are copied verbatim, which is how
//!   the module, repository and image names end up in every line. A structured
//!   message is merged into the object; a text message lands under `message`.
//!
//!   ```yaml
//!   fluent_console:
//!     format:
//!       level: "{level}"
//!       thread: "{thread_name}"
//!   ```
//!
//! Placeholders: `{level}`, `{name}`, `{message}`, `{thread}`, `{thread_name}`,
//! `{relative}`. `{{` and `}}` escape braces; unknown placeholders are kept as-is.

use crate::log_record::{Fields, LogRecord, Message};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Formatter {
    Template(String),
    Fluent(BTreeMap<String, String>),
}

impl Default for Formatter {
    fn default() -> Self {
        Formatter::Template(DEFAULT_TEMPLATE.to_string())
    }
}

pub const DEFAULT_TEMPLATE: &str = "[{relative}] {level} {name} {thread_name}: {message}";

impl Formatter {
    pub fn format(&self, record: &LogRecord) -> String {
        match self {
            Formatter::Template(template) => render(template, record),
            Formatter::Fluent(fields) => {
                let mut out = Fields::new();
                for (key, template) in fields {
                    out.insert(key.clone(), Value::String(render(template, record)));
                }
                match record.message() {
                    Message::Structured(message) => {
                        for (key, value) in message {
                            out.insert(key.clone(), value.clone());
                        }
                    }
                    Message::Text(text) => {
                        out.insert("message".to_string(), Value::String(text.clone()));
                    }
                }
                Value::Object(out).to_string()
            }
        }
    }
}

fn placeholder(name: &str, record: &LogRecord) -> Option<String> {
    match name {
        "level" => Some(record.level().name().to_string()),
        "name" => Some(record.logger().to_string()),
        "message" => Some(record.message().to_string()),
        "thread" => Some(record.thread().to_string()),
        "thread_name" => Some(record.thread_name().to_string()),
        "relative" => Some(format!("{:?}", record.relative_created())),
        _ => None,
    }
}

fn render(template: &str, record: &LogRecord) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('{') {
            if let Some(end) = tail.find('}') {
                let name = &tail[1..end];
                match placeholder(name, record) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&tail[..=end]),
                }
                rest = &tail[end + 1..];
                continue;
            }
        }
        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}
