// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rewriting of RPC request payloads for the `GRPC` level.

use crate::flatten::flatten;
use crate::log_record::{Fields, Message};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Depth the request body is flattened to when no depth is given.
pub const DEFAULT_GRPC_DEPTH: usize = 3;

const REQUEST_MARKER: &str = "Got request (type <class";

fn request_type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\(type <class '(.*)'>").expect("static pattern"))
}

fn body_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{.*\}").expect("static pattern"))
}

/// The class name in `(type <class '...'>`, if present.
pub fn extract_request_type(text: &str) -> Option<String> {
    request_type_pattern()
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|class| class.as_str().to_string())
}

/// The longest `{...}` span of `text`, parsed as JSON and flattened.
///
/// Returns an empty mapping when there is no such span or it does not parse.
pub fn extract_request_body(text: &str, max_level: usize) -> Fields {
    let Some(longest) = body_pattern()
        .find_iter(text)
        .max_by_key(|found| found.as_str().len())
    else {
        return Fields::new();
    };
    serde_json::from_str::<Value>(longest.as_str())
        .ok()
        .and_then(|body| flatten(&body, max_level).ok())
        .unwrap_or_default()
}

/**
Rewrites a request announcement into a flat, tagged payload.

A structured payload whose `message` contains `Got request (type <class '...'>)`
becomes `{original, <flattened body>, request_type, tags}`, where `tags` is the
payload's own tags with `"grpc"` appended. Any other message is returned unchanged.

```
use timewise::{Message, rewrite_grpc};
use serde_json::json;

let message = "Got request (type <class 'nlu.Intent'>): {\"intent\": {\"name\": \"greet\"}}";
let rewritten = rewrite_grpc(Message::from(json!({"message": message, "tags": ["rpc"]})), 3);
assert_eq!(rewritten.get("request_type"), Some(&json!("nlu.Intent")));
assert_eq!(rewritten.get("intent|name"), Some(&json!("greet")));
assert_eq!(rewritten.get("tags"), Some(&json!(["rpc", "grpc"])));
```
*/
pub fn rewrite_grpc(message: Message, max_level: usize) -> Message {
    let Some(text) = message
        .get("message")
        .and_then(Value::as_str)
        .filter(|text| text.contains(REQUEST_MARKER))
    else {
        return message;
    };
    let Some(request_type) = extract_request_type(text) else {
        return message;
    };

    let mut rewritten = Fields::new();
    rewritten.insert("original".to_string(), Value::String(text.to_string()));
    for (key, value) in extract_request_body(text, max_level) {
        rewritten.insert(key, value);
    }
    rewritten.insert("request_type".to_string(), Value::String(request_type));

    let mut tags = match message.get("tags") {
        Some(Value::Array(tags)) => tags.clone(),
        _ => Vec::new(),
    };
    tags.push(Value::String("grpc".to_string()));
    rewritten.insert("tags".to_string(), Value::Array(tags));
    Message::Structured(rewritten)
}
