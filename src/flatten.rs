// SPDX-License-Identifier: MIT OR Apache-2.0

//! Depth-limited flattening of nested JSON objects.

use crate::log_record::Fields;
use serde_json::Value;

/// Marker that replaces values cut off by truncation.
pub const TRUNCATED: &str = "<TRUNCATED!>";

/// Separator between the key segments of a flattened path.
pub const PATH_SEPARATOR: &str = "|";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FlattenError {
    #[error("flatten depth must be at least 1")]
    ZeroDepth,
}

/**
Flattens nested objects into a single level keyed by `|`-joined paths.

Objects nested deeper than `max_level` collapse to [TRUNCATED]. Arrays and scalars
are leaves. A value that is not an object at all is stored under the empty key.

```
use timewise::flatten;
use serde_json::json;

let nested = json!({"a": {"b": 1}});
assert_eq!(flatten(&nested, 2).unwrap()["a|b"], json!(1));
assert_eq!(flatten(&nested, 1).unwrap()["a"], json!("<TRUNCATED!>"));
assert!(flatten(&nested, 0).is_err());
```
*/
pub fn flatten(value: &Value, max_level: usize) -> Result<Fields, FlattenError> {
    if max_level == 0 {
        return Err(FlattenError::ZeroDepth);
    }
    let mut output = Fields::new();
    flatten_into(value, "", 0, max_level, &mut output);
    Ok(output)
}

fn flatten_into(node: &Value, path: &str, level: usize, max_level: usize, output: &mut Fields) {
    match node {
        Value::Object(children) if level < max_level => {
            for (key, child) in children {
                let child_path = if level == 0 {
                    key.clone()
                } else {
                    format!("{path}{PATH_SEPARATOR}{key}")
                };
                flatten_into(child, &child_path, level + 1, max_level, output);
            }
        }
        Value::Object(_) => {
            output.insert(path.to_string(), Value::String(TRUNCATED.to_string()));
        }
        leaf => {
            output.insert(path.to_string(), leaf.clone());
        }
    }
}
