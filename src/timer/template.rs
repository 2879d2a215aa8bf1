// SPDX-License-Identifier: MIT OR Apache-2.0

//! Positional message templates for timing reports.
//!
//! Supported replacement fields: `{}` and `{0}` (automatic or explicit index),
//! an optional conversion `!r` (quoted) or `!s`, and an optional spec of the form
//! `[0][width][.precision][f|d|s]`. `{{` and `}}` are literal braces.

use std::fmt::Write;

/// A value substituted into a template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TemplateArg<'a> {
    Float(f64),
    Int(u64),
    Str(&'a str),
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("replacement field {0} has no argument")]
    MissingArgument(usize),
    #[error("unsupported format spec {0:?}")]
    UnsupportedSpec(String),
    #[error("unsupported conversion {0:?}")]
    UnsupportedConversion(String),
    #[error("cannot switch between automatic and manual field numbering")]
    MixedNumbering,
    #[error("unbalanced brace in template")]
    UnbalancedBrace,
}

#[derive(Debug, Default)]
struct Spec {
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
    kind: Option<char>,
}

fn parse_spec(spec: &str) -> Result<Spec, FormatError> {
    let unsupported = || FormatError::UnsupportedSpec(spec.to_string());
    let mut parsed = Spec::default();
    let mut rest = spec;
    if let Some(stripped) = rest.strip_prefix('0') {
        parsed.zero = true;
        rest = stripped;
    }
    let width_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if width_end > 0 {
        parsed.width = Some(rest[..width_end].parse().map_err(|_| unsupported())?);
    }
    rest = &rest[width_end..];
    if let Some(stripped) = rest.strip_prefix('.') {
        let precision_end = stripped
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(stripped.len());
        if precision_end == 0 {
            return Err(unsupported());
        }
        parsed.precision = Some(stripped[..precision_end].parse().map_err(|_| unsupported())?);
        rest = &stripped[precision_end..];
    }
    let mut chars = rest.chars();
    parsed.kind = chars.next();
    if chars.next().is_some() || !matches!(parsed.kind, None | Some('f' | 'd' | 's')) {
        return Err(unsupported());
    }
    Ok(parsed)
}

fn render_value(arg: TemplateArg<'_>, quoted: bool, spec: &Spec, raw: &str) -> Result<String, FormatError> {
    let unsupported = || FormatError::UnsupportedSpec(raw.to_string());
    let width = spec.width.unwrap_or(0);
    let text = match (spec.kind, arg) {
        (Some('f'), TemplateArg::Float(value)) => float(value, spec.precision.unwrap_or(6), spec.zero, width),
        (Some('f'), TemplateArg::Int(value)) => float(value as f64, spec.precision.unwrap_or(6), spec.zero, width),
        (Some('f'), _) => return Err(unsupported()),
        (Some('d'), TemplateArg::Int(value)) if spec.zero => format!("{value:0width$}"),
        (Some('d'), TemplateArg::Int(value)) => format!("{value:>width$}"),
        (Some('d'), _) => return Err(unsupported()),
        (Some('s'), TemplateArg::Str(_)) | (None, _) => {
            let plain = match arg {
                TemplateArg::Float(value) => format!("{value:?}"),
                TemplateArg::Int(value) => value.to_string(),
                TemplateArg::Str(value) if quoted => format!("'{value}'"),
                TemplateArg::Str(value) => value.to_string(),
                TemplateArg::None => "None".to_string(),
            };
            if spec.precision.is_some() || spec.zero {
                return Err(unsupported());
            }
            format!("{plain:width$}")
        }
        _ => return Err(unsupported()),
    };
    Ok(text)
}

fn float(value: f64, precision: usize, zero: bool, width: usize) -> String {
    if zero {
        format!("{value:0width$.precision$}")
    } else {
        format!("{value:>width$.precision$}")
    }
}

/**
Formats `template` with positional `args`.

Arguments beyond those the template uses are ignored.

```
use timewise::{TemplateArg, format_positional};

let text = format_positional(
    "Elapsed time: {:0.4f} seconds. Finished {!r} in thread {}.",
    &[TemplateArg::Float(0.5), TemplateArg::Str("work"), TemplateArg::Int(7)],
).unwrap();
assert_eq!(text, "Elapsed time: 0.5000 seconds. Finished 'work' in thread 7.");
```
*/
pub fn format_positional(template: &str, args: &[TemplateArg<'_>]) -> Result<String, FormatError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut next_auto = 0usize;
    let mut manual = false;
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(FormatError::UnbalancedBrace),
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => return Err(FormatError::UnbalancedBrace),
                        Some(other) => field.push(other),
                    }
                }
                let (head, spec) = field.split_once(':').unwrap_or((field.as_str(), ""));
                let (index_text, conversion) = match head.split_once('!') {
                    Some((index_text, conversion)) => (index_text, Some(conversion)),
                    None => (head, None),
                };
                let index = if index_text.is_empty() {
                    if manual {
                        return Err(FormatError::MixedNumbering);
                    }
                    next_auto += 1;
                    next_auto - 1
                } else {
                    if next_auto > 0 {
                        return Err(FormatError::MixedNumbering);
                    }
                    manual = true;
                    index_text
                        .parse()
                        .map_err(|_| FormatError::UnsupportedSpec(field.clone()))?
                };
                let quoted = match conversion {
                    None | Some("s") => false,
                    Some("r") => true,
                    Some(other) => return Err(FormatError::UnsupportedConversion(other.to_string())),
                };
                let arg = *args.get(index).ok_or(FormatError::MissingArgument(index))?;
                let parsed = parse_spec(spec)?;
                let rendered = render_value(arg, quoted, &parsed, spec)?;
                // Writing to a String cannot fail.
                let _ = write!(out, "{rendered}");
            }
            other => out.push(other),
        }
    }
    Ok(out)
}
