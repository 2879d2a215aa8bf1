// SPDX-License-Identifier: MIT OR Apache-2.0
use proc_macro::{Delimiter, Spacing, TokenStream, TokenTree};

fn compile_error(message: &str) -> TokenStream {
    format!("compile_error!({:?});", message).parse().unwrap()
}

/// Splits `tokens` on commas that are not inside `<...>`.
fn split_top_level_commas(tokens: Vec<TokenTree>) -> Vec<Vec<TokenTree>> {
    let mut parts = vec![Vec::new()];
    let mut angle_depth = 0usize;
    let mut previous_was_dash = false;
    for token in tokens {
        let mut is_dash = false;
        if let TokenTree::Punct(p) = &token {
            match p.as_char() {
                '<' => angle_depth += 1,
                '>' if !previous_was_dash => angle_depth = angle_depth.saturating_sub(1),
                ',' if angle_depth == 0 => {
                    parts.push(Vec::new());
                    continue;
                }
                '-' => is_dash = p.spacing() == Spacing::Joint,
                _ => {}
            }
        }
        previous_was_dash = is_dash;
        if let Some(last) = parts.last_mut() {
            last.push(token);
        }
    }
    parts.retain(|part| !part.is_empty());
    parts
}

/**
Name of a parameter that binds a single identifier, like `x: u32` or `mut x: u32`.

Receivers (`self`, `&mut self`, ...) and destructuring patterns yield `None`.
*/
fn parameter_name(param: &[TokenTree]) -> Option<String> {
    let mut tokens = param.iter().peekable();
    // outer attributes: `#` followed by a bracket group
    while let Some(TokenTree::Punct(p)) = tokens.peek() {
        if p.as_char() != '#' {
            break;
        }
        tokens.next();
        tokens.next();
    }
    let mut pattern = Vec::new();
    let mut previous_colon = false;
    for token in tokens.by_ref() {
        if let TokenTree::Punct(p) = token {
            if p.as_char() == ':' && p.spacing() == Spacing::Alone && !previous_colon {
                break;
            }
            previous_colon = p.as_char() == ':';
        }
        pattern.push(token.to_string());
    }
    let idents: Vec<&String> = pattern
        .iter()
        .filter(|token| *token != "mut" && *token != "ref")
        .collect();
    match idents.as_slice() {
        [name] if *name != "self" && *name != "_" && name.chars().all(|c| c.is_alphanumeric() || c == '_') => {
            Some((*name).clone())
        }
        _ => None,
    }
}

/// Implementation of the `#[timed(TIMER)]` attribute macro.
///
/// Rewrites the function body into a `Timer::call_described` call that records the
/// function's named parameters and its result.
pub fn timed_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let timer = attr.to_string();
    if timer.trim().is_empty() {
        return compile_error("#[timed] needs a timer expression, as in #[timed(TIMER)]");
    }

    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let mut fn_name: Option<String> = None;
    let mut params: Option<TokenStream> = None;
    let mut return_type: Vec<TokenTree> = Vec::new();
    let mut body_idx: Option<usize> = None;

    let mut angle_depth = 0usize;
    let mut previous_was_dash = false;
    let mut in_return_type = false;
    let mut i = 0;
    while i < tokens.len() {
        let mut is_dash = false;
        match &tokens[i] {
            TokenTree::Ident(ident) if fn_name.is_none() && ident.to_string() == "async" => {
                return compile_error("#[timed] does not support async functions");
            }
            TokenTree::Ident(ident) if fn_name.is_none() && ident.to_string() == "fn" => {
                if let Some(TokenTree::Ident(name)) = tokens.get(i + 1) {
                    fn_name = Some(name.to_string());
                    i += 1;
                }
            }
            TokenTree::Group(g) if g.delimiter() == Delimiter::Brace && angle_depth == 0 && fn_name.is_some() => {
                body_idx = Some(i);
                break;
            }
            TokenTree::Ident(ident) if in_return_type && angle_depth == 0 && ident.to_string() == "where" => {
                in_return_type = false;
            }
            token if in_return_type => {
                return_type.push(token.clone());
                if let TokenTree::Punct(p) = token {
                    match p.as_char() {
                        '<' => angle_depth += 1,
                        '>' => angle_depth = angle_depth.saturating_sub(1),
                        _ => {}
                    }
                }
            }
            TokenTree::Group(g)
                if g.delimiter() == Delimiter::Parenthesis
                    && angle_depth == 0
                    && fn_name.is_some()
                    && params.is_none() =>
            {
                params = Some(g.stream());
            }
            TokenTree::Punct(p) if fn_name.is_some() => match p.as_char() {
                '<' => angle_depth += 1,
                '>' if previous_was_dash && params.is_some() && angle_depth == 0 => {
                    in_return_type = true;
                }
                '>' if !previous_was_dash => angle_depth = angle_depth.saturating_sub(1),
                '-' => is_dash = p.spacing() == Spacing::Joint,
                _ => {}
            },
            _ => {}
        }
        previous_was_dash = is_dash;
        i += 1;
    }

    let Some(fn_name) = fn_name else {
        return compile_error("#[timed] can only be applied to functions");
    };
    let Some(body_idx) = body_idx else {
        return compile_error("#[timed] requires a function with a body");
    };
    let original_body = match &tokens[body_idx] {
        TokenTree::Group(g) => g.stream(),
        _ => return compile_error("Expected function body"),
    };

    let names: Vec<String> = params
        .map(|params| split_top_level_commas(params.into_iter().collect()))
        .unwrap_or_default()
        .iter()
        .filter_map(|param| parameter_name(param))
        .collect();

    let return_type: TokenStream = return_type.into_iter().collect();
    let return_text = return_type.to_string();
    let return_text = if return_text.trim().is_empty() {
        "()".to_string()
    } else {
        return_text
    };
    // Elided lifetimes and `impl Trait` can't be spelled on a closure.
    let annotate = !(return_text.contains('&') || return_text.contains('\'') || return_text.contains("impl"));
    let (body_annotation, result_annotation) = if annotate {
        (format!("-> {return_text}"), format!(": &{return_text}"))
    } else {
        (String::new(), String::new())
    };

    let new_body_src = format!(
        r#"{{
            ({timer}).call_described(
                "{fn_name}",
                ::timewise::call_args!({args}),
                || {body_annotation} {{ {original_body} }},
                |__timewise_result{result_annotation}| ::timewise::describe!(__timewise_result),
            )
            .unwrap_or_else(|__timewise_failure| __timewise_failure.resume())
        }}"#,
        args = names.join(", "),
    );

    let new_body: TokenStream = new_body_src.parse().unwrap();
    let new_body_group = new_body.into_iter().next().unwrap();

    tokens[body_idx] = new_body_group;

    tokens.into_iter().collect()
}
