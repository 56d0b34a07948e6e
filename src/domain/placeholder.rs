// SPDX-License-Identifier: MIT OR Apache-2.0

//! `${key}` and `${key:default}` placeholder resolution.
//!
//! Placeholders may nest, both in the key (`${db.${profile}.url}`) and in the default
//! (`${a:${b:fallback}}`). Values read from the environment are resolved again, so an
//! environment entry may itself refer to other entries. A `${` with no closing brace
//! is kept as literal text.

use crate::domain::descriptor::Properties;
use crate::domain::errors::{ConfigError, Result};
use crate::ports::Environment;

const PREFIX: &str = "${";
const SUFFIX: char = '}';
const SEPARATOR: char = ':';

/// Returns `true` if `expression` contains a placeholder opening.
pub fn contains_placeholder(expression: &str) -> bool {
    expression.contains(PREFIX)
}

/// Resolves every placeholder in `expression` against `environment`.
///
/// # Errors
///
/// Returns [`ConfigError::UnresolvedPlaceholder`] naming the first key that is missing
/// and has no default, or that refers back to itself.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::placeholder::resolve;
/// use std::collections::HashMap;
///
/// let mut env = HashMap::new();
/// env.insert("server.addr".to_string(), "10.0.0.1".to_string());
///
/// assert_eq!(resolve("plain", &env).unwrap(), "plain");
/// assert_eq!(resolve("${server.addr}:8848", &env).unwrap(), "10.0.0.1:8848");
/// assert_eq!(resolve("${group:DEFAULT_GROUP}", &env).unwrap(), "DEFAULT_GROUP");
/// assert!(resolve("${missing}", &env).is_err());
/// ```
pub fn resolve(expression: &str, environment: &dyn Environment) -> Result<String> {
    if !contains_placeholder(expression) {
        return Ok(expression.to_string());
    }
    let mut visiting = Vec::new();
    resolve_text(expression, environment, expression, &mut visiting)
}

/// Resolves every value of `properties`, keeping the keys.
pub fn resolve_properties(
    properties: &Properties,
    environment: &dyn Environment,
) -> Result<Properties> {
    properties
        .iter()
        .map(|(key, value)| Ok((key.clone(), resolve(value, environment)?)))
        .collect()
}

fn resolve_text(
    text: &str,
    environment: &dyn Environment,
    expression: &str,
    visiting: &mut Vec<String>,
) -> Result<String> {
    let mut resolved = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(PREFIX) {
        resolved.push_str(&rest[..start]);
        let body = &rest[start + PREFIX.len()..];

        let Some(end) = find_closing(body) else {
            resolved.push_str(&rest[start..]);
            return Ok(resolved);
        };

        let placeholder = &body[..end];
        let (raw_key, default) = match find_separator(placeholder) {
            Some(at) => (&placeholder[..at], Some(&placeholder[at + 1..])),
            None => (placeholder, None),
        };

        let key = resolve_text(raw_key, environment, expression, visiting)?;
        if visiting.contains(&key) {
            return Err(unresolved(&key, expression));
        }

        let value = match environment.get(&key) {
            Some(value) => {
                visiting.push(key);
                let value = resolve_text(&value, environment, expression, visiting);
                visiting.pop();
                value?
            }
            None => match default {
                Some(default) => resolve_text(default, environment, expression, visiting)?,
                None => return Err(unresolved(&key, expression)),
            },
        };

        resolved.push_str(&value);
        rest = &body[end + SUFFIX.len_utf8()..];
    }

    resolved.push_str(rest);
    Ok(resolved)
}

/// Byte offset of the `}` closing a placeholder body, honouring nested `${...}`.
fn find_closing(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut chars = body.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        match c {
            '$' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                depth += 1;
            }
            SUFFIX if depth == 0 => return Some(index),
            SUFFIX => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Byte offset of the first top-level `:` in a placeholder body.
fn find_separator(placeholder: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut chars = placeholder.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        match c {
            '$' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                depth += 1;
            }
            SUFFIX if depth > 0 => depth -= 1,
            SEPARATOR if depth == 0 => return Some(index),
            _ => {}
        }
    }
    None
}

fn unresolved(key: &str, expression: &str) -> ConfigError {
    ConfigError::UnresolvedPlaceholder {
        key: key.to_string(),
        expression: expression.to_string(),
    }
}
