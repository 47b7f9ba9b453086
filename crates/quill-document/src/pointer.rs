//! JSON Pointer (RFC 6901) codec and navigation
//!
//! Tokens are escaped `~` → `~0` first, then `/` → `~1`; decoding runs the
//! reverse order so `~01` decodes to `~1` and not `/`.

use crate::error::PointerError;
use serde_json::Value;

/// Escape a raw token for use inside a pointer.
pub fn encode_token(token: &str) -> String {
    if !token.contains('~') && !token.contains('/') {
        return token.to_string();
    }
    token.replace('~', "~0").replace('/', "~1")
}

/// Unescape a single pointer token.
pub fn decode_token(token: &str) -> String {
    if !token.contains('~') {
        return token.to_string();
    }
    token.replace("~1", "/").replace("~0", "~")
}

/// Parse a pointer into decoded tokens.
///
/// `""` and `"/"` both denote the root and yield an empty list.
///
/// # Examples
///
/// ```
/// use quill_document::pointer::parse;
///
/// assert_eq!(parse("/a~1b").unwrap(), vec!["a/b".to_string()]);
/// assert!(parse("").unwrap().is_empty());
/// assert!(parse("name").is_err());
/// ```
pub fn parse(path: &str) -> Result<Vec<String>, PointerError> {
    if is_root(path) {
        return Ok(Vec::new());
    }
    if !path.starts_with('/') {
        return Err(PointerError::InvalidPointer(path.to_string()));
    }
    Ok(path[1..].split('/').map(decode_token).collect())
}

/// Like [`parse`] but prepends the missing leading `/` instead of failing.
///
/// Used where paths come straight from model output and a best-effort
/// reading is preferable to a rejection.
pub fn parse_lenient(path: &str) -> Vec<String> {
    if is_root(path) {
        return Vec::new();
    }
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    trimmed.split('/').map(decode_token).collect()
}

/// Append a raw (unescaped) token to a pointer.
///
/// ```
/// use quill_document::pointer::join;
///
/// assert_eq!(join("", "sections"), "/sections");
/// assert_eq!(join("/sections", "0"), "/sections/0");
/// assert_eq!(join("/a", "x/y"), "/a/x~1y");
/// ```
pub fn join(base: &str, raw_token: &str) -> String {
    let escaped = encode_token(raw_token);
    if base.is_empty() {
        return format!("/{}", escaped);
    }
    format!("{}/{}", base, escaped)
}

/// Format decoded tokens back into a pointer string.
pub fn format(tokens: &[String]) -> String {
    tokens.iter().fold(String::new(), |acc, t| join(&acc, t))
}

fn is_root(path: &str) -> bool {
    path.is_empty() || path == "/"
}

/// Parse an array index token.
///
/// Only canonical non-negative integers are accepted (`0`, `12`, not `012`).
pub(crate) fn parse_index(token: &str) -> Option<usize> {
    if token.is_empty() || (token.len() > 1 && token.starts_with('0')) {
        return None;
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn step<'a>(node: &'a Value, token: &str, tokens: &[String], depth: usize) -> Result<&'a Value, PointerError> {
    match node {
        Value::Object(map) => map
            .get(token)
            .ok_or_else(|| unresolvable(tokens, depth, format!("member {:?} not found", token))),
        Value::Array(items) => {
            let idx = parse_index(token)
                .ok_or_else(|| unresolvable(tokens, depth, format!("{:?} is not a valid array index", token)))?;
            items.get(idx).ok_or_else(|| {
                unresolvable(
                    tokens,
                    depth,
                    format!("index {} out of bounds (length {})", idx, items.len()),
                )
            })
        }
        _ => Err(unresolvable(
            tokens,
            depth,
            format!("cannot descend into {} with {:?}", type_name(node), token),
        )),
    }
}

/// Resolve decoded tokens against a document.
pub fn resolve<'a>(doc: &'a Value, tokens: &[String]) -> Result<&'a Value, PointerError> {
    let mut node = doc;
    for (depth, token) in tokens.iter().enumerate() {
        node = step(node, token, tokens, depth)?;
    }
    Ok(node)
}

/// Mutable counterpart of [`resolve`].
pub fn resolve_mut<'a>(doc: &'a mut Value, tokens: &[String]) -> Result<&'a mut Value, PointerError> {
    let mut node = doc;
    for (depth, token) in tokens.iter().enumerate() {
        node = match node {
            Value::Object(map) => map
                .get_mut(token)
                .ok_or_else(|| unresolvable(tokens, depth, format!("member {:?} not found", token)))?,
            Value::Array(items) => {
                let len = items.len();
                let idx = parse_index(token).ok_or_else(|| {
                    unresolvable(tokens, depth, format!("{:?} is not a valid array index", token))
                })?;
                items.get_mut(idx).ok_or_else(|| {
                    unresolvable(tokens, depth, format!("index {} out of bounds (length {})", idx, len))
                })?
            }
            other => {
                let kind = type_name(other);
                return Err(unresolvable(
                    tokens,
                    depth,
                    format!("cannot descend into {} with {:?}", kind, token),
                ));
            }
        };
    }
    Ok(node)
}

fn unresolvable(tokens: &[String], depth: usize, reason: String) -> PointerError {
    PointerError::Unresolvable {
        pointer: format(&tokens[..=depth]),
        reason,
    }
}

/// JSON type name of a value, as reported in tool results.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
