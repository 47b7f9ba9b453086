//! Read-only inspection of a JSON document
//!
//! Both entry points resolve model-supplied paths leniently and never fail:
//! an unresolvable path is reported as a [`Lookup::Missing`] value so it can
//! be handed back to the model as an observation.

use crate::pointer::{parse_lenient, resolve, type_name};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum characters of a scalar shown by [`inspect`]
pub const INSPECT_PREVIEW_CHARS: usize = 100;

/// Outcome of resolving a path before looking at the node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Lookup<T> {
    /// Path resolved
    Found {
        /// Always `true`
        found: bool,
        /// Path as supplied by the caller
        path: String,
        /// Operation-specific payload
        #[serde(flatten)]
        body: T,
    },
    /// Path did not resolve
    Missing {
        /// Always `false`
        found: bool,
        /// Path as supplied by the caller
        path: String,
        /// Resolution failure
        error: String,
    },
}

impl<T> Lookup<T> {
    fn found(path: &str, body: T) -> Self {
        Lookup::Found {
            found: true,
            path: path.to_string(),
            body,
        }
    }

    fn missing(path: &str, error: impl ToString) -> Self {
        Lookup::Missing {
            found: false,
            path: path.to_string(),
            error: error.to_string(),
        }
    }

    /// Whether the path resolved
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found { .. })
    }

    /// Payload, if the path resolved
    pub fn body(&self) -> Option<&T> {
        match self {
            Lookup::Found { body, .. } => Some(body),
            Lookup::Missing { .. } => None,
        }
    }
}

/// Shape summary returned by [`inspect`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NodeSummary {
    /// Object node: its keys in document order
    Object {
        /// Always `"object"`
        #[serde(rename = "type")]
        kind: &'static str,
        /// Member names
        keys: Vec<String>,
        /// Number of members
        count: usize,
    },
    /// Array node: its length only
    Array {
        /// Always `"array"`
        #[serde(rename = "type")]
        kind: &'static str,
        /// Number of elements
        length: usize,
    },
    /// Scalar node: type name and a short preview
    Scalar {
        /// JSON type name
        #[serde(rename = "type")]
        kind: &'static str,
        /// Preview capped at [`INSPECT_PREVIEW_CHARS`]
        value: String,
    },
}

/// Report the keys of an object, the length of an array, or a scalar preview.
pub fn inspect(doc: &Value, path: &str) -> Lookup<NodeSummary> {
    let tokens = parse_lenient(path);
    let node = match resolve(doc, &tokens) {
        Ok(node) => node,
        Err(e) => return Lookup::missing(path, e),
    };

    let summary = match node {
        Value::Object(map) => NodeSummary::Object {
            kind: "object",
            keys: map.keys().cloned().collect(),
            count: map.len(),
        },
        Value::Array(items) => NodeSummary::Array {
            kind: "array",
            length: items.len(),
        },
        scalar => NodeSummary::Scalar {
            kind: type_name(scalar),
            value: ellipsize(&scalar_text(scalar), INSPECT_PREVIEW_CHARS),
        },
    };
    Lookup::found(path, summary)
}

/// Size caps applied by [`read`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReadLimits {
    /// Strings longer than this are cut
    pub max_string_length: usize,
    /// Depth at which compound values collapse to a count placeholder
    pub max_depth: usize,
    /// Array elements kept before the remainder marker
    pub max_array_items: usize,
    /// Object members kept before the remainder marker
    pub max_object_keys: usize,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            max_string_length: 160,
            max_depth: 6,
            max_array_items: 50,
            max_object_keys: 50,
        }
    }
}

/// Payload of a successful [`read`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadBody {
    /// Value with truncation markers embedded
    pub value: Value,
    /// JSON type name of the untruncated value
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// Return the value at `path`, truncated according to `limits`.
pub fn read(doc: &Value, path: &str, limits: &ReadLimits) -> Lookup<ReadBody> {
    let tokens = parse_lenient(path);
    match resolve(doc, &tokens) {
        Ok(node) => Lookup::found(
            path,
            ReadBody {
                value: truncate(node, limits, 0),
                kind: type_name(node),
            },
        ),
        Err(e) => Lookup::missing(path, e),
    }
}

fn truncate(value: &Value, limits: &ReadLimits, depth: usize) -> Value {
    if depth >= limits.max_depth {
        return match value {
            Value::Object(map) => Value::String(object_placeholder(map.len())),
            Value::Array(items) => Value::String(array_placeholder(items.len())),
            Value::String(s) => Value::String(ellipsize(s, limits.max_string_length)),
            other => other.clone(),
        };
    }

    match value {
        Value::String(s) => {
            let total = s.chars().count();
            if total > limits.max_string_length {
                let head: String = s.chars().take(limits.max_string_length).collect();
                Value::String(format!("{}... ({} chars total)", head, total))
            } else {
                value.clone()
            }
        }
        Value::Object(map) => {
            let mut out: Map<String, Value> = map
                .iter()
                .take(limits.max_object_keys)
                .map(|(k, v)| (k.clone(), truncate(v, limits, depth + 1)))
                .collect();
            if map.len() > limits.max_object_keys {
                out.insert(
                    "__truncated__".to_string(),
                    Value::String(format!("{} more keys", map.len() - limits.max_object_keys)),
                );
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            let mut out: Vec<Value> = items
                .iter()
                .take(limits.max_array_items)
                .map(|item| truncate(item, limits, depth + 1))
                .collect();
            if items.len() > limits.max_array_items {
                out.push(Value::String(format!(
                    "... ({} more items)",
                    items.len() - limits.max_array_items
                )));
            }
            Value::Array(out)
        }
        other => other.clone(),
    }
}

/// Text form of a scalar used for previews and matching.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Keep at most `max` characters, marking the cut with `...`.
pub(crate) fn ellipsize(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max).collect();
    format!("{}...", head)
}

pub(crate) fn object_placeholder(len: usize) -> String {
    format!("{{...}} ({} keys)", len)
}

pub(crate) fn array_placeholder(len: usize) -> String {
    format!("[...] ({} items)", len)
}
