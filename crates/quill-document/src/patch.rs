//! JSON Patch (RFC 6902) subset: add, remove, replace, move, copy
//!
//! A patch list is validated as a whole before anything is touched, then
//! applied in order to a private copy of the document. The caller's document
//! is never modified; on failure the copy is dropped and the index of the
//! first operation that could not be applied is reported.

use crate::error::{ApplyError, PatchError};
use crate::pointer::{format, parse, parse_index, resolve, resolve_mut};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operation names accepted by [`validate`]
pub const SUPPORTED_OPS: [&str; 5] = ["add", "remove", "replace", "move", "copy"];

/// A validated patch operation
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    /// Insert a member, insert into an array, or replace the root
    Add {
        /// Target pointer
        path: String,
        /// Value to insert
        value: Value,
    },
    /// Delete an existing member or element
    Remove {
        /// Target pointer
        path: String,
    },
    /// Overwrite an existing member or element
    Replace {
        /// Target pointer
        path: String,
        /// New value
        value: Value,
    },
    /// Remove from `from` and add at `path`
    Move {
        /// Source pointer
        from: String,
        /// Target pointer
        path: String,
    },
    /// Add a copy of `from` at `path`
    Copy {
        /// Source pointer
        from: String,
        /// Target pointer
        path: String,
    },
}

/// Result of [`apply_patches`], shaped for tool observations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PatchOutcome {
    /// Every operation applied
    Applied {
        /// Always `true`
        success: bool,
        /// The patched document
        document: Value,
        /// Number of operations applied
        applied_count: usize,
        /// Informational note
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Nothing applied
    Failed {
        /// Always `false`
        success: bool,
        /// Failure description
        error: String,
        /// Index of the first operation that could not be applied
        failed_at_index: usize,
    },
}

impl PatchOutcome {
    /// Whether the patch list applied
    pub fn is_success(&self) -> bool {
        matches!(self, PatchOutcome::Applied { .. })
    }

    /// The patched document, if successful
    pub fn document(&self) -> Option<&Value> {
        match self {
            PatchOutcome::Applied { document, .. } => Some(document),
            PatchOutcome::Failed { .. } => None,
        }
    }

    /// Take the patched document, if successful
    pub fn into_document(self) -> Option<Value> {
        match self {
            PatchOutcome::Applied { document, .. } => Some(document),
            PatchOutcome::Failed { .. } => None,
        }
    }
}

impl From<PatchError> for PatchOutcome {
    fn from(e: PatchError) -> Self {
        PatchOutcome::Failed {
            success: false,
            failed_at_index: e.index(),
            error: e.to_string(),
        }
    }
}

/// Validate and apply raw patch operations, all-or-nothing.
///
/// # Examples
///
/// ```
/// use quill_document::apply_patches;
/// use serde_json::json;
///
/// let doc = json!({});
/// let outcome = apply_patches(&doc, &[json!({"op": "add", "path": "/name", "value": "John"})]);
/// assert_eq!(outcome.document(), Some(&json!({"name": "John"})));
/// assert_eq!(doc, json!({}));
/// ```
pub fn apply_patches(doc: &Value, patches: &[Value]) -> PatchOutcome {
    if patches.is_empty() {
        return PatchOutcome::Applied {
            success: true,
            document: doc.clone(),
            applied_count: 0,
            message: Some("No patches to apply".to_string()),
        };
    }

    match validate(patches).and_then(|ops| apply(doc, &ops)) {
        Ok(document) => PatchOutcome::Applied {
            success: true,
            document,
            applied_count: patches.len(),
            message: None,
        },
        Err(e) => e.into(),
    }
}

/// Check every raw operation before any mutation happens.
pub fn validate(patches: &[Value]) -> Result<Vec<PatchOperation>, PatchError> {
    patches
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let op = raw.get("op").and_then(Value::as_str);
            match op {
                Some("test") => Err(PatchError::UnsupportedTest { index }),
                Some(name) if SUPPORTED_OPS.contains(&name) => {
                    serde_json::from_value(raw.clone()).map_err(|e| PatchError::MalformedOperation {
                        index,
                        reason: e.to_string(),
                    })
                }
                _ => Err(PatchError::InvalidOperation {
                    index,
                    op: raw.get("op").map(op_label).unwrap_or_else(|| "null".to_string()),
                }),
            }
        })
        .collect()
}

fn op_label(op: &Value) -> String {
    match op {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Apply validated operations in order to a copy of `doc`.
///
/// Operations see the document as left by the previous one, so the first
/// error is exactly the index where a one-at-a-time replay would diverge.
pub fn apply(doc: &Value, ops: &[PatchOperation]) -> Result<Value, PatchError> {
    let mut working = doc.clone();
    for (index, op) in ops.iter().enumerate() {
        apply_operation(&mut working, op).map_err(|source| PatchError::Conflict { index, source })?;
    }
    Ok(working)
}

fn apply_operation(doc: &mut Value, op: &PatchOperation) -> Result<(), ApplyError> {
    match op {
        PatchOperation::Add { path, value } => add(doc, &parse(path)?, value.clone()),
        PatchOperation::Remove { path } => remove(doc, &parse(path)?).map(|_| ()),
        PatchOperation::Replace { path, value } => replace(doc, &parse(path)?, value.clone()),
        PatchOperation::Move { from, path } => {
            let from_tokens = parse(from)?;
            let to_tokens = parse(path)?;
            if from_tokens == to_tokens {
                // still has to exist
                resolve(doc, &from_tokens)?;
                return Ok(());
            }
            if to_tokens.len() > from_tokens.len() && to_tokens.starts_with(&from_tokens) {
                return Err(ApplyError::MoveIntoChild {
                    from: from.clone(),
                    path: path.clone(),
                });
            }
            let value = remove(doc, &from_tokens)?;
            add(doc, &to_tokens, value)
        }
        PatchOperation::Copy { from, path } => {
            let value = resolve(doc, &parse(from)?)?.clone();
            add(doc, &parse(path)?, value)
        }
    }
}

fn add(doc: &mut Value, tokens: &[String], value: Value) -> Result<(), ApplyError> {
    let Some((last, parent_tokens)) = tokens.split_last() else {
        *doc = value;
        return Ok(());
    };
    match resolve_mut(doc, parent_tokens)? {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            if last == "-" {
                items.push(value);
                return Ok(());
            }
            match parse_index(last) {
                Some(idx) if idx <= items.len() => {
                    items.insert(idx, value);
                    Ok(())
                }
                _ => Err(ApplyError::InvalidIndex {
                    token: last.clone(),
                    path: format(tokens),
                }),
            }
        }
        _ => Err(ApplyError::NotAContainer(format(tokens))),
    }
}

fn remove(doc: &mut Value, tokens: &[String]) -> Result<Value, ApplyError> {
    let Some((last, parent_tokens)) = tokens.split_last() else {
        return Err(ApplyError::RemoveRoot);
    };
    let missing = || ApplyError::Missing {
        op: "remove",
        path: format(tokens),
    };
    match resolve_mut(doc, parent_tokens)? {
        Value::Object(map) => map.shift_remove(last.as_str()).ok_or_else(missing),
        Value::Array(items) => match parse_index(last) {
            Some(idx) if idx < items.len() => Ok(items.remove(idx)),
            _ => Err(missing()),
        },
        _ => Err(ApplyError::NotAContainer(format(tokens))),
    }
}

fn replace(doc: &mut Value, tokens: &[String], value: Value) -> Result<(), ApplyError> {
    let Some((last, parent_tokens)) = tokens.split_last() else {
        *doc = value;
        return Ok(());
    };
    let missing = || ApplyError::Missing {
        op: "replace",
        path: format(tokens),
    };
    match resolve_mut(doc, parent_tokens)? {
        Value::Object(map) => match map.get_mut(last.as_str()) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(missing()),
        },
        Value::Array(items) => match parse_index(last).and_then(|idx| items.get_mut(idx)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(missing()),
        },
        _ => Err(ApplyError::NotAContainer(format(tokens))),
    }
}
