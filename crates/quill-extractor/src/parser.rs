//! Parse model replies into turns

use crate::error::ExtractorError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One model reply: reasoning plus the actions to run
///
/// Only the envelope has to be well formed. Odd entries inside `actions`
/// become actions with unrecognised names so the dispatcher can report them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelTurn {
    /// Free-form reasoning, logged but not interpreted
    #[serde(default, deserialize_with = "lenient_text")]
    pub think: String,

    /// Requested actions in execution order
    #[serde(default, deserialize_with = "lenient_actions")]
    pub actions: Vec<RawAction>,
}

/// A requested action before its input is validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    /// Action name as written by the model; non-string names are kept as
    /// their JSON text
    #[serde(default, deserialize_with = "action_name")]
    pub action: String,

    /// Action input object
    #[serde(default = "empty_object", deserialize_with = "null_as_empty")]
    pub input: Value,
}

impl RawAction {
    /// Build an action from a name and input
    pub fn new(action: impl Into<String>, input: Value) -> Self {
        Self {
            action: action.into(),
            input,
        }
    }

    fn from_entry(entry: Value) -> Self {
        if entry.is_object() {
            if let Ok(raw) = serde_json::from_value(entry.clone()) {
                return raw;
            }
        }
        Self::new(entry.to_string(), empty_object())
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn action_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(name) => name,
        other => other.to_string(),
    })
}

fn lenient_actions<'de, D>(deserializer: D) -> Result<Vec<RawAction>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries.into_iter().map(RawAction::from_entry).collect())
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(if value.is_null() { empty_object() } else { value })
}

/// Parse a model reply into a [`ModelTurn`].
///
/// # Errors
///
/// `ExtractorError::ModelOutput` when the reply is not a JSON turn object or
/// lists no actions.
pub fn parse_model_turn(reply: &str) -> Result<ModelTurn, ExtractorError> {
    let json_str = extract_json(reply)?;
    let turn: ModelTurn = serde_json::from_str(json_str)?;

    if turn.actions.is_empty() {
        return Err(ExtractorError::ModelOutput(
            "No actions specified by the model".to_string(),
        ));
    }
    Ok(turn)
}

/// Extract JSON from a reply, handling markdown code blocks
fn extract_json(reply: &str) -> Result<&str, ExtractorError> {
    let trimmed = reply.trim();
    if !trimmed.starts_with("```") {
        return Ok(trimmed);
    }

    // Skip the opening fence line (``` or ```json) and the closing fence
    let body = match trimmed.find('\n') {
        Some(newline) => &trimmed[newline + 1..],
        None => return Err(ExtractorError::ModelOutput("Empty code block".to_string())),
    };
    let body = body.trim_end();
    Ok(body.strip_suffix("```").unwrap_or(body).trim())
}
