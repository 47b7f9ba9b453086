//! Tool dispatcher: runs a turn's actions against the working document
//!
//! Per-action problems (unknown names, bad input, failed patches) never abort
//! a turn. They are recorded as results and shown to the model on its next
//! call.

use crate::guidance::Guidance;
use crate::parser::RawAction;
use quill_document::{apply_patches, inspect, read, search, ReadLimits, SearchOptions};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::borrow::Cow;
use thiserror::Error;
use tracing::{debug, warn};

/// Wire name of the inspect action
pub const INSPECT_KEYS: &str = "inspect_keys";
/// Wire name of the read action
pub const READ_VALUE: &str = "read_value";
/// Wire name of the search action
pub const SEARCH_POINTER: &str = "search_pointer";
/// Wire name of the patch action
pub const APPLY_PATCHES: &str = "apply_patches";
/// Wire name of the finalize action
pub const UPDATE_GUIDANCE: &str = "update_guidance";

/// Input of `inspect_keys`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InspectInput {
    /// Pointer to inspect
    pub path: String,
}

/// Input of `read_value`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReadInput {
    /// Pointer to read
    #[serde(default)]
    pub path: String,
    /// Truncation limits
    #[serde(flatten)]
    pub limits: ReadLimits,
}

/// Input of `apply_patches`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PatchInput {
    /// Raw RFC 6902 operations
    pub patches: Vec<Value>,
}

/// A recognised action with typed input
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// `inspect_keys`
    InspectKeys(InspectInput),
    /// `read_value`
    ReadValue(ReadInput),
    /// `search_pointer`
    SearchPointer(SearchOptions),
    /// `apply_patches`
    ApplyPatches(PatchInput),
    /// `update_guidance`
    UpdateGuidance(Guidance),
    /// Any other name
    Unrecognized(String),
}

impl Action {
    /// Decode a raw action, validating its input.
    ///
    /// # Errors
    ///
    /// `ActionError::InvalidInput` when the input does not fit the action.
    pub fn from_raw(raw: &RawAction) -> Result<Self, ActionError> {
        let name = raw.action.as_str();
        let action = match name {
            INSPECT_KEYS => Action::InspectKeys(decode(name, &raw.input)?),
            READ_VALUE => Action::ReadValue(decode(name, &raw.input)?),
            SEARCH_POINTER => Action::SearchPointer(decode(name, &raw.input)?),
            APPLY_PATCHES => Action::ApplyPatches(decode(name, &raw.input)?),
            UPDATE_GUIDANCE => Action::UpdateGuidance(decode(name, &raw.input)?),
            other => Action::Unrecognized(other.to_string()),
        };
        Ok(action)
    }
}

fn decode<T: serde::de::DeserializeOwned>(action: &str, input: &Value) -> Result<T, ActionError> {
    serde_json::from_value(input.clone()).map_err(|e| ActionError::InvalidInput {
        action: action.to_string(),
        reason: e.to_string(),
    })
}

/// Errors local to one action, reported back to the model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// Name is not one of the five actions
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// `update_guidance` sent alongside other actions
    #[error("update_guidance must be the ONLY action when finalizing. Other actions were present in the same response.")]
    FinalizationViolation,

    /// Input does not deserialize into the action's parameters
    #[error("Invalid input for {action}: {reason}")]
    InvalidInput {
        /// Action name
        action: String,
        /// Deserialization failure
        reason: String,
    },
}

/// One executed action, as shown to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    /// Action name as requested
    pub action: String,
    /// Input as requested
    pub input: Value,
    /// Tool output or `{"error": ...}`
    pub result: Value,
}

impl ActionResult {
    fn new(raw: &RawAction, result: Value) -> Self {
        Self {
            action: raw.action.clone(),
            input: raw.input.clone(),
            result,
        }
    }

    fn error(raw: &RawAction, error: &ActionError) -> Self {
        warn!(action = %raw.action, error = %error, "action rejected");
        Self::new(raw, json!({ "error": error.to_string() }))
    }

    /// Whether the result reports an error or a failed patch
    pub fn is_failure(&self) -> bool {
        self.result.get("error").is_some()
    }
}

/// Everything a turn produced
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Per-action results in request order
    pub results: Vec<ActionResult>,
    /// Working document, present only if a patch succeeded
    pub document: Option<Value>,
    /// New baton, present only if the turn finalized
    pub guidance: Option<Guidance>,
}

impl TurnOutcome {
    /// Whether the turn ended the chunk
    pub fn is_finalized(&self) -> bool {
        self.guidance.is_some()
    }
}

/// Execute a turn's actions against `document`.
///
/// A turn made of exactly one `update_guidance` is a finalize request.
/// Otherwise actions run in order against a shared working copy; a
/// successful `apply_patches` is visible to the actions after it.
pub fn dispatch(actions: &[RawAction], document: &Value) -> TurnOutcome {
    if let [only] = actions {
        if only.action == UPDATE_GUIDANCE {
            return finalize(only);
        }
    }

    let mut working = Cow::Borrowed(document);
    let mut results = Vec::with_capacity(actions.len());

    for raw in actions {
        debug!(action = %raw.action, "executing action");
        let result = match Action::from_raw(raw) {
            Err(e) => ActionResult::error(raw, &e),
            Ok(Action::InspectKeys(input)) => ActionResult::new(raw, render(&inspect(&working, &input.path))),
            Ok(Action::ReadValue(input)) => {
                ActionResult::new(raw, render(&read(&working, &input.path, &input.limits)))
            }
            Ok(Action::SearchPointer(options)) => ActionResult::new(raw, render(&search(&working, &options))),
            Ok(Action::ApplyPatches(input)) => {
                let outcome = apply_patches(&working, &input.patches);
                let rendered = render(&outcome);
                match outcome.into_document() {
                    Some(patched) => working = Cow::Owned(patched),
                    None => warn!(error = %rendered["error"], "patch list rejected"),
                }
                ActionResult::new(raw, rendered)
            }
            Ok(Action::UpdateGuidance(_)) => ActionResult::error(raw, &ActionError::FinalizationViolation),
            Ok(Action::Unrecognized(name)) => ActionResult::error(raw, &ActionError::UnknownAction(name)),
        };
        results.push(result);
    }

    TurnOutcome {
        results,
        document: match working {
            Cow::Owned(doc) => Some(doc),
            Cow::Borrowed(_) => None,
        },
        guidance: None,
    }
}

fn finalize(raw: &RawAction) -> TurnOutcome {
    match decode::<Guidance>(UPDATE_GUIDANCE, &raw.input) {
        Ok(guidance) => TurnOutcome {
            results: vec![ActionResult::new(raw, render(&guidance.clone().finalize()))],
            document: None,
            guidance: Some(guidance),
        },
        Err(e) => TurnOutcome {
            results: vec![ActionResult::error(raw, &e)],
            document: None,
            guidance: None,
        },
    }
}

fn render<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "error": e.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn act(name: &str, input: Value) -> RawAction {
        RawAction::new(name, input)
    }

    #[test]
    fn test_single_update_guidance_finalizes() {
        let outcome = dispatch(
            &[act(UPDATE_GUIDANCE, json!({"current_context": "clients", "extracted_entities_count": 1}))],
            &json!({}),
        );
        assert!(outcome.is_finalized());
        let guidance = outcome.guidance.unwrap();
        assert_eq!(guidance.current_context, "clients");
        assert_eq!(outcome.results[0].result["finalized"], json!(true));
        assert!(outcome.document.is_none());
    }

    #[test]
    fn test_invalid_guidance_input_does_not_finalize() {
        let outcome = dispatch(
            &[act(UPDATE_GUIDANCE, json!({"extracted_entities_count": "lots"}))],
            &json!({}),
        );
        assert!(!outcome.is_finalized());
        assert!(outcome.results[0].is_failure());
    }

    #[test]
    fn test_guidance_with_other_actions_is_rejected() {
        let doc = json!({"a": 1});
        let outcome = dispatch(
            &[
                act(INSPECT_KEYS, json!({"path": "/"})),
                act(UPDATE_GUIDANCE, json!({})),
            ],
            &doc,
        );
        assert!(!outcome.is_finalized());
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].result["keys"], json!(["a"]));
        assert!(outcome.results[1].result["error"]
            .as_str()
            .unwrap()
            .contains("must be the ONLY action"));
    }

    #[test]
    fn test_patch_visible_to_later_actions() {
        let doc = json!({});
        let outcome = dispatch(
            &[
                act(APPLY_PATCHES, json!({"patches": [{"op": "add", "path": "/name", "value": "John"}]})),
                act(READ_VALUE, json!({"path": "/name"})),
            ],
            &doc,
        );
        assert_eq!(outcome.results[1].result["value"], json!("John"));
        assert_eq!(outcome.document, Some(json!({"name": "John"})));
        assert_eq!(doc, json!({}));
    }

    #[test]
    fn test_failed_patch_leaves_working_document() {
        let doc = json!({"a": 1});
        let outcome = dispatch(
            &[
                act(APPLY_PATCHES, json!({"patches": [
                    {"op": "replace", "path": "/a", "value": 2},
                    {"op": "remove", "path": "/b"}
                ]})),
                act(READ_VALUE, json!({"path": "/a"})),
            ],
            &doc,
        );
        assert_eq!(outcome.results[0].result["success"], json!(false));
        assert_eq!(outcome.results[0].result["failed_at_index"], json!(1));
        assert!(outcome.results[0].is_failure());
        assert_eq!(outcome.results[1].result["value"], json!(1));
        assert!(outcome.document.is_none());
    }

    #[test]
    fn test_unknown_action_reported() {
        let outcome = dispatch(&[act("delete_everything", json!({}))], &json!({}));
        assert_eq!(
            outcome.results[0].result,
            json!({"error": "Unknown action: delete_everything"})
        );
        assert_eq!(outcome.results[0].input, json!({}));
    }

    #[test]
    fn test_malformed_entry_does_not_block_patch() {
        let turn = crate::parser::parse_model_turn(
            r#"{"think": "x", "actions": [
                {"action": null, "input": {}},
                {"action": "apply_patches", "input": {"patches": [{"op": "add", "path": "/a", "value": 1}]}}
            ]}"#,
        )
        .unwrap();
        let outcome = dispatch(&turn.actions, &json!({}));

        assert_eq!(outcome.results[0].result, json!({"error": "Unknown action: null"}));
        assert_eq!(outcome.results[1].result["success"], json!(true));
        assert_eq!(outcome.document, Some(json!({"a": 1})));
        assert!(!outcome.is_finalized());
    }

    #[test]
    fn test_invalid_input_reported() {
        let outcome = dispatch(&[act(SEARCH_POINTER, json!({"query": 5}))], &json!({}));
        assert!(outcome.results[0].result["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid input for search_pointer"));
    }

    #[test]
    fn test_read_value_limits_from_input() {
        let doc = json!({"text": "abcdefghij"});
        let outcome = dispatch(&[act(READ_VALUE, json!({"path": "/text", "max_string_length": 3}))], &doc);
        assert_eq!(outcome.results[0].result["value"], json!("abc... (10 chars total)"));
    }

    #[test]
    fn test_search_defaults() {
        let doc = json!({"clients": [{"name": "Client X Corp"}]});
        let outcome = dispatch(&[act(SEARCH_POINTER, json!({"query": "client x", "fuzzy_match": true}))], &doc);
        let result = &outcome.results[0].result;
        assert_eq!(result["type"], json!("value"));
        assert_eq!(result["matches"][0]["pointer"], json!("/clients/0/name"));
    }

    #[test]
    fn test_action_from_raw() {
        assert_eq!(
            Action::from_raw(&act(INSPECT_KEYS, json!({"path": "/x"}))),
            Ok(Action::InspectKeys(InspectInput { path: "/x".to_string() }))
        );
        assert_eq!(
            Action::from_raw(&act("other", json!(null))),
            Ok(Action::Unrecognized("other".to_string()))
        );
        assert!(Action::from_raw(&act(APPLY_PATCHES, json!({"patches": "nope"}))).is_err());
    }
}
