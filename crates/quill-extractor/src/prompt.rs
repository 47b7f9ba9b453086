//! Prompt construction for the extraction loop

use crate::dispatcher::ActionResult;
use crate::guidance::Guidance;
use serde_json::Value;

/// Builds the system prompt for one chunk
///
/// The prompt is rebuilt at the start of every chunk so it always reflects
/// the document and baton left by the previous chunk.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder<'a> {
    target_schema: Option<&'a Value>,
    guidance: Option<&'a Guidance>,
    document: Option<&'a Value>,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Advisory schema for the output document
    pub fn with_target_schema(mut self, schema: Option<&'a Value>) -> Self {
        self.target_schema = schema;
        self
    }

    /// Baton from the previous chunk
    pub fn with_guidance(mut self, guidance: Option<&'a Guidance>) -> Self {
        self.guidance = guidance;
        self
    }

    /// Document built so far
    pub fn with_document(mut self, document: &'a Value) -> Self {
        self.document = Some(document);
        self
    }

    /// Build the complete system prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(ROLE_INSTRUCTIONS);
        prompt.push_str("\n\n");
        prompt.push_str(TOOL_DEFINITIONS);
        prompt.push_str("\n\n");
        prompt.push_str(FINALIZATION_RULES);
        prompt.push_str("\n\n");

        prompt.push_str("<TargetSchema>\n");
        prompt.push_str(&self.target_schema.map(pretty).unwrap_or_else(|| "null".to_string()));
        prompt.push_str("\n</TargetSchema>\n\n");

        prompt.push_str("<PreviousGuidance>\n");
        let guidance = self
            .guidance
            .and_then(|g| serde_json::to_value(g).ok())
            .map(|g| pretty(&g))
            .unwrap_or_else(|| "null".to_string());
        prompt.push_str(&guidance);
        prompt.push_str("\n</PreviousGuidance>\n\n");

        prompt.push_str("<JsonSkeleton>\n");
        prompt.push_str(&self.document.map(pretty).unwrap_or_else(|| "{}".to_string()));
        prompt.push_str("\n</JsonSkeleton>\n\n");

        prompt.push_str(OUTPUT_FORMAT_REMINDER);
        prompt
    }
}

/// User message carrying chunk `index` (0-based) of `total`
pub fn build_user_message(chunk: &str, index: usize, total: usize) -> String {
    format!(
        "<TextChunk index=\"{}\" total=\"{}\">\n{}\n</TextChunk>",
        index + 1,
        total,
        chunk
    )
}

/// User message reporting the results of the previous turn
pub fn build_observation_message(results: &[ActionResult]) -> String {
    let body = serde_json::to_string_pretty(results).unwrap_or_else(|_| "[]".to_string());
    format!("<ToolObservations>\n{}\n</ToolObservations>", body)
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

const ROLE_INSTRUCTIONS: &str = r#"You build a JSON document from a long text that arrives one chunk at a time.
You only see the current chunk, the document skeleton below and the guidance left by the previous chunk.
Work in turns: think, request actions, read the observations, repeat until the chunk is fully written.

Rules:
- Never guess a pointer. Confirm containers with inspect_keys or search_pointer before writing into them
- Search for an existing entity before adding it, so the document holds no duplicates
- Correct earlier data with replace, remove or move when this chunk shows it was wrong or incomplete
- Bundle independent lookups in one turn; send writes that depend on them in the next turn
- Keep reads narrow: inspect lengths and read specific indices instead of whole arrays
- If no target schema is given, keep the structure consistent with the skeleton"#;

const TOOL_DEFINITIONS: &str = r#"<Tools>
inspect_keys {"path": "/pointer"}
  Keys of an object, length of an array, or a short preview of a scalar.
read_value {"path": "/pointer", "max_string_length": 160, "max_depth": 6, "max_array_items": 50, "max_object_keys": 50}
  Value at a pointer, truncated to the limits (all optional).
search_pointer {"query": "text", "type": "key|value", "fuzzy_match": false, "limit": 20}
  Pointers to keys or scalar values containing the query. fuzzy_match requires every word, in any order.
apply_patches {"patches": [{"op": "add|remove|replace|move|copy", "path": "/pointer", "value": ..., "from": "/pointer"}]}
  RFC 6902 patch, applied all-or-nothing. "-" appends to an array. "test" is not supported.
  On failure nothing is applied and failed_at_index names the first operation that did not fit.
update_guidance {"last_processed_path": "/pointer", "current_context": "...", "pending_action": "...", "extracted_entities_count": 0}
  Finishes the current chunk and leaves guidance for the next one.
</Tools>"#;

const FINALIZATION_RULES: &str = r#"<Finalization>
- update_guidance must be the only action of its turn; combined with anything else it is rejected
- Do not finalize while a patch from this chunk has failed or an observation you need is still pending
- Put in current_context what the next chunk needs to continue (open lists, the entity being filled)
</Finalization>"#;

const OUTPUT_FORMAT_REMINDER: &str = r#"Output format (a single JSON object, no markdown, no extra text):
{"think": "your reasoning", "actions": [{"action": "inspect_keys", "input": {"path": "/"}}]}"#;
