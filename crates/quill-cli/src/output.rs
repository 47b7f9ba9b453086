//! Output formatting for the CLI.

use crate::error::Result;
use colored::*;
use quill_extractor::ExtractionResult;
use serde_json::Value;

/// Output formatter.
pub struct Formatter {
    pretty: bool,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(pretty: bool, color_enabled: bool) -> Self {
        Self { pretty, color_enabled }
    }

    /// Render the extracted document.
    pub fn document(&self, document: &Value) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(document)?)
        } else {
            Ok(serde_json::to_string(document)?)
        }
    }

    /// One-line summary of a run.
    pub fn summary(&self, result: &ExtractionResult) -> String {
        let meta = &result.metadata;
        let msg = format!(
            "Processed {} chunk(s) with {} model call(s), {} token(s), in {} ms",
            meta.total_chunks, meta.model_calls, meta.token_usage.total_tokens, meta.processing_time_ms
        );
        if result.is_success() {
            self.success(&msg)
        } else {
            self.warning(&msg)
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("Error: {}", message), "red")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_extractor::{ExtractionMetadata, TokenUsage};
    use serde_json::json;

    fn result(error: Option<quill_extractor::ExtractorError>) -> ExtractionResult {
        ExtractionResult {
            json_document: json!({"name": "John"}),
            metadata: ExtractionMetadata {
                run_id: "run".to_string(),
                total_chunks: 2,
                final_guidance: None,
                model_name: "mock".to_string(),
                model_calls: 5,
                forced_finalizations: 0,
                token_usage: TokenUsage {
                    prompt_tokens: 900,
                    completion_tokens: 100,
                    total_tokens: 1000,
                },
                processing_time_ms: 12,
            },
            error,
        }
    }

    #[test]
    fn test_compact_document() {
        let formatter = Formatter::new(false, false);
        assert_eq!(formatter.document(&json!({"a": [1, 2]})).unwrap(), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn test_pretty_document() {
        let formatter = Formatter::new(true, false);
        let output = formatter.document(&json!({"a": 1})).unwrap();
        assert_eq!(output, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_summary() {
        let formatter = Formatter::new(false, false);
        assert_eq!(
            formatter.summary(&result(None)),
            "✓ Processed 2 chunk(s) with 5 model call(s), 1000 token(s), in 12 ms"
        );
        assert!(formatter
            .summary(&result(Some(quill_extractor::ExtractorError::NoText)))
            .starts_with('⚠'));
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(false, false);
        assert_eq!(formatter.error("boom"), "Error: boom");
    }
}
