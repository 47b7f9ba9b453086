//! OpenAI Provider Implementation
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint with
//! `response_format: json_object`, so replies are always a single JSON object.
//!
//! # Examples
//!
//! ```no_run
//! use quill_llm::OpenAiProvider;
//!
//! // Reads the key from OPENAI_API_KEY
//! let provider = OpenAiProvider::from_env("OPENAI_API_KEY", "gpt-4o-mini").unwrap();
//! ```

use crate::retry::{status_error, with_backoff, DEFAULT_MAX_RETRIES};
use crate::LlmError;
use quill_domain::traits::LlmProvider as LlmProviderTrait;
use quill_domain::{ChatMessage, ChatReply, Usage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default API base URL
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Default model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default completion budget per reply
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Default timeout for a single HTTP request
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// OpenAI chat completions provider
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: u32,
    timeout: Duration,
    max_retries: u32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl CompletionResponse {
    fn into_reply(self) -> Result<ChatReply, LlmError> {
        let content = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("Response contained no message content".to_string()))?;

        let mut reply = ChatReply::new(content);
        if let Some(usage) = self.usage {
            reply = reply.with_usage(Usage::new(usage.prompt_tokens, usage.completion_tokens));
        }
        Ok(reply)
    }
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    /// Create a provider with an explicit API key
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
            api_key: api_key.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Create a provider reading the API key from `var`
    ///
    /// # Errors
    ///
    /// `LlmError::MissingApiKey` when the variable is unset or blank.
    pub fn from_env(var: &str, model: impl Into<String>) -> Result<Self, LlmError> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key, model)),
            _ => Err(LlmError::MissingApiKey(var.to_string())),
        }
    }

    /// Use a different OpenAI-compatible base URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the completion budget
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn request_body<'a>(&'a self, messages: &'a [ChatMessage]) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: self.max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        }
    }

    fn send_once(&self, client: &reqwest::blocking::Client, body: &CompletionRequest<'_>) -> Result<ChatReply, LlmError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let response = client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status, text, &self.model));
        }

        let parsed: CompletionResponse = response
            .json()
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        parsed.into_reply()
    }
}

impl LlmProviderTrait for OpenAiProvider {
    type Error = LlmError;

    fn chat(&self, messages: &[ChatMessage]) -> Result<ChatReply, Self::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;
        let body = self.request_body(messages);

        debug!(model = %self.model, messages = messages.len(), "openai chat request");
        with_backoff(self.max_retries, || self.send_once(&client, &body))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_provider_creation() {
        let provider = OpenAiProvider::new("sk-test", "gpt-4o-mini");
        assert_eq!(provider.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(provider.model_name(), "gpt-4o-mini");
        assert_eq!(provider.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(provider.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let provider = OpenAiProvider::new("k", "m").with_endpoint("http://localhost:8080/v1/");
        assert_eq!(provider.endpoint, "http://localhost:8080/v1");
    }

    #[test]
    fn test_missing_api_key() {
        let result = OpenAiProvider::from_env("QUILL_TEST_UNSET_KEY_VAR", "m");
        assert_eq!(
            result.unwrap_err(),
            LlmError::MissingApiKey("QUILL_TEST_UNSET_KEY_VAR".to_string())
        );
    }

    #[test]
    fn test_request_body_shape() {
        let provider = OpenAiProvider::new("k", "gpt-4o-mini").with_max_tokens(100);
        let messages = [ChatMessage::system("rules"), ChatMessage::user("chunk")];
        let body = serde_json::to_value(provider.request_body(&messages)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "rules"},
                    {"role": "user", "content": "chunk"}
                ],
                "max_tokens": 100,
                "response_format": {"type": "json_object"}
            })
        );
    }

    #[test]
    fn test_reply_with_usage() {
        let response: CompletionResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"actions\": []}"}}],
            "usage": {"prompt_tokens": 812, "completion_tokens": 64, "total_tokens": 876}
        }))
        .unwrap();
        let reply = response.into_reply().unwrap();
        assert_eq!(reply.content, r#"{"actions": []}"#);
        assert_eq!(reply.usage, Some(Usage::new(812, 64)));
    }

    #[test]
    fn test_reply_without_usage_or_content() {
        let response: CompletionResponse =
            serde_json::from_value(serde_json::json!({"choices": [{"message": {"content": "{}"}}]})).unwrap();
        assert_eq!(response.into_reply().unwrap().usage, None);

        let empty: CompletionResponse = serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(matches!(empty.into_reply(), Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_unreachable_endpoint() {
        let provider = OpenAiProvider::new("k", "m")
            .with_endpoint("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(2))
            .with_max_retries(1);
        let result = provider.chat(&[ChatMessage::user("hi")]);
        assert!(matches!(result, Err(LlmError::Communication(_))));
    }
}
