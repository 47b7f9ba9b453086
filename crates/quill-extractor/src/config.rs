//! Configuration for the Extractor

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Text chunking strategy for large documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChunkStrategy {
    /// Split by paragraphs (double newlines)
    #[default]
    ByParagraph,
    /// Split by sections (markdown headers or numbered sections)
    BySection,
    /// Split at sentence boundaries by size only
    ByTokenCount,
}

/// Configuration for the Extractor
///
/// Built once by the caller and handed to [`crate::Extractor::new`]; the run
/// never reads settings from anywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Model turns allowed per chunk before it is finalized by force
    pub max_iterations_per_chunk: usize,

    /// Maximum time for a single model call (seconds)
    pub model_timeout_secs: u64,

    /// Text chunking strategy
    pub chunk_strategy: ChunkStrategy,

    /// Maximum chunk size (characters)
    pub max_chunk_size: usize,
}

impl ExtractorConfig {
    /// Get the model call timeout as a Duration
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    /// Set the per-chunk iteration cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations_per_chunk = max_iterations;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_iterations_per_chunk == 0 {
            return Err("max_iterations_per_chunk must be greater than 0".to_string());
        }
        if self.max_chunk_size == 0 {
            return Err("max_chunk_size must be greater than 0".to_string());
        }
        if self.model_timeout_secs == 0 {
            return Err("model_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_iterations_per_chunk: 20,
            model_timeout_secs: 120,
            chunk_strategy: ChunkStrategy::ByParagraph,
            max_chunk_size: 4_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExtractorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_iterations_per_chunk, 20);
        assert_eq!(config.model_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let config = ExtractorConfig::default().with_max_iterations(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = ExtractorConfig {
            max_chunk_size: 0,
            ..ExtractorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ExtractorConfig {
            model_timeout_secs: 0,
            ..ExtractorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig {
            chunk_strategy: ChunkStrategy::BySection,
            ..ExtractorConfig::default().with_max_iterations(7)
        };
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractorConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let parsed = ExtractorConfig::from_toml("max_iterations_per_chunk = 5").unwrap();
        assert_eq!(parsed.max_iterations_per_chunk, 5);
        assert_eq!(parsed.max_chunk_size, 4_000);
        assert_eq!(parsed.chunk_strategy, ChunkStrategy::ByParagraph);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(ExtractorConfig::from_toml("max_iterations_per_chunk = \"many\"").is_err());
    }
}
