//! Configuration file for the CLI.

use crate::cli::Cli;
use crate::error::{CliError, Result};
use quill_extractor::ExtractorConfig;
use quill_llm::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// CLI configuration, `~/.quill/config.toml` by default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Model backend
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Extraction loop settings
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Global CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".quill").join("config.toml"))
    }

    /// Load configuration from `path`, or the defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load from `--config`, or from the default path, writing the defaults
    /// there on first use.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(CliError::Config(format!("{} does not exist", path.display())));
            }
            return Self::load_from(path);
        }

        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = Self::default();
            config.save_to(&path).ok();
            Ok(config)
        }
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Describe the mismatch when a provider call, retries included, can
    /// outlast the extractor's per-call timeout.
    pub fn timeout_warning(&self) -> Option<String> {
        let worst = self.provider.max_call_duration();
        let limit = self.extractor.model_timeout();
        (worst > limit).then(|| {
            format!(
                "provider calls may take up to {}s with retries but model_timeout_secs is {}s",
                worst.as_secs(),
                limit.as_secs()
            )
        })
    }

    /// Apply command-line overrides.
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(max_iterations) = cli.max_iterations {
            self.extractor.max_iterations_per_chunk = max_iterations;
        }
        if let Some(model) = &cli.model {
            self.provider.model = model.clone();
        }
        if let Some(provider) = cli.provider {
            self.provider.kind = provider.into();
        }
        if cli.no_color {
            self.settings.color = false;
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self { color: true }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use quill_llm::ProviderKind;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.settings.color);
        assert_eq!(config.extractor.max_iterations_per_chunk, 20);
        assert_eq!(config.provider.kind, ProviderKind::OpenAi);
    }

    #[test]
    fn test_default_timeouts_leave_room_for_retries() {
        let config = Config::default();
        assert!(config.provider.max_call_duration() <= config.extractor.model_timeout());
        assert_eq!(config.timeout_warning(), None);
    }

    #[test]
    fn test_timeout_warning() {
        let mut config = Config::default();
        config.provider.timeout_secs = 120;
        let warning = config.timeout_warning().unwrap();
        assert!(warning.contains("363s"));
        assert!(warning.contains("120s"));
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[provider]\nkind = \"ollama\"\nmodel = \"llama3.1\"\n\n[extractor]\nmax_chunk_size = 2000\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Ollama);
        assert_eq!(config.provider.model, "llama3.1");
        assert_eq!(config.extractor.max_chunk_size, 2000);
        assert_eq!(config.extractor.max_iterations_per_chunk, 20);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.settings.color = false;

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_explicit_path() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[extractor\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(CliError::Toml(_))));
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "quill",
            "-t",
            "text",
            "--max-iterations",
            "5",
            "--model",
            "gpt-4o",
            "--provider",
            "ollama",
            "--no-color",
        ]);
        let mut config = Config::default();
        config.merge_cli(&cli);

        assert_eq!(config.extractor.max_iterations_per_chunk, 5);
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.provider.kind, ProviderKind::Ollama);
        assert!(!config.settings.color);
    }
}
