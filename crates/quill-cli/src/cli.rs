//! Command-line argument parsing.

use crate::error::{CliError, Result};
use clap::{ArgGroup, Parser};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// Quill - Extract a structured JSON document from unstructured text.
#[derive(Debug, Parser)]
#[command(name = "quill")]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("input").required(true).args(["text", "file"])))]
pub struct Cli {
    /// Text to extract from
    #[arg(short, long)]
    pub text: Option<String>,

    /// File containing the text to extract from
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// JSON file with a target schema for the output document
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Model turns allowed per chunk
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Model name, overriding the config file
    #[arg(long, env = "QUILL_MODEL")]
    pub model: Option<String>,

    /// Model backend, overriding the config file
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Write the document to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pretty-print the document
    #[arg(short, long)]
    pub pretty: bool,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log every model call
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Model backend argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderArg {
    /// OpenAI-compatible API
    Openai,
    /// Local Ollama server
    Ollama,
}

impl From<ProviderArg> for quill_llm::ProviderKind {
    fn from(provider: ProviderArg) -> Self {
        match provider {
            ProviderArg::Openai => quill_llm::ProviderKind::OpenAi,
            ProviderArg::Ollama => quill_llm::ProviderKind::Ollama,
        }
    }
}

impl Cli {
    /// Log level implied by `--quiet` and `--verbose`.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// The input text, from `--text` or `--file`.
    pub fn read_text(&self) -> Result<String> {
        match (&self.text, &self.file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => Ok(fs::read_to_string(path)?),
            (None, None) => Err(CliError::InvalidInput(
                "either --text or --file is required".to_string(),
            )),
        }
    }

    /// The target schema, if `--schema` was given.
    pub fn read_schema(&self) -> Result<Option<Value>> {
        let Some(path) = &self.schema else {
            return Ok(None);
        };
        let contents = fs::read_to_string(path)?;
        let schema: Value = serde_json::from_str(&contents)?;
        if !schema.is_object() {
            return Err(CliError::InvalidInput(format!(
                "schema in {} must be a JSON object",
                path.display()
            )));
        }
        Ok(Some(schema))
    }
}
