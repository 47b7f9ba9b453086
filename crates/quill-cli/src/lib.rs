//! Quill CLI library.
//!
//! Argument parsing, configuration loading and output formatting for the
//! `quill` binary.

pub mod cli;
pub mod config;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
