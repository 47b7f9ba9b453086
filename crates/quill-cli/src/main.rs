//! Quill CLI - Extract a JSON document from text with a language model.

use clap::Parser;
use quill_cli::{Cli, CliError, Config, Formatter};
use quill_extractor::{ExtractionRequest, Extractor};
use std::fs;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Log to stderr so stdout carries only the document
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .init();

    let color = !cli.no_color;
    if let Err(e) = run(cli).await {
        eprintln!("{}", Formatter::new(false, color).error(&e.to_string()));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> quill_cli::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.merge_cli(&cli);
    config
        .extractor
        .validate()
        .map_err(CliError::Config)?;

    if let Some(warning) = config.timeout_warning() {
        warn!("{}", warning);
    }

    let formatter = Formatter::new(cli.pretty, config.settings.color);
    let mut request = ExtractionRequest::new(cli.read_text()?);
    if let Some(schema) = cli.read_schema()? {
        request = request.with_schema(schema);
    }

    let provider = config.provider.build()?;
    info!(provider = ?config.provider.kind, model = %config.provider.model, "Using model");

    let extractor = Extractor::new(provider, config.extractor);
    let result = extractor.extract(request).await;

    // The partial document is written even when the run failed
    let document = formatter.document(&result.json_document)?;
    match &cli.output {
        Some(path) => fs::write(path, document + "\n")?,
        None => println!("{}", document),
    }
    if !cli.quiet {
        eprintln!("{}", formatter.summary(&result));
    }

    match result.error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
