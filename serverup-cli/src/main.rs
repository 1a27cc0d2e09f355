//! serverup command line
//!
//! Resolves the language server environment and keeps the language server
//! binary installed and current.

mod cli;
mod commands;
mod prompt;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::filter::{Directive, EnvFilter};

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    init_logging(cli.verbose);
    tracing::debug!("Starting serverup v{}", serverup_core::VERSION);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    runtime.block_on(commands::run(cli))
}

/// Logs go to stderr so command output on stdout stays machine readable.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into());
    if let Ok(directive) = format!("serverup={level}").parse::<Directive>() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
