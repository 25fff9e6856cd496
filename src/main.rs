// src/main.rs
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pincer::recording::JsonFileSource;
use pincer::PincerConfig;

/// Run the analyses described by a JSON config and print the results as JSON.
#[derive(Debug, Parser)]
#[command(name = "pincer", version, about)]
struct Cli {
    /// Batch config: recordings, analyses and derived measures.
    config: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let path = cli.config.display();
    let config = PincerConfig::load(&cli.config).with_context(|| format!("loading {path}"))?;
    let output = config
        .run(&JsonFileSource)
        .with_context(|| format!("building analyses from {path}"))?;
    log::info!(
        "{} rows, {} errors",
        output.report.table.rows().len(),
        output.report.errors.len()
    );
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
