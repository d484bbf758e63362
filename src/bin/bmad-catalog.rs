//! BMAD Catalog CLI Binary
//!
//! Command-line interface for discovering and resolving BMAD agents and workflows.

use anyhow::Context;
use bmad_catalog::logging::init_logging;
use bmad_catalog::tooling::cli::{Cli, CliContext};
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let config = cli.load_config().context("loading configuration")?;

    // A second subscriber (e.g. under a test harness) is not fatal.
    if let Err(e) = init_logging(Some(&config.logging)) {
        eprintln!("Warning: {}", e);
    }

    let context = CliContext::new(config, cli.format).context("initializing catalog")?;
    let output = context.execute(&cli.command).await?;
    Ok(output)
}
