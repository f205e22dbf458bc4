#![deny(missing_docs)]

//! # Modelgen CLI
//!
//! Command line front end for the artifact engine.
//!
//! Supported Commands:
//! - `generate`: OpenAPI document -> model/relationship artifact JSON.
//! - `check`: lists which schemas in a document denote persisted entities.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod check;
mod document;
mod error;
mod generate;

use error::CliResult;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Schema-to-relational artifact toolchain")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Derives model artifacts from an OpenAPI document.
    Generate(generate::GenerateArgs),
    /// Lists constructable schemas without deriving artifacts.
    Check(check::CheckArgs),
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate(args) => generate::execute(args)?,
        Commands::Check(args) => check::execute(args)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli_structure() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
