#![deny(missing_docs)]

//! # Generate Command
//!
//! Runs the artifact engine over an OpenAPI document and emits the derived
//! model artifacts as JSON.

use crate::document::load_schemas;
use crate::error::CliResult;
use clap::Args;
use modelgen_core::{generate, ResolutionContext};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the `generate` command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Path to the OpenAPI document (JSON or YAML).
    #[clap(short, long, env = "MODELGEN_SPEC")]
    pub spec: PathBuf,

    /// Output file for the artifact JSON; stdout when omitted.
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Emit compact instead of pretty-printed JSON.
    #[clap(long)]
    pub compact: bool,
}

/// Executes the generate command.
pub fn execute(args: &GenerateArgs) -> CliResult<()> {
    let mut schemas = load_schemas(&args.spec)?;
    let ctx = ResolutionContext::with_spec_path(&args.spec);

    let generated = generate(&mut schemas, &ctx)?;
    info!(
        models = generated.models.len(),
        associations = generated.associations.len(),
        "artifact generation finished"
    );

    let rendered = if args.compact {
        serde_json::to_string(&generated)
    } else {
        serde_json::to_string_pretty(&generated)
    }
    .map_err(|e| crate::error::CliError::General(format!("Failed to serialize: {}", e)))?;

    match &args.output {
        Some(path) => fs::write(path, rendered)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", rendered)?;
        }
    }

    Ok(())
}
