#![deny(missing_docs)]

//! # Check Command
//!
//! Lists the schemas in an OpenAPI document and reports which of them denote
//! persisted entities, without deriving any artifacts.

use crate::document::load_schemas;
use crate::error::CliResult;
use clap::Args;
use modelgen_core::{constructable, ResolutionContext};
use std::io::Write;
use std::path::PathBuf;

/// Arguments for the `check` command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the OpenAPI document (JSON or YAML).
    #[clap(short, long, env = "MODELGEN_SPEC")]
    pub spec: PathBuf,
}

/// Executes the check command.
pub fn execute(args: &CheckArgs) -> CliResult<()> {
    let schemas = load_schemas(&args.spec)?;
    let ctx = ResolutionContext::with_spec_path(&args.spec);

    let mut stdout = std::io::stdout().lock();
    for (name, schema) in &schemas {
        let is_model = constructable(schema, &schemas, &ctx)?;
        let marker = if is_model { "model" } else { "fragment" };
        writeln!(stdout, "{:<10} {}", marker, name)?;
    }

    Ok(())
}
