#![deny(missing_docs)]

//! # Document Loading
//!
//! Reads an OpenAPI document from disk (JSON or YAML by extension) and
//! extracts the `components/schemas` mapping the engine consumes.

use crate::error::{CliError, CliResult};
use modelgen_core::Schemas;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Loads an OpenAPI document and returns its named schemas.
pub fn load_schemas(path: &Path) -> CliResult<Schemas> {
    let contents = fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let document: Value = match extension.as_str() {
        "json" => serde_json::from_str(&contents)
            .map_err(|e| CliError::General(format!("Failed to parse {}: {}", path.display(), e)))?,
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .map_err(|e| CliError::General(format!("Failed to parse {}: {}", path.display(), e)))?,
        other => {
            return Err(CliError::General(format!(
                "Unsupported document extension: {:?}",
                other
            )))
        }
    };

    document
        .pointer("/components/schemas")
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| {
            CliError::General(format!(
                "{} does not contain components/schemas",
                path.display()
            ))
        })
}
