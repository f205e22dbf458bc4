#![deny(missing_docs)]

//! # Column Artifacts
//!
//! Maps a scalar property schema (type + format + constraints) into column
//! artifacts and the resolved database type. Assumes any `$ref` and `allOf`
//! have already been resolved.

use crate::artifacts::{ColumnArtifacts, ColumnRecord, ColumnType, DatabaseType};
use crate::error::{ModelError, ModelResult};
use crate::resolver::ResolutionContext;
use crate::schema::{peek, Schema, Schemas};
use serde_json::{Map, Value};

/// Derives the column record for a scalar property.
///
/// # Arguments
///
/// * `schema` - The prepared schema for the column.
/// * `logical_name` - The property name.
/// * `required` - Whether the property is listed as required on the model.
pub fn handle_column(
    schema: &Schema,
    logical_name: &str,
    required: Option<bool>,
) -> ModelResult<ColumnRecord> {
    let artifacts = check_schema(schema, required)?;
    let database_type = determine_type(&artifacts)?;
    let recorded = calculate_schema(&artifacts);
    Ok(ColumnRecord {
        logical_name: logical_name.to_string(),
        artifacts,
        database_type,
        schema: recorded,
    })
}

/// Checks a scalar schema and gathers the column artifacts.
///
/// Raises `MalformedSchema` when `type` is missing or any recognized key has
/// a value of the wrong shape.
pub fn check_schema(schema: &Schema, required: Option<bool>) -> ModelResult<ColumnArtifacts> {
    // Scalar schemas are prepared; peeks do not need the universe
    let schemas = Schemas::new();
    let ctx = ResolutionContext::new();

    let column_type: ColumnType = peek::type_(schema, &schemas, &ctx)?.parse()?;
    let format = peek::format_(schema, &schemas, &ctx)?;
    let max_length = peek::max_length(schema, &schemas, &ctx)?;
    let nullable = peek::nullable(schema, &schemas, &ctx)?;
    let primary_key = peek::primary_key(schema, &schemas, &ctx)?;
    let autoincrement = peek::autoincrement(schema, &schemas, &ctx)?;
    let index = peek::index(schema, &schemas, &ctx)?;
    let unique = peek::unique(schema, &schemas, &ctx)?;
    let foreign_key = peek::foreign_key(schema, &schemas, &ctx)?;

    let nullable = calculate_nullable(nullable, autoincrement == Some(true), required);

    Ok(ColumnArtifacts {
        column_type,
        format,
        max_length,
        nullable,
        primary_key,
        autoincrement,
        index,
        unique,
        foreign_key,
    })
}

/// Calculates the nullability of a column.
///
/// An explicit `nullable` wins. Otherwise the column is nullable unless it is
/// required or its value is database generated.
pub fn calculate_nullable(
    nullable: Option<bool>,
    generated: bool,
    required: Option<bool>,
) -> bool {
    match nullable {
        Some(value) => value,
        None => {
            if required == Some(true) {
                false
            } else {
                !generated
            }
        }
    }
}

/// Resolves the database type for column artifacts.
///
/// Checks the artifacts for rule compliance first; invalid combinations raise
/// `MalformedSchema`, unsupported formats raise `FeatureNotImplemented`.
pub fn determine_type(artifacts: &ColumnArtifacts) -> ModelResult<DatabaseType> {
    check_artifacts(artifacts)?;
    match artifacts.column_type {
        ColumnType::Integer => handle_integer(artifacts),
        ColumnType::Number => handle_number(artifacts),
        ColumnType::String => handle_string(artifacts),
        ColumnType::Boolean => Ok(DatabaseType::Boolean),
    }
}

/// Checks that the artifacts comply with overall rules:
///
/// 1. `maxLength` is only supported for strings without a `date`/`date-time`
///    format,
/// 2. `autoincrement` is only supported for integers and
/// 3. `format` is not supported for booleans.
fn check_artifacts(artifacts: &ColumnArtifacts) -> ModelResult<()> {
    if artifacts.max_length.is_some() {
        if matches!(
            artifacts.column_type,
            ColumnType::Integer | ColumnType::Number | ColumnType::Boolean
        ) {
            return Err(ModelError::MalformedSchema(format!(
                "maxLength is not supported for {}",
                artifacts.column_type
            )));
        }
        // Must be string type
        if let Some(format) = artifacts.format.as_deref() {
            if matches!(format, "date" | "date-time") {
                return Err(ModelError::MalformedSchema(format!(
                    "maxLength is not supported for string with the format {}",
                    format
                )));
            }
        }
    }
    if artifacts.autoincrement.is_some()
        && matches!(
            artifacts.column_type,
            ColumnType::Number | ColumnType::String | ColumnType::Boolean
        )
    {
        return Err(ModelError::MalformedSchema(format!(
            "autoincrement is not supported for {}",
            artifacts.column_type
        )));
    }
    if artifacts.column_type == ColumnType::Boolean && artifacts.format.is_some() {
        return Err(ModelError::MalformedSchema(
            "format is not supported for boolean".to_string(),
        ));
    }
    Ok(())
}

fn handle_integer(artifacts: &ColumnArtifacts) -> ModelResult<DatabaseType> {
    match artifacts.format.as_deref() {
        None | Some("int32") => Ok(DatabaseType::Integer),
        Some("int64") => Ok(DatabaseType::BigInteger),
        Some(other) => Err(ModelError::FeatureNotImplemented(format!(
            "{} format for integer is not supported.",
            other
        ))),
    }
}

fn handle_number(artifacts: &ColumnArtifacts) -> ModelResult<DatabaseType> {
    match artifacts.format.as_deref() {
        None | Some("float") => Ok(DatabaseType::Float),
        Some(other) => Err(ModelError::FeatureNotImplemented(format!(
            "{} format for number is not supported.",
            other
        ))),
    }
}

fn handle_string(artifacts: &ColumnArtifacts) -> ModelResult<DatabaseType> {
    match artifacts.format.as_deref() {
        None | Some("byte") | Some("password") => Ok(DatabaseType::Text(artifacts.max_length)),
        Some("binary") => Ok(DatabaseType::Binary(artifacts.max_length)),
        Some("date") => Ok(DatabaseType::Date),
        Some("date-time") => Ok(DatabaseType::DateTime),
        Some(other) => Err(ModelError::FeatureNotImplemented(format!(
            "{} format for string is not supported.",
            other
        ))),
    }
}

/// Calculates the schema recorded for the column on the model.
pub fn calculate_schema(artifacts: &ColumnArtifacts) -> Schema {
    let mut schema = Map::new();
    schema.insert(
        "type".to_string(),
        Value::String(artifacts.column_type.to_string()),
    );
    if let Some(format) = &artifacts.format {
        schema.insert("format".to_string(), Value::String(format.clone()));
    }
    if let Some(max_length) = artifacts.max_length {
        schema.insert("maxLength".to_string(), Value::from(max_length));
    }
    if let Some(autoincrement) = artifacts.autoincrement {
        schema.insert("x-generated".to_string(), Value::Bool(autoincrement));
    }
    schema.insert("nullable".to_string(), Value::Bool(artifacts.nullable));
    if let Some(foreign_key) = &artifacts.foreign_key {
        schema.insert(
            "x-foreign-key".to_string(),
            Value::String(foreign_key.clone()),
        );
    }
    Value::Object(schema)
}
