#![deny(missing_docs)]

//! # Object Reference Artifacts
//!
//! Gathers the relationship artifacts for a property that references another
//! entity: target entity name, foreign key column, back reference, secondary
//! table, cardinality and nullability.
//!
//! The property must be a direct `$ref` or an `allOf` composing exactly one
//! `$ref` with relationship-modifying fragments. A relationship attribute
//! given at the usage site overrides the value declared on the target schema;
//! a modifier appearing more than once across the `allOf` list is ambiguous
//! and rejected.

use crate::artifacts::{
    column, ColumnRecord, ObjectArtifacts, PropertyArtifacts, Relationship, RelationshipRecord,
};
use crate::error::{ModelError, ModelResult};
use crate::resolver::{self, ResolutionContext};
use crate::schema::{self, all_of, peek, Schema, Schemas};
use serde_json::{Map, Value};

const MODIFIER_KEYS: [&str; 5] = [
    "x-backref",
    "x-secondary",
    "x-foreign-key-column",
    "x-uselist",
    "nullable",
];

/// Default foreign key column on the referenced entity.
const DEFAULT_FK_COLUMN: &str = "id";

/// Derives the artifacts for an object reference property.
///
/// Returns the relationship record together with the foreign key column to be
/// added to the owning model.
pub(crate) fn handle_object(
    property_schema: &Schema,
    logical_name: &str,
    schemas: &Schemas,
    ctx: &ResolutionContext,
    required: Option<bool>,
) -> ModelResult<PropertyArtifacts> {
    let artifacts = gather(property_schema, logical_name, schemas, ctx)?;
    let foreign_key = foreign_key_record(&artifacts, schemas, ctx, required)?;
    let record = RelationshipRecord {
        logical_name: logical_name.to_string(),
        relationship: artifacts.relationship,
    };
    Ok(PropertyArtifacts::Relationship {
        record,
        foreign_key: Some(foreign_key),
    })
}

/// Gathers the object reference artifacts for a property schema.
///
/// # Arguments
///
/// * `schema` - The property schema: a `$ref` or an `allOf` with one `$ref`.
/// * `logical_name` - The property name on the referencing model.
/// * `schemas` - All defined schemas.
/// * `ctx` - The resolution context.
pub fn gather(
    schema: &Schema,
    logical_name: &str,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<ObjectArtifacts> {
    let (ref_str, usage) = check_schema(schema, schemas, ctx)?;

    let ref_wrapper = Value::Object({
        let mut map = Map::new();
        map.insert("$ref".to_string(), Value::String(ref_str));
        map
    });
    let (ref_name, ref_schema) = resolver::resolve("", &ref_wrapper, schemas, ctx, None)?;
    let spec = all_of::merge(&ref_schema, schemas, ctx, None)?;

    // The referenced schema must describe an object
    if spec.get("type").and_then(Value::as_str) != Some("object") {
        return Err(ModelError::MalformedRelationship(format!(
            "The referenced schema {} must be of type object.",
            ref_name
        )));
    }

    // Usage site values override the defaults declared on the target
    let backref = match usage.backref {
        Some(value) => Some(value),
        None => peek::backref(&spec, schemas, ctx)?,
    };
    let secondary = match usage.secondary {
        Some(value) => Some(value),
        None => peek::secondary(&spec, schemas, ctx)?,
    };
    let fk_column = match usage.fk_column {
        Some(value) => Some(value),
        None => peek::foreign_key_column(&spec, schemas, ctx)?,
    };
    let uselist = match usage.uselist {
        Some(value) => Some(value),
        None => peek::uselist(&spec, schemas, ctx)?,
    };
    let nullable = match usage.nullable {
        Some(value) => Some(value),
        None => peek::nullable(&spec, schemas, ctx)?,
    };

    // A one-to-one back reference needs an explicit attribute name on the
    // far side
    if uselist == Some(false) && backref.is_none() {
        return Err(ModelError::MalformedRelationship(
            "A one-to-one relationship requires a back reference.".to_string(),
        ));
    }

    Ok(ObjectArtifacts {
        spec,
        logical_name: logical_name.to_string(),
        fk_column: fk_column.unwrap_or_else(|| DEFAULT_FK_COLUMN.to_string()),
        relationship: Relationship {
            model_name: ref_name,
            back_reference: backref,
            secondary,
            uselist,
        },
        nullable,
    })
}

/// Usage-site relationship modifiers collected from the `allOf` list.
#[derive(Debug, Default)]
struct UsageModifiers {
    backref: Option<String>,
    secondary: Option<String>,
    fk_column: Option<String>,
    uselist: Option<bool>,
    nullable: Option<bool>,
}

/// Validates the reference composition and extracts the `$ref` plus the
/// usage-site modifiers.
fn check_schema(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<(String, UsageModifiers)> {
    if let Some(ref_value) = schema.get("$ref") {
        let ref_str = ref_value.as_str().ok_or_else(|| {
            ModelError::MalformedSchema("The value of $ref must be a string.".to_string())
        })?;
        return Ok((ref_str.to_string(), UsageModifiers::default()));
    }

    let Some(all_of) = schema.get("allOf") else {
        return Err(ModelError::MalformedRelationship(
            "An object reference must be a $ref or an allOf containing a $ref.".to_string(),
        ));
    };
    let fragments = all_of.as_array().ok_or_else(|| {
        ModelError::MalformedSchema("The value of allOf must be a list.".to_string())
    })?;

    let mut ref_str: Option<String> = None;
    let mut usage = UsageModifiers::default();
    let mut seen: std::collections::HashSet<&str> = std::collections::HashSet::new();

    for fragment in fragments {
        if let Some(ref_value) = fragment.get("$ref") {
            if ref_str.is_some() {
                return Err(ModelError::MalformedRelationship(
                    "Only one $ref is supported in the allOf of an object reference."
                        .to_string(),
                ));
            }
            let value = ref_value.as_str().ok_or_else(|| {
                ModelError::MalformedSchema("The value of $ref must be a string.".to_string())
            })?;
            ref_str = Some(value.to_string());
        }

        for key in MODIFIER_KEYS {
            if fragment.get(key).is_none() {
                continue;
            }
            if !seen.insert(key) {
                return Err(ModelError::MalformedRelationship(format!(
                    "The {} property is defined multiple times for the relationship.",
                    key
                )));
            }
            match key {
                "x-backref" => usage.backref = peek::backref(fragment, schemas, ctx)?,
                "x-secondary" => usage.secondary = peek::secondary(fragment, schemas, ctx)?,
                "x-foreign-key-column" => {
                    usage.fk_column = peek::foreign_key_column(fragment, schemas, ctx)?
                }
                "x-uselist" => usage.uselist = peek::uselist(fragment, schemas, ctx)?,
                "nullable" => usage.nullable = peek::nullable(fragment, schemas, ctx)?,
                _ => {}
            }
        }
    }

    let ref_str = ref_str.ok_or_else(|| {
        ModelError::MalformedRelationship(
            "An object reference must contain a $ref to the referenced schema.".to_string(),
        )
    })?;
    Ok((ref_str, usage))
}

/// Builds the foreign key column added to the owning model for the reference.
fn foreign_key_record(
    artifacts: &ObjectArtifacts,
    schemas: &Schemas,
    ctx: &ResolutionContext,
    required: Option<bool>,
) -> ModelResult<ColumnRecord> {
    let tablename = peek::tablename(&artifacts.spec, schemas, ctx)?.ok_or_else(|| {
        ModelError::MalformedRelationship(format!(
            "Referenced object {} is missing a table name extension.",
            artifacts.relationship.model_name
        ))
    })?;
    let properties = artifacts
        .spec
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            ModelError::MalformedRelationship(
                "Referenced object does not have any properties.".to_string(),
            )
        })?;
    let fk_property = properties.get(&artifacts.fk_column).ok_or_else(|| {
        ModelError::MalformedRelationship(format!(
            "Referenced object does not have the {} property.",
            artifacts.fk_column
        ))
    })?;
    let fk_prepared = schema::prepare_deep(fk_property, schemas, ctx)?;

    let mut fk_schema = Map::new();
    if let Some(type_value) = fk_prepared.get("type") {
        fk_schema.insert("type".to_string(), type_value.clone());
    }
    if let Some(format_value) = fk_prepared.get("format") {
        fk_schema.insert("format".to_string(), format_value.clone());
    }
    if let Some(max_length) = fk_prepared.get("maxLength") {
        fk_schema.insert("maxLength".to_string(), max_length.clone());
    }
    if let Some(nullable) = artifacts.nullable {
        fk_schema.insert("nullable".to_string(), Value::Bool(nullable));
    }
    fk_schema.insert(
        "x-foreign-key".to_string(),
        Value::String(format!("{}.{}", tablename, artifacts.fk_column)),
    );

    column::handle_column(
        &Value::Object(fk_schema),
        &format!("{}_{}", artifacts.logical_name, artifacts.fk_column),
        required,
    )
}
