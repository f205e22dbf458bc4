#![deny(missing_docs)]

//! # Array Reference Links
//!
//! Constructs the link between tables for a to-many relationship. Without an
//! `x-secondary` table a foreign key is added to the referenced (child)
//! schema pointing back to the owning (parent) table: one-to-many. With
//! `x-secondary` an association table holding foreign keys to both primary
//! keys is built and registered under the given name: many-to-many. Later
//! references to the same name reuse the registered table.

use crate::artifacts::{
    column, object_ref, AssociationTable, ColumnRecord, ModelRegistry, ObjectArtifacts,
    PropertyArtifacts, RelationshipRecord,
};
use crate::error::{ModelError, ModelResult};
use crate::resolver::ResolutionContext;
use crate::schema::{self, peek, Schema, Schemas};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Derives the artifacts for an array reference property and constructs the
/// table link as a side effect.
pub(crate) fn handle_array(
    prepared_schema: &Schema,
    logical_name: &str,
    schemas: &mut Schemas,
    ctx: &ResolutionContext,
    model_schema: &Schema,
    registry: &mut dyn ModelRegistry,
) -> ModelResult<PropertyArtifacts> {
    let items = prepared_schema.get("items").ok_or_else(|| {
        ModelError::MalformedRelationship(
            "An array reference must define the items schema.".to_string(),
        )
    })?;
    let artifacts = object_ref::gather(items, logical_name, schemas, ctx)?;

    // Scalar cardinality makes no sense on a to-many relationship
    if artifacts.relationship.uselist == Some(false) {
        return Err(ModelError::MalformedRelationship(
            "x-uselist false is not supported for to-many relationships.".to_string(),
        ));
    }

    construct(&artifacts, model_schema, schemas, ctx, registry)?;

    let record = RelationshipRecord {
        logical_name: logical_name.to_string(),
        relationship: artifacts.relationship,
    };
    Ok(PropertyArtifacts::Relationship {
        record,
        foreign_key: None,
    })
}

/// Constructs the link between the tables for a to-many relationship.
///
/// # Arguments
///
/// * `artifacts` - The object reference artifacts for the array items.
/// * `model_schema` - The prepared schema of the owning model.
/// * `schemas` - All defined schemas; mutated for one-to-many links.
/// * `ctx` - The resolution context.
/// * `registry` - The table registry mutated for many-to-many links.
pub fn construct(
    artifacts: &ObjectArtifacts,
    model_schema: &Schema,
    schemas: &mut Schemas,
    ctx: &ResolutionContext,
    registry: &mut dyn ModelRegistry,
) -> ModelResult<()> {
    match artifacts.relationship.secondary.as_deref() {
        None => set_foreign_key(artifacts, model_schema, schemas, ctx),
        Some(secondary) => {
            if registry.association(secondary).is_some() {
                debug!(secondary, "reusing registered association table");
                return Ok(());
            }
            let table =
                construct_association_table(model_schema, &artifacts.spec, schemas, ctx, secondary)?;
            debug!(secondary, "registering association table");
            registry.set_association(table);
            Ok(())
        }
    }
}

/// Adds a foreign key property to the referenced schema pointing back at the
/// owning table.
///
/// Re-injection with an identical foreign key is a no-op; a conflicting one
/// is rejected.
fn set_foreign_key(
    artifacts: &ObjectArtifacts,
    model_schema: &Schema,
    schemas: &mut Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<()> {
    let ref_model_name = &artifacts.relationship.model_name;
    let fk_column = &artifacts.fk_column;

    let tablename = peek::tablename(model_schema, schemas, ctx)?.ok_or_else(|| {
        ModelError::MalformedRelationship(
            "The owning model schema is missing a table name extension.".to_string(),
        )
    })?;
    let properties = model_schema
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            ModelError::MalformedRelationship(
                "The owning model schema does not have any properties.".to_string(),
            )
        })?;
    let fk_property = properties.get(fk_column).ok_or_else(|| {
        ModelError::MalformedRelationship(format!(
            "Unable to find the {} property on the owning model schema.",
            fk_column
        ))
    })?;
    let fk_prepared = schema::prepare_deep(fk_property, schemas, ctx)?;

    let fk_logical_name = format!("{}_{}", tablename, fk_column);
    let fk_target = format!("{}.{}", tablename, fk_column);
    let fk_schema = build_foreign_key_schema(&fk_prepared, &fk_target);

    let child_schema = schemas.get(ref_model_name).cloned().ok_or_else(|| {
        ModelError::SchemaNotFound(format!("{} was not found in schemas.", ref_model_name))
    })?;
    let child_prepared = schema::prepare_deep(&child_schema, schemas, ctx)?;
    if let Some(existing) = child_prepared
        .get("properties")
        .and_then(Value::as_object)
        .and_then(|properties| properties.get(&fk_logical_name))
    {
        let existing_target = existing.get("x-foreign-key").and_then(Value::as_str);
        if existing_target == Some(fk_target.as_str()) {
            debug!(
                model = %ref_model_name,
                column = %fk_logical_name,
                "foreign key already defined"
            );
            return Ok(());
        }
        return Err(ModelError::MalformedRelationship(format!(
            "The {} property on {} is already defined with a different foreign key.",
            fk_logical_name, ref_model_name
        )));
    }

    debug!(
        model = %ref_model_name,
        column = %fk_logical_name,
        target = %fk_target,
        "adding foreign key for one-to-many relationship"
    );
    let mut fk_properties = Map::new();
    fk_properties.insert(fk_logical_name, fk_schema);
    let wrapped = json!({
        "allOf": [
            child_schema,
            {"type": "object", "properties": fk_properties},
        ]
    });
    schemas.insert(ref_model_name.clone(), wrapped);
    Ok(())
}

/// Builds an association table with foreign keys to the parent and child
/// primary keys.
fn construct_association_table(
    parent_schema: &Schema,
    child_schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
    tablename: &str,
) -> ModelResult<AssociationTable> {
    let parent = primary_key_column(parent_schema, schemas, ctx)?;
    let child = primary_key_column(child_schema, schemas, ctx)?;
    Ok(AssociationTable {
        name: tablename.to_string(),
        columns: vec![parent, child],
    })
}

/// Finds the primary key of a schema and derives the matching foreign key
/// column for the association table.
fn primary_key_column(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<ColumnRecord> {
    let tablename = peek::tablename(schema, schemas, ctx)?.ok_or_else(|| {
        ModelError::MalformedRelationship(
            "A table linked through an association requires a table name extension."
                .to_string(),
        )
    })?;
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            ModelError::MalformedSchema(format!(
                "The schema for table {} does not have any properties.",
                tablename
            ))
        })?;

    for (name, property) in properties {
        let prepared = schema::prepare(property, schemas, ctx, None)?;
        if peek::primary_key(&prepared, schemas, ctx)? != Some(true) {
            continue;
        }
        let fk_target = format!("{}.{}", tablename, name);
        let mut fk_schema = build_foreign_key_schema(&prepared, &fk_target);
        if let Some(map) = fk_schema.as_object_mut() {
            map.insert("x-primary-key".to_string(), Value::Bool(true));
            map.insert("nullable".to_string(), Value::Bool(false));
        }
        return column::handle_column(&fk_schema, &format!("{}_{}", tablename, name), None);
    }

    Err(ModelError::MalformedSchema(format!(
        "The schema for table {} does not define a primary key.",
        tablename
    )))
}

/// Copies the type shape of a column schema and points it at `fk_target`.
fn build_foreign_key_schema(prepared: &Schema, fk_target: &str) -> Value {
    let mut fk_schema = Map::new();
    for key in ["type", "format", "maxLength"] {
        if let Some(value) = prepared.get(key) {
            fk_schema.insert(key.to_string(), value.clone());
        }
    }
    fk_schema.insert(
        "x-foreign-key".to_string(),
        Value::String(fk_target.to_string()),
    );
    Value::Object(fk_schema)
}
