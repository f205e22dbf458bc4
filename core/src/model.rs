#![deny(missing_docs)]

//! # Model Factory
//!
//! Assembles the artifacts for one model schema: resolves and merges the
//! schema, walks its properties dispatching each to the column or relationship
//! gatherers, and collects composite table arguments. [`generate`] runs the
//! factory over every constructable schema in a document.

use crate::artifacts::{
    self, AssociationTable, ColumnRecord, InMemoryRegistry, ModelRegistry, PropertyArtifacts,
    RelationshipRecord,
};
use crate::error::{ModelError, ModelResult};
use crate::resolver::{self, ResolutionContext};
use crate::schema::{self, peek, Schema, Schemas};
use crate::table_args::{self, CompositeIndex, UniqueConstraint};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, info};

/// The artifacts assembled for one model, handed to code generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelArtifacts {
    /// The schema name the model was derived from.
    pub name: String,
    /// The table name, absent for single-table inheritance children.
    pub tablename: Option<String>,
    /// The parent schema name when the model inherits.
    pub inherits: Option<String>,
    /// The columns of the table, including derived foreign key columns.
    pub columns: Vec<ColumnRecord>,
    /// The relationships to other models.
    pub relationships: Vec<RelationshipRecord>,
    /// Composite unique constraints.
    pub unique_constraints: Vec<UniqueConstraint>,
    /// Composite indexes.
    pub indexes: Vec<CompositeIndex>,
    /// The recorded (de-referenced) model schema.
    pub schema: Schema,
}

/// The result of a generation pass over a schema document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedModels {
    /// Artifacts for every constructable schema, in document order.
    pub models: Vec<ModelArtifacts>,
    /// Association tables built for many-to-many relationships.
    pub associations: Vec<AssociationTable>,
}

/// Derives artifacts for every constructable schema in the document.
///
/// Schemas are processed in document order. One-to-many relationships inject
/// foreign key columns into the referenced schemas, so referenced schemas
/// appearing after their referrer pick the injected columns up.
pub fn generate(schemas: &mut Schemas, ctx: &ResolutionContext) -> ModelResult<GeneratedModels> {
    let mut registry = InMemoryRegistry::new();
    let names: Vec<String> = schemas.keys().cloned().collect();
    let mut models = Vec::new();

    for name in names {
        let Some(schema) = schemas.get(&name).cloned() else {
            continue;
        };
        if !schema::constructable(&schema, schemas, ctx)? {
            debug!(model = %name, "schema is not constructable, skipping");
            continue;
        }
        info!(model = %name, "deriving model artifacts");
        models.push(model_artifacts(&name, schemas, ctx, &mut registry)?);
    }

    Ok(GeneratedModels {
        models,
        associations: registry.into_associations(),
    })
}

/// Assembles the artifacts for a single named schema.
///
/// # Arguments
///
/// * `name` - The name of the schema to process.
/// * `schemas` - All defined schemas; mutated by one-to-many links.
/// * `ctx` - The resolution context.
/// * `registry` - The table registry for association tables.
pub fn model_artifacts(
    name: &str,
    schemas: &mut Schemas,
    ctx: &ResolutionContext,
    registry: &mut dyn ModelRegistry,
) -> ModelResult<ModelArtifacts> {
    let schema = schemas
        .get(name)
        .cloned()
        .ok_or_else(|| ModelError::SchemaNotFound(format!("{} not found in schemas", name)))?;

    let inherits = schema::inherits(&schema, schemas, ctx)?;
    let (prepared, parent) = if inherits == Some(true) {
        let parent = retrieve_parent(&schema, schemas, ctx)?;
        // De-reference the schema excluding the parent fragment
        let prepared = schema::prepare(&schema, schemas, ctx, Some(&parent))?;
        (prepared, Some(parent))
    } else {
        let prepared = schema::prepare(&schema, schemas, ctx, None)?;
        if prepared.get("x-tablename").is_none() {
            return Err(ModelError::MalformedSchema(format!(
                "\"x-tablename\" is a required schema property for {}.",
                name
            )));
        }
        (prepared, None)
    };

    let type_value = prepared.get("type").and_then(Value::as_str);
    if type_value != Some("object") {
        return Err(ModelError::FeatureNotImplemented(format!(
            "{} is not supported in {}.",
            type_value.unwrap_or("missing type"),
            name
        )));
    }
    let properties = prepared
        .get("properties")
        .and_then(Value::as_object)
        .filter(|properties| !properties.is_empty())
        .cloned()
        .ok_or_else(|| {
            ModelError::MalformedSchema(format!("At least 1 property is required for {}.", name))
        })?;

    let required_value = prepared.get("required").cloned();
    let required_set: HashSet<String> = required_value
        .as_ref()
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let tablename = peek::tablename(&prepared, schemas, ctx)?;

    let mut columns = Vec::new();
    let mut relationships = Vec::new();
    let mut recorded_properties = Map::new();
    for (property_name, property_schema) in &properties {
        let required = required_value
            .as_ref()
            .map(|_| required_set.contains(property_name));
        let derived = artifacts::property_artifacts(
            property_schema,
            property_name,
            schemas,
            ctx,
            required,
            &prepared,
            registry,
        )?;
        match derived {
            PropertyArtifacts::Column(record) => {
                recorded_properties.insert(property_name.clone(), record.schema.clone());
                columns.push(record);
            }
            PropertyArtifacts::Relationship {
                record,
                foreign_key,
            } => {
                if let Some(fk) = foreign_key {
                    recorded_properties.insert(fk.logical_name.clone(), fk.schema.clone());
                    columns.push(fk);
                }
                relationships.push(record);
            }
        }
    }

    let unique_constraints = match peek::peek_key(&prepared, schemas, ctx, "x-composite-unique")? {
        Some(value) => table_args::unique_constraints(&value)?,
        None => Vec::new(),
    };
    let indexes = match peek::peek_key(&prepared, schemas, ctx, "x-composite-index")? {
        Some(value) => table_args::composite_indexes(&value)?,
        None => Vec::new(),
    };

    let mut model_schema = Map::new();
    model_schema.insert("type".to_string(), Value::String("object".to_string()));
    model_schema.insert(
        "properties".to_string(),
        Value::Object(recorded_properties),
    );
    if let Some(required) = required_value {
        model_schema.insert("required".to_string(), required);
    }
    if let Some(description) = peek::description(&prepared, schemas, ctx)? {
        model_schema.insert("description".to_string(), Value::String(description));
    }

    Ok(ModelArtifacts {
        name: name.to_string(),
        tablename,
        inherits: parent,
        columns,
        relationships,
        unique_constraints,
        indexes,
        schema: Value::Object(model_schema),
    })
}

/// Determines the parent schema name for an inheriting schema.
///
/// An `x-inherits` string names the parent directly; the literal `true` (or
/// an empty string) searches the `allOf` references for the first target
/// carrying a table name.
fn retrieve_parent(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<String> {
    if let Some(Value::String(parent)) = peek::inherits(schema, schemas, ctx)? {
        if !parent.is_empty() {
            let parent_schema = schemas.get(&parent).ok_or_else(|| {
                ModelError::SchemaNotFound(format!("{} not found in schemas", parent))
            })?;
            if !schema::constructable(parent_schema, schemas, ctx)? {
                return Err(ModelError::MalformedSchema(format!(
                    "The parent {} is not constructable.",
                    parent
                )));
            }
            return Ok(parent);
        }
    }

    if let Some(fragments) = schema.get("allOf").and_then(Value::as_array) {
        for fragment in fragments {
            if fragment.get("$ref").is_none() {
                continue;
            }
            let (ref_name, ref_schema) = resolver::resolve("", fragment, schemas, ctx, None)?;
            if peek::tablename(&ref_schema, schemas, ctx)?.is_some() {
                return Ok(ref_name);
            }
        }
    }

    Err(ModelError::MalformedSchema(
        "Unable to determine the parent schema for the inheriting schema.".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::DatabaseType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schemas_from(value: Value) -> Schemas {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_model_artifacts_missing_schema() {
        let ctx = ResolutionContext::new();
        let mut schemas = Schemas::new();
        let mut registry = InMemoryRegistry::new();

        let result = model_artifacts("Missing", &mut schemas, &ctx, &mut registry);

        assert!(matches!(result, Err(ModelError::SchemaNotFound(_))));
    }

    #[test]
    fn test_model_artifacts_missing_tablename() {
        let ctx = ResolutionContext::new();
        let mut schemas = schemas_from(json!({
            "Model": {"type": "object", "properties": {"id": {"type": "integer"}}}
        }));
        let mut registry = InMemoryRegistry::new();

        let result = model_artifacts("Model", &mut schemas, &ctx, &mut registry);

        assert!(matches!(result, Err(ModelError::MalformedSchema(_))));
    }

    #[test]
    fn test_model_artifacts_not_object() {
        let ctx = ResolutionContext::new();
        let mut schemas = schemas_from(json!({
            "Model": {"type": "string", "x-tablename": "model"}
        }));
        let mut registry = InMemoryRegistry::new();

        let result = model_artifacts("Model", &mut schemas, &ctx, &mut registry);

        assert!(matches!(
            result,
            Err(ModelError::FeatureNotImplemented(_))
        ));
    }

    #[test]
    fn test_model_artifacts_no_properties() {
        let ctx = ResolutionContext::new();
        let mut schemas = schemas_from(json!({
            "Model": {"type": "object", "x-tablename": "model"}
        }));
        let mut registry = InMemoryRegistry::new();

        let result = model_artifacts("Model", &mut schemas, &ctx, &mut registry);

        assert!(matches!(result, Err(ModelError::MalformedSchema(_))));
    }

    #[test]
    fn test_model_artifacts_columns_and_required() {
        let ctx = ResolutionContext::new();
        let mut schemas = schemas_from(json!({
            "Model": {
                "type": "object",
                "x-tablename": "model",
                "required": ["id"],
                "properties": {
                    "id": {"type": "integer", "format": "int64", "x-primary-key": true},
                    "name": {"type": "string", "maxLength": 50},
                },
            }
        }));
        let mut registry = InMemoryRegistry::new();

        let model = model_artifacts("Model", &mut schemas, &ctx, &mut registry).unwrap();

        assert_eq!(model.name, "Model");
        assert_eq!(model.tablename.as_deref(), Some("model"));
        assert_eq!(model.columns.len(), 2);
        assert_eq!(model.columns[0].database_type, DatabaseType::BigInteger);
        assert!(!model.columns[0].artifacts.nullable);
        assert_eq!(model.columns[1].database_type, DatabaseType::Text(Some(50)));
        assert!(model.columns[1].artifacts.nullable);
        assert_eq!(model.schema["required"], json!(["id"]));
    }

    #[test]
    fn test_model_artifacts_object_reference() {
        let ctx = ResolutionContext::new();
        let mut schemas = schemas_from(json!({
            "Division": {
                "type": "object",
                "x-tablename": "division",
                "properties": {"id": {"type": "integer", "x-primary-key": true}},
            },
            "Employee": {
                "type": "object",
                "x-tablename": "employee",
                "properties": {
                    "id": {"type": "integer", "x-primary-key": true},
                    "division": {"$ref": "#/components/schemas/Division"},
                },
            },
        }));
        let mut registry = InMemoryRegistry::new();

        let model = model_artifacts("Employee", &mut schemas, &ctx, &mut registry).unwrap();

        assert_eq!(model.relationships.len(), 1);
        assert_eq!(model.relationships[0].relationship.model_name, "Division");
        let fk = model
            .columns
            .iter()
            .find(|column| column.logical_name == "division_id")
            .expect("missing foreign key column");
        assert_eq!(fk.artifacts.foreign_key.as_deref(), Some("division.id"));
    }

    #[test]
    fn test_model_artifacts_composite_table_args() {
        let ctx = ResolutionContext::new();
        let mut schemas = schemas_from(json!({
            "Model": {
                "type": "object",
                "x-tablename": "model",
                "x-composite-unique": ["id", "name"],
                "x-composite-index": {"expressions": ["name"], "unique": true},
                "properties": {
                    "id": {"type": "integer"},
                    "name": {"type": "string"},
                },
            }
        }));
        let mut registry = InMemoryRegistry::new();

        let model = model_artifacts("Model", &mut schemas, &ctx, &mut registry).unwrap();

        assert_eq!(model.unique_constraints.len(), 1);
        assert_eq!(
            model.unique_constraints[0].columns,
            vec!["id".to_string(), "name".to_string()]
        );
        assert_eq!(model.indexes.len(), 1);
        assert_eq!(model.indexes[0].unique, Some(true));
    }

    #[test]
    fn test_model_artifacts_joined_inheritance() {
        let ctx = ResolutionContext::new();
        let mut schemas = schemas_from(json!({
            "Employee": {
                "type": "object",
                "x-tablename": "employee",
                "properties": {"id": {"type": "integer", "x-primary-key": true}},
            },
            "Manager": {
                "allOf": [
                    {"$ref": "#/components/schemas/Employee"},
                    {
                        "type": "object",
                        "x-inherits": "Employee",
                        "x-tablename": "manager",
                        "properties": {
                            "manager_data": {"type": "string"},
                        },
                    },
                ]
            },
        }));
        let mut registry = InMemoryRegistry::new();

        let model = model_artifacts("Manager", &mut schemas, &ctx, &mut registry).unwrap();

        assert_eq!(model.inherits.as_deref(), Some("Employee"));
        assert_eq!(model.tablename.as_deref(), Some("manager"));
        // The parent fragment is excluded: only the model's own properties
        assert_eq!(model.columns.len(), 1);
        assert_eq!(model.columns[0].logical_name, "manager_data");
    }

    #[test]
    fn test_model_artifacts_inherits_true_finds_parent() {
        let ctx = ResolutionContext::new();
        let mut schemas = schemas_from(json!({
            "Employee": {
                "type": "object",
                "x-tablename": "employee",
                "properties": {"id": {"type": "integer", "x-primary-key": true}},
            },
            "Manager": {
                "allOf": [
                    {"$ref": "#/components/schemas/Employee"},
                    {
                        "type": "object",
                        "x-inherits": true,
                        "properties": {
                            "manager_data": {"type": "string"},
                        },
                    },
                ]
            },
        }));
        let mut registry = InMemoryRegistry::new();

        let model = model_artifacts("Manager", &mut schemas, &ctx, &mut registry).unwrap();

        assert_eq!(model.inherits.as_deref(), Some("Employee"));
        // Single-table inheritance: no own tablename
        assert_eq!(model.tablename, None);
    }

    #[test]
    fn test_retrieve_parent_not_constructable() {
        let ctx = ResolutionContext::new();
        let schemas = schemas_from(json!({
            "Parent": {"type": "object"},
            "Child": {"x-inherits": "Parent"},
        }));

        let result = retrieve_parent(
            schemas.get("Child").unwrap(),
            &schemas,
            &ctx,
        );

        assert!(matches!(result, Err(ModelError::MalformedSchema(_))));
    }

    #[test]
    fn test_generate_document_order_and_associations() {
        let ctx = ResolutionContext::new();
        let mut schemas = schemas_from(json!({
            "Employee": {
                "type": "object",
                "x-tablename": "employee",
                "properties": {
                    "id": {"type": "integer", "x-primary-key": true},
                    "projects": {
                        "type": "array",
                        "items": {"allOf": [
                            {"$ref": "#/components/schemas/Project"},
                            {"x-secondary": "employee_project"},
                        ]},
                    },
                },
            },
            "Project": {
                "type": "object",
                "x-tablename": "project",
                "properties": {"id": {"type": "integer", "x-primary-key": true}},
            },
            "Fragment": {"type": "object"},
        }));

        let generated = generate(&mut schemas, &ctx).unwrap();

        let names: Vec<&str> = generated
            .models
            .iter()
            .map(|model| model.name.as_str())
            .collect();
        assert_eq!(names, vec!["Employee", "Project"]);
        assert_eq!(generated.associations.len(), 1);
        assert_eq!(generated.associations[0].name, "employee_project");
    }

    #[test]
    fn test_generate_one_to_many_injects_child_column() {
        let ctx = ResolutionContext::new();
        let mut schemas = schemas_from(json!({
            "Division": {
                "type": "object",
                "x-tablename": "division",
                "properties": {
                    "id": {"type": "integer", "x-primary-key": true},
                    "employees": {
                        "type": "array",
                        "items": {"$ref": "#/components/schemas/Employee"},
                    },
                },
            },
            "Employee": {
                "type": "object",
                "x-tablename": "employee",
                "properties": {"id": {"type": "integer", "x-primary-key": true}},
            },
        }));

        let generated = generate(&mut schemas, &ctx).unwrap();

        let employee = generated
            .models
            .iter()
            .find(|model| model.name == "Employee")
            .expect("Employee model missing");
        let fk = employee
            .columns
            .iter()
            .find(|column| column.logical_name == "division_id")
            .expect("injected foreign key missing");
        assert_eq!(fk.artifacts.foreign_key.as_deref(), Some("division.id"));
    }
}
