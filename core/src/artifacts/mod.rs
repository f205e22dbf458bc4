#![deny(missing_docs)]

//! # Artifact Records
//!
//! Normalized, fully-resolved records describing how each schema property maps
//! to a relational column, a foreign key or a relationship between entities.
//! These records are the produced interface of the engine; code generation
//! consumes them and is out of scope here.
//!
//! - **column**: scalar property schema -> [`ColumnArtifacts`] + database type.
//! - **object_ref**: `$ref`/`allOf` property schema -> [`ObjectArtifacts`].
//! - **array_ref**: to-many relationships -> foreign key or association table.

pub mod array_ref;
pub mod column;
pub mod object_ref;

use crate::error::{ModelError, ModelResult};
use crate::resolver::ResolutionContext;
use crate::schema::{self, Schema, SchemaKind, Schemas};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The closed set of scalar column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// An integer column.
    Integer,
    /// A floating point column.
    Number,
    /// A string column.
    String,
    /// A boolean column.
    Boolean,
}

impl FromStr for ColumnType {
    type Err = ModelError;

    fn from_str(value: &str) -> ModelResult<Self> {
        match value {
            "integer" => Ok(ColumnType::Integer),
            "number" => Ok(ColumnType::Number),
            "string" => Ok(ColumnType::String),
            "boolean" => Ok(ColumnType::Boolean),
            other => Err(ModelError::FeatureNotImplemented(format!(
                "{} has not been implemented",
                other
            ))),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Number => write!(f, "number"),
            ColumnType::String => write!(f, "string"),
            ColumnType::Boolean => write!(f, "boolean"),
        }
    }
}

/// Fully decided column construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnArtifacts {
    /// The scalar type of the column.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// The format qualifier, if any.
    pub format: Option<String>,
    /// The maximum length for string columns, if any.
    pub max_length: Option<u64>,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether the column is part of the primary key.
    pub primary_key: Option<bool>,
    /// Whether the column value is database generated.
    pub autoincrement: Option<bool>,
    /// Whether the column is indexed.
    pub index: Option<bool>,
    /// Whether the column carries a unique constraint.
    pub unique: Option<bool>,
    /// Foreign key target as `<table>.<column>`, if any.
    pub foreign_key: Option<String>,
}

/// The resolved database type for a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DatabaseType {
    /// 32 bit integer.
    Integer,
    /// 64 bit integer.
    BigInteger,
    /// Floating point number.
    Float,
    /// Variable length text with an optional bound.
    Text(Option<u64>),
    /// Binary blob with an optional bound.
    Binary(Option<u64>),
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Boolean.
    Boolean,
}

/// Relationship parameters between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    /// The name of the referenced model.
    pub model_name: String,
    /// The reverse navigation attribute created on the referenced entity.
    pub back_reference: Option<String>,
    /// The association table name for many-to-many relationships.
    pub secondary: Option<String>,
    /// Cardinality flag: `false` marks a one-to-one relationship.
    pub uselist: Option<bool>,
}

/// Artifacts gathered from a property referencing another entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectArtifacts {
    /// The resolved target schema.
    pub spec: Schema,
    /// The name of the property on the referencing model.
    pub logical_name: String,
    /// The referenced column used for the foreign key.
    pub fk_column: String,
    /// The relationship parameters.
    pub relationship: Relationship,
    /// Explicit nullability, if declared at the usage site or on the target.
    pub nullable: Option<bool>,
}

/// A fully decided column on a model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnRecord {
    /// The property name the column was derived from.
    pub logical_name: String,
    /// The column construction parameters.
    pub artifacts: ColumnArtifacts,
    /// The resolved database type.
    pub database_type: DatabaseType,
    /// The recorded (de-referenced) property schema.
    pub schema: Schema,
}

/// A relationship attached to a model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipRecord {
    /// The property name the relationship was derived from.
    pub logical_name: String,
    /// The relationship parameters.
    pub relationship: Relationship,
}

/// An association table implementing a many-to-many relationship.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationTable {
    /// The table name.
    pub name: String,
    /// The two foreign key columns to the parent and child primary keys.
    pub columns: Vec<ColumnRecord>,
}

/// The artifacts derived from one property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyArtifacts {
    /// A scalar column.
    Column(ColumnRecord),
    /// A relationship, optionally with a foreign key column on the owning
    /// model (object references) or with table mutations applied through the
    /// registry (array references).
    Relationship {
        /// The relationship record.
        record: RelationshipRecord,
        /// Foreign key column to add to the owning model, if any.
        foreign_key: Option<ColumnRecord>,
    },
}

/// Facade over the table registry mutated during artifact derivation.
///
/// Association tables are registered by name so later references to the same
/// `x-secondary` reuse the table instead of duplicating it.
pub trait ModelRegistry {
    /// Looks up an association table by name.
    fn association(&self, name: &str) -> Option<&AssociationTable>;
    /// Registers an association table under its name.
    fn set_association(&mut self, table: AssociationTable);
}

/// In-memory registry, sufficient for a single generation pass.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    associations: IndexMap<String, AssociationTable>,
}

impl InMemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the registry, returning the association tables in
    /// registration order.
    pub fn into_associations(self) -> Vec<AssociationTable> {
        self.associations.into_values().collect()
    }
}

impl ModelRegistry for InMemoryRegistry {
    fn association(&self, name: &str) -> Option<&AssociationTable> {
        self.associations.get(name)
    }

    fn set_association(&mut self, table: AssociationTable) {
        self.associations.insert(table.name.clone(), table);
    }
}

/// Derives the artifacts for a single model property.
///
/// Scalar schemas become columns; object schemas must reference another
/// entity and become many-to-one/one-to-one relationships with a foreign key
/// on the owning model; array schemas become to-many relationships with the
/// link constructed as a side effect (foreign key on the referenced schema or
/// an association table in the registry).
#[allow(clippy::too_many_arguments)]
pub fn property_artifacts(
    property_schema: &Schema,
    logical_name: &str,
    schemas: &mut Schemas,
    ctx: &ResolutionContext,
    required: Option<bool>,
    model_schema: &Schema,
    registry: &mut dyn ModelRegistry,
) -> ModelResult<PropertyArtifacts> {
    let prepared = schema::prepare(property_schema, schemas, ctx, None)?;
    match schema::kind(&prepared) {
        SchemaKind::Object => {
            object_ref::handle_object(property_schema, logical_name, schemas, ctx, required)
        }
        SchemaKind::Array => array_ref::handle_array(
            &prepared,
            logical_name,
            schemas,
            ctx,
            model_schema,
            registry,
        ),
        SchemaKind::Scalar => column::handle_column(&prepared, logical_name, required)
            .map(PropertyArtifacts::Column),
        // prepare leaves neither $ref nor allOf behind
        SchemaKind::Ref | SchemaKind::AllOf => Err(ModelError::MalformedSchema(format!(
            "The property {} could not be fully resolved.",
            logical_name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_column_type_parse() {
        assert_eq!("integer".parse::<ColumnType>().unwrap(), ColumnType::Integer);
        assert_eq!("boolean".parse::<ColumnType>().unwrap(), ColumnType::Boolean);
        assert!(matches!(
            "unknown".parse::<ColumnType>(),
            Err(ModelError::FeatureNotImplemented(_))
        ));
    }

    #[test]
    fn test_registry_set_and_reuse() {
        let mut registry = InMemoryRegistry::new();
        let table = AssociationTable {
            name: "association".to_string(),
            columns: Vec::new(),
        };

        registry.set_association(table.clone());

        assert_eq!(registry.association("association"), Some(&table));
        assert_eq!(registry.association("other"), None);
        assert_eq!(registry.into_associations(), vec![table]);
    }

    #[test]
    fn test_property_artifacts_scalar_column() {
        let ctx = ResolutionContext::new();
        let mut schemas = Schemas::new();
        let mut registry = InMemoryRegistry::new();
        let model_schema = json!({"x-tablename": "owner", "type": "object", "properties": {}});

        let artifacts = property_artifacts(
            &json!({"type": "integer"}),
            "id",
            &mut schemas,
            &ctx,
            None,
            &model_schema,
            &mut registry,
        )
        .unwrap();

        let PropertyArtifacts::Column(record) = artifacts else {
            panic!("Expected a column");
        };
        assert_eq!(record.logical_name, "id");
        assert_eq!(record.database_type, DatabaseType::Integer);
    }

    #[test]
    fn test_property_artifacts_missing_type() {
        let ctx = ResolutionContext::new();
        let mut schemas = Schemas::new();
        let mut registry = InMemoryRegistry::new();
        let model_schema = json!({"x-tablename": "owner"});

        let result = property_artifacts(
            &json!({}),
            "id",
            &mut schemas,
            &ctx,
            None,
            &model_schema,
            &mut registry,
        );

        assert!(matches!(result, Err(ModelError::MalformedSchema(_))));
    }
}
