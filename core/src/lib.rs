#![deny(missing_docs)]

//! # Modelgen Core
//!
//! Translates OpenAPI/JSON-Schema object definitions into a fully resolved,
//! de-referenced, merged schema graph and derives artifact records describing
//! how each schema property maps to a relational column, a foreign key or a
//! relationship between entities.
//!
//! The artifact records are the produced interface; source code emission and
//! live database construction are consumers of this crate and live elsewhere.

/// Shared error types.
pub mod error;

/// `$ref` resolution, local and cross-document.
pub mod resolver;

/// Schema representation, typed key access, `allOf` merging and
/// normalization.
pub mod schema;

/// Column and relationship artifact derivation.
pub mod artifacts;

/// Composite unique constraint and index parsing.
pub mod table_args;

/// Per-model artifact assembly and the document-level generation entry point.
pub mod model;

pub use artifacts::{
    AssociationTable, ColumnArtifacts, ColumnRecord, ColumnType, DatabaseType, InMemoryRegistry,
    ModelRegistry, ObjectArtifacts, PropertyArtifacts, Relationship, RelationshipRecord,
};
pub use error::{ModelError, ModelResult};
pub use model::{generate, model_artifacts, GeneratedModels, ModelArtifacts};
pub use resolver::ResolutionContext;
pub use schema::{constructable, inherits, prepare, prepare_deep, Schema, SchemaKind, Schemas};
pub use table_args::{CompositeIndex, UniqueConstraint};
