#![deny(missing_docs)]

//! # Schema Handling
//!
//! The schema representation plus the normalization and classification
//! operations every schema passes through before interpretation:
//!
//! - **peek**: typed accessors for recognized keys.
//! - **all_of**: `allOf` fragment merging.
//! - [`prepare`] / [`prepare_deep`]: `$ref` resolution + `allOf` merging,
//!   optionally recursive over `properties` and `items`.
//! - [`constructable`] / [`inherits`]: does a schema denote a persisted
//!   entity.

pub mod all_of;
pub mod peek;

use crate::error::{ModelError, ModelResult};
use crate::resolver::{self, ResolutionContext};
use serde_json::Value;

/// A single JSON-Schema fragment.
///
/// Schemas are kept as JSON values; unknown keys are ignored rather than
/// rejected. Key order is preserved by the `preserve_order` parser feature.
pub type Schema = Value;

/// All named schemas resolvable by reference: the resolution universe for a
/// generation pass.
pub type Schemas = serde_json::Map<String, Value>;

/// Structural classification of a schema, used at dispatch points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// The schema is a `$ref` to another schema.
    Ref,
    /// The schema composes fragments with `allOf`.
    AllOf,
    /// An object schema.
    Object,
    /// An array schema.
    Array,
    /// Anything else: a scalar column schema.
    Scalar,
}

/// Classifies a schema by its top-level structure.
pub fn kind(schema: &Schema) -> SchemaKind {
    if schema.get("$ref").is_some() {
        return SchemaKind::Ref;
    }
    if schema.get("allOf").is_some() {
        return SchemaKind::AllOf;
    }
    match schema.get("type").and_then(Value::as_str) {
        Some("object") => SchemaKind::Object,
        Some("array") => SchemaKind::Array,
        _ => SchemaKind::Scalar,
    }
}

/// Checks whether a schema denotes a real persisted entity.
///
/// The rules are:
/// 1. a bare local `$ref` is not constructable,
/// 2. an `allOf` with fewer than 2 fragments is just a wrapped reference, and
/// 3. the resolved schema must carry a table name or an inheritance marker.
pub fn constructable(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<bool> {
    // Check for reference only models
    if let Some(ref_value) = schema.get("$ref") {
        let ref_str = ref_value.as_str().ok_or_else(|| {
            ModelError::MalformedSchema("The value of $ref must be a string.".to_string())
        })?;
        if ref_str.starts_with('#') {
            return Ok(false);
        }
    }
    // Check for single item allOf
    if let Some(all_of) = schema.get("allOf") {
        let fragments = all_of.as_array().ok_or_else(|| {
            ModelError::MalformedSchema("The value of allOf must be a list.".to_string())
        })?;
        if fragments.len() < 2 {
            return Ok(false);
        }
    }
    // Check for tablename
    if peek::tablename(schema, schemas, ctx)?.is_some() {
        return Ok(true);
    }
    // Check for inherits
    Ok(inherits(schema, schemas, ctx)? == Some(true))
}

/// Checks whether a schema inherits.
///
/// `None` when the marker is absent; `Some(true)` for the literal `true` or
/// any string (the parent name, possibly empty); `Some(false)` for the
/// literal `false`.
pub fn inherits(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Option<bool>> {
    match peek::inherits(schema, schemas, ctx)? {
        None => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(value)),
        Some(_) => Ok(Some(true)),
    }
}

/// Resolves `$ref` and merges `allOf`.
///
/// The two-step canonicalization every schema must pass through before
/// interpretation.
pub fn prepare(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
    skip_name: Option<&str>,
) -> ModelResult<Schema> {
    let (_, resolved) = resolver::resolve("", schema, schemas, ctx, skip_name)?;
    all_of::merge(&resolved, schemas, ctx, skip_name)
}

/// Resolves `$ref` and merges `allOf` including for object properties and
/// items.
///
/// Assumes the schema is valid and acyclic; a schema that references itself
/// through `properties` or `items` recurses without bound.
pub fn prepare_deep(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Schema> {
    let mut prepared = prepare(schema, schemas, ctx, None)?;

    // Resolve $ref in any properties
    if let Some(properties) = prepared.get_mut("properties").and_then(Value::as_object_mut) {
        let names: Vec<String> = properties.keys().cloned().collect();
        for name in names {
            let current = properties.get(&name).cloned().unwrap_or(Value::Null);
            let deep = prepare_deep(&current, schemas, ctx)?;
            properties.insert(name, deep);
        }
    }

    // Resolve $ref of any items
    if let Some(items) = prepared.get_mut("items") {
        let deep = prepare_deep(&items.clone(), schemas, ctx)?;
        *items = deep;
    }

    Ok(prepared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schemas_from(value: Value) -> Schemas {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(kind(&json!({"$ref": "#/x"})), SchemaKind::Ref);
        assert_eq!(kind(&json!({"allOf": []})), SchemaKind::AllOf);
        assert_eq!(kind(&json!({"type": "object"})), SchemaKind::Object);
        assert_eq!(kind(&json!({"type": "array"})), SchemaKind::Array);
        assert_eq!(kind(&json!({"type": "integer"})), SchemaKind::Scalar);
        assert_eq!(kind(&json!({})), SchemaKind::Scalar);
    }

    #[test]
    fn test_constructable_matrix() {
        let ctx = ResolutionContext::new();
        let cases: Vec<(Value, Schemas, bool)> = vec![
            (json!({}), Schemas::new(), false),
            (json!({"x-tablename": "table 1"}), Schemas::new(), true),
            (json!({"x-inherits": "Schema1"}), Schemas::new(), true),
            (json!({"x-inherits": true}), Schemas::new(), true),
            (json!({"x-inherits": false}), Schemas::new(), false),
            (
                json!({"$ref": "#/components/schemas/Schema1"}),
                schemas_from(json!({"Schema1": {"x-tablename": "table 1"}})),
                false,
            ),
            (json!({"allOf": []}), Schemas::new(), false),
            (
                json!({"allOf": [{"$ref": "#/components/schemas/Schema1"}]}),
                schemas_from(json!({"Schema1": {"x-tablename": "table 1"}})),
                false,
            ),
            (
                json!({"allOf": [
                    {"$ref": "#/components/schemas/Schema1"},
                    {"key": "value"},
                ]}),
                schemas_from(json!({"Schema1": {"x-tablename": "table 1"}})),
                true,
            ),
        ];

        for (schema, schemas, expected) in cases {
            let result = constructable(&schema, &schemas, &ctx).unwrap();
            assert_eq!(result, expected, "schema: {}", schema);
        }
    }

    #[test]
    fn test_constructable_remote() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("remote.json"),
            r#"{"Table": {"x-tablename": "table 1"}}"#,
        )
        .unwrap();
        let ctx = ResolutionContext::with_spec_path(dir.path().join("original.json"));
        let schema = json!({"$ref": "remote.json#/Table"});

        let result = constructable(&schema, &Schemas::new(), &ctx).unwrap();

        assert!(result);
    }

    #[test]
    fn test_inherits_matrix() {
        let ctx = ResolutionContext::new();
        let cases: Vec<(Value, Option<bool>)> = vec![
            (json!({}), None),
            (json!({"x-inherits": true}), Some(true)),
            (json!({"x-inherits": false}), Some(false)),
            (json!({"x-inherits": ""}), Some(true)),
            (json!({"x-inherits": "Parent"}), Some(true)),
        ];

        for (schema, expected) in cases {
            let result = inherits(&schema, &Schemas::new(), &ctx).unwrap();
            assert_eq!(result, expected, "schema: {}", schema);
        }
    }

    #[test]
    fn test_prepare_variants() {
        let ctx = ResolutionContext::new();
        let cases: Vec<(Value, Schemas)> = vec![
            (json!({"key": "value"}), Schemas::new()),
            (
                json!({"$ref": "#/components/schemas/RefSchema"}),
                schemas_from(json!({"RefSchema": {"key": "value"}})),
            ),
            (json!({"allOf": [{"key": "value"}]}), Schemas::new()),
            (
                json!({"$ref": "#/components/schemas/RefSchema"}),
                schemas_from(json!({"RefSchema": {"allOf": [{"key": "value"}]}})),
            ),
            (
                json!({"allOf": [{"$ref": "#/components/schemas/RefSchema"}]}),
                schemas_from(json!({"RefSchema": {"allOf": [{"key": "value"}]}})),
            ),
        ];

        for (schema, schemas) in cases {
            let prepared = prepare(&schema, &schemas, &ctx, None).unwrap();
            assert_eq!(prepared, json!({"key": "value"}), "schema: {}", schema);
        }
    }

    #[test]
    fn test_prepare_skip() {
        let ctx = ResolutionContext::new();
        let schemas = schemas_from(json!({"RefSchema": {"key": "value"}}));

        let via_ref = prepare(
            &json!({"$ref": "#/components/schemas/RefSchema"}),
            &schemas,
            &ctx,
            Some("RefSchema"),
        )
        .unwrap();
        let via_all_of = prepare(
            &json!({"allOf": [{"$ref": "#/components/schemas/RefSchema"}]}),
            &schemas,
            &ctx,
            Some("RefSchema"),
        )
        .unwrap();

        assert_eq!(via_ref, json!({}));
        assert_eq!(via_all_of, json!({}));
    }

    #[test]
    fn test_prepare_idempotent() {
        // A schema without $ref/allOf is a fixed point of prepare
        let ctx = ResolutionContext::new();
        let schema = json!({"$ref": "#/components/schemas/RefSchema"});
        let schemas = schemas_from(json!({
            "RefSchema": {"allOf": [{"type": "object", "properties": {"id": {"type": "integer"}}}]}
        }));

        let once = prepare(&schema, &schemas, &ctx, None).unwrap();
        let twice = prepare(&once, &schemas, &ctx, None).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_prepare_deep_properties_and_items() {
        let ctx = ResolutionContext::new();
        let schemas = schemas_from(json!({
            "RefSchema1": {"key_1": "value 1"},
            "RefSchema2": {"key_2": "value 2"},
        }));

        let properties = prepare_deep(
            &json!({"properties": {
                "key_1": {"$ref": "#/components/schemas/RefSchema1"},
                "key_2": {"$ref": "#/components/schemas/RefSchema2"},
            }}),
            &schemas,
            &ctx,
        )
        .unwrap();
        assert_eq!(
            properties,
            json!({"properties": {
                "key_1": {"key_1": "value 1"},
                "key_2": {"key_2": "value 2"},
            }})
        );

        let items = prepare_deep(
            &json!({"items": {"$ref": "#/components/schemas/RefSchema1"}}),
            &schemas,
            &ctx,
        )
        .unwrap();
        assert_eq!(items, json!({"items": {"key_1": "value 1"}}));
    }
}
