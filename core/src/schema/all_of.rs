#![deny(missing_docs)]

//! # allOf Merging
//!
//! Merges an ordered `allOf` fragment list into one effective schema. Each
//! fragment is resolved first, so fragments may be `$ref`s or contain nested
//! `allOf` lists themselves.
//!
//! Merge policy: later fragments override earlier ones for scalar keys;
//! `properties` maps are merged key by key with the later fragment winning on
//! collision; `required` lists are unioned.

use crate::error::{ModelError, ModelResult};
use crate::resolver::{self, ResolutionContext};
use crate::schema::{Schema, Schemas};
use serde_json::{Map, Value};

/// Merges the `allOf` list of a schema into a single schema.
///
/// Returns the schema unchanged when it has no `allOf` key. Sibling keys next
/// to `allOf` are not merged; the composition replaces the wrapper.
///
/// # Arguments
///
/// * `schema` - The schema to merge.
/// * `schemas` - All defined schemas, used to resolve `$ref` fragments.
/// * `ctx` - The resolution context for remote references.
/// * `skip_name` - Schema name excluded from resolution (inheritance chains).
pub fn merge(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
    skip_name: Option<&str>,
) -> ModelResult<Schema> {
    let Some(all_of_value) = schema.get("allOf") else {
        return Ok(schema.clone());
    };
    let fragments = all_of_value.as_array().ok_or_else(|| {
        ModelError::MalformedSchema("The value of allOf must be a list.".to_string())
    })?;

    let mut merged: Map<String, Value> = Map::new();
    for fragment in fragments {
        let (_, resolved) = resolver::resolve("", fragment, schemas, ctx, skip_name)?;
        let flattened = merge(&resolved, schemas, ctx, skip_name)?;
        let Some(object) = flattened.as_object() else {
            continue;
        };
        for (key, value) in object {
            match key.as_str() {
                "properties" => merge_properties(&mut merged, value),
                "required" => merge_required(&mut merged, value),
                _ => {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
    }

    Ok(Value::Object(merged))
}

fn merge_properties(merged: &mut Map<String, Value>, value: &Value) {
    let Some(source) = value.as_object() else {
        merged.insert("properties".to_string(), value.clone());
        return;
    };
    let target = merged
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(target_map) = target.as_object_mut() {
        for (name, property) in source {
            target_map.insert(name.clone(), property.clone());
        }
    }
}

fn merge_required(merged: &mut Map<String, Value>, value: &Value) {
    let Some(source) = value.as_array() else {
        merged.insert("required".to_string(), value.clone());
        return;
    };
    let target = merged
        .entry("required")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Some(target_list) = target.as_array_mut() {
        for entry in source {
            if !target_list.contains(entry) {
                target_list.push(entry.clone());
            }
        }
    }
}
