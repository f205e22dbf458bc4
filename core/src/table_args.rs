#![deny(missing_docs)]

//! # Composite Table Arguments
//!
//! Parses the `x-composite-unique` and `x-composite-index` extensions. Both
//! accept four input shapes: a column list, a list of column lists, a single
//! constraint/index object, or a list of objects. All shapes normalize to
//! lists of [`UniqueConstraint`] / [`CompositeIndex`] records.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A unique constraint over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UniqueConstraint {
    /// The constrained columns.
    pub columns: Vec<String>,
    /// Optional constraint name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A composite index over one or more column expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositeIndex {
    /// The indexed column expressions.
    pub expressions: Vec<String>,
    /// Optional index name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the index enforces uniqueness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
}

/// Normalizes an `x-composite-unique` value to a list of constraints.
pub fn unique_constraints(value: &Value) -> ModelResult<Vec<UniqueConstraint>> {
    if let Some(columns) = string_list(value) {
        return Ok(vec![UniqueConstraint {
            columns,
            name: None,
        }]);
    }
    if let Some(lists) = string_list_list(value) {
        return Ok(lists
            .into_iter()
            .map(|columns| UniqueConstraint {
                columns,
                name: None,
            })
            .collect());
    }
    if value.is_object() {
        let constraint: UniqueConstraint =
            serde_json::from_value(value.clone()).map_err(mismatch("x-composite-unique"))?;
        return Ok(vec![constraint]);
    }
    if value.is_array() {
        let constraints: Vec<UniqueConstraint> =
            serde_json::from_value(value.clone()).map_err(mismatch("x-composite-unique"))?;
        return Ok(constraints);
    }
    Err(ModelError::MalformedSchema(
        "The x-composite-unique property did not match any of the supported forms.".to_string(),
    ))
}

/// Normalizes an `x-composite-index` value to a list of indexes.
pub fn composite_indexes(value: &Value) -> ModelResult<Vec<CompositeIndex>> {
    if let Some(expressions) = string_list(value) {
        return Ok(vec![CompositeIndex {
            expressions,
            name: None,
            unique: None,
        }]);
    }
    if let Some(lists) = string_list_list(value) {
        return Ok(lists
            .into_iter()
            .map(|expressions| CompositeIndex {
                expressions,
                name: None,
                unique: None,
            })
            .collect());
    }
    if value.is_object() {
        let index: CompositeIndex =
            serde_json::from_value(value.clone()).map_err(mismatch("x-composite-index"))?;
        return Ok(vec![index]);
    }
    if value.is_array() {
        let indexes: Vec<CompositeIndex> =
            serde_json::from_value(value.clone()).map_err(mismatch("x-composite-index"))?;
        return Ok(indexes);
    }
    Err(ModelError::MalformedSchema(
        "The x-composite-index property did not match any of the supported forms.".to_string(),
    ))
}

fn mismatch(key: &str) -> impl FnOnce(serde_json::Error) -> ModelError + '_ {
    move |error| {
        ModelError::MalformedSchema(format!(
            "The {} property did not match any of the supported forms: {}",
            key, error
        ))
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

fn string_list_list(value: &Value) -> Option<Vec<Vec<String>>> {
    let items = value.as_array()?;
    items.iter().map(string_list).collect()
}
