#![deny(missing_docs)]

//! # Typed Key Accessors
//!
//! Reads recognized schema keys (`type`, `format`, `nullable`, ... and the
//! `x-` extension keys) through `$ref` and `allOf` indirection, returning
//! typed values. Malformed-value errors are generated here so every caller
//! reports them the same way.

use crate::error::{ModelError, ModelResult};
use crate::resolver::{self, ResolutionContext};
use crate::schema::{Schema, Schemas};
use serde_json::Value;

/// Looks up a key on the schema, following `$ref` and peeking into `allOf`
/// fragments in order (first hit wins).
pub(crate) fn peek_key(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
    key: &str,
) -> ModelResult<Option<Value>> {
    if let Some(value) = schema.get(key) {
        if value.is_null() {
            return Err(ModelError::MalformedSchema(format!(
                "The value of {} cannot be null.",
                key
            )));
        }
        return Ok(Some(value.clone()));
    }

    if let Some(ref_value) = schema.get("$ref") {
        let ref_str = ref_value.as_str().ok_or_else(|| {
            ModelError::MalformedSchema("The value of $ref must be a string.".to_string())
        })?;
        let (_, ref_schema) = resolver::get_ref(ref_str, schemas, ctx)?;
        return peek_key(&ref_schema, schemas, ctx, key);
    }

    if let Some(all_of) = schema.get("allOf") {
        let fragments = all_of.as_array().ok_or_else(|| {
            ModelError::MalformedSchema("The value of allOf must be a list.".to_string())
        })?;
        for fragment in fragments {
            if let Some(value) = peek_key(fragment, schemas, ctx, key)? {
                return Ok(Some(value));
            }
        }
    }

    Ok(None)
}

fn peek_string(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
    key: &str,
) -> ModelResult<Option<String>> {
    match peek_key(schema, schemas, ctx, key)? {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(ModelError::MalformedSchema(format!(
            "A {} value must be of type string.",
            key
        ))),
    }
}

fn peek_bool(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
    key: &str,
) -> ModelResult<Option<bool>> {
    match peek_key(schema, schemas, ctx, key)? {
        None => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(value)),
        Some(_) => Err(ModelError::MalformedSchema(format!(
            "A {} value must be of type boolean.",
            key
        ))),
    }
}

/// The `type` of the schema. Raises when the key is missing or not a string.
pub fn type_(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<String> {
    peek_string(schema, schemas, ctx, "type")?.ok_or_else(|| {
        ModelError::MalformedSchema("Every property requires a type.".to_string())
    })
}

/// The `format` of the schema, if any.
pub fn format_(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Option<String>> {
    peek_string(schema, schemas, ctx, "format")
}

/// The `maxLength` of the schema, if any.
pub fn max_length(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Option<u64>> {
    match peek_key(schema, schemas, ctx, "maxLength")? {
        None => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            ModelError::MalformedSchema(
                "A maxLength value must be of type integer.".to_string(),
            )
        }),
    }
}

/// The `nullable` flag of the schema, if any.
pub fn nullable(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Option<bool>> {
    peek_bool(schema, schemas, ctx, "nullable")
}

/// The `description` of the schema, if any.
pub fn description(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Option<String>> {
    peek_string(schema, schemas, ctx, "description")
}

/// The table name extension, if any.
pub fn tablename(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Option<String>> {
    peek_string(schema, schemas, ctx, "x-tablename")
}

/// The raw inheritance marker: a boolean or a (possibly empty) parent name.
pub fn inherits(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Option<Value>> {
    match peek_key(schema, schemas, ctx, "x-inherits")? {
        None => Ok(None),
        Some(value @ (Value::Bool(_) | Value::String(_))) => Ok(Some(value)),
        Some(_) => Err(ModelError::MalformedSchema(
            "An x-inherits value must be of type boolean or string.".to_string(),
        )),
    }
}

/// The back reference name extension, if any.
pub fn backref(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Option<String>> {
    peek_string(schema, schemas, ctx, "x-backref")
}

/// The association table name extension, if any.
pub fn secondary(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Option<String>> {
    peek_string(schema, schemas, ctx, "x-secondary")
}

/// The cardinality flag extension, if any.
pub fn uselist(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Option<bool>> {
    peek_bool(schema, schemas, ctx, "x-uselist")
}

/// The foreign key column name override extension, if any.
pub fn foreign_key_column(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Option<String>> {
    peek_string(schema, schemas, ctx, "x-foreign-key-column")
}

/// The primary key flag extension, if any.
pub fn primary_key(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Option<bool>> {
    peek_bool(schema, schemas, ctx, "x-primary-key")
}

/// The autoincrement flag extension, if any.
pub fn autoincrement(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Option<bool>> {
    peek_bool(schema, schemas, ctx, "x-autoincrement")
}

/// The index flag extension, if any.
pub fn index(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Option<bool>> {
    peek_bool(schema, schemas, ctx, "x-index")
}

/// The unique flag extension, if any.
pub fn unique(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Option<bool>> {
    peek_bool(schema, schemas, ctx, "x-unique")
}

/// The foreign key target extension, if any. The value must be of the form
/// `<table>.<column>`.
pub fn foreign_key(
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<Option<String>> {
    match peek_string(schema, schemas, ctx, "x-foreign-key")? {
        None => Ok(None),
        Some(value) if value.contains('.') => Ok(Some(value)),
        Some(value) => Err(ModelError::MalformedSchema(format!(
            "An x-foreign-key value must be of the form <table>.<column>, got \"{}\".",
            value
        ))),
    }
}
