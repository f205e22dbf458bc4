#![deny(missing_docs)]

//! # Remote Reference Loading
//!
//! Cross-document references have the form `<relative-path>#/<Pointer>`. The
//! file path is resolved against the directory of the context document,
//! normalized, and used both to read the document and as the cache key.
//!
//! Any `$ref` found inside a remotely loaded schema is rewritten to carry the
//! remote document's context forward, so later resolution steps keep resolving
//! relative to the correct file. Three cases:
//!
//! 1. The `$ref` starts with `#`: the current context is prepended.
//! 2. The `$ref` is a bare filename: the directory of the current context is
//!    prepended.
//! 3. The `$ref` has its own relative path: the directories are merged and the
//!    result normalized.

use crate::error::{ModelError, ModelResult};
use crate::resolver::ResolutionContext;
use crate::schema::Schema;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::fs;
use std::path::{Component, Path};
use tracing::debug;

/// Resolves a cross-document reference to a name and schema.
///
/// The fragment is interpreted as a JSON Pointer from the document root; the
/// last pointer segment becomes the declared name of the resolved schema.
pub(crate) fn get_remote_ref(
    ref_str: &str,
    ctx: &ResolutionContext,
) -> ModelResult<(String, Schema)> {
    let (context, fragment) = split_reference(ref_str)?;
    if fragment.is_empty() {
        return Err(ModelError::SchemaNotFound(format!(
            "{} format incorrect, expected <relative-path>#/<SchemaName>",
            ref_str
        )));
    }

    let document = get_remote_document(context, ctx)?;

    let mut current = &document;
    let mut name = String::new();
    for segment in fragment.trim_start_matches('/').split('/') {
        let decoded = decode_pointer_segment(segment);
        current = current.get(&decoded).ok_or_else(|| {
            ModelError::SchemaNotFound(format!(
                "{} was not found in {}.",
                fragment, context
            ))
        })?;
        name = decoded;
    }

    let mut schema = current.clone();
    map_remote_refs(&mut schema, context)?;
    Ok((name, schema))
}

/// Reads a remote document, serving repeated reads from the context cache.
fn get_remote_document(context: &str, ctx: &ResolutionContext) -> ModelResult<Value> {
    let key = cache_key(context);
    if let Some(document) = ctx.cached_document(&key) {
        debug!(context, "remote document cache hit");
        return Ok(document);
    }

    let path = ctx.spec_dir().join(norm_context(context));
    debug!(context, path = %path.display(), "reading remote document");
    let contents = fs::read_to_string(&path).map_err(|e| {
        ModelError::SchemaNotFound(format!(
            "The referenced document {} could not be read: {}",
            path.display(),
            e
        ))
    })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let document: Value = match extension.as_str() {
        "json" => serde_json::from_str(&contents).map_err(|e| {
            ModelError::MalformedSchema(format!(
                "Failed to parse the referenced document {}: {}",
                path.display(),
                e
            ))
        })?,
        "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
            ModelError::MalformedSchema(format!(
                "Failed to parse the referenced document {}: {}",
                path.display(),
                e
            ))
        })?,
        other => {
            return Err(ModelError::FeatureNotImplemented(format!(
                "The {} extension is not supported for remote references.",
                other
            )))
        }
    };

    ctx.cache_document(key, document.clone());
    Ok(document)
}

/// Rewrites every `$ref` inside a remotely loaded schema to include `context`.
pub(crate) fn map_remote_refs(schema: &mut Value, context: &str) -> ModelResult<()> {
    match schema {
        Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                if key == "$ref" {
                    if let Value::String(ref_str) = value {
                        *value = Value::String(add_remote_context(context, ref_str)?);
                        continue;
                    }
                }
                map_remote_refs(value, context)?;
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                map_remote_refs(item, context)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Adds the remote context to a single `$ref` value.
pub(crate) fn add_remote_context(context: &str, ref_str: &str) -> ModelResult<String> {
    let (ref_context, ref_fragment) = split_reference(ref_str)?;

    // Reference within the same document
    if ref_context.is_empty() {
        return Ok(format!("{}{}", context, ref_str));
    }

    // Reference outside the document: merge directories and normalize
    let context_head = Path::new(context).parent().unwrap_or_else(|| Path::new(""));
    let joined = context_head.join(ref_context);
    Ok(format!(
        "{}#{}",
        norm_context(&joined.to_string_lossy()),
        ref_fragment
    ))
}

fn split_reference(ref_str: &str) -> ModelResult<(&str, &str)> {
    if ref_str.matches('#').count() != 1 {
        return Err(ModelError::MalformedSchema(format!(
            "A reference must contain exactly one #. Actual reference: {}",
            ref_str
        )));
    }
    Ok(ref_str.split_once('#').expect("checked # count"))
}

/// Collapses `.`/`..` segments in a context path.
fn norm_context(context: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in Path::new(context).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().map(|p| p != "..").unwrap_or(false) {
                    parts.pop();
                } else {
                    parts.push("..".to_string());
                }
            }
            Component::Normal(segment) => {
                parts.push(segment.to_string_lossy().into_owned());
            }
            Component::RootDir | Component::Prefix(_) => {
                parts.clear();
                parts.push(String::new());
            }
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Canonical cache key for a context path: normalized and case-folded.
fn cache_key(context: &str) -> String {
    norm_context(context).to_lowercase()
}

/// Decodes a JSON Pointer segment (handles `~1` and `~0`).
fn decode_pointer_segment(segment: &str) -> String {
    let decoded = segment.replace("~1", "/").replace("~0", "~");
    percent_decode_str(&decoded)
        .decode_utf8_lossy()
        .into_owned()
}
