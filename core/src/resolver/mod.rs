#![deny(missing_docs)]

//! # Reference Resolution
//!
//! Resolves `$ref` pointers against the schema universe. Local references use
//! the `#/components/schemas/<Name>` grammar; anything else is treated as a
//! cross-document reference and handed to the remote loader.
//!
//! All resolution state (base document path, remote document cache) lives in
//! an explicit [`ResolutionContext`] threaded through every call. There is no
//! ambient process-wide store; callers scope and reset the context themselves.

pub mod remote;

use crate::error::{ModelError, ModelResult};
use crate::schema::{Schema, Schemas};
use regex::Regex;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static LOCAL_REF_RE: OnceLock<Regex> = OnceLock::new();

fn local_ref_regex() -> &'static Regex {
    LOCAL_REF_RE.get_or_init(|| {
        Regex::new(r"^#/components/schemas/(\w+)$").expect("Invalid regex constant")
    })
}

/// Resolution state for one generation run.
///
/// Holds the path of the base document (remote references are resolved
/// relative to its directory) and the cache of remotely loaded documents,
/// keyed by normalized relative path.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    spec_path: Option<PathBuf>,
    store: RefCell<HashMap<String, Value>>,
}

impl ResolutionContext {
    /// Creates a context with no base document path.
    ///
    /// Remote references will resolve relative to the current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context rooted at the given base document path.
    pub fn with_spec_path(path: impl Into<PathBuf>) -> Self {
        Self {
            spec_path: Some(path.into()),
            store: RefCell::new(HashMap::new()),
        }
    }

    /// The directory against which remote reference paths are resolved.
    pub fn spec_dir(&self) -> PathBuf {
        self.spec_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Clears the remote document cache.
    ///
    /// Must be called between independent generation runs; cached documents
    /// are otherwise never re-read from disk.
    pub fn reset(&self) {
        self.store.borrow_mut().clear();
    }

    pub(crate) fn cached_document(&self, key: &str) -> Option<Value> {
        self.store.borrow().get(key).cloned()
    }

    pub(crate) fn cache_document(&self, key: String, document: Value) {
        self.store.borrow_mut().insert(key, document);
    }
}

/// Resolves a reference to another schema.
///
/// Follows `$ref` until a schema without the key is reached. On each step the
/// name of the schema is recorded, so the returned name is the one under which
/// the terminal schema was declared.
///
/// When `skip_name` matches the name of a reference target, resolution
/// short-circuits to the empty schema. This is used when generating a schema's
/// own properties in an inheritance chain, where the parent fragment must be
/// excluded.
///
/// # Arguments
///
/// * `name` - The name of the schema from the last step.
/// * `schema` - The schema from the last step.
/// * `schemas` - All defined schemas, used to resolve local `$ref`.
/// * `ctx` - The resolution context for remote references.
/// * `skip_name` - Schema name to exclude from resolution.
pub fn resolve(
    name: &str,
    schema: &Schema,
    schemas: &Schemas,
    ctx: &ResolutionContext,
    skip_name: Option<&str>,
) -> ModelResult<(String, Schema)> {
    let mut name = name.to_string();
    let mut schema = schema.clone();
    loop {
        let Some(ref_value) = schema.get("$ref") else {
            return Ok((name, schema));
        };
        let ref_str = ref_value.as_str().ok_or_else(|| {
            ModelError::MalformedSchema("The value of $ref must be a string.".to_string())
        })?;
        let (ref_name, ref_schema) = get_ref(ref_str, schemas, ctx)?;
        if skip_name == Some(ref_name.as_str()) {
            return Ok((ref_name, Value::Object(Map::new())));
        }
        name = ref_name;
        schema = ref_schema;
    }
}

/// Gets the schema referenced by `ref_str` together with its declared name.
///
/// References starting with `#` must match the local grammar
/// `#/components/schemas/<Name>`; every other reference is treated as a
/// cross-document reference of the form `<relative-path>#/<Pointer>`.
pub fn get_ref(
    ref_str: &str,
    schemas: &Schemas,
    ctx: &ResolutionContext,
) -> ModelResult<(String, Schema)> {
    if ref_str.starts_with('#') {
        let captures = local_ref_regex().captures(ref_str).ok_or_else(|| {
            ModelError::SchemaNotFound(format!(
                "{} format incorrect, expected #/components/schemas/<SchemaName>",
                ref_str
            ))
        })?;
        let name = &captures[1];
        let schema = schemas.get(name).ok_or_else(|| {
            ModelError::SchemaNotFound(format!("{} was not found in schemas.", name))
        })?;
        Ok((name.to_string(), schema.clone()))
    } else {
        remote::get_remote_ref(ref_str, ctx)
    }
}
