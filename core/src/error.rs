//! # Error Handling
//!
//! Provides the unified `ModelError` enum used across the workspace.

use derive_more::{Display, From};

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum ModelError {
    /// Wrapper for standard IO errors.
    #[display("IO Error: {}", _0)]
    Io(std::io::Error),

    /// A `$ref` could not be resolved: the reference grammar is invalid or the
    /// target name is absent from the schema universe.
    #[from(ignore)]
    #[display("Schema not found: {}", _0)]
    SchemaNotFound(String),

    /// A recognized key holds a value of the wrong shape, or a semantic
    /// combination of keys is invalid.
    #[from(ignore)]
    #[display("Malformed schema: {}", _0)]
    MalformedSchema(String),

    /// An object or array reference violates the relationship composition
    /// rules.
    #[from(ignore)]
    #[display("Malformed relationship: {}", _0)]
    MalformedRelationship(String),

    /// A syntactically valid but unsupported type/format combination.
    #[from(ignore)]
    #[display("Feature not implemented: {}", _0)]
    FeatureNotImplemented(String),

    /// Generic errors.
    #[display("General Error: {}", _0)]
    General(String),
}

/// Manual implementation of the standard Error trait.
///
/// We implement this manually (instead of `derive(Error)`) because the
/// `String`-carrying variants do not implement `std::error::Error`, causing
/// auto-derived `source()` implementations to fail compilation.
impl std::error::Error for ModelError {}

/// Helper type alias for Result using ModelError.
pub type ModelResult<T> = Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_conversion() {
        let io_err = Error::new(ErrorKind::Other, "test");
        let err: ModelError = io_err.into();
        assert!(matches!(err, ModelError::Io(_)));
    }

    #[test]
    fn test_string_conversion() {
        // String defaults to General, not one of the taxonomy variants
        let err: ModelError = String::from("something wrong").into();
        match err {
            ModelError::General(s) => assert_eq!(s, "something wrong"),
            _ => panic!("String should convert to ModelError::General"),
        }
    }

    #[test]
    fn test_schema_not_found_display() {
        let err = ModelError::SchemaNotFound("User was not found in schemas.".into());
        assert_eq!(
            format!("{}", err),
            "Schema not found: User was not found in schemas."
        );
    }
}
