#![deny(missing_docs)]

//! # CLI Errors
//!
//! Error types for the CLI crate.

use derive_more::{Display, From};
use modelgen_core::ModelError;

/// Main error enum for CLI operations.
#[derive(Debug, Display, From)]
pub enum CliError {
    /// IO Error wrapper.
    #[display("IO Error: {}", _0)]
    Io(std::io::Error),

    /// Engine error wrapper.
    #[display("{}", _0)]
    Core(ModelError),

    /// General failure message.
    #[display("Operation failed: {}", _0)]
    General(String),
}

/// Manual implementation of the standard Error trait.
///
/// We implement this manually (instead of `derive(Error)`) because the
/// `General(String)` variant contains a `String`, which does not implement
/// `std::error::Error`, causing auto-derived `source()` implementations to
/// fail compilation.
impl std::error::Error for CliError {}

/// Result type alias.
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_conversion() {
        let core_err = ModelError::SchemaNotFound("User".into());
        let err: CliError = core_err.into();
        assert!(matches!(err, CliError::Core(_)));
    }

    #[test]
    fn test_core_display_passthrough() {
        let err: CliError = ModelError::General("boom".to_string()).into();
        assert_eq!(format!("{}", err), "General Error: boom");
    }
}
