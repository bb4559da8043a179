//! Error types for avrojson
//!
//! Conversion is deterministic and idempotent: every error propagates
//! synchronously to the immediate caller and is never retried. A failed
//! conversion produces no partial result.

use thiserror::Error;

/// Result type for avrojson operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for avrojson operations
#[derive(Debug, Error)]
pub enum Error {
    /// A value's runtime kind does not match the schema it is being
    /// converted against
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Writer's and reader's schemas are structurally incompatible
    #[error("schemas do not match: writer {writer}, reader {reader}")]
    SchemaMismatch { writer: String, reader: String },

    /// Neither a writer's nor a reader's schema was supplied
    #[error("at least one schema must be specified")]
    AtLeastOneSchemaRequired,

    /// No branch of a union schema accepts the value
    #[error("no matching union branch for {0}")]
    NoMatchingUnionBranch(String),

    /// A non-nullable reader field has no value and no default
    #[error("{record} is missing required field: {field}")]
    MissingRequiredField { record: String, field: String },

    /// The wire object carries fields the reader's schema does not declare
    #[error("{record} contains extra fields: {fields:?}")]
    ExtraFields { record: String, fields: Vec<String> },

    /// A mapping key is not a declared field of the record type
    #[error("unknown field {field} for record {record}")]
    UnknownField { record: String, field: String },

    /// Writer's schema was omitted and could not be inferred from the value
    #[error("could not determine writer's schema from the value and no schema was passed")]
    SchemaInference,

    /// A schema node cannot be used in this position
    #[error("unsupported schema kind: {0}")]
    UnsupportedSchemaKind(String),
}

impl Error {
    /// Build a `TypeMismatch` from display-able parts
    pub(crate) fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
