//! Schema construction errors.

use thiserror::Error;

/// SchemaError reports a malformed schema. It is only ever produced while
/// building a [`super::Schema`], never while using one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("failed to parse schema: {0}")]
    Parse(String),

    #[error("type definition #{index} has no name")]
    UnnamedType { index: usize },

    #[error("type {name:?} is defined more than once")]
    DuplicateType { name: String },

    #[error("{context}: a type must declare exactly one of scalar, struct, list or map (found {found})")]
    AmbiguousType { context: String, found: usize },

    #[error("{context}: reference to undefined type {name:?}")]
    UnknownType { context: String, name: String },

    #[error("{context}: associative list key {key:?} is not a field of the element type")]
    InvalidKey { context: String, key: String },

    #[error("{context}: associative list with keys must have a struct element type")]
    KeysOnNonStruct { context: String },

    #[error("{context}: associative list without keys must have a scalar element type")]
    SetOfNonScalar { context: String },
}
