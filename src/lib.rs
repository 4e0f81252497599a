//! # Structured Apply
//!
//! Ownership-aware structural merges of schema-typed documents shared by
//! several independent writers ("managers").
//!
//! Each manager may declare only a partial view of a document. The engine
//! works out which exact fields each manager owns, reports conflicts when two
//! managers disagree about an overlapping field, and merges a manager's
//! declared intent into the live document without disturbing data owned by
//! anyone else.
//!
//! ## Modules
//!
//! - [`value`] - Closed in-memory document representation
//! - [`schema`] - Schema definitions and the resolved, immutable [`Schema`]
//! - [`fieldpath`] - Paths, field sets and the per-manager ownership ledger
//! - [`typed`] - Values validated against a schema type (comparison, merging)
//! - [`merge`] - The `Update` / `Apply` engine

pub mod fieldpath;
pub mod merge;
pub mod schema;
pub mod typed;
pub mod value;

pub use fieldpath::{ApiVersion, FieldSet, KeyFields, ManagedFields, Path, PathElement, VersionedSet};
pub use merge::{
    convert_field_set, Conflict, Conflicts, ConversionError, Converter, MergeError, Merged,
    Updater, UpdaterBuilder,
};
pub use schema::{parse_schema, Schema, SchemaError};
pub use typed::{Comparison, TypedValue, ValidationErrors, ValidationOptions};
pub use value::Value;
