//! Value module - Closed in-memory representation of JSON/YAML documents.
//!
//! Documents are plain data here; their shape is checked against a schema
//! type by [`crate::typed::TypedValue`].

mod value;

pub use value::*;
