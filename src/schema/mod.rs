//! Schema module - the type language documents are checked and walked against.
//!
//! A schema is written as a [`SchemaDefinition`] (usually YAML) and turned into
//! an immutable, fully resolved [`Schema`] by [`parse_schema`]. Every named
//! reference is checked once at that point so later walks never fail on
//! schema grounds.

mod definition;
mod error;
mod types;

pub use definition::*;
pub use error::*;
pub use types::*;
