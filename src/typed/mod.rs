//! Typed values: documents validated against a schema type.
//!
//! This module provides validation, field sets, comparison, merging and
//! removal on top of the [`crate::schema`] types.

mod comparison;
mod merge;
mod parser;
mod typed_value;
mod validation;

#[cfg(test)]
pub(crate) mod fixtures;

#[cfg(test)]
mod compare_test;



#[cfg(test)]
mod toset_test;


pub use comparison::*;
pub use parser::*;
pub use typed_value::TypedValue;
pub use validation::*;
