//! Building typed values straight from YAML or JSON documents.

use super::typed_value::TypedValue;
use super::validation::{ValidationErrors, ValidationOptions};
use crate::schema::{Schema, TypeRef};
use crate::value::{self, Value};
use thiserror::Error;

/// ParseError reports a document that could not be decoded or that does not
/// match its type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("failed to decode document: {0}")]
    Decode(String),

    #[error("{0}")]
    Invalid(#[from] ValidationErrors),
}

/// ParseableType produces typed values of one type of a schema.
#[derive(Debug, Clone)]
pub struct ParseableType {
    schema: Schema,
    type_ref: TypeRef,
    options: ValidationOptions,
}

impl ParseableType {
    pub fn new(schema: &Schema, type_name: &str) -> Self {
        ParseableType {
            schema: schema.clone(),
            type_ref: TypeRef::named(type_name),
            options: ValidationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns true if the type exists in the schema.
    pub fn is_valid(&self) -> bool {
        self.schema.resolve(&self.type_ref).is_some()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn from_yaml(&self, yaml: &str) -> Result<TypedValue, ParseError> {
        let value = value::from_yaml(yaml).map_err(|e| ParseError::Decode(e.to_string()))?;
        Ok(self.from_value(value)?)
    }

    pub fn from_json(&self, json: &str) -> Result<TypedValue, ParseError> {
        let value = value::from_json(json).map_err(|e| ParseError::Decode(e.to_string()))?;
        Ok(self.from_value(value)?)
    }

    pub fn from_value(&self, value: Value) -> Result<TypedValue, ValidationErrors> {
        TypedValue::with_options(value, &self.schema, self.type_ref.clone(), &self.options)
    }
}
