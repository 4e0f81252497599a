//! Validation of values against schema types.

use crate::fieldpath::Path;
use crate::schema::{ElementRelationship, ListType, ScalarKind, Schema, Type, TypeRef};
use crate::value::Value;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use super::typed_value::entry_element;

/// Default for [`ValidationOptions::max_depth`].
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// ValidationOptions controls how values are checked when a
/// [`super::TypedValue`] is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Deepest nesting of containers accepted in a document. Every later
    /// walk over a validated value is bounded by it.
    pub max_depth: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        ValidationOptions {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// ValidationError describes one way a value fails to match its type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{path}: expected {expected}, got {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: &'static str,
    },

    #[error("{path}: field {field:?} is not declared by the type")]
    UnknownField { path: String, field: String },

    #[error("{path}: associative list entry has no value for key {key:?}")]
    MissingKey { path: String, key: String },

    #[error("{path}: key field {key:?} must be a scalar")]
    NonScalarKey { path: String, key: String },

    #[error("{path}: duplicate entry {entry}")]
    DuplicateEntry { path: String, entry: String },

    #[error("{path}: document nested deeper than {max_depth} levels")]
    TooDeep { path: String, max_depth: usize },

    #[error("{path}: no type named {name:?}")]
    UnknownType { path: String, name: String },

    #[error("cannot combine a value of type {lhs} with a value of type {rhs}")]
    IncompatibleValues { lhs: String, rhs: String },
}

/// ValidationErrors collects every problem found in one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        ValidationErrors::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// Ok if nothing was collected.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        ValidationErrors {
            errors: vec![error],
        }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Checks `value` against `type_ref`, collecting every error.
pub(crate) fn validate(
    value: &Value,
    schema: &Schema,
    type_ref: &TypeRef,
    options: &ValidationOptions,
) -> Result<(), ValidationErrors> {
    let mut validator = Validator {
        schema,
        options,
        path: String::new(),
        errors: ValidationErrors::new(),
    };
    validator.check(value, type_ref, 0);
    validator.errors.into_result()
}

struct Validator<'a> {
    schema: &'a Schema,
    options: &'a ValidationOptions,
    /// Printable location of the value being checked.
    path: String,
    errors: ValidationErrors,
}

impl Validator<'_> {
    fn location(&self) -> String {
        if self.path.is_empty() {
            Path::root().to_string()
        } else {
            self.path.clone()
        }
    }

    fn mismatch(&mut self, expected: impl Into<String>, value: &Value) {
        let path = self.location();
        self.errors.push(ValidationError::TypeMismatch {
            path,
            expected: expected.into(),
            found: value.kind(),
        });
    }

    fn descend(&mut self, segment: &str, value: &Value, type_ref: &TypeRef, depth: usize) {
        let len = self.path.len();
        self.path.push_str(segment);
        self.check(value, type_ref, depth + 1);
        self.path.truncate(len);
    }

    fn check(&mut self, value: &Value, type_ref: &TypeRef, depth: usize) {
        if depth > self.options.max_depth {
            let path = self.location();
            self.errors.push(ValidationError::TooDeep {
                path,
                max_depth: self.options.max_depth,
            });
            return;
        }
        let Some(t) = self.schema.resolve(type_ref) else {
            let path = self.location();
            self.errors.push(ValidationError::UnknownType {
                path,
                name: type_ref.to_string(),
            });
            return;
        };
        // Null stands for "absent" at every type.
        if value.is_null() {
            return;
        }

        match t {
            Type::Scalar(kind) => self.check_scalar(value, *kind),
            Type::Struct(s) => {
                let Some(fields) = value.as_map() else {
                    return self.mismatch("struct", value);
                };
                for (name, field_value) in fields {
                    match s.fields.get(name) {
                        Some(field_type) => {
                            self.descend(&format!(".{}", name), field_value, field_type, depth)
                        }
                        None => {
                            let path = self.location();
                            self.errors.push(ValidationError::UnknownField {
                                path,
                                field: name.clone(),
                            });
                        }
                    }
                }
            }
            Type::Map(m) => {
                let Some(entries) = value.as_map() else {
                    return self.mismatch("map", value);
                };
                for (name, entry) in entries {
                    self.descend(&format!(".{}", name), entry, &m.element, depth);
                }
            }
            Type::List(l) => {
                let Some(items) = value.as_list() else {
                    return self.mismatch("list", value);
                };
                match l.relationship {
                    ElementRelationship::Atomic => {
                        for (i, item) in items.iter().enumerate() {
                            self.descend(&format!("[{}]", i), item, &l.element, depth);
                        }
                    }
                    ElementRelationship::Associative => self.check_entries(items, l, depth),
                }
            }
        }
    }

    fn check_scalar(&mut self, value: &Value, kind: ScalarKind) {
        let ok = match kind {
            ScalarKind::String => matches!(value, Value::String(_)),
            ScalarKind::Numeric => matches!(value, Value::Int(_) | Value::Float(_)),
            ScalarKind::Boolean => matches!(value, Value::Bool(_)),
            ScalarKind::Untyped => value.is_scalar(),
        };
        if !ok {
            let expected = match kind {
                ScalarKind::String => "string",
                ScalarKind::Numeric => "numeric",
                ScalarKind::Boolean => "boolean",
                ScalarKind::Untyped => "scalar",
            };
            self.mismatch(expected, value);
        }
    }

    fn check_entries(&mut self, items: &[Value], list: &ListType, depth: usize) {
        let mut seen = BTreeSet::new();
        for (i, item) in items.iter().enumerate() {
            if !list.keys.is_empty() && !self.check_key_fields(item, list, i) {
                continue;
            }
            let Some(element) = entry_element(list, item) else {
                continue;
            };
            let segment = element.to_string();
            if !seen.insert(element) {
                let path = self.location();
                self.errors.push(ValidationError::DuplicateEntry {
                    path,
                    entry: segment,
                });
                continue;
            }
            self.descend(&segment, item, &list.element, depth);
        }
    }

    /// Reports entries whose key fields cannot identify them.
    fn check_key_fields(&mut self, item: &Value, list: &ListType, index: usize) -> bool {
        let segment = format!("[{}]", index);
        let Some(fields) = item.as_map() else {
            let len = self.path.len();
            self.path.push_str(&segment);
            self.mismatch("struct", item);
            self.path.truncate(len);
            return false;
        };

        let mut ok = true;
        for key in &list.keys {
            let path = format!("{}{}", self.location(), segment);
            match fields.get(key) {
                None | Some(Value::Null) => {
                    self.errors.push(ValidationError::MissingKey {
                        path,
                        key: key.clone(),
                    });
                    ok = false;
                }
                Some(v) if !v.is_scalar() => {
                    self.errors.push(ValidationError::NonScalarKey {
                        path,
                        key: key.clone(),
                    });
                    ok = false;
                }
                Some(_) => {}
            }
        }
        ok
    }
}
