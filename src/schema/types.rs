//! Resolved schema types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::definition::{parse_schema, SchemaDefinition};
use super::error::SchemaError;

/// ScalarKind restricts which scalar values a leaf accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    String,
    Numeric,
    Boolean,
    /// Any scalar: string, number or boolean.
    Untyped,
}

/// ElementRelationship states how the entries of a list or map relate to
/// each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementRelationship {
    /// The container is one indivisible leaf for ownership and diffing.
    Atomic,
    /// Entries are identified by content: declared key fields for lists of
    /// structs, the scalar itself for sets, the key for maps.
    #[serde(alias = "separable", alias = "granular")]
    Associative,
}

/// Type is a single node of the schema's type language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Scalar(ScalarKind),
    Struct(StructType),
    List(ListType),
    Map(MapType),
}

/// StructType has a fixed set of named, individually typed fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructType {
    pub fields: BTreeMap<String, TypeRef>,
}

/// ListType holds elements of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListType {
    pub element: TypeRef,
    pub relationship: ElementRelationship,
    /// Fields of the element struct identifying an entry. Empty for sets
    /// (associative lists of scalars) and for atomic lists.
    pub keys: Vec<String>,
}

/// MapType holds string-keyed entries of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapType {
    pub element: TypeRef,
    pub relationship: ElementRelationship,
}

/// TypeRef either names a type of the schema or embeds one inline.
///
/// Recursive types are only expressible through names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    Inline(Box<Type>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn inline(t: Type) -> Self {
        TypeRef::Inline(Box::new(t))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{}", name),
            TypeRef::Inline(t) => write!(f, "<inline {}>", t.kind()),
        }
    }
}

impl Type {
    /// Short name of the type's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Type::Scalar(_) => "scalar",
            Type::Struct(_) => "struct",
            Type::List(_) => "list",
            Type::Map(_) => "map",
        }
    }

    /// Returns true if values of this type are leaves for ownership purposes.
    pub fn is_leaf(&self) -> bool {
        match self {
            Type::Scalar(_) => true,
            Type::Struct(_) => false,
            Type::List(l) => l.relationship == ElementRelationship::Atomic,
            Type::Map(m) => m.relationship == ElementRelationship::Atomic,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct SchemaInner {
    types: BTreeMap<String, Type>,
}

/// Schema is an immutable, validated set of named types.
///
/// Cloning is cheap and clones share the same underlying definitions, so a
/// schema can be handed to any number of threads once built.
#[derive(Debug, Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

impl Schema {
    /// Wraps already validated types. Use [`parse_schema`] to build one.
    pub(crate) fn from_validated(types: BTreeMap<String, Type>) -> Self {
        Schema {
            inner: Arc::new(SchemaInner { types }),
        }
    }

    /// Parses and validates a YAML schema definition.
    pub fn from_yaml(yaml: &str) -> Result<Schema, SchemaError> {
        let definition: SchemaDefinition =
            serde_yaml::from_str(yaml).map_err(|e| SchemaError::Parse(e.to_string()))?;
        parse_schema(&definition)
    }

    /// Parses and validates a JSON schema definition.
    pub fn from_json(json: &str) -> Result<Schema, SchemaError> {
        let definition: SchemaDefinition =
            serde_json::from_str(json).map_err(|e| SchemaError::Parse(e.to_string()))?;
        parse_schema(&definition)
    }

    /// Returns the type with the given name.
    pub fn type_named(&self, name: &str) -> Option<&Type> {
        self.inner.types.get(name)
    }

    /// Resolves a reference to the type it denotes.
    pub fn resolve<'a>(&'a self, type_ref: &'a TypeRef) -> Option<&'a Type> {
        match type_ref {
            TypeRef::Named(name) => self.type_named(name),
            TypeRef::Inline(t) => Some(t),
        }
    }

    /// Names of all types, sorted.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.inner.types.keys().map(String::as_str)
    }

    /// Returns true if both handles describe the same types.
    pub fn same_as(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner == other.inner
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Schema {}
