//! Path elements and paths.

use crate::value::Value;
use std::fmt;

/// KeyFields identifies an entry of an associative list by the values of its
/// key fields. Fields are kept sorted by name, so two keys naming the same
/// fields with the same values are equal no matter how they were built.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyFields {
    fields: Vec<(String, Value)>,
}

impl KeyFields {
    /// Creates a key from (field name, value) pairs.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let mut fields: Vec<(String, Value)> =
            fields.into_iter().map(|(name, value)| (name.into(), value)).collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        fields.dedup_by(|a, b| a.0 == b.0);
        KeyFields { fields }
    }

    /// Returns the value of the named key field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .binary_search_by(|(n, _)| n.as_str().cmp(name))
            .ok()
            .map(|i| &self.fields[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// PathElement is one step from a container to one of its children.
///
/// The declaration order of the variants is also their sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathElement {
    /// A struct field or an entry of an associative map.
    Field(String),
    /// An entry of an associative list, identified by its key fields.
    Key(KeyFields),
    /// An entry of a set (associative list of scalars), identified by itself.
    Value(Value),
}

impl PathElement {
    /// Creates a field path element.
    pub fn field(name: impl Into<String>) -> Self {
        PathElement::Field(name.into())
    }

    /// Creates a key path element from (field name, value) pairs.
    pub fn key<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        PathElement::Key(KeyFields::new(fields))
    }

    /// Creates a set-member path element.
    pub fn value(v: impl Into<Value>) -> Self {
        PathElement::Value(v.into())
    }

    pub fn as_field(&self) -> Option<&str> {
        match self {
            PathElement::Field(name) => Some(name),
            _ => None,
        }
    }

    /// Returns true for elements addressing an associative list entry.
    pub fn is_entry(&self) -> bool {
        matches!(self, PathElement::Key(_) | PathElement::Value(_))
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Field(name) => write!(f, ".{}", name),
            PathElement::Key(key) => {
                write!(f, "[")?;
                for (i, (name, value)) in key.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}={}", name, value)?;
                }
                write!(f, "]")
            }
            PathElement::Value(v) => write!(f, "[={}]", v),
        }
    }
}

/// Path is a sequence of elements leading from the document root.
///
/// Paths order lexicographically by element, so a path always sorts right
/// before its descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    elements: Vec<PathElement>,
}

impl Path {
    /// The empty path, addressing the document root.
    pub fn root() -> Self {
        Path::default()
    }

    pub fn from_elements(elements: Vec<PathElement>) -> Self {
        Path { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.elements.iter()
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    pub fn push(&mut self, element: PathElement) {
        self.elements.push(element);
    }

    pub fn pop(&mut self) -> Option<PathElement> {
        self.elements.pop()
    }

    /// Returns a new path extended by one element.
    pub fn child(&self, element: PathElement) -> Path {
        let mut elements = Vec::with_capacity(self.elements.len() + 1);
        elements.extend_from_slice(&self.elements);
        elements.push(element);
        Path { elements }
    }

    /// Returns the path without its last element.
    pub fn parent(&self) -> Option<Path> {
        self.elements
            .split_last()
            .map(|(_, rest)| Path::from_elements(rest.to_vec()))
    }

    /// Returns true if `prefix` is this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.elements.starts_with(&prefix.elements)
    }
}

impl From<Vec<PathElement>> for Path {
    fn from(elements: Vec<PathElement>) -> Self {
        Path { elements }
    }
}

impl FromIterator<PathElement> for Path {
    fn from_iter<T: IntoIterator<Item = PathElement>>(iter: T) -> Self {
        Path {
            elements: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathElement;
    type IntoIter = std::slice::Iter<'a, PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elements.is_empty() {
            return write!(f, "<root>");
        }
        for element in &self.elements {
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}
