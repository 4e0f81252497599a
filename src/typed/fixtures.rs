//! Shared schema and helpers for the typed tests.

use crate::fieldpath::{FieldSet, Path, PathElement};
use crate::schema::Schema;
use crate::typed::{ParseableType, TypedValue};
use crate::value::Value;

pub(crate) const SCHEMA: &str = r#"types:
- name: root
  struct:
    fields:
    - name: name
      type:
        scalar: string
    - name: spec
      type:
        namedType: spec
    - name: list
      type:
        namedType: entries
    - name: tags
      type:
        list:
          elementType:
            scalar: string
          elementRelationship: associative
    - name: args
      type:
        list:
          elementType:
            scalar: string
    - name: labels
      type:
        map:
          elementType:
            scalar: string
    - name: selector
      type:
        map:
          elementType:
            scalar: string
          elementRelationship: atomic
- name: spec
  struct:
    fields:
    - name: replicas
      type:
        scalar: numeric
    - name: paused
      type:
        scalar: boolean
    - name: template
      type:
        namedType: spec
- name: entries
  list:
    elementType:
      namedType: entry
    elementRelationship: associative
    keys:
    - name
- name: entry
  struct:
    fields:
    - name: name
      type:
        scalar: string
    - name: value
      type:
        scalar: numeric
"#;

pub(crate) fn schema() -> Schema {
    Schema::from_yaml(SCHEMA).unwrap()
}

pub(crate) fn root_type() -> ParseableType {
    ParseableType::new(&schema(), "root")
}

pub(crate) fn typed(yaml: &str) -> TypedValue {
    root_type()
        .from_yaml(yaml)
        .unwrap_or_else(|e| panic!("invalid fixture {:?}: {}", yaml, e))
}

pub(crate) fn field(name: &str) -> PathElement {
    PathElement::field(name)
}

pub(crate) fn entry(name: &str) -> PathElement {
    PathElement::key(vec![("name", Value::string(name))])
}

pub(crate) fn member(v: &str) -> PathElement {
    PathElement::value(v)
}

pub(crate) fn path(elements: Vec<PathElement>) -> Path {
    Path::from_elements(elements)
}

pub(crate) fn set(paths: Vec<Path>) -> FieldSet {
    paths.into_iter().collect()
}
