//! Serializable schema definitions and their validation into a [`Schema`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::SchemaError;
use super::types::{
    ElementRelationship, ListType, MapType, ScalarKind, Schema, StructType, Type, TypeRef,
};

/// SchemaDefinition is the on-disk form of a schema: a list of named types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub types: Vec<TypeDefinition>,
}

/// TypeDefinition names one atom.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDefinition {
    #[serde(default)]
    pub name: String,

    #[serde(flatten)]
    pub atom: AtomDefinition,
}

/// AtomDefinition must set exactly one of its members.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtomDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar: Option<ScalarKind>,

    #[serde(default, rename = "struct", skip_serializing_if = "Option::is_none")]
    pub structure: Option<StructDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<Box<ListDefinition>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<Box<MapDefinition>>,
}

/// TypeRefDefinition either names a type or declares one inline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeRefDefinition {
    #[serde(default, rename = "namedType", skip_serializing_if = "Option::is_none")]
    pub named_type: Option<String>,

    #[serde(flatten)]
    pub atom: AtomDefinition,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructDefinition {
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: TypeRefDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDefinition {
    #[serde(rename = "elementType")]
    pub element_type: TypeRefDefinition,

    /// Lists are atomic unless stated otherwise.
    #[serde(default = "atomic", rename = "elementRelationship")]
    pub element_relationship: ElementRelationship,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDefinition {
    #[serde(rename = "elementType")]
    pub element_type: TypeRefDefinition,

    /// Maps are granular unless stated otherwise.
    #[serde(default = "associative", rename = "elementRelationship")]
    pub element_relationship: ElementRelationship,
}

fn atomic() -> ElementRelationship {
    ElementRelationship::Atomic
}

fn associative() -> ElementRelationship {
    ElementRelationship::Associative
}

impl AtomDefinition {
    fn kinds(&self) -> usize {
        self.scalar.is_some() as usize
            + self.structure.is_some() as usize
            + self.list.is_some() as usize
            + self.map.is_some() as usize
    }
}

/// Builds a [`Schema`] from its definition.
///
/// Fails if a definition is ambiguous, a named type is referenced but never
/// defined, or an associative list declares keys that are not fields of its
/// element struct.
pub fn parse_schema(definition: &SchemaDefinition) -> Result<Schema, SchemaError> {
    let mut types = BTreeMap::new();
    for (index, def) in definition.types.iter().enumerate() {
        if def.name.is_empty() {
            return Err(SchemaError::UnnamedType { index });
        }
        let t = lower_atom(&def.atom, &def.name)?;
        if types.insert(def.name.clone(), t).is_some() {
            return Err(SchemaError::DuplicateType {
                name: def.name.clone(),
            });
        }
    }

    for (name, t) in &types {
        check_type(t, &types, name)?;
    }

    Ok(Schema::from_validated(types))
}

fn lower_atom(atom: &AtomDefinition, context: &str) -> Result<Type, SchemaError> {
    match (&atom.scalar, &atom.structure, &atom.list, &atom.map) {
        (Some(kind), None, None, None) => Ok(Type::Scalar(*kind)),
        (None, Some(s), None, None) => {
            let mut fields = BTreeMap::new();
            for field in &s.fields {
                let field_context = format!("{}.{}", context, field.name);
                fields.insert(field.name.clone(), lower_ref(&field.field_type, &field_context)?);
            }
            Ok(Type::Struct(StructType { fields }))
        }
        (None, None, Some(l), None) => Ok(Type::List(ListType {
            element: lower_ref(&l.element_type, &format!("{}[]", context))?,
            relationship: l.element_relationship,
            keys: l.keys.clone(),
        })),
        (None, None, None, Some(m)) => Ok(Type::Map(MapType {
            element: lower_ref(&m.element_type, &format!("{}{{}}", context))?,
            relationship: m.element_relationship,
        })),
        _ => Err(SchemaError::AmbiguousType {
            context: context.to_string(),
            found: atom.kinds(),
        }),
    }
}

fn lower_ref(def: &TypeRefDefinition, context: &str) -> Result<TypeRef, SchemaError> {
    match &def.named_type {
        Some(name) if def.atom.kinds() == 0 => Ok(TypeRef::Named(name.clone())),
        Some(_) => Err(SchemaError::AmbiguousType {
            context: context.to_string(),
            found: def.atom.kinds() + 1,
        }),
        None => Ok(TypeRef::inline(lower_atom(&def.atom, context)?)),
    }
}

fn resolve_in<'a>(
    types: &'a BTreeMap<String, Type>,
    type_ref: &'a TypeRef,
    context: &str,
) -> Result<&'a Type, SchemaError> {
    match type_ref {
        TypeRef::Named(name) => types.get(name).ok_or_else(|| SchemaError::UnknownType {
            context: context.to_string(),
            name: name.clone(),
        }),
        TypeRef::Inline(t) => Ok(t),
    }
}

fn check_ref(
    type_ref: &TypeRef,
    types: &BTreeMap<String, Type>,
    context: &str,
) -> Result<(), SchemaError> {
    match type_ref {
        // Named types are checked on their own; stopping here keeps
        // recursive definitions finite.
        TypeRef::Named(_) => resolve_in(types, type_ref, context).map(|_| ()),
        TypeRef::Inline(t) => check_type(t, types, context),
    }
}

fn check_type(t: &Type, types: &BTreeMap<String, Type>, context: &str) -> Result<(), SchemaError> {
    match t {
        Type::Scalar(_) => Ok(()),
        Type::Struct(s) => {
            for (name, field) in &s.fields {
                check_ref(field, types, &format!("{}.{}", context, name))?;
            }
            Ok(())
        }
        Type::Map(m) => check_ref(&m.element, types, &format!("{}{{}}", context)),
        Type::List(l) => {
            let element_context = format!("{}[]", context);
            check_ref(&l.element, types, &element_context)?;
            if l.relationship == ElementRelationship::Atomic {
                return Ok(());
            }
            let element = resolve_in(types, &l.element, &element_context)?;
            match (element, l.keys.is_empty()) {
                (Type::Scalar(_), true) => Ok(()),
                (_, true) => Err(SchemaError::SetOfNonScalar {
                    context: context.to_string(),
                }),
                (Type::Struct(s), false) => {
                    for key in &l.keys {
                        if !s.fields.contains_key(key) {
                            return Err(SchemaError::InvalidKey {
                                context: context.to_string(),
                                key: key.clone(),
                            });
                        }
                    }
                    Ok(())
                }
                (_, false) => Err(SchemaError::KeysOnNonStruct {
                    context: context.to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<Schema, SchemaError> {
        Schema::from_yaml(yaml)
    }

    #[test]
    fn test_recursive_named_types() {
        let schema = parse(
            r#"
types:
- name: tree
  map:
    elementType:
      namedType: tree
"#,
        );
        assert!(schema.is_ok());
    }

    #[test]
    fn test_unknown_named_type() {
        let err = parse(
            r#"
types:
- name: root
  struct:
    fields:
    - name: a
      type:
        namedType: nowhere
"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownType {
                context: "root.a".to_string(),
                name: "nowhere".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_associative_key() {
        let err = parse(
            r#"
types:
- name: list
  list:
    elementRelationship: associative
    keys: [id]
    elementType:
      struct:
        fields:
        - name: name
          type:
            scalar: string
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidKey { ref key, .. } if key == "id"));
    }

    #[test]
    fn test_set_of_structs_rejected() {
        let err = parse(
            r#"
types:
- name: list
  list:
    elementRelationship: associative
    elementType:
      struct:
        fields: []
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::SetOfNonScalar { .. }));
    }

    #[test]
    fn test_ambiguous_and_duplicate_definitions() {
        let err = parse(
            r#"
types:
- name: both
  scalar: string
  map:
    elementType:
      scalar: string
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::AmbiguousType { found: 2, .. }));

        let err = parse(
            r#"
types:
- name: a
  scalar: string
- name: a
  scalar: numeric
"#,
        )
        .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateType { name: "a".to_string() });
    }

    #[test]
    fn test_list_defaults_to_atomic() {
        let schema = parse(
            r#"
types:
- name: items
  list:
    elementType:
      scalar: string
"#,
        )
        .unwrap();
        match schema.type_named("items") {
            Some(Type::List(l)) => assert_eq!(l.relationship, ElementRelationship::Atomic),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_separable_is_accepted_for_maps() {
        let schema = parse(
            r#"
types:
- name: m
  map:
    elementRelationship: separable
    elementType:
      scalar: untyped
"#,
        )
        .unwrap();
        assert!(matches!(
            schema.type_named("m"),
            Some(Type::Map(MapType { relationship: ElementRelationship::Associative, .. }))
        ));
    }
}
