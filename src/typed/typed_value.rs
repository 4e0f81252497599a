//! TypedValue: a validated document bound to a schema type.

use super::validation::{validate, ValidationError, ValidationErrors, ValidationOptions};
use crate::fieldpath::{FieldSet, KeyFields, Path, PathElement};
use crate::schema::{ElementRelationship, ListType, Schema, Type, TypeRef};
use crate::value::{Map, Value};

/// TypedValue is a [`Value`] that has been checked against a type of a
/// [`Schema`]. Every operation on it relies on that check having passed.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    value: Value,
    schema: Schema,
    type_ref: TypeRef,
}

impl TypedValue {
    /// Validates `value` against the named type of `schema`.
    pub fn new(value: Value, schema: &Schema, type_name: &str) -> Result<TypedValue, ValidationErrors> {
        TypedValue::with_options(
            value,
            schema,
            TypeRef::named(type_name),
            &ValidationOptions::default(),
        )
    }

    /// Validates `value` against any type reference with explicit options.
    pub fn with_options(
        value: Value,
        schema: &Schema,
        type_ref: TypeRef,
        options: &ValidationOptions,
    ) -> Result<TypedValue, ValidationErrors> {
        validate(&value, schema, &type_ref, options)?;
        Ok(TypedValue::trusted(value, schema.clone(), type_ref))
    }

    /// Wraps a value built by this crate from already validated values.
    pub(crate) fn trusted(value: Value, schema: Schema, type_ref: TypeRef) -> TypedValue {
        TypedValue {
            value,
            schema,
            type_ref,
        }
    }

    /// Returns a value of the same type with a new body.
    pub(crate) fn with_value(&self, value: Value) -> TypedValue {
        TypedValue::trusted(value, self.schema.clone(), self.type_ref.clone())
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    /// Fails unless both values share a schema and a type.
    pub(crate) fn check_compatible(&self, other: &TypedValue) -> Result<(), ValidationErrors> {
        if self.type_ref == other.type_ref && self.schema.same_as(&other.schema) {
            return Ok(());
        }
        Err(ValidationError::IncompatibleValues {
            lhs: self.type_ref.to_string(),
            rhs: other.type_ref.to_string(),
        }
        .into())
    }

    /// Returns the set of every leaf present in the value.
    ///
    /// Leaves are scalars, nulls, atomic containers and empty containers.
    /// Entries of associative lists are included along with their contents,
    /// so owning anything inside an entry also owns the entry.
    pub fn field_set(&self) -> FieldSet {
        let mut set = FieldSet::new();
        collect_children(
            &self.schema,
            &self.value,
            &self.type_ref,
            &mut Path::root(),
            &mut set,
        );
        set
    }

    /// Returns the value found at `path`, if any.
    pub fn value_at(&self, path: &Path) -> Option<&Value> {
        path.iter()
            .try_fold(&self.value, |current, element| child_value(current, element))
    }

    /// Builds the smallest value of this type that carries every path of
    /// `set`: key fields come from key elements, set members from value
    /// elements and every leaf is null. Paths the type cannot hold are
    /// dropped.
    pub fn skeleton(&self, set: &FieldSet) -> TypedValue {
        self.with_value(build_skeleton(&self.schema, Some(set), &self.type_ref))
    }
}

/// Returns the path element identifying `item` inside an associative list.
pub(crate) fn entry_element(list: &ListType, item: &Value) -> Option<PathElement> {
    if list.keys.is_empty() {
        return Some(PathElement::Value(item.clone()));
    }
    let fields = item.as_map()?;
    let mut key = Vec::with_capacity(list.keys.len());
    for name in &list.keys {
        match fields.get(name) {
            Some(v) if v.is_scalar() && !v.is_null() => key.push((name.as_str(), v.clone())),
            _ => return None,
        }
    }
    Some(PathElement::Key(KeyFields::new(key)))
}

/// How a walk proceeds below a value of some type.
pub(crate) enum Descent<'a> {
    /// Scalars and atomic containers.
    Leaf,
    /// Struct fields or associative map entries, by name.
    Fields(&'a Type),
    /// Associative list entries, by identity.
    Entries(&'a ListType),
}

pub(crate) fn descent<'a>(schema: &'a Schema, type_ref: &'a TypeRef) -> Descent<'a> {
    let Some(t) = schema.resolve(type_ref) else {
        return Descent::Leaf;
    };
    match t {
        Type::Struct(_) => Descent::Fields(t),
        Type::Map(m) if m.relationship == ElementRelationship::Associative => Descent::Fields(t),
        Type::List(l) if l.relationship == ElementRelationship::Associative => Descent::Entries(l),
        _ => Descent::Leaf,
    }
}

/// Type of the named child of a struct or map.
pub(crate) fn field_type<'a>(t: &'a Type, name: &str) -> Option<&'a TypeRef> {
    match t {
        Type::Struct(s) => s.fields.get(name),
        Type::Map(m) => Some(&m.element),
        _ => None,
    }
}

fn has_children(schema: &Schema, value: &Value, type_ref: &TypeRef) -> bool {
    match (descent(schema, type_ref), value) {
        (Descent::Fields(_), Value::Map(fields)) => !fields.is_empty(),
        (Descent::Entries(_), Value::List(items)) => !items.is_empty(),
        _ => false,
    }
}

/// Adds `path` to `set` if the value there is a leaf, its leaves otherwise.
pub(crate) fn collect_reachable(
    schema: &Schema,
    value: &Value,
    type_ref: &TypeRef,
    path: &mut Path,
    set: &mut FieldSet,
) {
    if has_children(schema, value, type_ref) {
        collect_children(schema, value, type_ref, path, set);
    } else if !path.is_empty() {
        set.insert(path);
    }
}

/// Adds everything strictly below `path` to `set`.
pub(crate) fn collect_children(
    schema: &Schema,
    value: &Value,
    type_ref: &TypeRef,
    path: &mut Path,
    set: &mut FieldSet,
) {
    match (descent(schema, type_ref), value) {
        (Descent::Fields(t), Value::Map(fields)) => {
            for (name, child) in fields {
                let Some(child_type) = field_type(t, name) else {
                    continue;
                };
                path.push(PathElement::field(name.as_str()));
                collect_reachable(schema, child, child_type, path, set);
                path.pop();
            }
        }
        (Descent::Entries(list), Value::List(items)) => {
            for item in items {
                let Some(element) = entry_element(list, item) else {
                    continue;
                };
                path.push(element);
                set.insert(path);
                collect_reachable(schema, item, &list.element, path, set);
                path.pop();
            }
        }
        _ => {}
    }
}

pub(crate) fn child_value<'a>(value: &'a Value, element: &PathElement) -> Option<&'a Value> {
    match element {
        PathElement::Field(name) => value.as_map()?.get(name),
        PathElement::Key(key) => value.as_list()?.iter().find(|item| has_key(item, key)),
        PathElement::Value(v) => value.as_list()?.iter().find(|item| *item == v),
    }
}

fn has_key(item: &Value, key: &KeyFields) -> bool {
    item.as_map()
        .is_some_and(|fields| key.iter().all(|(name, v)| fields.get(name) == Some(v)))
}

fn build_skeleton(schema: &Schema, node: Option<&FieldSet>, type_ref: &TypeRef) -> Value {
    let Some(node) = node else {
        return Value::Null;
    };
    match descent(schema, type_ref) {
        Descent::Leaf => Value::Null,
        Descent::Fields(t) => {
            let mut fields = Map::new();
            for element in node.elements() {
                let PathElement::Field(name) = element else {
                    continue;
                };
                if let Some(child_type) = field_type(t, name) {
                    let child = build_skeleton(schema, node.child(element), child_type);
                    fields.insert(name.clone(), child);
                }
            }
            Value::Map(fields)
        }
        Descent::Entries(list) => {
            let mut items = Vec::new();
            for element in node.elements() {
                match element {
                    PathElement::Key(key) if !list.keys.is_empty() => {
                        if !list.keys.iter().all(|k| key.contains(k)) {
                            continue;
                        }
                        let mut fields =
                            match build_skeleton(schema, node.child(element), &list.element) {
                                Value::Map(fields) => fields,
                                _ => Map::new(),
                            };
                        for name in &list.keys {
                            if let Some(v) = key.get(name) {
                                fields.insert(name.clone(), v.clone());
                            }
                        }
                        items.push(Value::Map(fields));
                    }
                    PathElement::Value(v) if list.keys.is_empty() => items.push(v.clone()),
                    _ => {}
                }
            }
            Value::List(items)
        }
    }
}
