//! Merging values and removing fields from them.

use super::typed_value::{descent, entry_element, field_type, Descent, TypedValue};
use super::validation::ValidationErrors;
use crate::fieldpath::{FieldSet, Path, PathElement};
use crate::schema::{ListType, Schema, TypeRef};
use crate::value::{Map, Value};
use std::collections::BTreeMap;

impl TypedValue {
    /// Merges `other` into `self`.
    ///
    /// Scalars and atomic containers are replaced by `other`'s value. Struct
    /// fields and map entries are merged by name, associative list entries by
    /// identity: entries already in `self` keep their position and new ones
    /// are appended in `other`'s order.
    pub fn merge(&self, other: &TypedValue) -> Result<TypedValue, ValidationErrors> {
        self.check_compatible(other)?;
        let merged = merge_values(self.schema(), self.value(), other.value(), self.type_ref());
        Ok(self.with_value(merged))
    }

    /// Returns a copy of the value without the given paths and everything
    /// below them. Key fields of associative list entries are only removed
    /// together with their entry.
    pub fn remove_items(&self, items: &FieldSet) -> TypedValue {
        if items.has(&Path::root()) {
            return self.with_value(Value::Null);
        }
        let mut walker = RemoveWalker {
            schema: self.schema(),
            items,
            path: Path::root(),
        };
        let value = walker.remove(self.value(), self.type_ref(), &[]);
        self.with_value(value)
    }
}

fn merge_values(schema: &Schema, lhs: &Value, rhs: &Value, type_ref: &TypeRef) -> Value {
    if lhs == rhs {
        return rhs.clone();
    }
    match (descent(schema, type_ref), lhs, rhs) {
        (Descent::Fields(t), Value::Map(left), Value::Map(right)) => {
            let mut merged = left.clone();
            for (name, r) in right {
                let value = match (left.get(name), field_type(t, name)) {
                    (Some(l), Some(child_type)) => merge_values(schema, l, r, child_type),
                    _ => r.clone(),
                };
                merged.insert(name.clone(), value);
            }
            Value::Map(merged)
        }
        (Descent::Entries(list), Value::List(left), Value::List(right)) => {
            Value::List(merge_entries(schema, list, left, right))
        }
        _ => rhs.clone(),
    }
}

fn merge_entries(schema: &Schema, list: &ListType, left: &[Value], right: &[Value]) -> Vec<Value> {
    let mut incoming: BTreeMap<PathElement, &Value> = BTreeMap::new();
    let mut appended = Vec::new();
    for item in right {
        if let Some(element) = entry_element(list, item) {
            if incoming.insert(element.clone(), item).is_none() {
                appended.push(element);
            }
        }
    }

    let mut merged = Vec::with_capacity(left.len() + appended.len());
    for item in left {
        let element = entry_element(list, item);
        match element.as_ref().and_then(|e| incoming.remove(e)) {
            Some(r) => merged.push(merge_values(schema, item, r, &list.element)),
            None => merged.push(item.clone()),
        }
    }
    for element in appended {
        if let Some(r) = incoming.remove(&element) {
            merged.push(r.clone());
        }
    }
    merged
}

struct RemoveWalker<'a> {
    schema: &'a Schema,
    items: &'a FieldSet,
    path: Path,
}

impl RemoveWalker<'_> {
    /// Rebuilds `value` without the removed paths below the current path.
    /// `keys` names the fields identifying the value when it is a list entry.
    fn remove(&mut self, value: &Value, type_ref: &TypeRef, keys: &[String]) -> Value {
        if !self.items.has_descendants(&self.path) {
            return value.clone();
        }
        match (descent(self.schema, type_ref), value) {
            (Descent::Fields(t), Value::Map(fields)) => {
                let mut kept = Map::new();
                for (name, child) in fields {
                    self.path.push(PathElement::field(name.as_str()));
                    if keys.contains(name) {
                        kept.insert(name.clone(), child.clone());
                    } else if !self.items.has(&self.path) {
                        let child = match field_type(t, name) {
                            Some(child_type) => self.remove(child, child_type, &[]),
                            None => child.clone(),
                        };
                        kept.insert(name.clone(), child);
                    }
                    self.path.pop();
                }
                Value::Map(kept)
            }
            (Descent::Entries(list), Value::List(items)) => {
                let mut kept = Vec::with_capacity(items.len());
                for item in items {
                    let Some(element) = entry_element(list, item) else {
                        kept.push(item.clone());
                        continue;
                    };
                    self.path.push(element);
                    if !self.items.has(&self.path) {
                        kept.push(self.remove(item, &list.element, &list.keys));
                    }
                    self.path.pop();
                }
                Value::List(kept)
            }
            _ => value.clone(),
        }
    }
}
