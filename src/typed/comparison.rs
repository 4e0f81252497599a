//! Structural comparison of two values of the same type.

use super::typed_value::{
    collect_children, collect_reachable, descent, entry_element, field_type, Descent, TypedValue,
};
use super::validation::ValidationErrors;
use crate::fieldpath::{FieldSet, Path, PathElement};
use crate::schema::{Schema, TypeRef};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Comparison holds the result of comparing two TypedValues.
///
/// If all of the fieldsets are empty, then the objects must have been equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    /// Fields that were in the left-hand side but not the right-hand side.
    pub removed: FieldSet,
    /// Fields that were in both but had different values. Containers whose
    /// contents changed are listed here too.
    pub modified: FieldSet,
    /// Fields that were in the right-hand side but not the left-hand side.
    pub added: FieldSet,
}

impl Comparison {
    pub fn new() -> Self {
        Comparison::default()
    }

    /// Returns true if there are no changes.
    pub fn is_same(&self) -> bool {
        self.removed.is_empty() && self.modified.is_empty() && self.added.is_empty()
    }

    /// Modified paths with no other change below them: the fields whose own
    /// value changed, as opposed to containers that were merely touched.
    pub fn modified_leaves(&self) -> FieldSet {
        let changed = self.added.union(&self.modified).union(&self.removed);
        self.modified
            .iter()
            .filter(|path| !changed.has_descendants(path))
            .collect()
    }

    /// Drops the given paths, and everything below them, from the result.
    pub fn exclude(&mut self, fields: &FieldSet) {
        self.removed = self.removed.recursive_difference(fields);
        self.modified = self.modified.recursive_difference(fields);
        self.added = self.added.recursive_difference(fields);
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sections = [
            ("Modified", &self.modified),
            ("Added", &self.added),
            ("Removed", &self.removed),
        ];
        let mut first = true;
        for (name, set) in sections {
            if set.is_empty() {
                continue;
            }
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "- {} Fields:", name)?;
            for path in set.iter() {
                write!(f, "\n  {}", path)?;
            }
        }
        Ok(())
    }
}

impl TypedValue {
    /// Compares `self` (before) with `other` (after).
    ///
    /// Associative entries are matched by identity, never by position, so
    /// reordering them is not a change.
    pub fn compare(&self, other: &TypedValue) -> Result<Comparison, ValidationErrors> {
        self.check_compatible(other)?;
        let mut walker = CompareWalker {
            schema: self.schema(),
            path: Path::root(),
            comparison: Comparison::new(),
        };
        walker.compare(self.value(), other.value(), self.type_ref());
        Ok(walker.comparison)
    }
}

struct CompareWalker<'a> {
    schema: &'a Schema,
    path: Path,
    comparison: Comparison,
}

impl CompareWalker<'_> {
    /// Records the differences below the current path. Returns true if
    /// anything changed.
    fn compare(&mut self, lhs: &Value, rhs: &Value, type_ref: &TypeRef) -> bool {
        if lhs == rhs {
            return false;
        }
        match (descent(self.schema, type_ref), lhs, rhs) {
            (Descent::Fields(t), Value::Map(left), Value::Map(right)) => {
                let mut changed = false;
                for (name, l) in left {
                    let Some(child_type) = field_type(t, name) else {
                        continue;
                    };
                    self.path.push(PathElement::field(name.as_str()));
                    changed |= match right.get(name) {
                        Some(r) => self.compare(l, r, child_type),
                        None => self.removed(l, child_type),
                    };
                    self.path.pop();
                }
                for (name, r) in right {
                    if left.contains_key(name) {
                        continue;
                    }
                    let Some(child_type) = field_type(t, name) else {
                        continue;
                    };
                    self.path.push(PathElement::field(name.as_str()));
                    changed |= self.added(r, child_type);
                    self.path.pop();
                }
                changed
            }
            (Descent::Entries(list), Value::List(left), Value::List(right)) => {
                let index = |items: &[Value]| -> BTreeMap<PathElement, usize> {
                    items
                        .iter()
                        .enumerate()
                        .filter_map(|(i, item)| entry_element(list, item).map(|e| (e, i)))
                        .collect()
                };
                let (left_index, right_index) = (index(left), index(right));

                let mut changed = false;
                for (element, &i) in &left_index {
                    self.path.push(element.clone());
                    let entry_changed = match right_index.get(element) {
                        Some(&j) => self.compare(&left[i], &right[j], &list.element),
                        None => {
                            self.comparison.removed.insert(&self.path);
                            self.removed(&left[i], &list.element);
                            true
                        }
                    };
                    if entry_changed && right_index.contains_key(element) {
                        self.comparison.modified.insert(&self.path);
                    }
                    changed |= entry_changed;
                    self.path.pop();
                }
                for (element, &j) in &right_index {
                    if left_index.contains_key(element) {
                        continue;
                    }
                    self.path.push(element.clone());
                    self.comparison.added.insert(&self.path);
                    self.added(&right[j], &list.element);
                    self.path.pop();
                    changed = true;
                }
                changed
            }
            (Descent::Leaf, _, _) => {
                self.comparison.modified.insert(&self.path);
                true
            }
            // A container replaced by null or the other way round.
            _ => {
                self.comparison.modified.insert(&self.path);
                self.removed_below(lhs, type_ref);
                self.added_below(rhs, type_ref);
                true
            }
        }
    }

    fn added(&mut self, value: &Value, type_ref: &TypeRef) -> bool {
        collect_reachable(
            self.schema,
            value,
            type_ref,
            &mut self.path,
            &mut self.comparison.added,
        );
        true
    }

    fn removed(&mut self, value: &Value, type_ref: &TypeRef) -> bool {
        collect_reachable(
            self.schema,
            value,
            type_ref,
            &mut self.path,
            &mut self.comparison.removed,
        );
        true
    }

    fn added_below(&mut self, value: &Value, type_ref: &TypeRef) {
        collect_children(
            self.schema,
            value,
            type_ref,
            &mut self.path,
            &mut self.comparison.added,
        );
    }

    fn removed_below(&mut self, value: &Value, type_ref: &TypeRef) {
        collect_children(
            self.schema,
            value,
            type_ref,
            &mut self.path,
            &mut self.comparison.removed,
        );
    }
}
