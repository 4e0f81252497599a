//! Field paths, field sets and the per-manager ownership ledger.
//!
//! A [`FieldSet`] names a set of fields of a document. [`ManagedFields`]
//! records, for every manager, the set of fields it owns together with the
//! API version that set is expressed in.

mod path;
mod serialize;
mod set;

pub use path::*;
pub use serialize::*;
pub use set::*;

use std::collections::BTreeMap;
use std::fmt;

/// ApiVersion names the schema shape a field set is expressed in.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion(String);

impl ApiVersion {
    pub fn new(version: impl Into<String>) -> Self {
        ApiVersion(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ApiVersion {
    fn from(s: &str) -> Self {
        ApiVersion(s.to_string())
    }
}

impl From<String> for ApiVersion {
    fn from(s: String) -> Self {
        ApiVersion(s)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// VersionedSet is one manager's ownership record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedSet {
    pub set: FieldSet,
    pub api_version: ApiVersion,
    /// True if the set was last written by an apply, false for an update.
    pub applied: bool,
}

impl VersionedSet {
    pub fn new(set: FieldSet, api_version: ApiVersion, applied: bool) -> Self {
        VersionedSet {
            set,
            api_version,
            applied,
        }
    }
}

/// ManagedFields maps manager names to what they own.
///
/// Managers iterate in name order, so two equal ledgers always serialize
/// identically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagedFields {
    managers: BTreeMap<String, VersionedSet>,
}

impl ManagedFields {
    pub fn new() -> Self {
        ManagedFields::default()
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    pub fn get(&self, manager: &str) -> Option<&VersionedSet> {
        self.managers.get(manager)
    }

    pub fn get_mut(&mut self, manager: &str) -> Option<&mut VersionedSet> {
        self.managers.get_mut(manager)
    }

    /// Inserts or replaces a manager's record.
    pub fn insert(&mut self, manager: impl Into<String>, versioned: VersionedSet) {
        self.managers.insert(manager.into(), versioned);
    }

    pub fn remove(&mut self, manager: &str) -> Option<VersionedSet> {
        self.managers.remove(manager)
    }

    pub fn contains(&self, manager: &str) -> bool {
        self.managers.contains_key(manager)
    }

    /// Iterates over managers and their records in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VersionedSet)> {
        self.managers.iter().map(|(m, v)| (m.as_str(), v))
    }

    pub fn managers(&self) -> impl Iterator<Item = &str> {
        self.managers.keys().map(String::as_str)
    }

    /// Deletes every manager whose set became empty.
    pub fn remove_empty(&mut self) {
        self.managers.retain(|_, versioned| !versioned.set.is_empty());
    }
}

impl FromIterator<(String, VersionedSet)> for ManagedFields {
    fn from_iter<T: IntoIterator<Item = (String, VersionedSet)>>(iter: T) -> Self {
        ManagedFields {
            managers: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for ManagedFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (manager, versioned) in &self.managers {
            writeln!(f, "{}:", manager)?;
            writeln!(f, "- Applied: {}", versioned.applied)?;
            writeln!(f, "- APIVersion: {}", versioned.api_version)?;
            for path in versioned.set.iter() {
                writeln!(f, "  {}", path)?;
            }
        }
        Ok(())
    }
}
