//! Updater: the `update` and `apply` operations over a managed fields ledger.

use super::converter::VersionBridge;
use super::{Conflict, Conflicts, ConversionError, Converter};
use crate::fieldpath::{ApiVersion, FieldSet, ManagedFields, Path, VersionedSet};
use crate::typed::{TypedValue, ValidationErrors};
use crate::value::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// MergeError is returned by [`Updater::update`] and [`Updater::apply`].
///
/// None of these leave anything half done: the caller's inputs are never
/// modified and no result is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MergeError {
    #[error("{0}")]
    Conflicts(#[from] Conflicts),

    #[error("invalid object: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("manager {manager:?} records version {version}, which cannot be converted")]
    MissingVersion { manager: String, version: ApiVersion },

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// Merged is the outcome of a successful operation: the next object and
/// the ledger to store with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub object: TypedValue,
    pub managers: ManagedFields,
}

/// UpdaterBuilder configures an [`Updater`].
#[derive(Default)]
pub struct UpdaterBuilder {
    converter: Option<Box<dyn Converter>>,
    ignored_fields: BTreeMap<ApiVersion, FieldSet>,
    drop_obsolete_managers: bool,
}

impl UpdaterBuilder {
    pub fn new() -> Self {
        UpdaterBuilder::default()
    }

    /// Sets the converter used when a manager recorded another version.
    pub fn converter(mut self, converter: Box<dyn Converter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Never tracks ownership of `fields`, or anything below them, for
    /// objects of `version`.
    pub fn ignored_fields(mut self, version: ApiVersion, fields: FieldSet) -> Self {
        self.ignored_fields.insert(version, fields);
        self
    }

    /// Drops managers whose recorded version can no longer be converted
    /// instead of failing the call.
    pub fn drop_obsolete_managers(mut self, drop: bool) -> Self {
        self.drop_obsolete_managers = drop;
        self
    }

    pub fn build(self) -> Updater {
        Updater {
            converter: self.converter,
            ignored_fields: self.ignored_fields,
            drop_obsolete_managers: self.drop_obsolete_managers,
        }
    }
}

/// Updater computes merged objects and ownership for one kind of object.
///
/// It holds only configuration; every call is a pure function of its
/// arguments, so one updater can serve any number of threads.
pub struct Updater {
    converter: Option<Box<dyn Converter>>,
    ignored_fields: BTreeMap<ApiVersion, FieldSet>,
    drop_obsolete_managers: bool,
}

/// Every manager's set at the version of the current call, plus the records
/// they came from.
struct Ledger {
    recorded: ManagedFields,
    sets: BTreeMap<String, FieldSet>,
}

impl Updater {
    pub fn builder() -> UpdaterBuilder {
        UpdaterBuilder::new()
    }

    fn ignored(&self, version: &ApiVersion) -> FieldSet {
        self.ignored_fields.get(version).cloned().unwrap_or_default()
    }

    /// Brings `live` to the type of `target`. A live object stored at
    /// another version goes through the converter; without one it is left
    /// alone and the compatibility check rejects it.
    fn align<'a>(
        &self,
        live: &'a TypedValue,
        target: &TypedValue,
        version: &ApiVersion,
    ) -> Result<Cow<'a, TypedValue>, MergeError> {
        match &self.converter {
            Some(converter) if live.type_ref() != target.type_ref() => {
                debug!(from = %live.type_ref(), %version, "converting live object");
                Ok(Cow::Owned(converter.convert(live, version)?))
            }
            _ => Ok(Cow::Borrowed(live)),
        }
    }

    /// Update records an imperative write of `new` by `manager`.
    ///
    /// The manager takes every field it added or changed, other managers
    /// lose the fields whose value changed under them, and removed fields
    /// leave every record. Update never conflicts.
    pub fn update(
        &self,
        live: &TypedValue,
        new: &TypedValue,
        version: &ApiVersion,
        managers: &ManagedFields,
        manager: &str,
    ) -> Result<Merged, MergeError> {
        let live = self.align(live, new, version)?;
        let live = &*live;
        let ignored = self.ignored(version);
        let mut compare = live.compare(new)?;
        compare.exclude(&ignored);

        let mut bridge = VersionBridge::new(self.converter.as_deref(), live, version);
        let ledger = self.normalize(&mut bridge, managers)?;

        // A container that went from null to populated is reached through
        // its children; nobody keeps the container itself.
        let reached = new.field_set();
        let stale = compare.modified.difference(&reached);
        let taken = compare
            .removed
            .union(&compare.modified_leaves())
            .union(&compare.added)
            .union(&stale);
        let after: BTreeMap<String, FieldSet> = ledger
            .sets
            .iter()
            .filter(|(name, _)| name.as_str() != manager)
            .map(|(name, set)| (name.clone(), set.difference(&taken)))
            .collect();

        let owned = ledger
            .sets
            .get(manager)
            .cloned()
            .unwrap_or_default()
            .difference(&compare.removed)
            .difference(&stale)
            .union(&compare.added)
            .union(&compare.modified.intersection(&reached))
            .recursive_difference(&ignored);
        debug!(
            manager,
            %version,
            added = compare.added.len(),
            modified = compare.modified.len(),
            removed = compare.removed.len(),
            "update"
        );

        let managers = self.finish(
            &bridge,
            ledger,
            after,
            manager,
            VersionedSet::new(owned, version.clone(), false),
        )?;
        Ok(Merged {
            object: new.clone(),
            managers,
        })
    }

    /// Apply merges the partial object `config` from `manager` into `live`.
    ///
    /// Fields `config` sets to a value another manager owns with a different
    /// value are conflicts; unless `force` is set they fail the call. Fields
    /// the manager applied before but omits now are removed from the object
    /// unless another manager also owns them. The manager ends up owning
    /// exactly what `config` sets.
    pub fn apply(
        &self,
        live: &TypedValue,
        config: &TypedValue,
        version: &ApiVersion,
        managers: &ManagedFields,
        manager: &str,
        force: bool,
    ) -> Result<Merged, MergeError> {
        let live = self.align(live, config, version)?;
        let live = &*live;
        live.check_compatible(config)?;
        let applied = config.field_set().recursive_difference(&self.ignored(version));

        let mut bridge = VersionBridge::new(self.converter.as_deref(), live, version);
        let ledger = self.normalize(&mut bridge, managers)?;

        let conflicts = find_conflicts(live, config, &applied, &ledger.sets, manager);
        if !conflicts.is_empty() {
            if !force {
                debug!(manager, %version, conflicts = conflicts.len(), "apply conflicts");
                return Err(MergeError::Conflicts(conflicts));
            }
            debug!(manager, %version, conflicts = conflicts.len(), "forcing apply over conflicts");
        }

        let mut object = live.merge(config)?;

        let previous = ledger.sets.get(manager).cloned().unwrap_or_default();
        let prune: FieldSet = previous
            .difference(&applied)
            .iter()
            .filter(|path| !applied.has_descendants(path))
            .filter(|path| !owned_by_others(&ledger.sets, manager, path))
            .collect();
        if !prune.is_empty() {
            debug!(manager, fields = prune.len(), "removing fields no longer applied");
            object = object.remove_items(&prune);
        }

        let compare = live.compare(&object)?;
        let after: BTreeMap<String, FieldSet> = ledger
            .sets
            .iter()
            .filter(|(name, _)| name.as_str() != manager)
            .map(|(name, set)| {
                let lost = compare.removed.union(&conflicts.paths_of(name));
                (name.clone(), set.difference(&lost))
            })
            .collect();

        let managers = self.finish(
            &bridge,
            ledger,
            after,
            manager,
            VersionedSet::new(applied, version.clone(), true),
        )?;
        Ok(Merged { object, managers })
    }

    /// Converts every recorded set to the version of the call, dropping or
    /// failing on managers whose version is gone.
    fn normalize(&self, bridge: &mut VersionBridge<'_>, managers: &ManagedFields) -> Result<Ledger, MergeError> {
        let mut recorded = ManagedFields::new();
        let mut sets = BTreeMap::new();
        for (name, versioned) in managers.iter() {
            match bridge.incoming(versioned) {
                Ok(set) => {
                    sets.insert(name.to_string(), set);
                    recorded.insert(name, versioned.clone());
                }
                Err(err) if bridge.is_missing_version(&err) => {
                    if !self.drop_obsolete_managers {
                        return Err(MergeError::MissingVersion {
                            manager: name.to_string(),
                            version: versioned.api_version.clone(),
                        });
                    }
                    warn!(
                        manager = name,
                        version = %versioned.api_version,
                        "dropping manager with an obsolete version"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(Ledger { recorded, sets })
    }

    /// Builds the next ledger. Records that did not change are kept as they
    /// were; changed ones go back to the version they were recorded at.
    fn finish(
        &self,
        bridge: &VersionBridge<'_>,
        ledger: Ledger,
        after: BTreeMap<String, FieldSet>,
        manager: &str,
        own: VersionedSet,
    ) -> Result<ManagedFields, MergeError> {
        let mut next = ManagedFields::new();
        for (name, set) in after {
            let (Some(before), Some(recorded)) = (ledger.sets.get(&name), ledger.recorded.get(&name)) else {
                continue;
            };
            if &set == before {
                next.insert(name, recorded.clone());
                continue;
            }
            debug!(manager = %name, "ownership changed");
            let set = bridge.outgoing(&set, &recorded.api_version)?;
            next.insert(name, VersionedSet::new(set, recorded.api_version.clone(), recorded.applied));
        }
        next.insert(manager, own);
        next.remove_empty();
        Ok(next)
    }
}

/// Finds every leaf of `applied` where another manager owns a value that
/// `config` would change. An explicit null also conflicts with whatever
/// other managers own below it.
fn find_conflicts(
    live: &TypedValue,
    config: &TypedValue,
    applied: &FieldSet,
    sets: &BTreeMap<String, FieldSet>,
    manager: &str,
) -> Conflicts {
    let mut found = Vec::new();
    for path in applied.leaves() {
        let wanted = config.value_at(&path);
        for (other, owned) in sets {
            if other == manager {
                continue;
            }
            if owned.has(&path) && wanted != live.value_at(&path) {
                found.push(Conflict::new(other.clone(), path.clone()));
            }
            if wanted == Some(&Value::Null) {
                found.extend(
                    owned
                        .with_prefix(&path)
                        .leaves()
                        .filter(|below| below != &path && live.value_at(below).is_some())
                        .map(|below| Conflict::new(other.clone(), below)),
                );
            }
        }
    }
    found.into_iter().collect()
}

/// True if a manager other than `manager` owns `path` or anything below it.
fn owned_by_others(sets: &BTreeMap<String, FieldSet>, manager: &str, path: &Path) -> bool {
    sets.iter()
        .filter(|(name, _)| name.as_str() != manager)
        .any(|(_, set)| set.has(path) || set.has_descendants(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::fixtures::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_update_simple() {
        let updater = Updater::builder().build();
        let live = typed("name: a\n");
        let new = typed("name: b\nspec:\n  replicas: 1\n");

        let merged = updater
            .update(&live, &new, &ApiVersion::new("v1"), &ManagedFields::new(), "manager1")
            .unwrap();
        assert_eq!(merged.object, new);

        let owned = merged.managers.get("manager1").unwrap();
        assert_eq!(
            owned.set,
            set(vec![
                path(vec![field("name")]),
                path(vec![field("spec"), field("replicas")]),
            ])
        );
        assert!(!owned.applied);
    }

    #[test]
    fn test_apply_simple() {
        let updater = Updater::builder().build();
        let live = typed("name: a\n");
        let config = typed("spec:\n  replicas: 2\n");

        let merged = updater
            .apply(&live, &config, &ApiVersion::new("v1"), &ManagedFields::new(), "manager1", false)
            .unwrap();
        assert_eq!(merged.object, typed("name: a\nspec:\n  replicas: 2\n"));

        let owned = merged.managers.get("manager1").unwrap();
        assert_eq!(owned.set, config.field_set());
        assert!(owned.applied);
    }

    #[test]
    fn test_empty_records_are_dropped() {
        let updater = Updater::builder().build();
        let live = typed("name: a\n");
        let merged = updater
            .update(&live, &live, &ApiVersion::new("v1"), &ManagedFields::new(), "noop")
            .unwrap();
        assert!(merged.managers.is_empty());
    }

    #[test]
    fn test_apply_rejects_other_types() {
        let updater = Updater::builder().build();
        let entry = crate::typed::ParseableType::new(&schema(), "entry")
            .from_yaml("name: x\n")
            .unwrap();
        let err = updater
            .apply(&typed("{}"), &entry, &ApiVersion::new("v1"), &ManagedFields::new(), "m", false)
            .unwrap_err();
        assert!(matches!(err, MergeError::Validation(_)));
    }
}
