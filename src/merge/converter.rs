//! Conversion between API versions.

use crate::fieldpath::{ApiVersion, FieldSet, VersionedSet};
use crate::typed::TypedValue;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use thiserror::Error;

/// Converter translates objects between API versions of one schema family.
pub trait Converter: Send + Sync {
    /// Converts `object` to `version`. The source version is implied by the
    /// object's type.
    fn convert(&self, object: &TypedValue, version: &ApiVersion) -> Result<TypedValue, ConversionError>;

    /// Returns true if `err` means the requested version does not exist.
    fn is_missing_version_error(&self, err: &ConversionError) -> bool {
        err.is_missing_version()
    }
}

/// ConversionError is returned by a [`Converter`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("no conversion to version {0}")]
    MissingVersion(ApiVersion),

    #[error("conversion to {version} failed: {message}")]
    Failed { version: ApiVersion, message: String },
}

impl ConversionError {
    pub fn is_missing_version(&self) -> bool {
        matches!(self, ConversionError::MissingVersion(_))
    }
}

/// Converts a field set recorded against `object`'s version to `version`.
///
/// The set is turned into the smallest value carrying it, that value is
/// converted, and the reachable paths of the result are the new set.
/// `object` only supplies the schema and type of the source version.
pub fn convert_field_set(
    converter: &dyn Converter,
    object: &TypedValue,
    set: &FieldSet,
    version: &ApiVersion,
) -> Result<FieldSet, ConversionError> {
    if set.is_empty() {
        return Ok(FieldSet::new());
    }
    let skeleton = object.skeleton(set);
    Ok(converter.convert(&skeleton, version)?.field_set())
}

/// VersionBridge moves recorded sets in and out of the version of a single
/// call. Without a converter every version shares one coordinate system.
pub(crate) struct VersionBridge<'a> {
    converter: Option<&'a dyn Converter>,
    live: &'a TypedValue,
    version: &'a ApiVersion,
    templates: BTreeMap<ApiVersion, TypedValue>,
}

impl<'a> VersionBridge<'a> {
    pub(crate) fn new(
        converter: Option<&'a dyn Converter>,
        live: &'a TypedValue,
        version: &'a ApiVersion,
    ) -> Self {
        VersionBridge {
            converter,
            live,
            version,
            templates: BTreeMap::new(),
        }
    }

    pub(crate) fn is_missing_version(&self, err: &ConversionError) -> bool {
        match self.converter {
            Some(converter) => converter.is_missing_version_error(err),
            None => err.is_missing_version(),
        }
    }

    /// Re-expresses a recorded set at the version of the call.
    pub(crate) fn incoming(&mut self, recorded: &VersionedSet) -> Result<FieldSet, ConversionError> {
        let Some(converter) = self.converter else {
            return Ok(recorded.set.clone());
        };
        if &recorded.api_version == self.version {
            return Ok(recorded.set.clone());
        }
        let version = self.version;
        let template = self.template(converter, &recorded.api_version)?;
        convert_field_set(converter, template, &recorded.set, version)
    }

    /// Expresses a set computed at the version of the call at `target`.
    pub(crate) fn outgoing(&self, set: &FieldSet, target: &ApiVersion) -> Result<FieldSet, ConversionError> {
        match self.converter {
            Some(converter) if target != self.version => {
                convert_field_set(converter, self.live, set, target)
            }
            _ => Ok(set.clone()),
        }
    }

    /// The live object at `version`, converted once per call.
    fn template(
        &mut self,
        converter: &dyn Converter,
        version: &ApiVersion,
    ) -> Result<&TypedValue, ConversionError> {
        let live = self.live;
        match self.templates.entry(version.clone()) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => Ok(&*entry.insert(converter.convert(live, version)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::fixtures::*;
    use pretty_assertions::assert_eq;

    struct Only(&'static str);

    impl Converter for Only {
        fn convert(&self, object: &TypedValue, version: &ApiVersion) -> Result<TypedValue, ConversionError> {
            if version.as_str() == self.0 {
                Ok(object.clone())
            } else {
                Err(ConversionError::MissingVersion(version.clone()))
            }
        }
    }

    #[test]
    fn test_missing_version_is_distinguished() {
        let missing = ConversionError::MissingVersion(ApiVersion::new("v9"));
        let failed = ConversionError::Failed {
            version: ApiVersion::new("v1"),
            message: "bad".to_string(),
        };
        assert!(Only("v1").is_missing_version_error(&missing));
        assert!(!Only("v1").is_missing_version_error(&failed));
        assert_eq!(failed.to_string(), "conversion to v1 failed: bad");
    }

    #[test]
    fn test_bridge_without_converter_keeps_sets() {
        let live = typed("name: x\n");
        let version = ApiVersion::new("v1");
        let mut bridge = VersionBridge::new(None, &live, &version);
        let recorded = VersionedSet::new(
            set(vec![path(vec![field("name")])]),
            ApiVersion::new("v7"),
            true,
        );
        assert_eq!(bridge.incoming(&recorded).unwrap(), recorded.set);
        assert_eq!(
            bridge.outgoing(&recorded.set, &ApiVersion::new("v7")).unwrap(),
            recorded.set
        );
    }

    #[test]
    fn test_bridge_reports_unreachable_versions() {
        let live = typed("name: x\n");
        let version = ApiVersion::new("v1");
        let converter = Only("v1");
        let mut bridge = VersionBridge::new(Some(&converter), &live, &version);

        let same = VersionedSet::new(set(vec![path(vec![field("name")])]), version.clone(), false);
        assert_eq!(bridge.incoming(&same).unwrap(), same.set);

        let old = VersionedSet::new(same.set.clone(), ApiVersion::new("v0"), false);
        let err = bridge.incoming(&old).unwrap_err();
        assert!(bridge.is_missing_version(&err));
    }

    #[test]
    fn test_convert_field_set_through_identity() {
        let live = typed("list:\n- name: a\n  value: 1\ntags: [t]\n");
        let fields = live.field_set();
        let converted =
            convert_field_set(&Only("v2"), &live, &fields, &ApiVersion::new("v2")).unwrap();
        assert_eq!(converted, fields);
    }
}
