//! JSON wire format for field sets and managed fields.
//!
//! A field set is a nested JSON object. Every key is a path element:
//! `f:<name>` for a field, `k:<json object>` for an associative list entry
//! and `v:<json value>` for a set member. A `"."` key inside an object marks
//! the object's own path as a member of the set.

use super::path::{KeyFields, PathElement};
use super::set::FieldSet;
use super::{ApiVersion, ManagedFields, VersionedSet};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

type JsonObject = serde_json::Map<String, serde_json::Value>;

/// SerializeError reports malformed wire data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializeError {
    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("path element {0:?} must be at least 2 characters long")]
    ShortElement(String),

    #[error("unknown path element type in {0:?}")]
    UnknownElement(String),

    #[error("key element {0:?} must be a JSON object")]
    KeyNotObject(String),

    #[error("expected a JSON object under {0:?}")]
    ExpectedObject(String),

    #[error("manager {0:?} appears more than once")]
    DuplicateManager(String),
}

impl From<serde_json::Error> for SerializeError {
    fn from(e: serde_json::Error) -> Self {
        SerializeError::Json(e.to_string())
    }
}

/// Serializes a path element to its `f:`, `k:` or `v:` form.
pub fn serialize_path_element(pe: &PathElement) -> Result<String, SerializeError> {
    match pe {
        PathElement::Field(name) => Ok(format!("f:{}", name)),
        PathElement::Key(key) => {
            let object: BTreeMap<&str, &Value> = key.iter().collect();
            Ok(format!("k:{}", serde_json::to_string(&object)?))
        }
        PathElement::Value(v) => Ok(format!("v:{}", serde_json::to_string(v)?)),
    }
}

/// Parses a path element from its `f:`, `k:` or `v:` form.
pub fn deserialize_path_element(s: &str) -> Result<PathElement, SerializeError> {
    let (Some(prefix), Some(content)) = (s.get(..2), s.get(2..)) else {
        return Err(SerializeError::ShortElement(s.to_string()));
    };
    match prefix {
        "f:" => Ok(PathElement::field(content)),
        "v:" => Ok(PathElement::Value(serde_json::from_str(content)?)),
        "k:" => {
            let fields: BTreeMap<String, Value> = serde_json::from_str(content)
                .map_err(|_| SerializeError::KeyNotObject(s.to_string()))?;
            Ok(PathElement::Key(KeyFields::new(fields)))
        }
        _ => Err(SerializeError::UnknownElement(s.to_string())),
    }
}

impl FieldSet {
    /// Serializes the set to compact JSON.
    pub fn to_json(&self) -> Result<String, SerializeError> {
        Ok(serde_json::to_string(&self.to_json_value()?)?)
    }

    /// Parses a set from JSON. Path elements of unknown type are dropped.
    pub fn from_json(json: &str) -> Result<FieldSet, SerializeError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        FieldSet::from_json_value(&value)
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value, SerializeError> {
        let mut object = self.to_object(false)?;
        if self.root {
            object.insert(".".to_string(), serde_json::Value::Object(JsonObject::new()));
        }
        Ok(serde_json::Value::Object(object))
    }

    pub fn from_json_value(value: &serde_json::Value) -> Result<FieldSet, SerializeError> {
        let object = value
            .as_object()
            .ok_or_else(|| SerializeError::ExpectedObject(".".to_string()))?;
        let (mut set, _) = parse_object(object)?;
        set.root = object.contains_key(".");
        Ok(set)
    }

    fn to_object(&self, is_member: bool) -> Result<JsonObject, SerializeError> {
        let mut object = JsonObject::new();
        if is_member && !(self.members.is_empty() && self.children.is_empty()) {
            object.insert(".".to_string(), serde_json::Value::Object(JsonObject::new()));
        }
        for member in &self.members {
            if !self.children.contains_key(member) {
                object.insert(
                    serialize_path_element(member)?,
                    serde_json::Value::Object(JsonObject::new()),
                );
            }
        }
        for (element, child) in &self.children {
            let child_object = child.to_object(self.members.contains(element))?;
            object.insert(
                serialize_path_element(element)?,
                serde_json::Value::Object(child_object),
            );
        }
        Ok(object)
    }
}

/// Returns the set below an object and whether the object's own path is a
/// member.
fn parse_object(object: &JsonObject) -> Result<(FieldSet, bool), SerializeError> {
    let mut set = FieldSet::new();
    let mut is_member = object.is_empty();
    for (key, value) in object {
        if key == "." {
            is_member = true;
            continue;
        }
        let element = match deserialize_path_element(key) {
            Ok(element) => element,
            Err(SerializeError::UnknownElement(_)) => continue,
            Err(e) => return Err(e),
        };
        let child_object = value
            .as_object()
            .ok_or_else(|| SerializeError::ExpectedObject(key.clone()))?;
        let (child, child_is_member) = parse_object(child_object)?;
        if child_is_member {
            set.members.insert(element.clone());
        }
        if !child.is_empty() {
            set.children.insert(element, child);
        }
    }
    Ok((set, is_member))
}

/// Operation records which kind of call last wrote a manager's set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Apply,
    Update,
}

/// ManagedFieldsEntry is one manager's record on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedFieldsEntry {
    pub manager: String,
    pub operation: Operation,
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    #[serde(rename = "fieldsV1")]
    pub fields_v1: serde_json::Value,
}

impl ManagedFields {
    /// Converts the ledger to wire entries, sorted by manager.
    pub fn to_entries(&self) -> Result<Vec<ManagedFieldsEntry>, SerializeError> {
        self.iter()
            .map(|(manager, versioned)| {
                Ok(ManagedFieldsEntry {
                    manager: manager.to_string(),
                    operation: if versioned.applied {
                        Operation::Apply
                    } else {
                        Operation::Update
                    },
                    api_version: versioned.api_version.as_str().to_string(),
                    fields_v1: versioned.set.to_json_value()?,
                })
            })
            .collect()
    }

    /// Builds a ledger from wire entries.
    pub fn from_entries(entries: &[ManagedFieldsEntry]) -> Result<ManagedFields, SerializeError> {
        let mut managed = ManagedFields::new();
        for entry in entries {
            if managed.contains(&entry.manager) {
                return Err(SerializeError::DuplicateManager(entry.manager.clone()));
            }
            managed.insert(
                entry.manager.clone(),
                VersionedSet::new(
                    FieldSet::from_json_value(&entry.fields_v1)?,
                    ApiVersion::new(entry.api_version.clone()),
                    entry.operation == Operation::Apply,
                ),
            );
        }
        Ok(managed)
    }

    /// Serializes the ledger to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SerializeError> {
        Ok(serde_json::to_string_pretty(&self.to_entries()?)?)
    }

    pub fn from_json(json: &str) -> Result<ManagedFields, SerializeError> {
        let entries: Vec<ManagedFieldsEntry> = serde_json::from_str(json)?;
        ManagedFields::from_entries(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fieldpath::Path;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_path_element_forms() {
        let cases = vec![
            (PathElement::field("foo"), "f:foo"),
            (PathElement::value("aa"), r#"v:"aa""#),
            (PathElement::value(Value::Int(2)), "v:2"),
            (PathElement::value(true), "v:true"),
            (
                PathElement::key(vec![("protocol", Value::string("tcp")), ("port", Value::Int(443))]),
                r#"k:{"port":443,"protocol":"tcp"}"#,
            ),
        ];
        for (pe, expected) in cases {
            assert_eq!(serialize_path_element(&pe).unwrap(), expected);
            assert_eq!(deserialize_path_element(expected).unwrap(), pe);
        }
    }

    #[test]
    fn test_bad_path_elements() {
        assert!(matches!(deserialize_path_element("f"), Err(SerializeError::ShortElement(_))));
        assert!(matches!(deserialize_path_element("k:[1]"), Err(SerializeError::KeyNotObject(_))));
        assert!(matches!(deserialize_path_element("i:1"), Err(SerializeError::UnknownElement(_))));
    }

    #[test]
    fn test_golden_sets_are_stable() {
        let examples = [
            r#"{"f:aaa":{},"f:aab":{}}"#,
            r#"{"f:a":{"f:b":{}}}"#,
            r#"{"f:list":{".":{},"k:{\"name\":\"a\"}":{".":{},"f:name":{},"f:value":{}}}}"#,
            r#"{"f:set":{"v:\"x\"":{},"v:1":{},"v:true":{}}}"#,
        ];
        for example in examples {
            let set = FieldSet::from_json(example).unwrap();
            assert_eq!(set.to_json().unwrap(), example);
        }
    }

    #[test]
    fn test_membership_marker() {
        let set = FieldSet::from_json(r#"{"f:list":{".":{},"f:x":{}}}"#).unwrap();
        let list = Path::from_elements(vec![PathElement::field("list")]);
        assert!(set.has(&list));
        assert!(set.has(&list.child(PathElement::field("x"))));
        assert_eq!(set.len(), 2);

        let set = FieldSet::from_json(r#"{"f:list":{"f:x":{}}}"#).unwrap();
        assert!(!set.has(&list));
    }

    #[test]
    fn test_empty_and_root_sets_differ() {
        assert_eq!(FieldSet::new().to_json().unwrap(), "{}");
        assert!(FieldSet::from_json("{}").unwrap().is_empty());

        let root: FieldSet = vec![Path::root()].into_iter().collect();
        assert_eq!(root.to_json().unwrap(), r#"{".":{}}"#);
        assert_eq!(FieldSet::from_json(r#"{".":{}}"#).unwrap(), root);
    }

    #[test]
    fn test_unknown_elements_are_dropped() {
        let set = FieldSet::from_json(r#"{"f:aaa":{},"r:aab":{}}"#).unwrap();
        assert_eq!(set.to_json().unwrap(), r#"{"f:aaa":{}}"#);
    }

    #[test]
    fn test_managed_fields_wire_format() {
        let json = r#"[
  {
    "manager": "controller",
    "operation": "Update",
    "apiVersion": "v1",
    "fieldsV1": {
      "f:status": {}
    }
  },
  {
    "manager": "kubectl",
    "operation": "Apply",
    "apiVersion": "v2",
    "fieldsV1": {
      "f:spec": {
        "f:replicas": {}
      }
    }
  }
]"#;
        let managed = ManagedFields::from_json(json).unwrap();
        assert_eq!(managed.len(), 2);
        let kubectl = managed.get("kubectl").unwrap();
        assert!(kubectl.applied);
        assert_eq!(kubectl.api_version, ApiVersion::new("v2"));
        assert!(!managed.get("controller").unwrap().applied);
        assert_eq!(managed.to_json().unwrap(), json);
    }

    #[test]
    fn test_duplicate_manager_rejected() {
        let json = r#"[
            {"manager": "a", "operation": "Apply", "apiVersion": "v1", "fieldsV1": {}},
            {"manager": "a", "operation": "Update", "apiVersion": "v1", "fieldsV1": {}}
        ]"#;
        assert_eq!(
            ManagedFields::from_json(json),
            Err(SerializeError::DuplicateManager("a".to_string()))
        );
    }
}
