//! Tests for structural comparison.

#[cfg(test)]
mod tests {
    use crate::fieldpath::Path;
    use crate::typed::fixtures::*;
    use crate::typed::{ParseableType, ValidationError};
    use pretty_assertions::assert_eq;

    struct CompareTestCase {
        name: &'static str,
        lhs: &'static str,
        rhs: &'static str,
        added: Vec<Path>,
        modified: Vec<Path>,
        removed: Vec<Path>,
        modified_leaves: Vec<Path>,
    }

    fn compare_cases() -> Vec<CompareTestCase> {
        vec![
            CompareTestCase {
                name: "reordered associative entries",
                lhs: "list:\n- name: a\n  value: 1\n- name: b\ntags: [x, y]\n",
                rhs: "list:\n- name: b\n- name: a\n  value: 1\ntags: [y, x]\n",
                added: vec![],
                modified: vec![],
                removed: vec![],
                modified_leaves: vec![],
            },
            CompareTestCase {
                name: "scalar changed",
                lhs: "spec:\n  replicas: 3\n",
                rhs: "spec:\n  replicas: 4\n",
                added: vec![],
                modified: vec![path(vec![field("spec"), field("replicas")])],
                removed: vec![],
                modified_leaves: vec![path(vec![field("spec"), field("replicas")])],
            },
            CompareTestCase {
                name: "field inside an entry changed",
                lhs: "list:\n- name: a\n  value: 1\n",
                rhs: "list:\n- name: a\n  value: 2\n",
                added: vec![],
                modified: vec![
                    path(vec![field("list"), entry("a")]),
                    path(vec![field("list"), entry("a"), field("value")]),
                ],
                removed: vec![],
                modified_leaves: vec![path(vec![field("list"), entry("a"), field("value")])],
            },
            CompareTestCase {
                name: "entries added and removed",
                lhs: "list:\n- name: a\n- name: b\n",
                rhs: "list:\n- name: a\n- name: c\n",
                added: vec![
                    path(vec![field("list"), entry("c")]),
                    path(vec![field("list"), entry("c"), field("name")]),
                ],
                modified: vec![],
                removed: vec![
                    path(vec![field("list"), entry("b")]),
                    path(vec![field("list"), entry("b"), field("name")]),
                ],
                modified_leaves: vec![],
            },
            CompareTestCase {
                name: "set members",
                lhs: "tags: [t1, t2]\n",
                rhs: "tags: [t2, t3]\n",
                added: vec![path(vec![field("tags"), member("t3")])],
                modified: vec![],
                removed: vec![path(vec![field("tags"), member("t1")])],
                modified_leaves: vec![],
            },
            CompareTestCase {
                name: "atomic list reordered",
                lhs: "args: [x, y]\n",
                rhs: "args: [y, x]\n",
                added: vec![],
                modified: vec![path(vec![field("args")])],
                removed: vec![],
                modified_leaves: vec![path(vec![field("args")])],
            },
            CompareTestCase {
                name: "atomic map changed",
                lhs: "selector:\n  app: web\n",
                rhs: "selector:\n  app: db\n",
                added: vec![],
                modified: vec![path(vec![field("selector")])],
                removed: vec![],
                modified_leaves: vec![path(vec![field("selector")])],
            },
            CompareTestCase {
                name: "null replaced by a struct",
                lhs: "spec: null\n",
                rhs: "spec:\n  replicas: 1\n",
                added: vec![path(vec![field("spec"), field("replicas")])],
                modified: vec![path(vec![field("spec")])],
                removed: vec![],
                modified_leaves: vec![],
            },
            CompareTestCase {
                name: "map entries",
                lhs: "labels:\n  app: web\n  tier: front\n",
                rhs: "labels:\n  app: web\n  env: prod\n",
                added: vec![path(vec![field("labels"), field("env")])],
                modified: vec![],
                removed: vec![path(vec![field("labels"), field("tier")])],
                modified_leaves: vec![],
            },
            CompareTestCase {
                name: "whole struct removed",
                lhs: "spec:\n  replicas: 1\n  paused: true\nname: x\n",
                rhs: "name: x\n",
                added: vec![],
                modified: vec![],
                removed: vec![
                    path(vec![field("spec"), field("paused")]),
                    path(vec![field("spec"), field("replicas")]),
                ],
                modified_leaves: vec![],
            },
        ]
    }

    #[test]
    fn test_compare() {
        for tc in compare_cases() {
            let comparison = typed(tc.lhs).compare(&typed(tc.rhs)).unwrap();
            assert_eq!(comparison.added, set(tc.added), "added, case {}", tc.name);
            assert_eq!(comparison.modified, set(tc.modified), "modified, case {}", tc.name);
            assert_eq!(comparison.removed, set(tc.removed), "removed, case {}", tc.name);
            assert_eq!(
                comparison.modified_leaves(),
                set(tc.modified_leaves),
                "modified leaves, case {}",
                tc.name
            );
        }
    }

    #[test]
    fn test_compare_with_self_is_same() {
        let tv = typed("name: x\nlist:\n- name: a\n  value: 1\ntags: [a]\n");
        assert!(tv.compare(&tv).unwrap().is_same());
    }

    #[test]
    fn test_compare_rejects_other_types() {
        let root = typed("name: x\n");
        let entry = ParseableType::new(&schema(), "entry")
            .from_yaml("name: x\n")
            .unwrap();
        let err = root.compare(&entry).unwrap_err();
        assert!(matches!(
            err.iter().next(),
            Some(ValidationError::IncompatibleValues { .. })
        ));
    }

    #[test]
    fn test_exclude_drops_subtrees() {
        let mut comparison = typed("spec:\n  replicas: 1\nname: a\n")
            .compare(&typed("spec:\n  replicas: 2\n  paused: true\nname: b\n"))
            .unwrap();
        comparison.exclude(&set(vec![path(vec![field("spec")])]));
        assert!(comparison.added.is_empty());
        assert_eq!(comparison.modified, set(vec![path(vec![field("name")])]));
    }

    #[test]
    fn test_display() {
        let comparison = typed("name: a\ntags: [x]\n")
            .compare(&typed("name: b\ntags: [y]\n"))
            .unwrap();
        assert_eq!(
            comparison.to_string(),
            "- Modified Fields:\n  .name\n- Added Fields:\n  .tags[=\"y\"]\n- Removed Fields:\n  .tags[=\"x\"]"
        );
    }
}
