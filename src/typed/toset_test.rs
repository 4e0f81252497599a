//! Tests for field sets, value lookup and skeleton reconstruction.

#[cfg(test)]
mod tests {
    use crate::fieldpath::Path;
    use crate::typed::fixtures::*;
    use crate::value::{self, Value};
    use pretty_assertions::assert_eq;

    const GRAB_BAG: &str = r#"
name: x
spec:
  replicas: 3
  template: {}
list:
- name: a
  value: 1
- name: b
tags: [t1, t2]
args: [x, y]
labels:
  app: web
selector:
  app: web
"#;

    struct ToSetTestCase {
        name: &'static str,
        object: &'static str,
        set: Vec<Path>,
    }

    fn to_set_cases() -> Vec<ToSetTestCase> {
        vec![
            ToSetTestCase {
                name: "empty object",
                object: "{}",
                set: vec![],
            },
            ToSetTestCase {
                name: "grab bag",
                object: GRAB_BAG,
                set: vec![
                    path(vec![field("name")]),
                    path(vec![field("spec"), field("replicas")]),
                    path(vec![field("spec"), field("template")]),
                    path(vec![field("list"), entry("a")]),
                    path(vec![field("list"), entry("a"), field("name")]),
                    path(vec![field("list"), entry("a"), field("value")]),
                    path(vec![field("list"), entry("b")]),
                    path(vec![field("list"), entry("b"), field("name")]),
                    path(vec![field("tags"), member("t1")]),
                    path(vec![field("tags"), member("t2")]),
                    path(vec![field("args")]),
                    path(vec![field("labels"), field("app")]),
                    path(vec![field("selector")]),
                ],
            },
            ToSetTestCase {
                name: "nulls and empty containers are leaves",
                object: "spec: null\nlist: []\nlabels: {}\n",
                set: vec![
                    path(vec![field("spec")]),
                    path(vec![field("list")]),
                    path(vec![field("labels")]),
                ],
            },
            ToSetTestCase {
                name: "nested struct",
                object: "spec:\n  template:\n    template:\n      paused: true\n",
                set: vec![path(vec![
                    field("spec"),
                    field("template"),
                    field("template"),
                    field("paused"),
                ])],
            },
        ]
    }

    #[test]
    fn test_to_field_set() {
        for tc in to_set_cases() {
            let got = typed(tc.object).field_set();
            assert_eq!(got, set(tc.set), "case {}", tc.name);
        }
    }

    #[test]
    fn test_field_set_ignores_list_order() {
        let a = typed("list:\n- name: a\n- name: b\ntags: [x, y]\n");
        let b = typed("list:\n- name: b\n- name: a\ntags: [y, x]\n");
        assert_eq!(a.field_set(), b.field_set());
    }

    #[test]
    fn test_value_at() {
        let tv = typed(GRAB_BAG);
        assert_eq!(
            tv.value_at(&path(vec![field("list"), entry("a"), field("value")])),
            Some(&Value::Int(1))
        );
        assert_eq!(
            tv.value_at(&path(vec![field("tags"), member("t2")])),
            Some(&Value::string("t2"))
        );
        assert_eq!(
            tv.value_at(&path(vec![field("spec"), field("template")])),
            Some(&Value::Map(Default::default()))
        );
        assert_eq!(tv.value_at(&path(vec![field("list"), entry("zz")])), None);
        assert_eq!(tv.value_at(&path(vec![field("spec"), field("paused")])), None);
        assert_eq!(tv.value_at(&Path::root()), Some(tv.value()));
    }

    #[test]
    fn test_skeleton_carries_exactly_the_set() {
        let tv = typed(GRAB_BAG);
        let fields = tv.field_set();
        let skeleton = tv.skeleton(&fields);
        assert_eq!(skeleton.field_set(), fields);
    }

    #[test]
    fn test_skeleton_fills_keys_and_drops_unknown_paths() {
        let tv = typed("{}");
        let fields = set(vec![
            path(vec![field("list"), entry("a"), field("value")]),
            path(vec![field("tags"), member("t1")]),
            path(vec![field("spec"), field("replicas")]),
            path(vec![field("nope"), field("x")]),
            path(vec![field("tags"), entry("wrong")]),
        ]);
        let expected = value::from_yaml(
            "list:\n- name: a\n  value: null\ntags: [t1]\nspec:\n  replicas: null\n",
        )
        .unwrap();
        assert_eq!(tv.skeleton(&fields).value(), &expected);
    }
}
