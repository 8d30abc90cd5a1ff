//! Inspection helpers for forms and items.
//!
//! Paths use the dotted syntax of field paths, with `[n]` for list indices:
//! `blocks[0].item.title`.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::diagnostics::join_path;

/// Values at one path that differ between two documents. A side is `None`
/// when the path does not exist there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Difference {
    pub left: Option<Value>,
    pub right: Option<Value>,
}

/// Deep structural diff of two JSON documents, keyed by path.
///
/// Objects are compared key by key and lists index by index; any other
/// mismatch (including a type change) is reported at the path where it
/// occurs.
pub fn find_differences(left: &Value, right: &Value) -> BTreeMap<String, Difference> {
    let mut diffs = BTreeMap::new();
    diff_into(Some(left), Some(right), String::new(), &mut diffs);
    diffs
}

fn diff_into(
    left: Option<&Value>,
    right: Option<&Value>,
    path: String,
    diffs: &mut BTreeMap<String, Difference>,
) {
    if left == right {
        return;
    }

    match (left, right) {
        (Some(Value::Array(a)), Some(Value::Array(b))) => {
            for i in 0..a.len().max(b.len()) {
                diff_into(a.get(i), b.get(i), format!("{}[{}]", path, i), diffs);
            }
        }
        (Some(Value::Object(a)), Some(Value::Object(b))) => {
            for key in a.keys().chain(b.keys().filter(|k| !a.contains_key(*k))) {
                diff_into(a.get(key), b.get(key), join_path(&path, key), diffs);
            }
        }
        _ => {
            diffs.insert(
                path,
                Difference {
                    left: left.cloned(),
                    right: right.cloned(),
                },
            );
        }
    }
}

/// Paths inside a form holding a pending relational delta: an object with
/// `create`, `update` and `delete` lists.
pub fn find_delta_paths(form: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    collect_delta_paths(form, "", &mut paths);
    paths
}

fn is_delta(value: &Value) -> bool {
    value.as_object().is_some_and(|map| {
        ["create", "update", "delete"]
            .iter()
            .all(|key| map.get(*key).is_some_and(Value::is_array))
    })
}

fn collect_delta_paths(value: &Value, path: &str, paths: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if !(child.is_object() || child.is_array()) {
                    continue;
                }
                let child_path = join_path(path, key);
                if is_delta(child) {
                    paths.push(child_path.clone());
                }
                collect_delta_paths(child, &child_path, paths);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if item.is_object() || item.is_array() {
                    collect_delta_paths(item, &format!("{}[{}]", path, i), paths);
                }
            }
        }
        _ => {}
    }
}

/// Resolve a path against a document. The empty path is the document itself.
pub fn resolve_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() {
        return Some(value);
    }

    let normalized = path.replace('[', ".").replace(']', "");
    normalized
        .split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identical_documents_have_no_differences() {
        let doc = json!({ "title": "a", "tags": [1, 2] });
        assert!(find_differences(&doc, &doc).is_empty());
    }

    #[test]
    fn test_differences_by_path() {
        let left = json!({ "title": "old", "author": { "name": "Ada" }, "tags": [1, 2], "draft": true });
        let right = json!({ "title": "new", "author": { "name": "Ada", "age": 36 }, "tags": [1] });

        let diffs = find_differences(&left, &right);

        assert_eq!(diffs.len(), 4);
        assert_eq!(
            diffs["title"],
            Difference {
                left: Some(json!("old")),
                right: Some(json!("new"))
            }
        );
        assert_eq!(
            diffs["author.age"],
            Difference {
                left: None,
                right: Some(json!(36))
            }
        );
        assert_eq!(
            diffs["tags[1]"],
            Difference {
                left: Some(json!(2)),
                right: None
            }
        );
        assert_eq!(diffs["draft"].right, None);
    }

    #[test]
    fn test_type_change_is_a_leaf_difference() {
        let diffs = find_differences(&json!({ "a": [1] }), &json!({ "a": { "0": 1 } }));
        assert_eq!(diffs.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_find_delta_paths() {
        let form = json!({
            "title": "Hello",
            "comments": { "create": [], "update": [], "delete": [3] },
            "blocks": {
                "create": [],
                "update": [
                    { "item": { "id": 7, "slides": { "create": [{}], "update": [], "delete": [] } } }
                ],
                "delete": []
            },
            "partial": { "create": [] }
        });

        assert_eq!(
            find_delta_paths(&form),
            vec![
                "blocks".to_string(),
                "blocks.update[0].item.slides".to_string(),
                "comments".to_string(),
            ]
        );
    }

    #[test]
    fn test_resolve_path() {
        let doc = json!({ "blocks": [{ "item": { "title": "Hero" } }] });

        assert_eq!(resolve_path(&doc, "blocks[0].item.title"), Some(&json!("Hero")));
        assert_eq!(resolve_path(&doc, "blocks.0.item"), Some(&json!({ "title": "Hero" })));
        assert_eq!(resolve_path(&doc, "blocks[1]"), None);
        assert_eq!(resolve_path(&doc, "blocks[0].item.title.length"), None);
        assert_eq!(resolve_path(&doc, ""), Some(&doc));
    }
}
