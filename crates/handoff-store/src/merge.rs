// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure JSON merge semantics: field-level deep merge and array union.

use serde_json::Value;

/// Deep-merges `patch` into `base`.
///
/// Object fields merge recursively; any other value (including arrays)
/// replaces the existing one wholesale. Matches the merge-set contract of
/// the document store the original system ran against.
pub fn deep_merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}

/// Appends each of `items` to `existing` unless an equal value is already
/// present (array-union semantics). Order of first appearance is preserved.
pub fn array_union(existing: &mut Vec<Value>, items: Vec<Value>) {
    for item in items {
        if !existing.contains(&item) {
            existing.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_preserves_unmentioned_fields() {
        let mut base = json!({"userName": "Ada", "status": "pending", "nested": {"a": 1}});
        deep_merge(
            &mut base,
            json!({"status": "resolved", "nested": {"b": 2}}),
        );
        assert_eq!(
            base,
            json!({"userName": "Ada", "status": "resolved", "nested": {"a": 1, "b": 2}})
        );
    }

    #[test]
    fn deep_merge_replaces_arrays_wholesale() {
        let mut base = json!({"tags": [1, 2, 3]});
        deep_merge(&mut base, json!({"tags": [4]}));
        assert_eq!(base, json!({"tags": [4]}));
    }

    #[test]
    fn deep_merge_into_non_object_overwrites() {
        let mut base = json!("scalar");
        deep_merge(&mut base, json!({"a": 1}));
        assert_eq!(base, json!({"a": 1}));
    }

    #[test]
    fn array_union_skips_duplicates() {
        let mut existing = vec![json!({"text": "hi", "sender": "user"})];
        array_union(
            &mut existing,
            vec![
                json!({"text": "hi", "sender": "user"}),
                json!({"text": "yo", "sender": "bot"}),
            ],
        );
        assert_eq!(existing.len(), 2);
        assert_eq!(existing[1]["text"], "yo");
    }

    #[test]
    fn array_union_is_idempotent() {
        let items = vec![json!(1), json!(2)];
        let mut existing = Vec::new();
        array_union(&mut existing, items.clone());
        array_union(&mut existing, items);
        assert_eq!(existing, vec![json!(1), json!(2)]);
    }
}
