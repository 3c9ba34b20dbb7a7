//! Recursive cleanup of canvas JSON before it is stored.
//!
//! Exports taken from a live editor can carry references to render targets
//! and DOM nodes, private bookkeeping fields, and (through those) arbitrarily
//! deep structures. None of that can be restored, so it is stripped.

use serde_json::{Map, Value};

/// Objects nested deeper than this are replaced with `null`.
pub const MAX_DEPTH: usize = 64;

/// Keys that only ever hold live rendering state.
const TRANSIENT_KEYS: &[&str] = &[
    "canvas",
    "ctx",
    "context",
    "contextTop",
    "contextContainer",
    "element",
    "cacheCanvas",
    "ownerDocument",
    "parentNode",
    "upperCanvasEl",
    "lowerCanvasEl",
    "wrapperEl",
];

/// Whether a key is private or transient and must not be persisted.
#[must_use]
pub fn is_transient_key(key: &str) -> bool {
    key.starts_with('_') || TRANSIENT_KEYS.contains(&key)
}

fn looks_like_dom_node(map: &Map<String, Value>) -> bool {
    map.contains_key("nodeType") && (map.contains_key("nodeName") || map.contains_key("tagName"))
}

/// Strip non-persistable data from a canvas JSON value.
///
/// - keys starting with `_` and known transient keys are removed,
/// - object properties holding DOM-node-like values are removed,
/// - DOM-node-like array items become `null` (indices are preserved),
/// - anything nested deeper than [`MAX_DEPTH`] becomes `null`.
#[must_use]
pub fn sanitize(value: Value) -> Value {
    sanitize_at(value, 0)
}

fn sanitize_at(value: Value, depth: usize) -> Value {
    if depth > MAX_DEPTH {
        return Value::Null;
    }

    match value {
        Value::Object(map) => {
            if looks_like_dom_node(&map) {
                return Value::Null;
            }
            let cleaned = map
                .into_iter()
                .filter(|(key, _)| !is_transient_key(key))
                .filter(|(_, child)| !matches!(child, Value::Object(m) if looks_like_dom_node(m)))
                .map(|(key, child)| (key, sanitize_at(child, depth + 1)))
                .collect();
            Value::Object(cleaned)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| sanitize_at(item, depth + 1))
                .collect(),
        ),
        scalar => scalar,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_strips_private_and_transient_keys() {
        let cleaned = sanitize(json!({
            "type": "image",
            "_element": {"src": "x"},
            "_cacheKey": 7,
            "canvas": {"width": 10},
            "src": "data:image/png;base64,AAAA",
            "data": {"_tmp": true, "accessoryId": "hole-4"}
        }));
        assert_eq!(
            cleaned,
            json!({
                "type": "image",
                "src": "data:image/png;base64,AAAA",
                "data": {"accessoryId": "hole-4"}
            })
        );
    }

    #[test]
    fn test_removes_dom_nodes() {
        let cleaned = sanitize(json!({
            "img": {"nodeType": 1, "tagName": "IMG"},
            "list": [1, {"nodeType": 3, "nodeName": "#text"}, "ok"],
            "notDom": {"nodeType": "custom"}
        }));
        assert_eq!(
            cleaned,
            json!({"list": [1, null, "ok"], "notDom": {"nodeType": "custom"}})
        );
    }

    #[test]
    fn test_truncates_deep_nesting() {
        let mut value = json!("leaf");
        for _ in 0..(MAX_DEPTH + 5) {
            value = json!({ "child": value });
        }
        let cleaned = sanitize(value);

        let mut depth = 0;
        let mut cursor = &cleaned;
        while let Some(child) = cursor.get("child") {
            cursor = child;
            depth += 1;
        }
        assert!(cursor.is_null());
        assert!(depth <= MAX_DEPTH + 1);
    }

    #[test]
    fn test_scalars_untouched() {
        assert_eq!(sanitize(json!(3.5)), json!(3.5));
        assert_eq!(sanitize(json!(null)), json!(null));
    }
}
