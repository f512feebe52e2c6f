//! Canonical JSON rendering.

use serde_json::Value;
use std::collections::BTreeMap;

/// Serialize a `Value` to a canonical representation:
/// - object keys sorted lexicographically (byte order), recursively
/// - array element order preserved, elements canonicalized
/// - no insignificant whitespace
///
/// Independent of serde_json's `preserve_order` feature, which another crate in
/// the dependency graph may switch on.
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => value.to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let tree: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, to_canonical_json(v))).collect();
            let items: Vec<String> = tree
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), v))
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

/// Treat a string body that parses as JSON as the structured value it encodes.
///
/// Absent, null and empty-string bodies collapse to `{}`.
pub fn normalize_body(data: Option<&Value>) -> Value {
    match data {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(Value::String(s)) if s.is_empty() => Value::Object(Default::default()),
        Some(Value::String(s)) => {
            serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()))
        }
        Some(other) => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primitives() {
        assert_eq!(to_canonical_json(&json!(null)), "null");
        assert_eq!(to_canonical_json(&json!(true)), "true");
        assert_eq!(to_canonical_json(&json!(123)), "123");
        assert_eq!(to_canonical_json(&json!("hola")), "\"hola\"");
    }

    #[test]
    fn test_array_order_is_kept() {
        let val = json!([3, "a", false]);
        assert_eq!(to_canonical_json(&val), "[3,\"a\",false]");
    }

    #[test]
    fn test_nested() {
        let val = json!({ "z": [ { "y": "yes", "b": 1 }, null ], "a": { "x": 10 } });
        assert_eq!(
            to_canonical_json(&val),
            "{\"a\":{\"x\":10},\"z\":[{\"b\":1,\"y\":\"yes\"},null]}"
        );
    }

    #[test]
    fn test_keys_are_escaped() {
        let val = json!({ "a\"b": 1 });
        assert_eq!(to_canonical_json(&val), "{\"a\\\"b\":1}");
    }

    #[test]
    fn test_normalize_body() {
        assert_eq!(normalize_body(None), json!({}));
        assert_eq!(normalize_body(Some(&json!(""))), json!({}));
        assert_eq!(normalize_body(Some(&json!("{\"a\":1}"))), json!({"a": 1}));
        assert_eq!(normalize_body(Some(&json!("plain text"))), json!("plain text"));
        assert_eq!(normalize_body(Some(&json!([1, 2]))), json!([1, 2]));
    }
}
