//! Blake3 digests for request bodies.
//!
//! JSON bodies are digested over a canonical rendering (object keys sorted)
//! so that two bodies with the same content always produce the same digest.

use serde_json::Value;

/// Number of hex characters kept from a body digest
const DIGEST_LEN: usize = 16;

/// Short, order-insensitive digest of a JSON body
pub fn json_digest(value: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(value, &mut canonical);
    let hash = blake3::hash(canonical.as_bytes());
    let hex = hash.to_hex();
    hex.as_str()[..DIGEST_LEN].to_string()
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                if let Some(inner) = map.get(*key) {
                    write_canonical(inner, out);
                }
            }
            out.push('}');
        },
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        },
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_digest_ignores_key_order() {
        let a = json!({"listing": 7, "qty": 2, "meta": {"b": 1, "a": [1, 2]}});
        let b = json!({"meta": {"a": [1, 2], "b": 1}, "qty": 2, "listing": 7});
        assert_eq!(json_digest(&a), json_digest(&b));
        assert_eq!(json_digest(&a).len(), DIGEST_LEN);
    }

    #[test]
    fn test_json_digest_distinguishes_content() {
        assert_ne!(json_digest(&json!({"qty": 1})), json_digest(&json!({"qty": 2})));
        assert_ne!(json_digest(&json!([1, 2])), json_digest(&json!([2, 1])));
    }
}
