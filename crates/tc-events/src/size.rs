//! Payload size bounding.
//!
//! Size is measured on a canonical serialization (object keys sorted at every
//! level, no whitespace), so it does not depend on map iteration order.

use serde_json::{json, Value};

/// Canonical JSON text of `value`.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Longest prefix of `text` that fits in `limit` bytes without splitting a
/// character.
pub fn clip_to_bytes(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Marker that replaces an oversized payload.
///
/// `serialized` is the canonical serialization that exceeded `limit`.
pub fn truncated_payload(serialized: &str, limit: usize) -> Value {
    json!({
        "truncated": true,
        "approxBytes": serialized.len(),
        "preview": clip_to_bytes(serialized, limit),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_canonical_sorts_keys() {
        let value = json!({"b": 1, "a": {"d": [1, "x"], "c": null}});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":{"c":null,"d":[1,"x"]},"b":1}"#
        );
    }

    #[test]
    fn test_canonical_escapes_keys_and_strings() {
        let value = json!({"q\"k": "line\nbreak"});
        assert_eq!(canonical_json(&value), r#"{"q\"k":"line\nbreak"}"#);
    }

    #[test]
    fn test_clip_respects_char_boundary() {
        // "é" is two bytes
        assert_eq!(clip_to_bytes("aé", 2), "a");
        assert_eq!(clip_to_bytes("aé", 3), "aé");
        assert_eq!(clip_to_bytes("abc", 0), "");
    }

    #[test]
    fn test_truncated_payload_shape() {
        let serialized = canonical_json(&json!({"blob": "x".repeat(100)}));
        let marker = truncated_payload(&serialized, 16);
        assert_eq!(marker["truncated"], true);
        assert_eq!(marker["approxBytes"], serialized.len());
        assert_eq!(marker["preview"].as_str().unwrap(), &serialized[..16]);
    }

    proptest! {
        #[test]
        fn prop_clip_never_exceeds_limit(text in "\\PC{0,40}", limit in 0usize..64) {
            let clipped = clip_to_bytes(&text, limit);
            prop_assert!(clipped.len() <= limit);
            prop_assert!(text.starts_with(clipped));
        }
    }
}
