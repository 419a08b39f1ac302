/*
 *  Copyright 2025-2026 Taskmill Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Deduplication Key Derivation
//!
//! Computes the deterministic fingerprint that collapses duplicate task
//! creation requests into a single row. The key is a SHA-256 digest over
//! the type name and a canonical encoding of the parameter payload,
//! separated by a NUL byte (which cannot appear in either component, so
//! `("ab", "c")` and `("a", "bc")` never collide).
//!
//! Canonicalization sorts object keys recursively before serializing, so
//! two semantically identical payloads that differ only in key order
//! derive the same key.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Derives the dedupe key for a `(type_name, params)` pair.
///
/// Pure function, no I/O. Returns a 64-character lowercase hex string.
pub fn derive_key(type_name: &str, params: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(type_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical_json(params).as_bytes());
    hex::encode(hasher.finalize())
}

/// Serializes a JSON value with object keys in sorted order at every level.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(k).unwrap_or_default(),
                        canonical_json(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let elements: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", elements.join(","))
        }
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_is_stable_for_identical_inputs() {
        let params = json!({"message": "hi"});
        assert_eq!(
            derive_key("Demo.Echo", &params),
            derive_key("Demo.Echo", &params)
        );
    }

    #[test]
    fn key_ignores_object_key_order() {
        let a = json!({"b": 2, "a": 1, "nested": {"y": true, "x": false}});
        let b = json!({"a": 1, "nested": {"x": false, "y": true}, "b": 2});
        assert_eq!(derive_key("Demo.Echo", &a), derive_key("Demo.Echo", &b));
    }

    #[test]
    fn key_differs_across_types_and_params() {
        let params = json!({"message": "hi"});
        assert_ne!(
            derive_key("Demo.Echo", &params),
            derive_key("Demo.Reverse", &params)
        );
        assert_ne!(
            derive_key("Demo.Echo", &params),
            derive_key("Demo.Echo", &json!({"message": "bye"}))
        );
    }

    #[test]
    fn separator_prevents_boundary_ambiguity() {
        assert_ne!(
            derive_key("ab", &json!("c")),
            derive_key("a", &json!("bc"))
        );
    }

    #[test]
    fn array_order_is_significant() {
        assert_ne!(
            derive_key("t", &json!([1, 2])),
            derive_key("t", &json!([2, 1]))
        );
    }

    #[test]
    fn key_is_hex_sha256() {
        let key = derive_key("Demo.Echo", &json!({}));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
