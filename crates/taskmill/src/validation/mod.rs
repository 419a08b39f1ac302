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

//! Parameter Schema Validation
//!
//! Validates a parameter payload against the JSON-Schema-like document
//! registered on its task type. The supported keyword set is deliberately
//! small: primitive `type` checks, `required`, nested `properties`,
//! `additionalProperties`, `items`, `minLength`/`maxLength`/`pattern` for
//! strings, `minimum`/`maximum` for numbers, `minItems`/`maxItems` for
//! arrays, and `enum`. Composition keywords (`$ref`, `allOf`, `anyOf`,
//! `oneOf`) and `format` are not supported.
//!
//! Validation collects every violation rather than stopping at the first,
//! and each message carries the offending field path (e.g. `params.age`)
//! so callers can fix all problems in one round trip. The validator is
//! stateless and never mutates its inputs.

use regex::Regex;
use serde_json::Value;

/// Root path prefix used in violation messages.
const ROOT: &str = "params";

/// Validates `document` against `schema`, returning all violations.
///
/// An empty `Ok(())` means the payload conforms. Schema documents that
/// are not objects are treated as unconstrained (everything passes),
/// matching the permissive behavior of an absent schema.
pub fn validate(document: &Value, schema: &Value) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    check_value(document, schema, ROOT, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_value(value: &Value, schema: &Value, path: &str, errors: &mut Vec<String>) {
    let schema = match schema.as_object() {
        Some(s) => s,
        None => return,
    };

    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !type_matches(value, expected) {
            errors.push(format!(
                "{}: expected type '{}', got '{}'",
                path,
                expected,
                type_name(value)
            ));
            // Remaining keywords assume the declared type; bail on this node.
            return;
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            errors.push(format!("{}: value is not one of the allowed values", path));
        }
    }

    match value {
        Value::Object(map) => {
            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for name in required.iter().filter_map(Value::as_str) {
                    if !map.contains_key(name) {
                        errors.push(format!("{}.{}: required field is missing", path, name));
                    }
                }
            }

            let properties = schema.get("properties").and_then(Value::as_object);
            if let Some(properties) = properties {
                for (name, child_schema) in properties {
                    if let Some(child) = map.get(name) {
                        let child_path = format!("{}.{}", path, name);
                        check_value(child, child_schema, &child_path, errors);
                    }
                }
            }

            if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
                for name in map.keys() {
                    let declared = properties.is_some_and(|p| p.contains_key(name));
                    if !declared {
                        errors.push(format!("{}.{}: field is not allowed", path, name));
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
                if (items.len() as u64) < min {
                    errors.push(format!(
                        "{}: array has {} items, fewer than minimum {}",
                        path,
                        items.len(),
                        min
                    ));
                }
            }
            if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
                if (items.len() as u64) > max {
                    errors.push(format!(
                        "{}: array has {} items, more than maximum {}",
                        path,
                        items.len(),
                        max
                    ));
                }
            }
            if let Some(item_schema) = schema.get("items") {
                for (index, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, index);
                    check_value(item, item_schema, &item_path, errors);
                }
            }
        }
        Value::String(s) => {
            let length = s.chars().count() as u64;
            if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
                if length < min {
                    errors.push(format!(
                        "{}: string length {} is shorter than minimum {}",
                        path, length, min
                    ));
                }
            }
            if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
                if length > max {
                    errors.push(format!(
                        "{}: string length {} is longer than maximum {}",
                        path, length, max
                    ));
                }
            }
            if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
                match Regex::new(pattern) {
                    Ok(re) => {
                        if !re.is_match(s) {
                            errors.push(format!(
                                "{}: string does not match pattern '{}'",
                                path, pattern
                            ));
                        }
                    }
                    Err(_) => {
                        errors.push(format!("{}: schema pattern '{}' is invalid", path, pattern));
                    }
                }
            }
        }
        Value::Number(n) => {
            if let Some(value) = n.as_f64() {
                if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
                    if value < min {
                        errors.push(format!("{}: {} is less than minimum {}", path, value, min));
                    }
                }
                if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
                    if value > max {
                        errors.push(format!("{}: {} is greater than maximum {}", path, value, max));
                    }
                }
            }
        }
        _ => {}
    }
}

fn type_matches(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        // Unknown type names constrain nothing.
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_required_field_reports_its_path() {
        let schema = json!({
            "type": "object",
            "required": ["message"],
            "properties": {"message": {"type": "string"}}
        });
        let errors = validate(&json!({}), &schema).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("params.message:"));
    }

    #[test]
    fn conforming_document_passes() {
        let schema = json!({
            "type": "object",
            "required": ["message"],
            "properties": {
                "message": {"type": "string", "minLength": 1},
                "count": {"type": "integer", "minimum": 0}
            }
        });
        assert!(validate(&json!({"message": "hi", "count": 3}), &schema).is_ok());
    }

    #[test]
    fn all_violations_are_collected() {
        let schema = json!({
            "type": "object",
            "required": ["a", "b"],
            "properties": {
                "c": {"type": "integer", "maximum": 10}
            }
        });
        let errors = validate(&json!({"c": 99}), &schema).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("params.a")));
        assert!(errors.iter().any(|e| e.contains("params.b")));
        assert!(errors.iter().any(|e| e.contains("params.c")));
    }

    #[test]
    fn type_mismatch_names_both_types() {
        let schema = json!({"type": "object", "properties": {"n": {"type": "integer"}}});
        let errors = validate(&json!({"n": "five"}), &schema).unwrap_err();
        assert_eq!(
            errors,
            vec!["params.n: expected type 'integer', got 'string'"]
        );
    }

    #[test]
    fn additional_properties_false_rejects_undeclared_fields() {
        let schema = json!({
            "type": "object",
            "properties": {"known": {"type": "string"}},
            "additionalProperties": false
        });
        let errors = validate(&json!({"known": "x", "extra": 1}), &schema).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("params.extra"));
    }

    #[test]
    fn string_bounds_and_pattern() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "minLength": 2, "maxLength": 4, "pattern": "^[a-z]+$"}
            }
        });
        assert!(validate(&json!({"name": "ab"}), &schema).is_ok());
        assert!(validate(&json!({"name": "a"}), &schema).is_err());
        assert!(validate(&json!({"name": "abcde"}), &schema).is_err());
        assert!(validate(&json!({"name": "AB"}), &schema).is_err());
    }

    #[test]
    fn numeric_bounds_are_inclusive() {
        let schema = json!({
            "type": "object",
            "properties": {"pct": {"type": "number", "minimum": 0, "maximum": 100}}
        });
        assert!(validate(&json!({"pct": 0}), &schema).is_ok());
        assert!(validate(&json!({"pct": 100}), &schema).is_ok());
        assert!(validate(&json!({"pct": -0.5}), &schema).is_err());
        assert!(validate(&json!({"pct": 100.5}), &schema).is_err());
    }

    #[test]
    fn array_items_validated_with_indices() {
        let schema = json!({
            "type": "object",
            "properties": {
                "tags": {
                    "type": "array",
                    "minItems": 1,
                    "maxItems": 3,
                    "items": {"type": "string"}
                }
            }
        });
        assert!(validate(&json!({"tags": ["a", "b"]}), &schema).is_ok());

        let errors = validate(&json!({"tags": ["a", 2]}), &schema).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("params.tags[1]"));

        assert!(validate(&json!({"tags": []}), &schema).is_err());
        assert!(validate(&json!({"tags": ["a", "b", "c", "d"]}), &schema).is_err());
    }

    #[test]
    fn enum_membership() {
        let schema = json!({
            "type": "object",
            "properties": {"mode": {"enum": ["fast", "slow"]}}
        });
        assert!(validate(&json!({"mode": "fast"}), &schema).is_ok());
        assert!(validate(&json!({"mode": "medium"}), &schema).is_err());
    }

    #[test]
    fn nested_objects_recurse() {
        let schema = json!({
            "type": "object",
            "properties": {
                "outer": {
                    "type": "object",
                    "required": ["inner"],
                    "properties": {"inner": {"type": "boolean"}}
                }
            }
        });
        let errors = validate(&json!({"outer": {}}), &schema).unwrap_err();
        assert!(errors[0].contains("params.outer.inner"));
    }

    #[test]
    fn non_object_schema_constrains_nothing() {
        assert!(validate(&json!({"anything": 1}), &json!(true)).is_ok());
        assert!(validate(&json!(42), &json!(null)).is_ok());
    }

    #[test]
    fn integer_accepts_whole_numbers_only() {
        let schema = json!({"type": "object", "properties": {"n": {"type": "integer"}}});
        assert!(validate(&json!({"n": 7}), &schema).is_ok());
        assert!(validate(&json!({"n": 7.5}), &schema).is_err());
    }
}
