//! Parameter sampling from tool input schemas
//!
//! Produces one deterministic, plausible value for every required parameter
//! so that a probe can be rendered without a human supplying arguments.

use serde_json::{Map, Value, json};

use crate::strategy::Parameters;

/// Sample values for every required parameter of `schema`
///
/// Reads `properties` and `required` from a JSON Schema object. The result
/// holds exactly the required names, in `required` order.
pub fn sample_parameters(schema: &Value) -> Parameters {
    let empty = Map::new();
    let properties = schema.get("properties").and_then(Value::as_object).unwrap_or(&empty);
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    sample_required(properties, &required)
}

/// Sample values for `required` names using their `properties` entries
pub fn sample_required(properties: &Map<String, Value>, required: &[&str]) -> Parameters {
    required
        .iter()
        .map(|name| {
            let value = match properties.get(*name) {
                Some(property) => sample_value(name, property),
                None => Value::Null,
            };
            (name.to_string(), value)
        })
        .collect()
}

/// Sample a single value for the property `name`
pub fn sample_value(name: &str, property: &Value) -> Value {
    let default = property.get("default").filter(|d| !d.is_null());

    match declared_type(property) {
        Some("string") => {
            if let Some(d) = default {
                return d.clone();
            }
            if let Some(first) = property.get("enum").and_then(Value::as_array).and_then(|e| e.first()) {
                return first.clone();
            }
            Value::String(hinted_string(name).to_string())
        }
        Some("number") | Some("integer") => default.cloned().unwrap_or_else(|| json!(1)),
        Some("boolean") => default.cloned().unwrap_or(Value::Bool(false)),
        Some("array") => {
            let item_type = property.get("items").and_then(declared_type);
            if item_type == Some("string") {
                json!(["test"])
            } else {
                json!([])
            }
        }
        Some("object") => json!({}),
        _ => Value::Null,
    }
}

/// `type` of a schema, taking the first non-null member of a union
fn declared_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(t) => Some(t.as_str()),
        Value::Array(members) => members.iter().filter_map(Value::as_str).find(|t| *t != "null"),
        _ => None,
    }
}

fn hinted_string(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    let has = |hints: &[&str]| hints.iter().any(|h| lower.contains(h));

    if has(&["path", "file", "dir"]) {
        "/tmp"
    } else if has(&["url", "uri", "link"]) {
        "https://example.com"
    } else if lower == "q" || has(&["query", "search", "pattern"]) {
        "test"
    } else if has(&["name", "title"]) {
        "example"
    } else {
        "test"
    }
}
