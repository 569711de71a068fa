//! Fixed helper library available to rule bodies.
//!
//! Strict: numbers are numbers and strings are strings, no coercion
//! between them.

use serde_json::Value;

/// String-membership test used by `attribute_one_of`.
pub fn contains_str(options: &[String], value: &str) -> bool {
    options.iter().any(|option| option == value)
}

/// Strict integer view of an attribute value.
pub fn numeric(value: &Value) -> Option<i64> {
    value.as_i64()
}

/// Value type name for diagnostics.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
