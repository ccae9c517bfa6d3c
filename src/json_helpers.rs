//! Helper functions for safe JSON access
//!
//! Block descriptors arrive as raw `serde_json::Value`s. These accessors
//! keep the option-chaining in one place so block parsing stays terse.

use serde_json::Value;

/// Get an optional string field.
pub fn get_str_opt<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(|v| v.as_str())
}

/// Get an optional unsigned integer field.
pub fn get_u32_opt(obj: &Value, key: &str) -> Option<u32> {
    obj.get(key).and_then(|v| v.as_u64()).map(|n| n as u32)
}

/// Get an optional array field.
pub fn get_array_opt<'a>(obj: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    obj.get(key).and_then(|v| v.as_array())
}

/// Column widths in millimeters from an optional `widths` array.
/// Entries that are not numbers are skipped.
pub fn get_f64_array(obj: &Value, key: &str) -> Vec<f64> {
    obj.get(key)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_f64()).collect())
        .unwrap_or_default()
}
