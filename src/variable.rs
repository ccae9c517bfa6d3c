//! Placeholder substitution against a render context
//!
//! Template strings may contain `{{ path.to.value }}` placeholders.
//! Each placeholder is looked up in the context with dot-separated
//! traversal; paths that resolve to nothing substitute an empty string.

use regex::{Captures, Regex};
use serde_json::Value;

use crate::context::Context;

/// Resolves `{{path}}` placeholders in template strings.
pub struct VariableResolver {
    pattern: Regex,
}

impl Default for VariableResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableResolver {
    pub fn new() -> Self {
        Self {
            // Path is anything between double braces, trimmed. The
            // character class keeps matches non-greedy across multiple
            // placeholders on one line.
            pattern: Regex::new(r"\{\{([^{}]*)\}\}").unwrap(),
        }
    }

    /// Replace every placeholder in `template` in a single
    /// left-to-right pass. Substituted values are never re-scanned, so
    /// a context value containing `{{...}}` stays literal. Missing
    /// paths substitute an empty string, never an error.
    pub fn resolve(&self, template: &str, context: &Context) -> String {
        self.pattern
            .replace_all(template, |caps: &Captures| {
                let path = caps[1].trim();
                context
                    .get_path(path)
                    .map(value_to_string)
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

/// Stringification rule for resolved values: strings verbatim, numbers
/// and booleans via Display, null as empty, arrays and objects as
/// compact JSON.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
