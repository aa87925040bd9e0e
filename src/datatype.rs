// used to print out readable forms of a value kind
use std::fmt;

use serde_json::Value;

/// How a scalar column compares against a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Text,
    Enum,
    Date,
}
impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Enum => "enum",
            Self::Date => "date",
        };
        f.write_str(name)
    }
}

/// The string form of a wire value.
///
/// Strings pass through, everything else uses its compact JSON text, so `null`
/// becomes `"null"`.
pub fn coerce(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        _ => value.to_string(),
    }
}

/// Like `coerce`, but only for values that already are scalars.
pub fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(_) | Value::Bool(_) | Value::Number(_) => Some(coerce(value)),
        _ => None,
    }
}

// The escape character used in every LIKE template.
pub const LIKE_ESCAPE: char = '\\';

/// Escapes LIKE metacharacters so a user value only ever matches literally.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

pub fn contains_pattern(value: &str) -> String {
    format!("%{}%", escape_like(value))
}

pub fn prefix_pattern(value: &str) -> String {
    format!("{}%", escape_like(value))
}

pub fn suffix_pattern(value: &str) -> String {
    format!("%{}", escape_like(value))
}
