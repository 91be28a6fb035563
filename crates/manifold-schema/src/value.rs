use serde_json::{Map, Value};
use std::fmt;

/// The variant tag of a [`Value`], used when reporting shape errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An object is resource-shaped when both `kind` and `apiVersion` are present
/// and non-null.
pub fn is_resource(object: &Map<String, Value>) -> bool {
    let present = |key: &str| object.get(key).is_some_and(|v| !v.is_null());
    present("kind") && present("apiVersion")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_names() {
        assert_eq!(ValueKind::of(&json!(null)).to_string(), "null");
        assert_eq!(ValueKind::of(&json!(true)).to_string(), "bool");
        assert_eq!(ValueKind::of(&json!(1.5)).to_string(), "number");
        assert_eq!(ValueKind::of(&json!("x")).to_string(), "string");
        assert_eq!(ValueKind::of(&json!([])).to_string(), "array");
        assert_eq!(ValueKind::of(&json!({})).to_string(), "object");
    }

    #[test]
    fn resource_requires_both_fields() {
        let full = json!({"apiVersion": "v1", "kind": "ConfigMap"});
        assert!(is_resource(full.as_object().unwrap()));

        let no_kind = json!({"apiVersion": "v1"});
        assert!(!is_resource(no_kind.as_object().unwrap()));

        let null_kind = json!({"apiVersion": "v1", "kind": null});
        assert!(!is_resource(null_kind.as_object().unwrap()));
    }
}
