use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// The tuple two resources must not share within one batch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectIdentity {
    pub api_version: String,
    pub kind: String,
    /// Empty for cluster-scoped resources.
    pub namespace: String,
    pub name: String,
}

impl ObjectIdentity {
    /// Compute the identity of a resource-shaped object. Missing or non-string
    /// fields contribute an empty string.
    pub fn of(object: &Map<String, Value>) -> Self {
        let top = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        Self {
            api_version: top("apiVersion"),
            kind: top("kind"),
            namespace: metadata_str(object, "namespace")
                .unwrap_or_default()
                .to_owned(),
            name: metadata_str(object, "name").unwrap_or_default().to_owned(),
        }
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ", self.api_version, self.kind)?;
        if self.namespace.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// Read a string field from `metadata`.
pub fn metadata_str<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    object
        .get("metadata")
        .and_then(Value::as_object)
        .and_then(|m| m.get(field))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_of_namespaced_object() {
        let obj = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "foo", "namespace": "default"}
        });
        let id = ObjectIdentity::of(obj.as_object().unwrap());
        assert_eq!(id.api_version, "v1");
        assert_eq!(id.kind, "ConfigMap");
        assert_eq!(id.namespace, "default");
        assert_eq!(id.name, "foo");
        assert_eq!(id.to_string(), "v1/ConfigMap default/foo");
    }

    #[test]
    fn cluster_scoped_identity_has_empty_namespace() {
        let obj = json!({
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "kind": "ClusterRole",
            "metadata": {"name": "reader"}
        });
        let id = ObjectIdentity::of(obj.as_object().unwrap());
        assert!(id.namespace.is_empty());
        assert_eq!(
            id.to_string(),
            "rbac.authorization.k8s.io/v1/ClusterRole reader"
        );
    }

    #[test]
    fn metadata_str_ignores_non_object_metadata() {
        let obj = json!({"metadata": "oops"});
        assert_eq!(metadata_str(obj.as_object().unwrap(), "name"), None);
    }
}
