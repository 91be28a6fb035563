use crate::{CoreError, Resource};
use manifold_schema::{is_resource, Breadcrumb, ProvenanceKeys, Value, ValueKind};

/// How discovered objects are labelled.
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions<'a> {
    /// Source label, used for the file annotation and in errors.
    pub file: &'a str,
    /// Annotation keys to stamp, or `None` to leave objects untouched.
    pub provenance: Option<&'a ProvenanceKeys>,
}

/// Collect every resource-shaped object under `value`, in document order.
///
/// A resource is returned whole and not descended into. Other objects are
/// searched field by field in key order, arrays element by element, and
/// nulls are skipped. Any other scalar is a [`CoreError::Shape`].
pub fn walk(
    value: Value,
    root: &Breadcrumb,
    options: &WalkOptions<'_>,
) -> Result<Vec<Resource>, CoreError> {
    let mut found = Vec::new();
    walk_into(value, root, options, &mut found)?;
    Ok(found)
}

fn walk_into(
    value: Value,
    path: &Breadcrumb,
    options: &WalkOptions<'_>,
    found: &mut Vec<Resource>,
) -> Result<(), CoreError> {
    match value {
        Value::Null => Ok(()),
        Value::Object(mut object) => {
            if is_resource(&object) {
                if let Some(keys) = options.provenance {
                    keys.stamp(&mut object, options.file, &path.to_string());
                }
                found.push(object);
                return Ok(());
            }
            for (key, child) in object {
                walk_into(child, &path.field(&key), options, found)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for (i, child) in items.into_iter().enumerate() {
                walk_into(child, &path.index(i), options, found)?;
            }
            Ok(())
        }
        other => Err(CoreError::Shape {
            input: options.file.to_owned(),
            path: path.to_string(),
            found: ValueKind::of(&other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manifold_schema::{DEFAULT_FILE_KEY, DEFAULT_PATH_KEY};
    use serde_json::json;

    const PLAIN: WalkOptions<'static> = WalkOptions {
        file: "test.jsonnet",
        provenance: None,
    };

    fn names(found: &[Resource]) -> Vec<&str> {
        found
            .iter()
            .map(|o| o["metadata"]["name"].as_str().unwrap_or(""))
            .collect()
    }

    #[test]
    fn finds_nested_resources_in_key_order() {
        let value = json!({
            "z": {"apiVersion": "v1", "kind": "ConfigMap", "metadata": {"name": "z"}},
            "a": [
                {"apiVersion": "v1", "kind": "ConfigMap", "metadata": {"name": "a0"}},
                null,
                {"inner": {"apiVersion": "v1", "kind": "Secret", "metadata": {"name": "a2"}}}
            ],
            "empty": {}
        });
        let found = walk(value, &Breadcrumb::root(), &PLAIN).unwrap();
        assert_eq!(names(&found), vec!["a0", "a2", "z"]);
    }

    #[test]
    fn resources_are_not_descended_into() {
        let value = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "outer"},
            "data": {"nested": {"apiVersion": "v1", "kind": "Secret"}}
        });
        let found = walk(value, &Breadcrumb::root(), &PLAIN).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(names(&found), vec!["outer"]);
    }

    #[test]
    fn null_kind_is_not_a_resource() {
        let value = json!({"x": {"apiVersion": "v1", "kind": null}});
        assert!(walk(value, &Breadcrumb::root(), &PLAIN).unwrap().is_empty());
    }

    #[test]
    fn scalar_is_shape_error_with_path() {
        let err = walk(json!("hello"), &Breadcrumb::root(), &PLAIN).unwrap_err();
        match &err {
            CoreError::Shape { path, found, .. } => {
                assert_eq!(path, "$");
                assert_eq!(*found, ValueKind::String);
            }
            other => panic!("unexpected error {other}"),
        }

        let err = walk(json!({"a": [1]}), &Breadcrumb::root(), &PLAIN).unwrap_err();
        assert!(err.to_string().contains("at $.a[0], found number"), "{err}");
    }

    #[test]
    fn stamps_provenance_when_enabled() {
        let keys = ProvenanceKeys::default();
        let options = WalkOptions {
            file: "app.jsonnet",
            provenance: Some(&keys),
        };
        let value = json!({
            "deploy": [{"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "web"}}]
        });
        let found = walk(value, &Breadcrumb::root(), &options).unwrap();
        let annotations = &found[0]["metadata"]["annotations"];
        assert_eq!(annotations[DEFAULT_FILE_KEY], "app.jsonnet");
        assert_eq!(annotations[DEFAULT_PATH_KEY], "$.deploy[0]");
    }

    #[test]
    fn walk_starts_from_given_root() {
        let keys = ProvenanceKeys::default();
        let options = WalkOptions {
            file: "a.yaml",
            provenance: Some(&keys),
        };
        let value = json!({"apiVersion": "v1", "kind": "Namespace", "metadata": {"name": "ns"}});
        let found = walk(value, &Breadcrumb::root().index(1), &options).unwrap();
        assert_eq!(found[0]["metadata"]["annotations"][DEFAULT_PATH_KEY], "$[1]");
    }
}
