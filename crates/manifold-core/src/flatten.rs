use crate::{CoreError, Resource};
use manifold_schema::{is_resource, metadata_str, ObjectIdentity, ProvenanceKeys, Value};
use std::collections::HashMap;
use tracing::debug;

/// A list container: a resource whose kind ends in `List` and whose `items`
/// is an array.
pub fn is_list(object: &Resource) -> bool {
    let kind_is_list = object
        .get("kind")
        .and_then(Value::as_str)
        .is_some_and(|k| k.ends_with("List"));
    kind_is_list && object.get("items").is_some_and(Value::is_array)
}

/// Replace every list container by its items, recursively, keeping order.
///
/// Items that carry no provenance of their own inherit the list's, with
/// `.items[i]` appended to its path.
pub fn flatten(objects: Vec<Resource>, keys: &ProvenanceKeys) -> Result<Vec<Resource>, CoreError> {
    let mut out = Vec::with_capacity(objects.len());
    for object in objects {
        flatten_into(object, keys, &mut out)?;
    }
    Ok(out)
}

fn flatten_into(
    mut object: Resource,
    keys: &ProvenanceKeys,
    out: &mut Vec<Resource>,
) -> Result<(), CoreError> {
    if !is_list(&object) {
        out.push(object);
        return Ok(());
    }

    let list = ObjectIdentity::of(&object);
    let provenance = keys.read(&object);
    let Some(Value::Array(items)) = object.remove("items") else {
        return Ok(());
    };
    debug!("flattening {list} with {} items", items.len());

    for (i, item) in items.into_iter().enumerate() {
        let Value::Object(mut item) = item else {
            return Err(CoreError::ListShape { list, index: i });
        };
        if !is_resource(&item) {
            return Err(CoreError::ListShape { list, index: i });
        }
        if let Some(path) = &provenance.path {
            if !keys.read(&item).is_known() {
                let file = provenance.file.as_deref().unwrap_or("");
                keys.stamp(&mut item, file, &format!("{path}.items[{i}]"));
            }
        }
        flatten_into(item, keys, out)?;
    }
    Ok(())
}

/// Reject two objects with the same identity.
///
/// Objects that set `metadata.generateName` with a missing or empty
/// `metadata.name` get their name from the server and are never duplicates.
pub fn check_duplicates(objects: &[Resource], keys: &ProvenanceKeys) -> Result<(), CoreError> {
    let mut seen: HashMap<ObjectIdentity, usize> = HashMap::with_capacity(objects.len());
    for (i, object) in objects.iter().enumerate() {
        let generated = metadata_str(object, "name").is_none_or(str::is_empty)
            && metadata_str(object, "generateName").is_some();
        if generated {
            continue;
        }

        let identity = ObjectIdentity::of(object);
        if let Some(&first) = seen.get(&identity) {
            return Err(CoreError::Duplicate {
                identity,
                first: keys.read(&objects[first]),
                second: keys.read(object),
            });
        }
        seen.insert(identity, i);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use manifold_schema::DEFAULT_PATH_KEY;
    use serde_json::json;

    fn resource(value: Value) -> Resource {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn config_map(ns: &str, name: &str) -> Resource {
        resource(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"namespace": ns, "name": name}
        }))
    }

    #[test]
    fn list_detection() {
        assert!(is_list(&resource(json!({"apiVersion": "v1", "kind": "List", "items": []}))));
        assert!(is_list(&resource(
            json!({"apiVersion": "v1", "kind": "ConfigMapList", "items": []})
        )));
        assert!(!is_list(&resource(
            json!({"apiVersion": "v1", "kind": "List", "items": {}})
        )));
        assert!(!is_list(&config_map("default", "a")));
    }

    #[test]
    fn flattens_nested_lists_in_order() {
        let inner = json!({
            "apiVersion": "v1",
            "kind": "List",
            "items": [config_map("default", "b"), config_map("default", "c")]
        });
        let outer = resource(json!({
            "apiVersion": "v1",
            "kind": "List",
            "items": [config_map("default", "a"), inner]
        }));
        let flat = flatten(
            vec![outer, config_map("default", "d")],
            &ProvenanceKeys::default(),
        )
        .unwrap();
        let names: Vec<_> = flat
            .iter()
            .map(|o| metadata_str(o, "name").unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn empty_list_vanishes() {
        let list = resource(json!({"apiVersion": "v1", "kind": "List", "items": []}));
        assert!(flatten(vec![list], &ProvenanceKeys::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn non_resource_item_is_list_shape_error() {
        let list = resource(json!({
            "apiVersion": "v1",
            "kind": "List",
            "metadata": {"name": "bad"},
            "items": [config_map("default", "a"), {"just": "data"}]
        }));
        let err = flatten(vec![list], &ProvenanceKeys::default()).unwrap_err();
        assert!(
            matches!(err, CoreError::ListShape { index: 1, .. }),
            "{err}"
        );
    }

    #[test]
    fn items_inherit_list_provenance() {
        let keys = ProvenanceKeys::default();
        let mut list = resource(json!({
            "apiVersion": "v1",
            "kind": "List",
            "items": [config_map("default", "a")]
        }));
        keys.stamp(&mut list, "list.yaml", "$[0]");
        let flat = flatten(vec![list], &keys).unwrap();
        let provenance = keys.read(&flat[0]);
        assert_eq!(provenance.file.as_deref(), Some("list.yaml"));
        assert_eq!(provenance.path.as_deref(), Some("$[0].items[0]"));
        assert_eq!(
            flat[0]["metadata"]["annotations"][DEFAULT_PATH_KEY],
            "$[0].items[0]"
        );
    }

    #[test]
    fn detects_duplicates_with_locations() {
        let keys = ProvenanceKeys::default();
        let mut first = config_map("default", "foo");
        keys.stamp(&mut first, "a.yaml", "$[0]");
        let mut second = config_map("default", "foo");
        keys.stamp(&mut second, "b.yaml", "$[0]");

        let err = check_duplicates(&[first, config_map("default", "bar"), second], &keys)
            .unwrap_err();
        let message = err.to_string();
        assert!(
            message.contains("v1/ConfigMap default/foo"),
            "{message}"
        );
        assert!(message.contains("a.yaml:$[0]"), "{message}");
        assert!(message.contains("b.yaml:$[0]"), "{message}");
    }

    #[test]
    fn namespace_distinguishes_identity() {
        let objects = [config_map("a", "foo"), config_map("b", "foo")];
        check_duplicates(&objects, &ProvenanceKeys::default()).unwrap();
    }

    #[test]
    fn generated_names_are_exempt() {
        let job = |metadata: Value| {
            resource(json!({
                "apiVersion": "batch/v1",
                "kind": "Job",
                "metadata": metadata
            }))
        };
        let keys = ProvenanceKeys::default();
        let missing = json!({"generateName": "migrate-"});
        check_duplicates(&[job(missing.clone()), job(missing)], &keys).unwrap();

        let empty = json!({"name": "", "generateName": "migrate-"});
        check_duplicates(&[job(empty.clone()), job(empty)], &keys).unwrap();

        let named = json!({"name": "once", "generateName": "migrate-"});
        assert!(check_duplicates(&[job(named.clone()), job(named)], &keys).is_err());
    }
}
