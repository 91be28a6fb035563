use crate::{CoreError, Resource};
use manifold_resolve::Resolver;
use manifold_schema::{Breadcrumb, ObjectIdentity, Value};
use std::collections::HashMap;
use tracing::debug;

/// Pod spec fields holding container lists.
const CONTAINER_FIELDS: [&str; 3] = ["containers", "initContainers", "ephemeralContainers"];

/// Pass every container `image` in `objects` through `resolver`.
///
/// Each distinct reference is resolved once per call. Returns the number of
/// references that were rewritten.
pub fn resolve_images(objects: &mut [Resource], resolver: &dyn Resolver) -> Result<usize, CoreError> {
    let mut resolved: HashMap<String, String> = HashMap::new();
    let mut rewritten = 0;

    for object in objects.iter_mut() {
        let owner = ObjectIdentity::of(object).to_string();
        let mut visit = |image: &mut String, path: &Breadcrumb| -> Result<(), CoreError> {
            let pinned = match resolved.get(image.as_str()) {
                Some(pinned) => pinned.clone(),
                None => {
                    let pinned = resolver.resolve_reference(image).map_err(|err| {
                        CoreError::Resolver {
                            object: owner.clone(),
                            path: path.to_string(),
                            image: image.clone(),
                            err,
                        }
                    })?;
                    resolved.insert(image.clone(), pinned.clone());
                    pinned
                }
            };
            if pinned != *image {
                debug!("{owner}: {image} -> {pinned}");
                *image = pinned;
                rewritten += 1;
            }
            Ok(())
        };
        for (key, value) in object.iter_mut() {
            visit_images(value, &Breadcrumb::root().field(key), &mut visit)?;
        }
    }
    Ok(rewritten)
}

fn visit_images(
    value: &mut Value,
    path: &Breadcrumb,
    visit: &mut dyn FnMut(&mut String, &Breadcrumb) -> Result<(), CoreError>,
) -> Result<(), CoreError> {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                let child_path = path.field(key);
                if CONTAINER_FIELDS.contains(&key.as_str()) {
                    if let Value::Array(containers) = child {
                        for (i, container) in containers.iter_mut().enumerate() {
                            if let Some(Value::String(image)) = container.get_mut("image") {
                                visit(image, &child_path.index(i).field("image"))?;
                            }
                        }
                        continue;
                    }
                }
                visit_images(child, &child_path, visit)?;
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                visit_images(item, &path.index(i), visit)?;
            }
        }
        _ => {}
    }
    Ok(())
}
