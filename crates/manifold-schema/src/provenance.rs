//! Provenance annotations recording where a resource was discovered.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const DEFAULT_FILE_KEY: &str = "manifold.dev/provenance-file";
pub const DEFAULT_PATH_KEY: &str = "manifold.dev/provenance-path";

/// Annotation keys written under `metadata.annotations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvenanceKeys {
    pub file: String,
    pub path: String,
}

impl Default for ProvenanceKeys {
    fn default() -> Self {
        Self {
            file: DEFAULT_FILE_KEY.to_owned(),
            path: DEFAULT_PATH_KEY.to_owned(),
        }
    }
}

impl ProvenanceKeys {
    /// Stamp `object` with its source file and rendered breadcrumb.
    ///
    /// `metadata` and `metadata.annotations` are created when absent. If either
    /// exists but is not an object the resource is left as is. An empty `file`
    /// skips the file annotation.
    pub fn stamp(&self, object: &mut Map<String, Value>, file: &str, path: &str) {
        let metadata = object
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(metadata) = metadata.as_object_mut() else {
            return;
        };
        let annotations = metadata
            .entry("annotations")
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(annotations) = annotations.as_object_mut() else {
            return;
        };
        if !file.is_empty() {
            annotations.insert(self.file.clone(), Value::String(file.to_owned()));
        }
        annotations.insert(self.path.clone(), Value::String(path.to_owned()));
    }

    pub fn read(&self, object: &Map<String, Value>) -> Provenance {
        let annotations = object
            .get("metadata")
            .and_then(Value::as_object)
            .and_then(|m| m.get("annotations"))
            .and_then(Value::as_object);
        let get = |key: &str| {
            annotations
                .and_then(|a| a.get(key))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };
        Provenance {
            file: get(&self.file),
            path: get(&self.path),
        }
    }
}

/// Provenance read back from a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub file: Option<String>,
    pub path: Option<String>,
}

impl Provenance {
    pub fn is_known(&self) -> bool {
        self.file.is_some() || self.path.is_some()
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, &self.path) {
            (Some(file), Some(path)) => write!(f, "{file}:{path}"),
            (Some(file), None) => f.write_str(file),
            (None, Some(path)) => f.write_str(path),
            (None, None) => f.write_str("unknown location"),
        }
    }
}
