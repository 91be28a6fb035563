//! Extraction pipeline for manifold.
//!
//! This crate turns source files into a deduplicated batch of Kubernetes
//! resources: the multi-format reader (`reader`) decodes JSON, YAML streams or
//! evaluates templates through an [`EvalEngine`], the walker (`walk`) finds
//! resource-shaped objects at any depth and stamps provenance, `flatten`
//! expands list containers and rejects duplicate identities, and `images`
//! feeds container image references through a resolver. [`Pipeline`] wires
//! these together from a [`PipelineConfig`].

pub mod engine;
pub mod env;
pub mod flatten;
pub mod images;
pub mod mock;
pub mod overlay;
pub mod pipeline;
pub mod reader;
pub mod walk;

pub use engine::{select_engine, EngineError, EvalEngine, JsonnetCommand};
pub use env::{Binding, EvalEnv, SearchPath, VarBinding, VarExpr, VarSource, VarTarget, BUILTIN_SEARCH_URL};
pub use flatten::{check_duplicates, flatten, is_list};
pub use images::resolve_images;
pub use mock::MockEngine;
pub use overlay::{apply_overlays, Overlay};
pub use pipeline::{Pipeline, PipelineConfig};
pub use reader::{read_source, Source, SourceFormat};
pub use walk::{walk, WalkOptions};

use manifold_resolve::ResolveError;
use manifold_schema::{ObjectIdentity, Provenance, ValueKind};
use thiserror::Error;

/// A resource-shaped object discovered in a source.
pub type Resource = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{input}: unrecognized format '{suffix}' (expected .json, .yaml, .yml, .jsonnet or .libsonnet)")]
    Format { input: String, suffix: String },
    #[error("error reading {input}: {err}")]
    Io {
        input: String,
        #[source]
        err: std::io::Error,
    },
    #[error("error decoding {input}: {message}")]
    Decode { input: String, message: String },
    #[error("error evaluating {input}: {err}")]
    Eval {
        input: String,
        #[source]
        err: EngineError,
    },
    #[error("{input}: expected a resource object at {path}, found {found}")]
    Shape {
        input: String,
        path: String,
        found: ValueKind,
    },
    #[error("list {list} has a non-resource item at index {index}")]
    ListShape { list: ObjectIdentity, index: usize },
    #[error("duplicate resource {identity}{}", duplicate_locations(.first, .second))]
    Duplicate {
        identity: ObjectIdentity,
        first: Provenance,
        second: Provenance,
    },
    #[error("cannot resolve image '{image}' in {object} at {path}: {err}")]
    Resolver {
        object: String,
        path: String,
        image: String,
        #[source]
        err: ResolveError,
    },
    #[error("config error: {0}")]
    Config(String),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

fn duplicate_locations(first: &Provenance, second: &Provenance) -> String {
    if first.is_known() || second.is_known() {
        format!(" (first at {first}, again at {second})")
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_message_includes_known_locations() {
        let identity = ObjectIdentity {
            api_version: "v1".to_owned(),
            kind: "ConfigMap".to_owned(),
            namespace: "default".to_owned(),
            name: "foo".to_owned(),
        };
        let err = CoreError::Duplicate {
            identity: identity.clone(),
            first: Provenance {
                file: Some("a.yaml".to_owned()),
                path: Some("$[0]".to_owned()),
            },
            second: Provenance {
                file: Some("b.yaml".to_owned()),
                path: Some("$[1]".to_owned()),
            },
        };
        assert_eq!(
            err.to_string(),
            "duplicate resource v1/ConfigMap default/foo (first at a.yaml:$[0], again at b.yaml:$[1])"
        );

        let bare = CoreError::Duplicate {
            identity,
            first: Provenance::default(),
            second: Provenance::default(),
        };
        assert_eq!(
            bare.to_string(),
            "duplicate resource v1/ConfigMap default/foo"
        );
    }

    #[test]
    fn shape_message_names_path_and_kind() {
        let err = CoreError::Shape {
            input: "main.jsonnet".to_owned(),
            path: "$".to_owned(),
            found: ValueKind::String,
        };
        assert_eq!(
            err.to_string(),
            "main.jsonnet: expected a resource object at $, found string"
        );
    }
}
