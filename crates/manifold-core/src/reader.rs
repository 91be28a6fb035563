use crate::engine::EvalEngine;
use crate::env::EvalEnv;
use crate::CoreError;
use manifold_schema::{Breadcrumb, Value};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Input to a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A file on disk; its format follows from the suffix.
    Path(PathBuf),
    /// Generated template code standing in for the file at `location`.
    /// Always evaluated by the engine.
    Snippet {
        label: String,
        code: String,
        location: PathBuf,
    },
}

impl Source {
    /// Human-readable name used in provenance and error messages.
    pub fn label(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Snippet { label, .. } => label.clone(),
        }
    }

    pub fn format(&self) -> Result<SourceFormat, CoreError> {
        match self {
            Self::Path(path) => SourceFormat::detect(path),
            Self::Snippet { .. } => Ok(SourceFormat::Template),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Yaml,
    Template,
}

impl SourceFormat {
    /// Classify by suffix: `.json`, `.yaml`/`.yml`, `.jsonnet`/`.libsonnet`.
    pub fn detect(path: &Path) -> Result<Self, CoreError> {
        let suffix = path
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match suffix.as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "jsonnet" | "libsonnet" => Ok(Self::Template),
            _ => Err(CoreError::Format {
                input: path.display().to_string(),
                suffix: if suffix.is_empty() {
                    suffix
                } else {
                    format!(".{suffix}")
                },
            }),
        }
    }

    /// Root breadcrumb for the `index`-th document of a source. YAML streams
    /// address each document as an element of the stream.
    pub fn document_root(self, index: usize) -> Breadcrumb {
        match self {
            Self::Yaml => Breadcrumb::root().index(index),
            Self::Json | Self::Template => Breadcrumb::root(),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Yaml => f.write_str("yaml"),
            Self::Template => f.write_str("jsonnet"),
        }
    }
}

/// Read `source` into its top-level documents.
///
/// JSON files hold exactly one document. YAML files are a stream; empty and
/// null documents are dropped. Templates evaluate to exactly one document.
/// Relative paths are taken relative to `working_dir`.
pub fn read_source(
    source: &Source,
    working_dir: &Path,
    engine: &dyn EvalEngine,
    env: &EvalEnv,
) -> Result<Vec<Value>, CoreError> {
    let label = source.label();
    let format = source.format()?;
    debug!("reading {label} as {format}");

    match source {
        Source::Path(path) => {
            let path = working_dir.join(path);
            let bytes = std::fs::read(&path).map_err(|err| CoreError::Io {
                input: label.clone(),
                err,
            })?;
            let content = String::from_utf8(bytes).map_err(|e| CoreError::Decode {
                input: label.clone(),
                message: e.to_string(),
            })?;
            match format {
                SourceFormat::Json => decode_json(&label, &content).map(|v| vec![v]),
                SourceFormat::Yaml => decode_yaml_stream(&label, &content),
                SourceFormat::Template => {
                    evaluate(&label, &path, &content, engine, env).map(|v| vec![v])
                }
            }
        }
        Source::Snippet { code, location, .. } => {
            let location = working_dir.join(location);
            evaluate(&label, &location, code, engine, env).map(|v| vec![v])
        }
    }
}

fn evaluate(
    label: &str,
    location: &Path,
    content: &str,
    engine: &dyn EvalEngine,
    env: &EvalEnv,
) -> Result<Value, CoreError> {
    let output = engine
        .evaluate(location, content, env)
        .map_err(|err| CoreError::Eval {
            input: label.to_owned(),
            err,
        })?;
    decode_json(label, &output)
}

fn decode_json(label: &str, content: &str) -> Result<Value, CoreError> {
    serde_json::from_str(content).map_err(|e| CoreError::Decode {
        input: label.to_owned(),
        message: e.to_string(),
    })
}

fn decode_yaml_stream(label: &str, content: &str) -> Result<Vec<Value>, CoreError> {
    let decode_err = |message: String| CoreError::Decode {
        input: label.to_owned(),
        message,
    };

    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let yaml = serde_yaml::Value::deserialize(document).map_err(|e| decode_err(e.to_string()))?;
        if yaml.is_null() {
            continue;
        }
        let value = serde_json::to_value(&yaml)
            .map_err(|e| decode_err(format!("document is not representable as JSON: {e}")))?;
        documents.push(value);
    }
    Ok(documents)
}
