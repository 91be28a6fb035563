//! Evaluation environment: library search locations and variable bindings.

use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Location of the engine's built-in libraries; always searched last.
pub const BUILTIN_SEARCH_URL: &str = "internal:///";

/// Whether a variable is an external variable or a top-level argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarTarget {
    Ext,
    Tla,
}

/// Whether a variable's value is given inline or read from a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarSource {
    #[default]
    Literal,
    File,
}

/// Whether a variable's value is bound as a string or as code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarExpr {
    #[default]
    String,
    Code,
}

/// A variable as the user supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarBinding {
    pub name: String,
    pub value: String,
    pub target: VarTarget,
    #[serde(default)]
    pub source: VarSource,
    #[serde(default)]
    pub expr: VarExpr,
}

impl VarBinding {
    /// Parse `name=value`. A bare `name` takes its value from the environment
    /// variable of the same name, which must be set.
    pub fn parse(
        spec: &str,
        target: VarTarget,
        source: VarSource,
        expr: VarExpr,
    ) -> Result<Self, CoreError> {
        let (name, value) = match spec.split_once('=') {
            Some((name, value)) => (name.to_owned(), value.to_owned()),
            None if source == VarSource::File => {
                return Err(CoreError::Config(format!(
                    "file variable '{spec}' needs the form name=path"
                )))
            }
            None => {
                let value = std::env::var(spec).map_err(|_| {
                    CoreError::Config(format!(
                        "variable '{spec}' has no value and is not set in the environment"
                    ))
                })?;
                (spec.to_owned(), value)
            }
        };
        if name.is_empty() {
            return Err(CoreError::Config(format!("variable '{spec}' has no name")));
        }
        Ok(Self {
            name,
            value,
            target,
            source,
            expr,
        })
    }

    /// Rewrite into the form handed to the engine. File contents are bound
    /// as an `import`/`importstr` of the absolute path, so they are code.
    fn bind(&self, working_dir: &Path) -> Binding {
        let (value, code) = match self.source {
            VarSource::Literal => (self.value.clone(), self.expr == VarExpr::Code),
            VarSource::File => {
                let path = working_dir.join(&self.value);
                let keyword = match self.expr {
                    VarExpr::String => "importstr",
                    VarExpr::Code => "import",
                };
                (format!("{keyword} {}", verbatim_string(&path)), true)
            }
        };
        Binding {
            name: self.name.clone(),
            value,
            target: self.target,
            code,
        }
    }
}

/// A variable ready for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub value: String,
    pub target: VarTarget,
    pub code: bool,
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match self.target {
            VarTarget::Ext => "ext",
            VarTarget::Tla => "tla",
        };
        let expr = if self.code { "code" } else { "str" };
        write!(f, "{target}-{expr} {}", self.name)
    }
}

/// One library search location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPath {
    /// The engine's own built-in libraries.
    Builtin,
    Url(Url),
}

impl fmt::Display for SearchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => f.write_str(BUILTIN_SEARCH_URL),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

/// Everything an engine needs besides the source itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalEnv {
    /// Library search locations in lookup order; the first location that
    /// has the file wins.
    pub search_paths: Vec<SearchPath>,
    pub bindings: Vec<Binding>,
}

impl Default for EvalEnv {
    fn default() -> Self {
        Self {
            search_paths: vec![SearchPath::Builtin],
            bindings: Vec::new(),
        }
    }
}

impl EvalEnv {
    /// Build the search list and bindings.
    ///
    /// Local directories come first, then remote URLs, each in caller order,
    /// and the built-in location last. Relative directories and file
    /// variables are resolved against `working_dir`.
    pub fn configure(
        import_paths: &[PathBuf],
        import_urls: &[String],
        vars: &[VarBinding],
        working_dir: &Path,
    ) -> Result<Self, CoreError> {
        let mut search_paths = Vec::with_capacity(import_paths.len() + import_urls.len() + 1);
        for dir in import_paths {
            search_paths.push(SearchPath::Url(local_dir_url(&working_dir.join(dir))?));
        }
        for raw in import_urls {
            search_paths.push(SearchPath::Url(remote_dir_url(raw)?));
        }
        search_paths.push(SearchPath::Builtin);
        for url in &search_paths {
            debug!("search path: {url}");
        }

        let bindings = vars.iter().map(|v| v.bind(working_dir)).collect();
        Ok(Self {
            search_paths,
            bindings,
        })
    }
}

fn local_dir_url(dir: &Path) -> Result<Url, CoreError> {
    let absolute = std::path::absolute(dir)
        .map_err(|e| CoreError::Config(format!("import path {}: {e}", dir.display())))?;
    Url::from_directory_path(&absolute)
        .map_err(|()| CoreError::Config(format!("import path {} is not absolute", dir.display())))
}

fn remote_dir_url(raw: &str) -> Result<Url, CoreError> {
    let mut url =
        Url::parse(raw).map_err(|e| CoreError::Config(format!("import URL '{raw}': {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Render `path` as a verbatim string literal: `@'...'` with `'` doubled.
fn verbatim_string(path: &Path) -> String {
    format!("@'{}'", path.to_string_lossy().replace('\'', "''"))
}
