//! Source rewriting for overlays.
//!
//! An overlay is merged onto each source with the template language's object
//! `+`, so every overlaid source becomes a [`Source::Snippet`] evaluated by the
//! engine, whatever its original format.

use crate::reader::{Source, SourceFormat};
use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Template merged onto every source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overlay {
    /// A file, in any readable format.
    Path(PathBuf),
    /// Inline template code.
    Code(String),
}

/// Apply `overlays` to `source` in order. The label and the location of the
/// source are preserved.
pub fn apply_overlays(
    source: Source,
    overlays: &[Overlay],
    working_dir: &Path,
) -> Result<Source, CoreError> {
    if overlays.is_empty() {
        return Ok(source);
    }

    let label = source.label();
    let (mut code, location) = match source {
        Source::Path(path) => {
            let format = SourceFormat::detect(&path)?;
            let absolute = absolute(working_dir, &path)?;
            (import_expr(&absolute, format)?, absolute)
        }
        Source::Snippet { code, location, .. } => (format!("({code})"), location),
    };

    for overlay in overlays {
        let rhs = match overlay {
            Overlay::Path(path) => {
                let format = SourceFormat::detect(path)?;
                import_expr(&absolute(working_dir, path)?, format)?
            }
            Overlay::Code(code) => format!("({code})"),
        };
        code = format!("{code} + {rhs}");
    }

    Ok(Source::Snippet {
        label,
        code,
        location,
    })
}

/// Expression evaluating to the contents of the file at `path`.
fn import_expr(path: &Path, format: SourceFormat) -> Result<String, CoreError> {
    let literal = serde_json::to_string(&path.to_string_lossy()).map_err(|e| {
        CoreError::Config(format!("cannot quote path {}: {e}", path.display()))
    })?;
    Ok(match format {
        SourceFormat::Yaml => format!("std.parseYaml(importstr {literal})"),
        SourceFormat::Json | SourceFormat::Template => format!("(import {literal})"),
    })
}

fn absolute(working_dir: &Path, path: &Path) -> Result<PathBuf, CoreError> {
    std::path::absolute(working_dir.join(path))
        .map_err(|e| CoreError::Config(format!("cannot resolve {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet_code(source: &Source) -> &str {
        match source {
            Source::Snippet { code, .. } => code,
            Source::Path(path) => panic!("not rewritten: {}", path.display()),
        }
    }

    #[test]
    fn no_overlays_leaves_source_alone() {
        let source = Source::Path(PathBuf::from("a.yaml"));
        let out = apply_overlays(source.clone(), &[], Path::new("/work")).unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn path_overlay_imports_both_files() {
        let out = apply_overlays(
            Source::Path(PathBuf::from("app/main.jsonnet")),
            &[Overlay::Path(PathBuf::from("/overlays/prod.libsonnet"))],
            Path::new("/work"),
        )
        .unwrap();
        assert_eq!(out.label(), "app/main.jsonnet");
        assert_eq!(
            snippet_code(&out),
            r#"(import "/work/app/main.jsonnet") + (import "/overlays/prod.libsonnet")"#
        );
        match out {
            Source::Snippet { location, .. } => {
                assert_eq!(location, Path::new("/work/app/main.jsonnet"));
            }
            Source::Path(_) => unreachable!(),
        }
    }

    #[test]
    fn yaml_sources_are_parsed_in_template() {
        let out = apply_overlays(
            Source::Path(PathBuf::from("/srv/deploy.yaml")),
            &[Overlay::Code("{ metadata+: { labels+: { team: 'x' } } }".to_owned())],
            Path::new("/work"),
        )
        .unwrap();
        assert_eq!(
            snippet_code(&out),
            r#"std.parseYaml(importstr "/srv/deploy.yaml") + ({ metadata+: { labels+: { team: 'x' } } })"#
        );
    }

    #[test]
    fn code_overlay_wraps_path_overlay() {
        let out = apply_overlays(
            Source::Path(PathBuf::from("/a.json")),
            &[
                Overlay::Path(PathBuf::from("/o.jsonnet")),
                Overlay::Code("{x: 1}".to_owned()),
            ],
            Path::new("/"),
        )
        .unwrap();
        assert_eq!(
            snippet_code(&out),
            r#"(import "/a.json") + (import "/o.jsonnet") + ({x: 1})"#
        );
    }

    #[test]
    fn unknown_source_format_is_rejected() {
        let err = apply_overlays(
            Source::Path(PathBuf::from("a.txt")),
            &[Overlay::Code("{}".to_owned())],
            Path::new("/"),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Format { .. }), "{err}");
    }

    #[test]
    fn quotes_awkward_paths() {
        let out = apply_overlays(
            Source::Path(PathBuf::from(r#"/we"ird.json"#)),
            &[Overlay::Code("{}".to_owned())],
            Path::new("/"),
        )
        .unwrap();
        assert_eq!(snippet_code(&out), r#"(import "/we\"ird.json") + ({})"#);
    }
}
