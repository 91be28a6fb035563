use crate::engine::{select_engine, EvalEngine};
use crate::env::{EvalEnv, VarBinding};
use crate::flatten::{check_duplicates, flatten};
use crate::images::resolve_images;
use crate::overlay::{apply_overlays, Overlay};
use crate::reader::{read_source, Source};
use crate::walk::{walk, WalkOptions};
use crate::{CoreError, Resource};
use manifold_resolve::{build_resolver, FailureAction, RegistryConfig, Resolver, ResolverKind};
use manifold_schema::ProvenanceKeys;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Options for reading a batch.
///
/// Every field has a default, so a config file only needs the fields it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Stamp each resource with the file and path it was found at.
    pub provenance: bool,
    pub provenance_keys: ProvenanceKeys,
    pub resolver: ResolverKind,
    pub resolver_failure: FailureAction,
    pub registry: RegistryConfig,
    /// Local library directories, searched first and in order.
    pub import_paths: Vec<PathBuf>,
    /// Remote library locations, searched after `import_paths`.
    pub import_urls: Vec<String>,
    pub vars: Vec<VarBinding>,
    /// Base for relative paths; the process working directory when unset.
    pub working_dir: Option<PathBuf>,
    /// `jsonnet` or `mock`.
    pub engine: String,
    pub jsonnet_bin: String,
    pub overlays: Vec<Overlay>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            provenance: false,
            provenance_keys: ProvenanceKeys::default(),
            resolver: ResolverKind::default(),
            resolver_failure: FailureAction::default(),
            registry: RegistryConfig::default(),
            import_paths: Vec::new(),
            import_urls: Vec::new(),
            vars: Vec::new(),
            working_dir: None,
            engine: "jsonnet".to_owned(),
            jsonnet_bin: "jsonnet".to_owned(),
            overlays: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, CoreError> {
        toml::from_str(input).map_err(|e| CoreError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|err| CoreError::Io {
            input: path.display().to_string(),
            err,
        })?;
        toml::from_str(&content)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))
    }
}

/// Reads sources into a flat, duplicate-free batch of resources.
pub struct Pipeline {
    config: PipelineConfig,
    working_dir: PathBuf,
    env: EvalEnv,
    engine: Arc<dyn EvalEngine>,
    resolver: Box<dyn Resolver>,
}

impl Pipeline {
    /// Build a pipeline with the engine and resolver named in `config`.
    pub fn new(config: PipelineConfig) -> Result<Self, CoreError> {
        let engine = select_engine(&config.engine, &config.jsonnet_bin)?;
        Self::with_engine(config, engine)
    }

    pub fn with_engine(
        config: PipelineConfig,
        engine: Arc<dyn EvalEngine>,
    ) -> Result<Self, CoreError> {
        let working_dir = match &config.working_dir {
            Some(dir) => std::path::absolute(dir),
            None => std::env::current_dir(),
        }
        .map_err(|e| CoreError::Config(format!("cannot determine working directory: {e}")))?;
        let env = EvalEnv::configure(
            &config.import_paths,
            &config.import_urls,
            &config.vars,
            &working_dir,
        )?;
        let resolver = build_resolver(config.resolver, config.resolver_failure, &config.registry);
        debug!(
            "pipeline ready: engine {}, resolver {} ({})",
            engine.name(),
            resolver.name(),
            config.resolver_failure
        );
        Ok(Self {
            config,
            working_dir,
            env,
            engine,
            resolver,
        })
    }

    /// Replace the resolver built from the config.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Box<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn env(&self) -> &EvalEnv {
        &self.env
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Read one source (after overlays) and walk each of its documents.
    pub fn read_source(&self, source: Source) -> Result<Vec<Resource>, CoreError> {
        let source = apply_overlays(source, &self.config.overlays, &self.working_dir)?;
        let label = source.label();
        let format = source.format()?;
        let documents = read_source(&source, &self.working_dir, &*self.engine, &self.env)?;

        let options = WalkOptions {
            file: &label,
            provenance: self.config.provenance.then_some(&self.config.provenance_keys),
        };
        let mut found = Vec::new();
        for (i, document) in documents.into_iter().enumerate() {
            found.extend(walk(document, &format.document_root(i), &options)?);
        }
        debug!("{label}: {} objects", found.len());
        Ok(found)
    }

    /// Read `sources` in order into one batch.
    ///
    /// Lists are flattened and duplicates rejected across the whole batch,
    /// then container images are resolved. The first error aborts the batch.
    pub fn read_batch(&self, sources: &[PathBuf]) -> Result<Vec<Resource>, CoreError> {
        let mut objects = Vec::new();
        for path in sources {
            objects.extend(self.read_source(Source::Path(path.clone()))?);
        }

        let keys = &self.config.provenance_keys;
        let mut objects = flatten(objects, keys)?;
        check_duplicates(&objects, keys)?;
        let rewritten = resolve_images(&mut objects, self.resolver.as_ref())?;

        info!(
            "read {} objects from {} sources ({rewritten} images resolved)",
            objects.len(),
            sources.len()
        );
        Ok(objects)
    }
}
