pub mod check;
pub mod completions;
pub mod show;

use clap::{Args, ValueEnum};
use manifold_core::{
    CoreError, Overlay, Pipeline, PipelineConfig, Resource, VarBinding, VarExpr, VarSource,
    VarTarget,
};
use manifold_resolve::{FailureAction, ResolverKind};
use std::path::PathBuf;
use tracing::debug;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_INPUT_ERROR: u8 = 2;
pub const EXIT_DUPLICATE: u8 = 3;
pub const EXIT_RESOLVE_ERROR: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Options shared by every command that reads sources.
#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Source files (.json, .yaml, .yml, .jsonnet, .libsonnet).
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// TOML file with pipeline options; flags are applied on top.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Library search directory (repeatable, searched in order).
    #[arg(short = 'J', long = "jpath", value_name = "DIR")]
    pub jpath: Vec<PathBuf>,

    /// Remote library location (repeatable, searched after --jpath).
    #[arg(short = 'U', long = "jurl", value_name = "URL")]
    pub jurl: Vec<String>,

    /// External variable as name=value, or name to read the environment.
    #[arg(short = 'V', long, value_name = "VAR")]
    pub ext_str: Vec<String>,

    /// External variable read from a file, as name=path.
    #[arg(long, value_name = "VAR=FILE")]
    pub ext_str_file: Vec<String>,

    /// External variable given as code.
    #[arg(long, value_name = "VAR")]
    pub ext_code: Vec<String>,

    /// External variable given as code read from a file.
    #[arg(long, value_name = "VAR=FILE")]
    pub ext_code_file: Vec<String>,

    /// Top-level argument as name=value, or name to read the environment.
    #[arg(short = 'A', long, value_name = "VAR")]
    pub tla_str: Vec<String>,

    /// Top-level argument read from a file.
    #[arg(long, value_name = "VAR=FILE")]
    pub tla_str_file: Vec<String>,

    /// Top-level argument given as code.
    #[arg(long, value_name = "VAR")]
    pub tla_code: Vec<String>,

    /// Top-level argument given as code read from a file.
    #[arg(long, value_name = "VAR=FILE")]
    pub tla_code_file: Vec<String>,

    /// Template merged onto every source.
    #[arg(long, value_name = "FILE")]
    pub overlay: Option<PathBuf>,

    /// Inline template code merged onto every source (after --overlay).
    #[arg(long, value_name = "CODE")]
    pub overlay_code: Option<String>,

    /// Annotate each resource with the file and path it was found at.
    #[arg(long, default_value_t = false)]
    pub show_provenance: bool,

    /// Image resolver: none or registry.
    #[arg(long, value_name = "RESOLVER")]
    pub resolve_images: Option<ResolverKind>,

    /// Action on resolver failure: ignore, warn or report.
    #[arg(long, value_name = "ACTION")]
    pub resolve_images_error: Option<FailureAction>,

    /// Registry host to reach over plain HTTP (repeatable).
    #[arg(long, value_name = "HOST")]
    pub insecure_registry: Vec<String>,

    /// Evaluation engine: jsonnet or mock.
    #[arg(long)]
    pub engine: Option<String>,

    /// jsonnet executable used by the jsonnet engine.
    #[arg(long, value_name = "PATH")]
    pub jsonnet_bin: Option<String>,

    /// Base directory for relative paths.
    #[arg(long, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,
}

impl ReadArgs {
    /// Build the pipeline config: the `--config` file (or defaults) with flags
    /// applied on top.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, String> {
        let mut config = match &self.config {
            Some(path) => {
                debug!("loading config from {}", path.display());
                PipelineConfig::load(path).map_err(|e| e.to_string())?
            }
            None => PipelineConfig::default(),
        };

        config.import_paths.extend(self.jpath.iter().cloned());
        config.import_urls.extend(self.jurl.iter().cloned());

        let groups = [
            (&self.ext_str, VarTarget::Ext, VarSource::Literal, VarExpr::String),
            (&self.ext_str_file, VarTarget::Ext, VarSource::File, VarExpr::String),
            (&self.ext_code, VarTarget::Ext, VarSource::Literal, VarExpr::Code),
            (&self.ext_code_file, VarTarget::Ext, VarSource::File, VarExpr::Code),
            (&self.tla_str, VarTarget::Tla, VarSource::Literal, VarExpr::String),
            (&self.tla_str_file, VarTarget::Tla, VarSource::File, VarExpr::String),
            (&self.tla_code, VarTarget::Tla, VarSource::Literal, VarExpr::Code),
            (&self.tla_code_file, VarTarget::Tla, VarSource::File, VarExpr::Code),
        ];
        for (specs, target, source, expr) in groups {
            for spec in specs {
                let var =
                    VarBinding::parse(spec, target, source, expr).map_err(|e| e.to_string())?;
                config.vars.push(var);
            }
        }

        if self.overlay.is_some() || self.overlay_code.is_some() {
            config.overlays.clear();
            if let Some(path) = &self.overlay {
                config.overlays.push(Overlay::Path(path.clone()));
            }
            if let Some(code) = &self.overlay_code {
                config.overlays.push(Overlay::Code(code.clone()));
            }
        }

        if self.show_provenance {
            config.provenance = true;
        }
        if let Some(kind) = self.resolve_images {
            config.resolver = kind;
        }
        if let Some(action) = self.resolve_images_error {
            config.resolver_failure = action;
        }
        config
            .registry
            .insecure_hosts
            .extend(self.insecure_registry.iter().cloned());
        if let Some(engine) = &self.engine {
            config.engine.clone_from(engine);
        }
        if let Some(bin) = &self.jsonnet_bin {
            config.jsonnet_bin.clone_from(bin);
        }
        if self.working_dir.is_some() {
            config.working_dir.clone_from(&self.working_dir);
        }
        Ok(config)
    }
}

/// Outcome of reading a batch from the command line.
pub enum BatchRead {
    Objects(Vec<Resource>),
    /// The pipeline failed; the error has been reported and this is the exit
    /// code to return.
    Failed(u8),
}

/// Run the pipeline described by `args`. Pipeline failures are printed here
/// and mapped to their exit code; setup failures are returned as errors.
pub fn read_batch(args: &ReadArgs) -> Result<BatchRead, String> {
    let config = args.pipeline_config()?;
    let pipeline = Pipeline::new(config).map_err(|e| e.to_string())?;
    debug!(
        "reading {} sources from {}",
        args.sources.len(),
        pipeline.working_dir().display()
    );
    match pipeline.read_batch(&args.sources) {
        Ok(objects) => Ok(BatchRead::Objects(objects)),
        Err(e) => {
            eprintln!("error: {e}");
            Ok(BatchRead::Failed(exit_code(&e)))
        }
    }
}

pub fn exit_code(err: &CoreError) -> u8 {
    match err {
        CoreError::Format { .. }
        | CoreError::Io { .. }
        | CoreError::Decode { .. }
        | CoreError::Eval { .. }
        | CoreError::Shape { .. }
        | CoreError::ListShape { .. } => EXIT_INPUT_ERROR,
        CoreError::Duplicate { .. } => EXIT_DUPLICATE,
        CoreError::Resolver { .. } => EXIT_RESOLVE_ERROR,
        CoreError::Config(_) | CoreError::Engine(_) => EXIT_FAILURE,
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}
