use crate::env::{EvalEnv, SearchPath, VarTarget};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to run {program}: {err}")]
    Spawn {
        program: String,
        #[source]
        err: std::io::Error,
    },
    #[error("{0}")]
    Evaluation(String),
    #[error("unknown evaluation engine '{0}', expected 'jsonnet' or 'mock'")]
    Unknown(String),
}

/// Evaluates template source to JSON text.
///
/// `location` is the absolute path the content was read from (or stands in
/// for); relative imports are resolved next to it.
pub trait EvalEngine: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, location: &Path, content: &str, env: &EvalEnv)
        -> Result<String, EngineError>;
}

impl<E: EvalEngine + ?Sized> EvalEngine for Arc<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn evaluate(
        &self,
        location: &Path,
        content: &str,
        env: &EvalEnv,
    ) -> Result<String, EngineError> {
        (**self).evaluate(location, content, env)
    }
}

/// Evaluates by piping content to an external `jsonnet` binary.
pub struct JsonnetCommand {
    program: String,
}

impl JsonnetCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, location: &Path, env: &EvalEnv) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(dir) = location.parent() {
            cmd.current_dir(dir);
        }

        // The right-most `-J` wins, so pass them lowest precedence first.
        for path in env.search_paths.iter().rev() {
            match path {
                SearchPath::Url(url) if url.scheme() == "file" => {
                    if let Ok(dir) = url.to_file_path() {
                        cmd.arg("-J").arg(dir);
                    }
                }
                SearchPath::Builtin => {}
                SearchPath::Url(url) => {
                    debug!("{} cannot search {url}, skipping", self.program);
                }
            }
        }

        for binding in &env.bindings {
            let flag = match (binding.target, binding.code) {
                (VarTarget::Ext, false) => "--ext-str",
                (VarTarget::Ext, true) => "--ext-code",
                (VarTarget::Tla, false) => "--tla-str",
                (VarTarget::Tla, true) => "--tla-code",
            };
            cmd.arg(flag)
                .arg(format!("{}={}", binding.name, binding.value));
        }

        cmd.arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Default for JsonnetCommand {
    fn default() -> Self {
        Self::new("jsonnet")
    }
}

impl EvalEngine for JsonnetCommand {
    fn name(&self) -> &'static str {
        "jsonnet"
    }

    fn evaluate(
        &self,
        location: &Path,
        content: &str,
        env: &EvalEnv,
    ) -> Result<String, EngineError> {
        let spawn_err = |err| EngineError::Spawn {
            program: self.program.clone(),
            err,
        };

        debug!("{} evaluating {}", self.program, location.display());
        let mut child = self.command(location, env).spawn().map_err(spawn_err)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(content.as_bytes()).map_err(spawn_err)?;
        }
        let output = child.wait_with_output().map_err(spawn_err)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Evaluation(stderr.trim().to_owned()));
        }
        String::from_utf8(output.stdout)
            .map_err(|e| EngineError::Evaluation(format!("output is not UTF-8: {e}")))
    }
}

/// Select an engine by name.
pub fn select_engine(name: &str, program: &str) -> Result<Arc<dyn EvalEngine>, EngineError> {
    match name {
        "jsonnet" => Ok(Arc::new(JsonnetCommand::new(program))),
        "mock" => Ok(Arc::new(crate::mock::MockEngine::new())),
        other => Err(EngineError::Unknown(other.to_owned())),
    }
}
