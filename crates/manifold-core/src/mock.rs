use crate::engine::{EngineError, EvalEngine};
use crate::env::EvalEnv;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One recorded [`MockEngine::evaluate`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalCall {
    pub location: PathBuf,
    pub content: String,
    pub env: EvalEnv,
}

/// Engine for tests and dry runs: template content must already be JSON and
/// is returned unchanged. Every call is recorded.
#[derive(Debug, Default)]
pub struct MockEngine {
    calls: Mutex<Vec<EvalCall>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<EvalCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl EvalEngine for MockEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn evaluate(
        &self,
        location: &Path,
        content: &str,
        env: &EvalEnv,
    ) -> Result<String, EngineError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(EvalCall {
                location: location.to_path_buf(),
                content: content.to_owned(),
                env: env.clone(),
            });
        }
        serde_json::from_str::<serde_json::Value>(content)
            .map_err(|e| EngineError::Evaluation(format!("mock engine expects JSON: {e}")))?;
        Ok(content.to_owned())
    }
}
