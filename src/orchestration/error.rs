use crate::config::ConfigError;
use crate::provider::ProviderError;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("invalid build input: {0}")]
    Input(String),
    #[error("step `{step}` response could not be parsed: {reason}")]
    Parse { step: String, reason: String },
    #[error("structural error: {0}")]
    Structural(String),
    #[error("checkpoint recovery failed for {path}: {reason}")]
    Recovery { path: String, reason: String },
    #[error("generation failed for step `{step}`: {source}")]
    Generation {
        step: String,
        #[source]
        source: ProviderError,
    },
    #[error("prompt render failed for step `{step}`: {reason}")]
    PromptRender { step: String, reason: String },
    #[error("reconstruction exceeded max total steps ({max_total_steps})")]
    MaxStepsExceeded { max_total_steps: u32 },
    #[error("config error: {0}")]
    Config(String),
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<ConfigError> for OrchestratorError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> OrchestratorError {
    OrchestratorError::Io {
        path: path.display().to_string(),
        source,
    }
}

pub(crate) fn json_error(path: &Path, source: serde_json::Error) -> OrchestratorError {
    OrchestratorError::Json {
        path: path.display().to_string(),
        source,
    }
}
