use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod cli_generator;
pub mod invocation;
pub mod model_map;
pub mod output_parse;
pub mod prompt_files;
pub mod runner;

pub use cli_generator::CliGenerator;
pub use invocation::build_invocation;
pub use model_map::resolve_anthropic_model;
pub use output_parse::parse_openai_jsonl;
pub use prompt_files::write_file_backed_prompt;
pub use runner::{run_provider, RunnerBinaries};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("unknown provider `{0}`")]
    UnknownProvider(String),
    #[error("unsupported anthropic model `{0}`")]
    UnsupportedAnthropicModel(String),
    #[error("provider binary missing for {provider}: {binary}")]
    MissingBinary {
        provider: ProviderKind,
        binary: String,
        log: Box<InvocationLog>,
    },
    #[error("provider process failed for {provider} with exit code {exit_code}: {stderr}")]
    NonZeroExit {
        provider: ProviderKind,
        exit_code: i32,
        stderr: String,
        log: Box<InvocationLog>,
    },
    #[error("provider process timed out for {provider} after {timeout_ms}ms")]
    Timeout {
        provider: ProviderKind,
        timeout_ms: u64,
        log: Box<InvocationLog>,
    },
    #[error("provider output parse failure for {provider}: {reason}")]
    ParseFailure {
        provider: ProviderKind,
        reason: String,
        log: Option<Box<InvocationLog>>,
    },
    #[error("generation backend failed: {0}")]
    Backend(String),
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::OpenAi => write!(f, "openai"),
        }
    }
}

impl TryFrom<&str> for ProviderKind {
    type Error = ProviderError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }
}

/// Text returned by one blocking generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
}

/// A blocking text-generation backend. One call per reconstruction step.
pub trait GenerationService {
    fn generate(
        &self,
        system_instruction: &str,
        user_instruction: &str,
        variables: &BTreeMap<String, String>,
    ) -> Result<Generation, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct PromptArtifacts {
    pub system_file: PathBuf,
    pub user_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub request_id: String,
    pub provider: ProviderKind,
    pub model: String,
    pub cwd: PathBuf,
    pub message: String,
    pub prompt_artifacts: PromptArtifacts,
    pub timeout: Duration,
    pub env_overrides: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct InvocationSpec {
    pub binary: String,
    pub args: Vec<String>,
    pub resolved_model: String,
}

#[derive(Debug, Clone)]
pub struct InvocationLog {
    pub request_id: String,
    pub provider: ProviderKind,
    pub model: String,
    pub command_form: String,
    pub working_directory: PathBuf,
    pub system_file: PathBuf,
    pub user_file: PathBuf,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

#[derive(Debug, Clone)]
pub struct ProviderResult {
    pub message: String,
    pub log: InvocationLog,
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> ProviderError {
    ProviderError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_request(provider: ProviderKind, base: &Path) -> ProviderRequest {
        ProviderRequest {
            request_id: "req-1".to_string(),
            provider,
            model: "sonnet".to_string(),
            cwd: base.to_path_buf(),
            message: "use files".to_string(),
            prompt_artifacts: write_file_backed_prompt(base, "req-1", "system", "user")
                .expect("prompt artifacts"),
            timeout: Duration::from_secs(1),
            env_overrides: BTreeMap::new(),
        }
    }

    #[test]
    fn anthropic_model_aliases_map() {
        assert_eq!(
            resolve_anthropic_model("sonnet").expect("map"),
            "claude-sonnet-4-5"
        );
        assert!(resolve_anthropic_model("gpt-5").is_err());
    }

    #[test]
    fn invocation_builds_single_shot_anthropic_args() {
        let dir = tempdir().expect("tempdir");
        let req = sample_request(ProviderKind::Anthropic, dir.path());
        let spec = build_invocation(&req, &RunnerBinaries::default()).expect("build");
        assert_eq!(spec.binary, "claude");
        assert!(spec.args.contains(&"-p".to_string()));
        assert!(!spec.args.contains(&"-c".to_string()));
    }

    #[test]
    fn invocation_never_resumes_openai_sessions() {
        let dir = tempdir().expect("tempdir");
        let mut req = sample_request(ProviderKind::OpenAi, dir.path());
        req.model = "gpt-5.2".to_string();

        let spec = build_invocation(&req, &RunnerBinaries::default()).expect("build");
        assert_eq!(spec.binary, "codex");
        assert_eq!(&spec.args[0], "exec");
        assert!(!spec.args.contains(&"resume".to_string()));
        assert!(spec.args.contains(&"--json".to_string()));
    }

    #[test]
    fn provider_kind_parses_case_insensitively() {
        assert_eq!(
            ProviderKind::try_from(" OpenAI ").expect("kind"),
            ProviderKind::OpenAi
        );
        assert!(ProviderKind::try_from("gemini").is_err());
    }
}
