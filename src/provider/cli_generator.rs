use crate::provider::prompt_files::file_backed_message;
use crate::provider::{
    run_provider, write_file_backed_prompt, Generation, GenerationService, ProviderError,
    ProviderKind, ProviderRequest, RunnerBinaries,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// [`GenerationService`] backed by the `claude` or `codex` command-line tools.
#[derive(Debug)]
pub struct CliGenerator {
    provider: ProviderKind,
    model: String,
    binaries: RunnerBinaries,
    workspace: PathBuf,
    timeout: Duration,
    env_overrides: BTreeMap<String, String>,
    calls: AtomicU32,
}

impl CliGenerator {
    pub fn new(
        provider: ProviderKind,
        model: impl Into<String>,
        binaries: RunnerBinaries,
        workspace: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            binaries,
            workspace: workspace.into(),
            timeout,
            env_overrides: BTreeMap::new(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_overrides.insert(key.into(), value.into());
        self
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }
}

impl GenerationService for CliGenerator {
    fn generate(
        &self,
        system_instruction: &str,
        user_instruction: &str,
        _variables: &BTreeMap<String, String>,
    ) -> Result<Generation, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let request_id = format!("generation-{call:04}");
        let prompt_artifacts = write_file_backed_prompt(
            &self.workspace,
            &request_id,
            system_instruction,
            user_instruction,
        )?;
        let request = ProviderRequest {
            request_id,
            provider: self.provider,
            model: self.model.clone(),
            cwd: self.workspace.clone(),
            message: file_backed_message(&prompt_artifacts),
            prompt_artifacts,
            timeout: self.timeout,
            env_overrides: self.env_overrides.clone(),
        };
        let result = run_provider(&request, &self.binaries)?;
        Ok(Generation {
            text: result.message,
        })
    }
}
