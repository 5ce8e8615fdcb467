use super::{ConfigError, Settings};
use crate::provider::RunnerBinaries;
use std::path::Path;

pub const SETTINGS_FILE_NAME: &str = "cascade.yaml";
pub const ENV_PROVIDER_BIN_ANTHROPIC: &str = "CASCADE_PROVIDER_BIN_ANTHROPIC";
pub const ENV_PROVIDER_BIN_OPENAI: &str = "CASCADE_PROVIDER_BIN_OPENAI";

/// Reads, path-resolves and validates a settings file. `None` yields validated defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let settings = match path {
        Some(path) => {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            Settings::from_path(path)?.resolve_paths(base)
        }
        None => Settings::default(),
    };
    settings.validate()?;
    Ok(settings)
}

/// Environment variables win over the settings file, which wins over `claude` / `codex`.
pub fn resolve_runner_binaries<F>(settings: &Settings, env: F) -> RunnerBinaries
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = RunnerBinaries::default();
    RunnerBinaries {
        anthropic: env(ENV_PROVIDER_BIN_ANTHROPIC)
            .or_else(|| settings.binaries.anthropic.clone())
            .unwrap_or(defaults.anthropic),
        openai: env(ENV_PROVIDER_BIN_OPENAI)
            .or_else(|| settings.binaries.openai.clone())
            .unwrap_or(defaults.openai),
    }
}
