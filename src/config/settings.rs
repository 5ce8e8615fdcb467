use super::ConfigError;
use crate::provider::ProviderKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BinaryOverrides {
    #[serde(default)]
    pub anthropic: Option<String>,
    #[serde(default)]
    pub openai: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_save_folder")]
    pub save_folder: PathBuf,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_step_timeout_seconds")]
    pub step_timeout_seconds: u64,
    #[serde(default = "default_max_total_steps")]
    pub max_total_steps: u32,
    #[serde(default)]
    pub schema_path: Option<PathBuf>,
    #[serde(default)]
    pub prompts_dir: Option<PathBuf>,
    #[serde(default)]
    pub binaries: BinaryOverrides,
}

fn default_save_folder() -> PathBuf {
    PathBuf::from("output")
}

fn default_provider() -> String {
    "anthropic".to_string()
}

fn default_model() -> String {
    "sonnet".to_string()
}

fn default_step_timeout_seconds() -> u64 {
    900
}

fn default_max_total_steps() -> u32 {
    500
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_folder: default_save_folder(),
            provider: default_provider(),
            model: default_model(),
            step_timeout_seconds: default_step_timeout_seconds(),
            max_total_steps: default_max_total_steps(),
            schema_path: None,
            prompts_dir: None,
            binaries: BinaryOverrides::default(),
        }
    }
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw, path)
    }

    pub fn from_yaml(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.save_folder.as_os_str().is_empty() {
            return Err(ConfigError::Settings(
                "`save_folder` must be non-empty".to_string(),
            ));
        }
        self.provider_kind()?;
        if self.model.trim().is_empty() {
            return Err(ConfigError::Settings("`model` must be non-empty".to_string()));
        }
        if self.step_timeout_seconds == 0 {
            return Err(ConfigError::Settings(
                "`step_timeout_seconds` must be greater than zero".to_string(),
            ));
        }
        if self.max_total_steps == 0 {
            return Err(ConfigError::Settings(
                "`max_total_steps` must be greater than zero".to_string(),
            ));
        }
        for (name, value) in [
            ("binaries.anthropic", &self.binaries.anthropic),
            ("binaries.openai", &self.binaries.openai),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ConfigError::Settings(format!(
                    "`{name}` must be non-empty when set"
                )));
            }
        }
        Ok(())
    }

    pub fn provider_kind(&self) -> Result<ProviderKind, ConfigError> {
        ProviderKind::try_from(self.provider.as_str())
            .map_err(|_| {
                ConfigError::Settings(format!(
                    "`provider` must be `anthropic` or `openai`, got `{}`",
                    self.provider
                ))
            })
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_seconds)
    }

    /// Relative paths resolve against `base`, normally the settings file's directory.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |path: PathBuf| {
            if path.is_absolute() {
                path
            } else {
                base.join(path)
            }
        };
        self.save_folder = resolve(self.save_folder);
        self.schema_path = self.schema_path.map(resolve);
        self.prompts_dir = self.prompts_dir.map(resolve);
        self
    }

    pub fn load_schema_text(&self) -> Result<Option<String>, ConfigError> {
        let Some(path) = &self.schema_path else {
            return Ok(None);
        };
        fs::read_to_string(path)
            .map(Some)
            .map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })
    }
}
