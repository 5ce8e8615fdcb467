use crate::cascade::{BuildInput, Cascade, TargetCoordinate};
use crate::orchestration::error::{io_error, json_error, OrchestratorError};
use crate::orchestration::state::{StepResult, WorkflowState};
use crate::orchestration::step::StepKind;
use crate::shared::fs_atomic::atomic_write_json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const BUILD_INPUT_FILE: &str = "BuildInput.json";
pub const FINAL_STATE_FILE: &str = "FinalState.json";
pub const FINAL_CASCADE_FILE: &str = "FinalEventCascade.json";
pub const INTEGRATED_CASCADE_FILE: &str = "IntegratedEventCascade.json";
pub const RESULT_FILE_SUFFIX: &str = "-Result.json";

/// Everything exchanged with the generation service for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExchange {
    pub step: StepKind,
    pub sequence: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetCoordinate>,
    pub system_instruction: String,
    pub user_instruction: String,
    pub instructions_sha256: String,
    pub variables: BTreeMap<String, String>,
    pub raw_response: String,
    pub recorded_at: String,
}

impl StepExchange {
    pub fn instructions_digest(system_instruction: &str, user_instruction: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(system_instruction.as_bytes());
        hasher.update([0]);
        hasher.update(user_instruction.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }
}

/// `(step, sequence, optional suffix)` key of a checkpoint pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointKey {
    pub step: StepKind,
    pub sequence: u32,
    pub target: Option<TargetCoordinate>,
}

impl CheckpointKey {
    pub fn stem(&self) -> String {
        let base = format!("{}-{}", self.step.checkpoint_name(), self.sequence);
        match self.target {
            Some(target) => format!("{base}-{}", target.checkpoint_suffix()),
            None => base,
        }
    }

    pub fn exchange_file_name(&self) -> String {
        format!("{}.json", self.stem())
    }

    pub fn result_file_name(&self) -> String {
        format!("{}{RESULT_FILE_SUFFIX}", self.stem())
    }

    /// Parses a `*-Result.json` file name. Returns why the file is not a usable result.
    pub fn parse_result_file_name(file_name: &str) -> Result<Self, String> {
        let Some(stem) = file_name.strip_suffix(RESULT_FILE_SUFFIX) else {
            return Err("not a result file".to_string());
        };
        let mut parts = stem.splitn(3, '-');
        let step_name = parts.next().unwrap_or_default();
        let Some(step) = StepKind::from_checkpoint_name(step_name) else {
            return Err(format!("unknown step name `{step_name}`"));
        };
        let sequence_token = parts.next().unwrap_or_default();
        let sequence = sequence_token
            .parse::<u32>()
            .map_err(|_| format!("sequence token `{sequence_token}` is not an integer"))?;
        let target = match parts.next() {
            None => None,
            Some(suffix) => Some(
                TargetCoordinate::parse_suffix(suffix)
                    .ok_or_else(|| format!("unrecognized suffix `{suffix}`"))?,
            ),
        };
        Ok(Self {
            step,
            sequence,
            target,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<(), OrchestratorError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))
    }

    /// Writes the exchange file, then the result file. Both are written atomically.
    pub fn write_step(
        &self,
        exchange: &StepExchange,
        payload: &Value,
    ) -> Result<PathBuf, OrchestratorError> {
        self.ensure_dir()?;
        let key = CheckpointKey {
            step: exchange.step,
            sequence: exchange.sequence,
            target: exchange.target,
        };
        let exchange_path = self.dir.join(key.exchange_file_name());
        atomic_write_json(&exchange_path, exchange).map_err(|e| io_error(&exchange_path, e))?;
        let result_path = self.dir.join(key.result_file_name());
        atomic_write_json(&result_path, payload).map_err(|e| io_error(&result_path, e))?;
        Ok(result_path)
    }

    pub fn load_exchange(&self, key: &CheckpointKey) -> Result<StepExchange, OrchestratorError> {
        self.read_json(&self.dir.join(key.exchange_file_name()))
    }

    /// Scans the directory for result files and returns them ordered by sequence.
    pub fn load_results(&self) -> Result<Vec<StepResult>, OrchestratorError> {
        let entries = fs::read_dir(&self.dir).map_err(|err| OrchestratorError::Recovery {
            path: self.dir.display().to_string(),
            reason: format!("cannot read checkpoint directory: {err}"),
        })?;

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&self.dir, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if !file_name.ends_with(RESULT_FILE_SUFFIX) {
                continue;
            }
            let key = match CheckpointKey::parse_result_file_name(file_name) {
                Ok(key) => key,
                Err(reason) => {
                    tracing::warn!(file = %file_name, %reason, "skipping checkpoint file");
                    continue;
                }
            };
            found.push((key, entry.path()));
        }

        if found.is_empty() {
            return Err(OrchestratorError::Recovery {
                path: self.dir.display().to_string(),
                reason: format!("no usable `*{RESULT_FILE_SUFFIX}` files"),
            });
        }

        found.sort_by_key(|(key, _)| key.sequence);
        if let Some(pair) = found
            .windows(2)
            .find(|pair| pair[0].0.sequence == pair[1].0.sequence)
        {
            return Err(OrchestratorError::Recovery {
                path: self.dir.display().to_string(),
                reason: format!(
                    "sequence {} appears in both {} and {}",
                    pair[0].0.sequence,
                    pair[0].1.display(),
                    pair[1].1.display()
                ),
            });
        }

        let mut results = Vec::with_capacity(found.len());
        for (key, path) in found {
            let raw = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
            let payload = serde_json::from_str(&raw).map_err(|err| OrchestratorError::Recovery {
                path: path.display().to_string(),
                reason: format!("result file is not valid json: {err}"),
            })?;
            results.push(StepResult {
                step: key.step,
                sequence: key.sequence,
                payload,
                target: key.target,
            });
        }
        Ok(results)
    }

    pub fn write_build_input(&self, input: &BuildInput) -> Result<PathBuf, OrchestratorError> {
        self.write_artifact(BUILD_INPUT_FILE, input)
    }

    pub fn load_build_input(&self) -> Result<BuildInput, OrchestratorError> {
        self.read_json(&self.dir.join(BUILD_INPUT_FILE))
    }

    pub fn write_final_state(&self, state: &WorkflowState) -> Result<PathBuf, OrchestratorError> {
        self.write_artifact(FINAL_STATE_FILE, state)
    }

    pub fn write_final_cascade(&self, cascade: &Cascade) -> Result<PathBuf, OrchestratorError> {
        self.write_artifact(FINAL_CASCADE_FILE, cascade)
    }

    pub fn write_integrated_cascade(
        &self,
        cascade: &Cascade,
    ) -> Result<PathBuf, OrchestratorError> {
        self.write_artifact(INTEGRATED_CASCADE_FILE, cascade)
    }

    fn write_artifact<T: Serialize>(
        &self,
        file_name: &str,
        value: &T,
    ) -> Result<PathBuf, OrchestratorError> {
        self.ensure_dir()?;
        let path = self.dir.join(file_name);
        atomic_write_json(&path, value).map_err(|e| io_error(&path, e))?;
        Ok(path)
    }

    fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &Path,
    ) -> Result<T, OrchestratorError> {
        let raw = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        serde_json::from_str(&raw).map_err(|e| json_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_file_names_parse_with_and_without_suffix() {
        let key = CheckpointKey::parse_result_file_name(
            "ParticipantReconstructor-7-Stage1-Episode0-Result.json",
        )
        .expect("key");
        assert_eq!(key.step, StepKind::Participant);
        assert_eq!(key.sequence, 7);
        assert_eq!(
            key.target,
            Some(TargetCoordinate::Episode {
                stage: 1,
                episode: 0
            })
        );
        assert_eq!(
            key.result_file_name(),
            "ParticipantReconstructor-7-Stage1-Episode0-Result.json"
        );

        let key = CheckpointKey::parse_result_file_name("SkeletonReconstructor-1-Result.json")
            .expect("key");
        assert_eq!(key.target, None);
        assert_eq!(key.exchange_file_name(), "SkeletonReconstructor-1.json");
    }

    #[test]
    fn non_integer_sequence_is_rejected() {
        let err = CheckpointKey::parse_result_file_name("SkeletonReconstructor-x-Result.json")
            .expect_err("bad sequence");
        assert!(err.contains("not an integer"));
    }
}
