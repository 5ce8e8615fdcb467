use crate::cascade::{BuildInput, Cascade};
use crate::orchestration::checkpoint_store::CheckpointStore;
use crate::orchestration::error::OrchestratorError;
use crate::orchestration::integrator::{integrate, integrate_from_checkpoints};
use crate::orchestration::router::{next_step, NextStep};
use crate::orchestration::state::WorkflowState;
use crate::orchestration::step_execution::StepExecutor;
use crate::prompts::PromptSet;
use crate::provider::GenerationService;
use crate::schema::SchemaScoper;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_TOTAL_STEPS: u32 = 500;
pub const RUN_DIR_PREFIX: &str = "build_output_";

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_dir: PathBuf,
    pub state: WorkflowState,
    pub cascade: Cascade,
    /// `None` when recovery from the run's checkpoints failed.
    pub recovered: Option<Cascade>,
}

/// `save_folder/build_output_<timestamp>`, made unique if a run already used the name.
pub fn timestamped_run_dir(save_folder: &Path, now: DateTime<Utc>) -> PathBuf {
    let base = format!("{RUN_DIR_PREFIX}{}", now.format("%Y%m%d_%H%M%S"));
    let mut candidate = save_folder.join(&base);
    let mut attempt = 1;
    while candidate.exists() {
        attempt += 1;
        candidate = save_folder.join(format!("{base}_{attempt}"));
    }
    candidate
}

pub struct WorkflowEngine<'a> {
    generator: &'a dyn GenerationService,
    scoper: &'a SchemaScoper,
    prompts: &'a PromptSet,
    max_total_steps: u32,
}

impl<'a> WorkflowEngine<'a> {
    pub fn new(
        generator: &'a dyn GenerationService,
        scoper: &'a SchemaScoper,
        prompts: &'a PromptSet,
    ) -> Self {
        Self {
            generator,
            scoper,
            prompts,
            max_total_steps: DEFAULT_MAX_TOTAL_STEPS,
        }
    }

    pub fn with_max_total_steps(mut self, max_total_steps: u32) -> Self {
        self.max_total_steps = max_total_steps;
        self
    }

    /// Runs every step to completion, integrates the result, writes the final artifacts and
    /// checks that recovery from the checkpoints reproduces the live cascade.
    pub fn run(&self, input: BuildInput, run_dir: &Path) -> Result<RunSummary, OrchestratorError> {
        let mut state = WorkflowState::new(input)?;
        let store = CheckpointStore::new(run_dir);
        store.write_build_input(state.input())?;
        tracing::info!(run_dir = %run_dir.display(), "reconstruction run started");

        let executor = StepExecutor::new(self.generator, self.scoper, self.prompts, &store);
        loop {
            let step = match next_step(&state)? {
                NextStep::Done => break,
                NextStep::Run(step) => step,
            };
            if state.log().len() >= self.max_total_steps as usize {
                return Err(OrchestratorError::MaxStepsExceeded {
                    max_total_steps: self.max_total_steps,
                });
            }
            executor.execute(&mut state, step)?;
        }

        let cascade = integrate(state.log(), state.results())?;
        store.write_final_state(&state)?;
        store.write_final_cascade(&cascade)?;
        tracing::info!(
            steps = state.log().len(),
            stages = cascade.stage_count(),
            episodes = cascade.episode_count(),
            "live integration complete"
        );

        let recovered = match integrate_from_checkpoints(run_dir) {
            Ok(recovered) => recovered,
            Err(err @ OrchestratorError::Recovery { .. }) => {
                tracing::error!(error = %err, "recovery integration failed");
                return Ok(RunSummary {
                    run_dir: run_dir.to_path_buf(),
                    state,
                    cascade,
                    recovered: None,
                });
            }
            Err(err) => return Err(err),
        };
        store.write_integrated_cascade(&recovered)?;
        if recovered != cascade {
            return Err(OrchestratorError::Structural(
                "cascade recovered from checkpoints differs from the live cascade".to_string(),
            ));
        }

        Ok(RunSummary {
            run_dir: run_dir.to_path_buf(),
            state,
            cascade,
            recovered: Some(recovered),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn run_dirs_do_not_collide() {
        let dir = tempfile::tempdir().expect("tempdir");
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).single().expect("time");
        let first = timestamped_run_dir(dir.path(), now);
        assert!(first.ends_with("build_output_20260304_050607"));
        std::fs::create_dir_all(&first).expect("mkdir");
        let second = timestamped_run_dir(dir.path(), now);
        assert!(second.ends_with("build_output_20260304_050607_2"));
    }
}
