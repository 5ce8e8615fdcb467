use crate::orchestration::error::OrchestratorError;
use crate::orchestration::state::WorkflowState;
use crate::orchestration::step::StepKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    Run(StepKind),
    Done,
}

#[derive(Debug, Clone)]
struct LoopProgress {
    cumulative: Vec<usize>,
    completed_episodes: usize,
    completed_stages: usize,
}

impl LoopProgress {
    fn read(state: &WorkflowState) -> Result<Self, OrchestratorError> {
        let skeleton = state.skeleton()?.ok_or_else(|| {
            OrchestratorError::Structural("episode loop reached without a skeleton".to_string())
        })?;
        Ok(Self {
            cumulative: skeleton.cumulative_episode_counts(),
            completed_episodes: state.count(StepKind::Episode),
            completed_stages: state.count(StepKind::StageAggregate),
        })
    }

    fn total_episodes(&self) -> usize {
        self.cumulative.last().copied().unwrap_or(0)
    }

    /// The next stage whose aggregation has not run and whose episodes are all complete.
    /// Stages without episodes become pending as soon as the previous boundary is reached.
    fn stage_ready(&self) -> bool {
        self.cumulative
            .get(self.completed_stages)
            .is_some_and(|boundary| self.completed_episodes >= *boundary)
    }

    fn stages_remaining(&self) -> bool {
        self.completed_stages < self.cumulative.len()
    }
}

/// Decides the step after the most recent one. Reads the state only.
pub fn next_step(state: &WorkflowState) -> Result<NextStep, OrchestratorError> {
    let Some(last) = state.last_step() else {
        return Ok(NextStep::Run(StepKind::Skeleton));
    };
    let next = match last {
        StepKind::Skeleton => NextStep::Run(StepKind::Verify),
        StepKind::Participant => NextStep::Run(StepKind::Transaction),
        StepKind::Transaction => NextStep::Run(StepKind::Episode),
        StepKind::Verify | StepKind::StageAggregate => {
            let progress = LoopProgress::read(state)?;
            if progress.stage_ready() {
                NextStep::Run(StepKind::StageAggregate)
            } else if progress.stages_remaining() {
                NextStep::Run(StepKind::Participant)
            } else {
                NextStep::Run(StepKind::EventAggregate)
            }
        }
        StepKind::Episode => {
            let progress = LoopProgress::read(state)?;
            if progress.stage_ready() {
                NextStep::Run(StepKind::StageAggregate)
            } else if progress.completed_episodes < progress.total_episodes() {
                NextStep::Run(StepKind::Participant)
            } else {
                tracing::warn!(
                    completed_episodes = progress.completed_episodes,
                    completed_stages = progress.completed_stages,
                    "episode loop finished without a pending stage aggregation"
                );
                NextStep::Done
            }
        }
        StepKind::EventAggregate => NextStep::Done,
    };
    Ok(next)
}
