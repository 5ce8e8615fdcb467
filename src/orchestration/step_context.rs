use crate::cascade::{BuildInput, Cascade, Episode, Stage, TargetCoordinate};
use crate::orchestration::error::OrchestratorError;
use crate::orchestration::integrator::{assemble, Assembly};
use crate::orchestration::state::{StepResult, WorkflowState};
use crate::orchestration::step::StepKind;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Step-specific inputs, one variant per step kind.
#[derive(Debug, Clone, PartialEq)]
pub enum StepContext {
    Skeleton,
    Verify {
        skeleton: Cascade,
    },
    Participant {
        target: TargetCoordinate,
        episode: Episode,
        /// Skeleton where every episode processed so far carries its participants.
        annotated_skeleton: Cascade,
    },
    Transaction {
        target: TargetCoordinate,
        episode: Episode,
    },
    Episode {
        target: TargetCoordinate,
        stage: Stage,
        episode: Episode,
    },
    StageAggregate {
        target: TargetCoordinate,
        stage: Stage,
    },
    EventAggregate {
        cascade: Cascade,
    },
}

fn structural(message: impl Into<String>) -> OrchestratorError {
    OrchestratorError::Structural(message.into())
}

fn list_payload(result: &StepResult, key: &str) -> Vec<Value> {
    match &result.payload {
        Value::Array(items) => items.clone(),
        other => other
            .get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    }
}

impl StepContext {
    pub fn build(state: &WorkflowState, step: StepKind) -> Result<Self, OrchestratorError> {
        match step {
            StepKind::Skeleton => Ok(StepContext::Skeleton),
            StepKind::Verify => {
                let raw = state
                    .latest(StepKind::Skeleton)
                    .ok_or_else(|| structural("verification requested before a skeleton"))?;
                let skeleton = Cascade::from_payload(&raw.payload).map_err(|err| {
                    structural(format!("skeleton result is not a cascade: {err}"))
                })?;
                Ok(StepContext::Verify { skeleton })
            }
            StepKind::Participant => {
                let skeleton = require_skeleton(state)?;
                let (target, _, episode) = target_episode(&skeleton, state.count(step))?;
                let mut annotated_skeleton = skeleton.clone();
                let coordinates = skeleton.episode_coordinates();
                for (coordinate, result) in coordinates
                    .into_iter()
                    .zip(state.results_of(StepKind::Participant))
                {
                    if let Some(node) = annotated_skeleton.episode_mut(coordinate) {
                        node.participants = list_payload(result, "participants");
                    }
                }
                Ok(StepContext::Participant {
                    target,
                    episode,
                    annotated_skeleton,
                })
            }
            StepKind::Transaction => {
                let skeleton = require_skeleton(state)?;
                let ordinal = state.count(step);
                let (target, _, mut episode) = target_episode(&skeleton, ordinal)?;
                if state.count(StepKind::Participant) != ordinal + 1 {
                    return Err(structural(format!(
                        "{target} has no fresh {} result",
                        StepKind::Participant
                    )));
                }
                let participants = state
                    .latest(StepKind::Participant)
                    .ok_or_else(|| structural("missing participant result"))?;
                episode.participants = list_payload(participants, "participants");
                Ok(StepContext::Transaction { target, episode })
            }
            StepKind::Episode => {
                let skeleton = require_skeleton(state)?;
                let (target, stage, mut episode) = target_episode(&skeleton, state.count(step))?;
                let (transaction, participant) = match state.results() {
                    [.., participant, transaction]
                        if participant.step == StepKind::Participant
                            && transaction.step == StepKind::Transaction =>
                    {
                        (transaction, participant)
                    }
                    _ => {
                        return Err(structural(format!(
                            "{} for {target} must directly follow {} and {}",
                            StepKind::Episode,
                            StepKind::Participant,
                            StepKind::Transaction
                        )))
                    }
                };
                episode.participants = list_payload(participant, "participants");
                episode.transactions = list_payload(transaction, "transactions");
                Ok(StepContext::Episode {
                    target,
                    stage,
                    episode,
                })
            }
            StepKind::StageAggregate => {
                let position = state.count(step);
                let integrated = assemble(state.results(), Assembly::Partial)?;
                let stage = integrated.stages.get(position).cloned().ok_or_else(|| {
                    structural(format!("no stage at position {position} to aggregate"))
                })?;
                Ok(StepContext::StageAggregate {
                    target: TargetCoordinate::Stage { stage: position },
                    stage,
                })
            }
            StepKind::EventAggregate => Ok(StepContext::EventAggregate {
                cascade: assemble(state.results(), Assembly::Partial)?,
            }),
        }
    }

    pub fn step(&self) -> StepKind {
        match self {
            StepContext::Skeleton => StepKind::Skeleton,
            StepContext::Verify { .. } => StepKind::Verify,
            StepContext::Participant { .. } => StepKind::Participant,
            StepContext::Transaction { .. } => StepKind::Transaction,
            StepContext::Episode { .. } => StepKind::Episode,
            StepContext::StageAggregate { .. } => StepKind::StageAggregate,
            StepContext::EventAggregate { .. } => StepKind::EventAggregate,
        }
    }

    pub fn target(&self) -> Option<TargetCoordinate> {
        match self {
            StepContext::Participant { target, .. }
            | StepContext::Transaction { target, .. }
            | StepContext::Episode { target, .. }
            | StepContext::StageAggregate { target, .. } => Some(*target),
            StepContext::Skeleton
            | StepContext::Verify { .. }
            | StepContext::EventAggregate { .. } => None,
        }
    }

    /// Template variables: the run input, the scoped schema and the step's own context.
    pub fn variables(
        &self,
        input: &BuildInput,
        schema: &str,
    ) -> Result<BTreeMap<String, String>, OrchestratorError> {
        let mut variables = BTreeMap::from([
            ("Query".to_string(), input.query.clone()),
            ("Keywords".to_string(), input.joined_keywords()),
            ("Content".to_string(), input.joined_content()),
            ("Schema".to_string(), schema.to_string()),
        ]);
        let step = self.step();
        let mut insert = |name: &str, json: String| {
            variables.insert(name.to_string(), json);
        };
        match self {
            StepContext::Skeleton => {}
            StepContext::Verify { skeleton } => insert("Skeleton", pretty(step, skeleton)?),
            StepContext::Participant {
                episode,
                annotated_skeleton,
                ..
            } => {
                insert("Episode", pretty(step, episode)?);
                insert("Skeleton", pretty(step, annotated_skeleton)?);
            }
            StepContext::Transaction { episode, .. } => insert("Episode", pretty(step, episode)?),
            StepContext::Episode { stage, episode, .. } => {
                insert("Stage", pretty(step, stage)?);
                insert("Episode", pretty(step, episode)?);
            }
            StepContext::StageAggregate { stage, .. } => insert("Stage", pretty(step, stage)?),
            StepContext::EventAggregate { cascade } => insert("Cascade", pretty(step, cascade)?),
        }
        Ok(variables)
    }
}

fn pretty<T: Serialize>(step: StepKind, value: &T) -> Result<String, OrchestratorError> {
    serde_json::to_string_pretty(value).map_err(|err| OrchestratorError::PromptRender {
        step: step.to_string(),
        reason: format!("failed to encode context: {err}"),
    })
}

fn require_skeleton(state: &WorkflowState) -> Result<Cascade, OrchestratorError> {
    state
        .skeleton()?
        .ok_or_else(|| structural("episode step requested before a skeleton"))
}

fn target_episode(
    skeleton: &Cascade,
    ordinal: usize,
) -> Result<(TargetCoordinate, Stage, Episode), OrchestratorError> {
    let found = skeleton
        .episode_at(ordinal)
        .ok_or_else(|| structural(format!("no episode at ordinal {ordinal} in the skeleton")))?;
    Ok((
        found.coordinate(),
        found.stage.clone(),
        found.episode.clone(),
    ))
}
