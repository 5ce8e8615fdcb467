use crate::cascade::{BuildInput, Cascade, TargetCoordinate};
use crate::orchestration::error::OrchestratorError;
use crate::orchestration::step::StepKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: StepKind,
    pub sequence: u32,
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetCoordinate>,
}

/// Ledger of a reconstruction run.
///
/// The execution log and the results list only ever grow; `next_sequence` names the next
/// checkpoint and starts at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    input: BuildInput,
    log: Vec<StepKind>,
    results: Vec<StepResult>,
    next_sequence: u32,
}

impl WorkflowState {
    pub fn new(input: BuildInput) -> Result<Self, OrchestratorError> {
        input.validate().map_err(OrchestratorError::Input)?;
        Ok(Self {
            input,
            log: Vec::new(),
            results: Vec::new(),
            next_sequence: 1,
        })
    }

    /// Rebuilds a ledger from results ordered by sequence, as recovered from checkpoints.
    pub fn from_results(
        input: BuildInput,
        results: Vec<StepResult>,
    ) -> Result<Self, OrchestratorError> {
        let mut state = Self::new(input)?;
        for result in results {
            if result.sequence < state.next_sequence {
                return Err(OrchestratorError::Structural(format!(
                    "result sequence {} is not after {}",
                    result.sequence,
                    state.next_sequence.saturating_sub(1)
                )));
            }
            state.next_sequence = result.sequence;
            state.record(result);
        }
        Ok(state)
    }

    pub fn input(&self) -> &BuildInput {
        &self.input
    }

    pub fn log(&self) -> &[StepKind] {
        &self.log
    }

    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    pub fn last_step(&self) -> Option<StepKind> {
        self.log.last().copied()
    }

    pub fn count(&self, kind: StepKind) -> usize {
        self.log.iter().filter(|step| **step == kind).count()
    }

    pub fn results_of(&self, kind: StepKind) -> impl Iterator<Item = &StepResult> {
        self.results.iter().filter(move |result| result.step == kind)
    }

    pub fn latest(&self, kind: StepKind) -> Option<&StepResult> {
        self.results.iter().rev().find(|result| result.step == kind)
    }

    /// The verified skeleton when one exists, else the raw skeleton.
    pub fn skeleton(&self) -> Result<Option<Cascade>, OrchestratorError> {
        skeleton_from_results(&self.results)
    }

    pub(crate) fn record(&mut self, result: StepResult) {
        self.log.push(result.step);
        self.results.push(result);
        self.next_sequence += 1;
    }
}

pub(crate) fn skeleton_from_results(
    results: &[StepResult],
) -> Result<Option<Cascade>, OrchestratorError> {
    let source = results
        .iter()
        .rev()
        .find(|result| result.step == StepKind::Verify)
        .or_else(|| {
            results
                .iter()
                .rev()
                .find(|result| result.step == StepKind::Skeleton)
        });
    let Some(source) = source else {
        return Ok(None);
    };
    if !source.payload.is_object() {
        return Err(OrchestratorError::Structural(format!(
            "{} result #{} is not a cascade object",
            source.step, source.sequence
        )));
    }
    Cascade::from_payload(&source.payload)
        .map(Some)
        .map_err(|err| {
            OrchestratorError::Structural(format!(
                "{} result #{} is not a cascade: {err}",
                source.step, source.sequence
            ))
        })
}
