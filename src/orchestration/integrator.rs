use crate::cascade::model::{merge_payload_keys, CASCADE_KEYS, STAGE_KEYS};
use crate::cascade::{Cascade, Episode, TargetCoordinate};
use crate::orchestration::checkpoint_store::CheckpointStore;
use crate::orchestration::error::OrchestratorError;
use crate::orchestration::state::{skeleton_from_results, StepResult};
use crate::orchestration::step::StepKind;
use serde_json::Value;
use std::path::Path;

/// How to treat episodes and stages whose results have not been produced yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Assembly {
    /// Every node must have its results.
    Complete,
    /// Nodes without results keep their skeleton form.
    Partial,
}

/// Live integration over the execution log and the results list of a run.
pub fn integrate(log: &[StepKind], results: &[StepResult]) -> Result<Cascade, OrchestratorError> {
    if log.len() != results.len() {
        return Err(OrchestratorError::Structural(format!(
            "execution log has {} entries but there are {} results",
            log.len(),
            results.len()
        )));
    }
    if let Some((idx, (logged, result))) = log
        .iter()
        .zip(results)
        .enumerate()
        .find(|(_, (logged, result))| **logged != result.step)
    {
        return Err(OrchestratorError::Structural(format!(
            "execution log entry {idx} is {logged} but result is {}",
            result.step
        )));
    }
    assemble(results, Assembly::Complete)
}

/// Recovery integration from the `*-Result.json` files of a checkpoint directory.
pub fn integrate_from_checkpoints(dir: &Path) -> Result<Cascade, OrchestratorError> {
    let results = CheckpointStore::new(dir).load_results()?;
    tracing::info!(
        dir = %dir.display(),
        results = results.len(),
        "integrating from checkpoints"
    );
    let log = results.iter().map(|result| result.step).collect::<Vec<_>>();
    integrate(&log, &results)
}

pub(crate) fn assemble(
    results: &[StepResult],
    assembly: Assembly,
) -> Result<Cascade, OrchestratorError> {
    let mut cascade = skeleton_from_results(results)?.ok_or_else(|| {
        OrchestratorError::Structural("no skeleton result to integrate into".to_string())
    })?;

    let of_kind = |kind: StepKind| {
        results
            .iter()
            .filter(|result| result.step == kind)
            .collect::<Vec<_>>()
    };
    let participants = of_kind(StepKind::Participant);
    let transactions = of_kind(StepKind::Transaction);
    let episodes = of_kind(StepKind::Episode);
    let stage_aggregates = of_kind(StepKind::StageAggregate);
    let event_aggregates = of_kind(StepKind::EventAggregate);

    let coordinates = cascade.episode_coordinates();
    for (kind, list) in [
        (StepKind::Participant, &participants),
        (StepKind::Transaction, &transactions),
        (StepKind::Episode, &episodes),
    ] {
        if list.len() > coordinates.len() {
            return Err(OrchestratorError::Structural(format!(
                "{} {kind} results for {} episodes",
                list.len(),
                coordinates.len()
            )));
        }
    }

    for (ordinal, coordinate) in coordinates.into_iter().enumerate() {
        let (Some(participant), Some(transaction), Some(episode)) = (
            participants.get(ordinal),
            transactions.get(ordinal),
            episodes.get(ordinal),
        ) else {
            if assembly == Assembly::Partial {
                continue;
            }
            let missing = [
                (StepKind::Participant, participants.len()),
                (StepKind::Transaction, transactions.len()),
                (StepKind::Episode, episodes.len()),
            ]
            .into_iter()
            .filter(|(_, len)| *len <= ordinal)
            .map(|(kind, _)| kind.to_string())
            .collect::<Vec<_>>()
            .join(", ");
            return Err(OrchestratorError::Structural(format!(
                "{coordinate} is missing results: {missing}"
            )));
        };
        for result in [participant, transaction, episode] {
            check_target(result, coordinate)?;
        }
        let skeleton_episode = cascade.episode_mut(coordinate).ok_or_else(|| {
            OrchestratorError::Structural(format!("{coordinate} is not in the skeleton"))
        })?;
        let rich = enrich_episode(skeleton_episode, participant, transaction, episode)?;
        *skeleton_episode = rich;
    }

    let stage_count = cascade.stage_count();
    if stage_aggregates.len() > stage_count {
        return Err(OrchestratorError::Structural(format!(
            "{} stage aggregation results for {stage_count} stages",
            stage_aggregates.len()
        )));
    }
    if assembly == Assembly::Complete && stage_aggregates.len() < stage_count {
        return Err(OrchestratorError::Structural(format!(
            "stage {} is missing its {} result",
            stage_aggregates.len(),
            StepKind::StageAggregate
        )));
    }
    for (position, result) in stage_aggregates.into_iter().enumerate() {
        check_target(result, TargetCoordinate::Stage { stage: position })?;
        let stage = &mut cascade.stages[position];
        merge_payload_keys(&mut stage.extra, &result.payload, STAGE_KEYS);
    }

    match (event_aggregates.as_slice(), assembly) {
        ([], Assembly::Partial) => {}
        ([], Assembly::Complete) => {
            return Err(OrchestratorError::Structural(format!(
                "missing {} result",
                StepKind::EventAggregate
            )))
        }
        ([single], _) => {
            merge_payload_keys(&mut cascade.extra, &single.payload, CASCADE_KEYS);
        }
        (many, _) => {
            return Err(OrchestratorError::Structural(format!(
                "{} {} results; expected one",
                many.len(),
                StepKind::EventAggregate
            )))
        }
    }

    Ok(cascade)
}

fn check_target(result: &StepResult, expected: TargetCoordinate) -> Result<(), OrchestratorError> {
    match result.target {
        Some(target) if target != expected => Err(OrchestratorError::Structural(format!(
            "{} result #{} targets {target} but correlates with {expected}",
            result.step, result.sequence
        ))),
        _ => Ok(()),
    }
}

fn payload_list(result: &StepResult, key: &str) -> Result<Vec<Value>, OrchestratorError> {
    let list = match &result.payload {
        Value::Array(items) => Some(items),
        Value::Object(object) => match object.get(key) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(items)) => Some(items),
            Some(_) => None,
        },
        _ => None,
    };
    list.cloned().ok_or_else(|| {
        OrchestratorError::Structural(format!(
            "{} result #{} has no `{key}` list",
            result.step, result.sequence
        ))
    })
}

fn enrich_episode(
    skeleton: &Episode,
    participant: &StepResult,
    transaction: &StepResult,
    episode: &StepResult,
) -> Result<Episode, OrchestratorError> {
    if !episode.payload.is_object() {
        return Err(OrchestratorError::Structural(format!(
            "{} result #{} is not an episode object",
            episode.step, episode.sequence
        )));
    }
    let mut rich: Episode = serde_json::from_value(episode.payload.clone()).map_err(|err| {
        OrchestratorError::Structural(format!(
            "{} result #{} is not an episode: {err}",
            episode.step, episode.sequence
        ))
    })?;
    if rich.id.is_empty() {
        rich.id = skeleton.id.clone();
    }
    if rich.name.is_null() {
        rich.name = skeleton.name.clone();
    }
    if rich.index_in_stage.is_none() {
        rich.index_in_stage = skeleton.index_in_stage.clone();
    }
    rich.participants = payload_list(participant, "participants")?;
    rich.transactions = payload_list(transaction, "transactions")?;
    Ok(rich)
}
