use cascade_builder::cascade::{BuildInput, DataSample, TargetCoordinate};
use cascade_builder::orchestration::{
    CheckpointKey, CheckpointStore, OrchestratorError, StepExchange, StepKind,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use tempfile::tempdir;

fn exchange(step: StepKind, sequence: u32, target: Option<TargetCoordinate>) -> StepExchange {
    StepExchange {
        step,
        sequence,
        target,
        system_instruction: "system".to_string(),
        user_instruction: "user".to_string(),
        instructions_sha256: StepExchange::instructions_digest("system", "user"),
        variables: BTreeMap::from([("Query".to_string(), "q".to_string())]),
        raw_response: "{}".to_string(),
        recorded_at: "2026-01-01T00:00:00+00:00".to_string(),
    }
}

#[test]
fn step_pairs_are_named_by_step_sequence_and_target() {
    let dir = tempdir().expect("tempdir");
    let store = CheckpointStore::new(dir.path().join("run"));
    let target = Some(TargetCoordinate::Episode {
        stage: 2,
        episode: 1,
    });
    let result_path = store
        .write_step(
            &exchange(StepKind::Transaction, 11, target),
            &json!({"transactions": []}),
        )
        .expect("write");
    assert_eq!(
        result_path,
        dir.path()
            .join("run/TransactionReconstructor-11-Stage2-Episode1-Result.json")
    );
    assert!(dir
        .path()
        .join("run/TransactionReconstructor-11-Stage2-Episode1.json")
        .is_file());

    let key = CheckpointKey {
        step: StepKind::Transaction,
        sequence: 11,
        target,
    };
    assert_eq!(
        store.load_exchange(&key).expect("exchange"),
        exchange(StepKind::Transaction, 11, target)
    );

    let results = store.load_results().expect("results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].target, target);
    assert_eq!(results[0].payload, json!({"transactions": []}));
}

#[test]
fn results_load_in_sequence_order() {
    let dir = tempdir().expect("tempdir");
    let store = CheckpointStore::new(dir.path());
    for (step, sequence) in [
        (StepKind::EventAggregate, 10),
        (StepKind::Skeleton, 1),
        (StepKind::Verify, 2),
    ] {
        store
            .write_step(&exchange(step, sequence, None), &json!({"seq": sequence}))
            .expect("write");
    }
    let sequences = store
        .load_results()
        .expect("results")
        .iter()
        .map(|result| result.sequence)
        .collect::<Vec<_>>();
    assert_eq!(sequences, vec![1, 2, 10]);
}

#[test]
fn suffix_parsing_rejects_malformed_names() {
    for name in [
        "SkeletonReconstructor-1.json",
        "Mystery-1-Result.json",
        "SkeletonReconstructor--Result.json",
        "EpisodeReconstructor-4-Stage-Episode1-Result.json",
        "EpisodeReconstructor-4-Stage0-Episode1-Extra-Result.json",
    ] {
        assert!(
            CheckpointKey::parse_result_file_name(name).is_err(),
            "{name} should be rejected"
        );
    }
    let key = CheckpointKey::parse_result_file_name("StageDescriptionReconstructor-9-Stage0-Result.json")
        .expect("stage key");
    assert_eq!(key.target, Some(TargetCoordinate::Stage { stage: 0 }));
}

#[test]
fn build_input_round_trips_and_missing_dir_is_recovery() {
    let dir = tempdir().expect("tempdir");
    let store = CheckpointStore::new(dir.path().join("fresh"));
    let input = BuildInput::new(
        "q",
        vec!["k".to_string()],
        vec![DataSample {
            source: None,
            content: "c".to_string(),
        }],
    );
    let missing = store.load_results().expect_err("no directory yet");
    assert!(matches!(missing, OrchestratorError::Recovery { .. }));

    store.write_build_input(&input).expect("write input");
    assert_eq!(store.load_build_input().expect("read input"), input);
    let raw = fs::read_to_string(dir.path().join("fresh/BuildInput.json")).expect("raw");
    assert!(raw.ends_with("}\n"));

    let empty = store.load_results().expect_err("only artifacts");
    assert!(matches!(empty, OrchestratorError::Recovery { .. }));
}
