mod support;

use cascade_builder::cascade::TargetCoordinate;
use cascade_builder::orchestration::{
    CheckpointKey, CheckpointStore, OrchestratorError, StepExchange, StepExecutor, StepKind,
    WorkflowState,
};
use cascade_builder::prompts::PromptSet;
use cascade_builder::schema::SchemaScoper;
use support::{full_script, sample_input, ScriptedGenerator};

#[test]
fn executed_step_is_checkpointed_and_recorded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = CheckpointStore::new(dir.path());
    let generator = ScriptedGenerator::new(full_script(&[1]));
    let scoper = SchemaScoper::cascade();
    let prompts = PromptSet::default();
    let executor = StepExecutor::new(&generator, &scoper, &prompts, &store);
    let mut state = WorkflowState::new(sample_input()).expect("state");

    executor.execute(&mut state, StepKind::Skeleton).expect("skeleton");
    executor.execute(&mut state, StepKind::Verify).expect("verify");
    executor
        .execute(&mut state, StepKind::Participant)
        .expect("participant");

    assert_eq!(state.next_sequence(), 4);
    let latest = state.latest(StepKind::Participant).expect("participant result");
    assert_eq!(latest.sequence, 3);
    assert_eq!(
        latest.target,
        Some(TargetCoordinate::Episode {
            stage: 0,
            episode: 0
        })
    );

    let key = CheckpointKey {
        step: StepKind::Participant,
        sequence: 3,
        target: latest.target,
    };
    let exchange: StepExchange = store.load_exchange(&key).expect("exchange");
    let call = generator.call(2);
    assert_eq!(exchange.system_instruction, call.system);
    assert_eq!(exchange.user_instruction, call.user);
    assert_eq!(exchange.raw_response, full_script(&[1])[2]);
    assert_eq!(
        exchange.instructions_sha256,
        StepExchange::instructions_digest(&call.system, &call.user)
    );
    assert_eq!(exchange.variables["Query"], "How did the lender collapse?");
    assert!(dir.path().join(key.result_file_name()).is_file());
}

#[test]
fn episode_step_requires_fresh_participant_and_transaction_results() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = CheckpointStore::new(dir.path());
    let generator = ScriptedGenerator::new(full_script(&[1]));
    let scoper = SchemaScoper::cascade();
    let prompts = PromptSet::default();
    let executor = StepExecutor::new(&generator, &scoper, &prompts, &store);
    let mut state = WorkflowState::new(sample_input()).expect("state");
    executor.execute(&mut state, StepKind::Skeleton).expect("skeleton");
    executor.execute(&mut state, StepKind::Verify).expect("verify");

    let err = executor
        .execute(&mut state, StepKind::Episode)
        .expect_err("no participant or transaction yet");
    assert!(matches!(err, OrchestratorError::Structural(_)));
    assert_eq!(generator.call_count(), 2);
    assert_eq!(state.log().len(), 2);
}

#[test]
fn unparseable_response_leaves_state_and_directory_unchanged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = CheckpointStore::new(dir.path());
    let generator = ScriptedGenerator::new(["no json here"]);
    let scoper = SchemaScoper::cascade();
    let prompts = PromptSet::default();
    let executor = StepExecutor::new(&generator, &scoper, &prompts, &store);
    let mut state = WorkflowState::new(sample_input()).expect("state");

    let err = executor
        .execute(&mut state, StepKind::Skeleton)
        .expect_err("parse failure");
    assert!(matches!(err, OrchestratorError::Parse { .. }));
    assert!(state.log().is_empty());
    assert_eq!(state.next_sequence(), 1);
    assert_eq!(fs_entries(dir.path()), 0);
}

#[test]
fn aggregation_steps_get_field_filtered_schemas() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = CheckpointStore::new(dir.path());
    let generator = ScriptedGenerator::new(Vec::<String>::new());
    let scoper = SchemaScoper::cascade();
    let prompts = PromptSet::default();
    let executor = StepExecutor::new(&generator, &scoper, &prompts, &store);

    let stage_schema = executor.scoped_schema(StepKind::StageAggregate);
    assert!(stage_schema.contains("struct EventStage {"));
    assert!(stage_schema.contains("descriptions"));
    assert!(!stage_schema.contains("episodes:"));
    assert!(!stage_schema.contains("struct Participant {"));

    let full = executor.scoped_schema(StepKind::Participant);
    assert!(full.contains("struct Participant {"));
}

fn fs_entries(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}
