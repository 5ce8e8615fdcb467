use cascade_builder::provider::invocation::build_invocation;
use cascade_builder::provider::{
    write_file_backed_prompt, ProviderError, ProviderKind, ProviderRequest, RunnerBinaries,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

fn sample_request(provider: ProviderKind, model: &str, cwd: &Path) -> ProviderRequest {
    ProviderRequest {
        request_id: "generation-0001".to_string(),
        provider,
        model: model.to_string(),
        cwd: cwd.to_path_buf(),
        message: "use files".to_string(),
        prompt_artifacts: write_file_backed_prompt(cwd, "generation-0001", "system", "user")
            .expect("prompt artifacts"),
        timeout: Duration::from_secs(1),
        env_overrides: BTreeMap::new(),
    }
}

#[test]
fn openai_invocation_is_a_single_shot_exec() {
    let dir = tempfile::tempdir().expect("tempdir");
    let req = sample_request(ProviderKind::OpenAi, "gpt-5.2", dir.path());

    let spec = build_invocation(&req, &RunnerBinaries::default()).expect("build");
    assert_eq!(spec.binary, "codex");
    assert_eq!(spec.args.first().map(String::as_str), Some("exec"));
    assert!(spec.args.contains(&"--json".to_string()));
    assert!(!spec.args.contains(&"resume".to_string()));
    assert_eq!(spec.args.last().map(String::as_str), Some("use files"));
}

#[test]
fn anthropic_invocation_resolves_model_alias_without_session_flags() {
    let dir = tempfile::tempdir().expect("tempdir");
    let req = sample_request(ProviderKind::Anthropic, "opus", dir.path());

    let spec = build_invocation(&req, &RunnerBinaries::default()).expect("build");
    assert_eq!(spec.binary, "claude");
    assert_eq!(spec.resolved_model, "claude-opus-4-6");
    assert!(spec.args.contains(&"-p".to_string()));
    assert!(!spec.args.contains(&"-c".to_string()));
    assert!(!spec.args.contains(&"--resume".to_string()));
}

#[test]
fn unknown_anthropic_model_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let req = sample_request(ProviderKind::Anthropic, "gpt-5.2", dir.path());
    let err = build_invocation(&req, &RunnerBinaries::default()).expect_err("unsupported");
    assert!(matches!(err, ProviderError::UnsupportedAnthropicModel(_)));
}
