use cascade_builder::orchestration::response_parse::{
    extract_json_payload, parse_response, strip_code_fence,
};
use cascade_builder::orchestration::{OrchestratorError, StepKind};
use serde_json::json;

#[test]
fn fenced_response_with_language_tag_decodes() {
    let text = "Here you go:\n```json\n{\"participants\": [{\"participant_id\": \"P_1\"}]}\n```\nDone.";
    let value = parse_response(StepKind::Participant, text).expect("payload");
    assert_eq!(value["participants"][0]["participant_id"], "P_1");
}

#[test]
fn fence_without_language_tag_is_stripped() {
    assert_eq!(strip_code_fence("```\n[1, 2]\n```"), "[1, 2]");
    assert_eq!(strip_code_fence("  {\"a\": 1}  "), "{\"a\": 1}");
}

#[test]
fn prose_around_json_is_ignored() {
    let value = parse_response(
        StepKind::Transaction,
        "The transactions are {\"transactions\": [{\"note\": \"paid {late}\"}]} as requested.",
    )
    .expect("payload");
    assert_eq!(value, json!({"transactions": [{"note": "paid {late}"}]}));
}

#[test]
fn top_level_array_is_accepted() {
    let value = extract_json_payload("result: [{\"a\": 1}, {\"b\": 2}]").expect("array");
    assert_eq!(value.as_array().map(Vec::len), Some(2));
}

#[test]
fn response_without_json_is_a_parse_error() {
    let err = parse_response(StepKind::Episode, "I am unable to help with that {").expect_err("no json");
    match err {
        OrchestratorError::Parse { step, .. } => assert_eq!(step, "EpisodeReconstructor"),
        other => panic!("unexpected error: {other}"),
    }
}
