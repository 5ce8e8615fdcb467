#![allow(dead_code)]

use cascade_builder::cascade::{BuildInput, DataSample};
use cascade_builder::provider::{Generation, GenerationService, ProviderError};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone)]
pub struct Call {
    pub system: String,
    pub user: String,
    pub variables: BTreeMap<String, String>,
}

/// Replays canned responses in order and records every request.
pub struct ScriptedGenerator {
    responses: RefCell<VecDeque<String>>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: RefCell::new(responses.into_iter().map(Into::into).collect()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn call(&self, idx: usize) -> Call {
        self.calls.borrow()[idx].clone()
    }
}

impl GenerationService for ScriptedGenerator {
    fn generate(
        &self,
        system_instruction: &str,
        user_instruction: &str,
        variables: &BTreeMap<String, String>,
    ) -> Result<Generation, ProviderError> {
        self.calls.borrow_mut().push(Call {
            system: system_instruction.to_string(),
            user: user_instruction.to_string(),
            variables: variables.clone(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .map(|text| Generation { text })
            .ok_or_else(|| ProviderError::Backend("script exhausted".to_string()))
    }
}

pub fn sample_input() -> BuildInput {
    BuildInput::new(
        "How did the lender collapse?",
        vec!["lender".to_string(), "collapse".to_string()],
        vec![DataSample {
            source: Some("report.txt".to_string()),
            content: "The lender promised fixed returns, then stopped paying withdrawals."
                .to_string(),
        }],
    )
}

/// Skeleton payload with `shape[s]` episodes in stage `s`.
pub fn skeleton(event_id: &str, shape: &[usize]) -> Value {
    let stages = shape
        .iter()
        .enumerate()
        .map(|(s, count)| {
            let episodes = (0..*count)
                .map(|e| {
                    json!({
                        "episode_id": format!("S{s}E{e}"),
                        "name": {"value": format!("episode {s}.{e}")},
                        "index_in_stage": e,
                    })
                })
                .collect::<Vec<_>>();
            json!({
                "stage_id": format!("S{s}"),
                "name": {"value": format!("stage {s}")},
                "index_in_event": s,
                "episodes": episodes,
            })
        })
        .collect::<Vec<_>>();
    json!({
        "event_id": event_id,
        "title": {"value": "Lender collapse"},
        "event_type": {"value": "ponzi scheme"},
        "stages": stages,
    })
}

/// Every response of a complete run over `shape`, in execution order.
pub fn full_script(shape: &[usize]) -> Vec<String> {
    let mut script = vec![
        skeleton("EV-raw", shape).to_string(),
        skeleton("EV-verified", shape).to_string(),
    ];
    let mut participant = 0;
    for (s, count) in shape.iter().enumerate() {
        for e in 0..*count {
            participant += 1;
            script.push(
                json!({"participants": [{"participant_id": format!("P_{participant}")}]})
                    .to_string(),
            );
            script.push(
                json!({"transactions": [{"name": {"value": format!("deposit {s}.{e}")}}]})
                    .to_string(),
            );
            script.push(
                json!({
                    "episode_id": format!("S{s}E{e}"),
                    "name": {"value": format!("episode {s}.{e}")},
                    "descriptions": [{"value": format!("what happened in {s}.{e}")}],
                    "participants": [],
                    "transactions": [],
                })
                .to_string(),
            );
        }
        script.push(json!({"descriptions": [{"value": format!("stage {s} summary")}]}).to_string());
    }
    script.push(json!({"descriptions": [{"value": "event summary"}]}).to_string());
    script
}
