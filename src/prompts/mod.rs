use crate::config::ConfigError;
use crate::orchestration::step::StepKind;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

const SKELETON_SYSTEM: &str = include_str!("assets/skeleton.system.md");
const SKELETON_USER: &str = include_str!("assets/skeleton.user.md");
const VERIFY_SYSTEM: &str = include_str!("assets/verify.system.md");
const VERIFY_USER: &str = include_str!("assets/verify.user.md");
const PARTICIPANT_SYSTEM: &str = include_str!("assets/participant.system.md");
const PARTICIPANT_USER: &str = include_str!("assets/participant.user.md");
const TRANSACTION_SYSTEM: &str = include_str!("assets/transaction.system.md");
const TRANSACTION_USER: &str = include_str!("assets/transaction.user.md");
const EPISODE_SYSTEM: &str = include_str!("assets/episode.system.md");
const EPISODE_USER: &str = include_str!("assets/episode.user.md");
const STAGE_AGGREGATE_SYSTEM: &str = include_str!("assets/stage_aggregate.system.md");
const STAGE_AGGREGATE_USER: &str = include_str!("assets/stage_aggregate.user.md");
const EVENT_AGGREGATE_SYSTEM: &str = include_str!("assets/event_aggregate.system.md");
const EVENT_AGGREGATE_USER: &str = include_str!("assets/event_aggregate.user.md");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPrompt {
    pub system: String,
    pub user: String,
}

/// File stem of a step's prompt pair, e.g. `stage_aggregate` for
/// `stage_aggregate.system.md` and `stage_aggregate.user.md`.
pub fn prompt_file_stem(step: StepKind) -> &'static str {
    match step {
        StepKind::Skeleton => "skeleton",
        StepKind::Verify => "verify",
        StepKind::Participant => "participant",
        StepKind::Transaction => "transaction",
        StepKind::Episode => "episode",
        StepKind::StageAggregate => "stage_aggregate",
        StepKind::EventAggregate => "event_aggregate",
    }
}

pub fn default_prompt(step: StepKind) -> StepPrompt {
    let (system, user) = match step {
        StepKind::Skeleton => (SKELETON_SYSTEM, SKELETON_USER),
        StepKind::Verify => (VERIFY_SYSTEM, VERIFY_USER),
        StepKind::Participant => (PARTICIPANT_SYSTEM, PARTICIPANT_USER),
        StepKind::Transaction => (TRANSACTION_SYSTEM, TRANSACTION_USER),
        StepKind::Episode => (EPISODE_SYSTEM, EPISODE_USER),
        StepKind::StageAggregate => (STAGE_AGGREGATE_SYSTEM, STAGE_AGGREGATE_USER),
        StepKind::EventAggregate => (EVENT_AGGREGATE_SYSTEM, EVENT_AGGREGATE_USER),
    };
    StepPrompt {
        system: system.to_string(),
        user: user.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    prompts: BTreeMap<StepKind, StepPrompt>,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            prompts: StepKind::ALL
                .into_iter()
                .map(|step| (step, default_prompt(step)))
                .collect(),
        }
    }
}

impl PromptSet {
    /// Defaults, with any `<stem>.system.md` / `<stem>.user.md` found in `dir` taking their
    /// place.
    pub fn with_overrides(dir: &Path) -> Result<Self, ConfigError> {
        let mut set = Self::default();
        for step in StepKind::ALL {
            let stem = prompt_file_stem(step);
            let prompt = set.prompts.entry(step).or_insert_with(|| default_prompt(step));
            if let Some(system) = read_optional(&dir.join(format!("{stem}.system.md")))? {
                prompt.system = system;
            }
            if let Some(user) = read_optional(&dir.join(format!("{stem}.user.md")))? {
                prompt.user = user;
            }
        }
        Ok(set)
    }

    pub fn get(&self, step: StepKind) -> StepPrompt {
        self.prompts
            .get(&step)
            .cloned()
            .unwrap_or_else(|| default_prompt(step))
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(body) => Ok(Some(body)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Read {
            path: path.display().to_string(),
            source,
        }),
    }
}
