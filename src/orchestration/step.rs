use crate::schema::{FieldSelection, ScopeMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StepKind {
    #[serde(rename = "SkeletonReconstructor")]
    Skeleton,
    #[serde(rename = "SkeletonVerifier")]
    Verify,
    #[serde(rename = "ParticipantReconstructor")]
    Participant,
    #[serde(rename = "TransactionReconstructor")]
    Transaction,
    #[serde(rename = "EpisodeReconstructor")]
    Episode,
    #[serde(rename = "StageDescriptionReconstructor")]
    StageAggregate,
    #[serde(rename = "EventDescriptionReconstructor")]
    EventAggregate,
}

/// What part of the schema a step is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaRequest {
    Scope(ScopeMode),
    Fields(BTreeMap<String, FieldSelection>),
}

const SKELETON_CASCADE_FIELDS: &[&str] = &[
    "event_id",
    "title",
    "event_type",
    "start_time",
    "end_time",
    "stages",
];
const SKELETON_STAGE_FIELDS: &[&str] = &[
    "stage_id",
    "name",
    "index_in_event",
    "start_time",
    "end_time",
    "episodes",
];
const SKELETON_EPISODE_FIELDS: &[&str] = &[
    "episode_id",
    "name",
    "index_in_stage",
    "start_time",
    "end_time",
];

impl StepKind {
    pub const ALL: [StepKind; 7] = [
        StepKind::Skeleton,
        StepKind::Verify,
        StepKind::Participant,
        StepKind::Transaction,
        StepKind::Episode,
        StepKind::StageAggregate,
        StepKind::EventAggregate,
    ];

    /// Name used in checkpoint file names and in the execution log.
    pub fn checkpoint_name(self) -> &'static str {
        match self {
            StepKind::Skeleton => "SkeletonReconstructor",
            StepKind::Verify => "SkeletonVerifier",
            StepKind::Participant => "ParticipantReconstructor",
            StepKind::Transaction => "TransactionReconstructor",
            StepKind::Episode => "EpisodeReconstructor",
            StepKind::StageAggregate => "StageDescriptionReconstructor",
            StepKind::EventAggregate => "EventDescriptionReconstructor",
        }
    }

    pub fn from_checkpoint_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.checkpoint_name() == name)
    }

    pub fn is_episode_scoped(self) -> bool {
        matches!(
            self,
            StepKind::Participant | StepKind::Transaction | StepKind::Episode
        )
    }

    pub fn schema_request(self) -> SchemaRequest {
        match self {
            StepKind::Skeleton | StepKind::Verify => SchemaRequest::Fields(BTreeMap::from([
                ("VerifiableField".to_string(), FieldSelection::All),
                (
                    "EventCascade".to_string(),
                    FieldSelection::only(SKELETON_CASCADE_FIELDS.iter().copied()),
                ),
                (
                    "EventStage".to_string(),
                    FieldSelection::only(SKELETON_STAGE_FIELDS.iter().copied()),
                ),
                (
                    "Episode".to_string(),
                    FieldSelection::only(SKELETON_EPISODE_FIELDS.iter().copied()),
                ),
            ])),
            StepKind::Participant => SchemaRequest::Scope(ScopeMode::closure(["Participant"])),
            StepKind::Transaction => SchemaRequest::Scope(ScopeMode::closure(["Transaction"])),
            StepKind::Episode => SchemaRequest::Scope(ScopeMode::closure(["Episode"])),
            StepKind::StageAggregate => SchemaRequest::Fields(BTreeMap::from([
                ("VerifiableField".to_string(), FieldSelection::All),
                (
                    "EventStage".to_string(),
                    FieldSelection::only(["descriptions"]),
                ),
            ])),
            StepKind::EventAggregate => SchemaRequest::Fields(BTreeMap::from([
                ("VerifiableField".to_string(), FieldSelection::All),
                (
                    "EventCascade".to_string(),
                    FieldSelection::only(["descriptions"]),
                ),
            ])),
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.checkpoint_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_names_are_unique_and_parse_back() {
        for kind in StepKind::ALL {
            assert_eq!(StepKind::from_checkpoint_name(kind.checkpoint_name()), Some(kind));
            assert!(!kind.checkpoint_name().contains('-'));
        }
        assert_eq!(StepKind::from_checkpoint_name("Unknown"), None);
    }

    #[test]
    fn serde_name_matches_checkpoint_name() {
        for kind in StepKind::ALL {
            let encoded = serde_json::to_value(kind).expect("encode");
            assert_eq!(encoded, serde_json::json!(kind.checkpoint_name()));
        }
    }
}
