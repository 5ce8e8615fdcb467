use crate::cascade::model::{Cascade, Episode, Stage};
use serde::{Deserialize, Serialize};

/// Hierarchy position a step result is aimed at. Positions are zero-based and follow the
/// skeleton's stage-major traversal order, not the identifiers the model produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetCoordinate {
    Episode { stage: usize, episode: usize },
    Stage { stage: usize },
}

impl TargetCoordinate {
    pub fn checkpoint_suffix(&self) -> String {
        match self {
            TargetCoordinate::Episode { stage, episode } => {
                format!("Stage{stage}-Episode{episode}")
            }
            TargetCoordinate::Stage { stage } => format!("Stage{stage}"),
        }
    }

    pub fn parse_suffix(suffix: &str) -> Option<Self> {
        let mut parts = suffix.split('-');
        let stage = parts.next()?.strip_prefix("Stage")?.parse().ok()?;
        match parts.next() {
            None => Some(TargetCoordinate::Stage { stage }),
            Some(part) => {
                let episode = part.strip_prefix("Episode")?.parse().ok()?;
                if parts.next().is_some() {
                    return None;
                }
                Some(TargetCoordinate::Episode { stage, episode })
            }
        }
    }
}

impl std::fmt::Display for TargetCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetCoordinate::Episode { stage, episode } => {
                write!(f, "stage {stage} episode {episode}")
            }
            TargetCoordinate::Stage { stage } => write!(f, "stage {stage}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EpisodeRef<'a> {
    pub ordinal: usize,
    pub stage_position: usize,
    pub episode_position: usize,
    pub stage: &'a Stage,
    pub episode: &'a Episode,
}

impl EpisodeRef<'_> {
    pub fn coordinate(&self) -> TargetCoordinate {
        TargetCoordinate::Episode {
            stage: self.stage_position,
            episode: self.episode_position,
        }
    }
}

impl Cascade {
    pub fn episodes(&self) -> impl Iterator<Item = EpisodeRef<'_>> {
        self.stages
            .iter()
            .enumerate()
            .flat_map(|(stage_position, stage)| {
                stage
                    .episodes
                    .iter()
                    .enumerate()
                    .map(move |(episode_position, episode)| {
                        (stage_position, stage, episode_position, episode)
                    })
            })
            .enumerate()
            .map(
                |(ordinal, (stage_position, stage, episode_position, episode))| EpisodeRef {
                    ordinal,
                    stage_position,
                    episode_position,
                    stage,
                    episode,
                },
            )
    }

    pub fn episode_at(&self, ordinal: usize) -> Option<EpisodeRef<'_>> {
        self.episodes().nth(ordinal)
    }

    pub fn episode_mut(&mut self, coordinate: TargetCoordinate) -> Option<&mut Episode> {
        match coordinate {
            TargetCoordinate::Episode { stage, episode } => {
                self.stages.get_mut(stage)?.episodes.get_mut(episode)
            }
            TargetCoordinate::Stage { .. } => None,
        }
    }

    pub fn episode_coordinates(&self) -> Vec<TargetCoordinate> {
        self.episodes().map(|episode| episode.coordinate()).collect()
    }
}
