use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cascade {
    #[serde(rename = "event_id", default, deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default)]
    pub title: Value,
    #[serde(default, deserialize_with = "lenient_list")]
    pub stages: Vec<Stage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(rename = "stage_id", default, deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default)]
    pub name: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_in_event: Option<Index>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub episodes: Vec<Episode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    #[serde(rename = "episode_id", default, deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default)]
    pub name: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_in_stage: Option<Index>,
    /// Placeholder in model output; replaced by the Participant payload on integration.
    #[serde(default, deserialize_with = "placeholder_list")]
    pub participants: Vec<Value>,
    #[serde(default, deserialize_with = "placeholder_list")]
    pub transactions: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Position of a node within its parent. Values that are not a non-negative integer
/// (or a string holding one) are kept verbatim so they survive into the final cascade.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Index {
    Position(u32),
    Raw(Value),
}

impl Index {
    pub fn position(&self) -> Option<u32> {
        match self {
            Index::Position(position) => Some(*position),
            Index::Raw(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for Index {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        let position = match &raw {
            Value::Number(number) => number.as_u64().and_then(|v| u32::try_from(v).ok()),
            Value::String(text) => text.trim().parse::<u32>().ok(),
            _ => None,
        };
        Ok(match position {
            Some(position) => Index::Position(position),
            None => Index::Raw(raw),
        })
    }
}

pub(crate) const CASCADE_KEYS: &[&str] = &["event_id", "title", "stages"];
pub(crate) const STAGE_KEYS: &[&str] = &["stage_id", "name", "index_in_event", "episodes"];

impl Cascade {
    pub fn from_payload(payload: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(payload.clone())
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn episode_count(&self) -> usize {
        self.stages.iter().map(|stage| stage.episodes.len()).sum()
    }

    /// `cum[s]` is the number of episodes in stages `0..=s`.
    pub fn cumulative_episode_counts(&self) -> Vec<usize> {
        self.stages
            .iter()
            .scan(0usize, |total, stage| {
                *total += stage.episodes.len();
                Some(*total)
            })
            .collect()
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Copies every key of an aggregation payload onto a node, except the structural keys
/// that define the hierarchy itself.
pub(crate) fn merge_payload_keys(
    target: &mut Map<String, Value>,
    payload: &Value,
    reserved: &[&str],
) -> usize {
    let Some(object) = payload.as_object() else {
        return 0;
    };
    let mut merged = 0;
    for (key, value) in object {
        if reserved.contains(&key.as_str()) {
            tracing::debug!(key = %key, "ignoring structural key in aggregation payload");
            continue;
        }
        target.insert(key.clone(), value.clone());
        merged += 1;
    }
    merged
}

/// Identifiers arrive as strings or numbers; anything else other than null keeps its
/// JSON text.
fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    })
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn placeholder_list<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}
