use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSample {
    #[serde(default)]
    pub source: Option<String>,
    pub content: String,
}

/// Initial context of a reconstruction run: what to look for and the text to look in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInput {
    pub query: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub samples: Vec<DataSample>,
}

impl BuildInput {
    pub fn new(query: impl Into<String>, keywords: Vec<String>, samples: Vec<DataSample>) -> Self {
        Self {
            query: query.into(),
            keywords,
            samples,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("query text must be non-empty".to_string());
        }
        if self.samples.is_empty() {
            return Err("at least one source sample is required".to_string());
        }
        if let Some(idx) = self
            .samples
            .iter()
            .position(|sample| sample.content.trim().is_empty())
        {
            return Err(format!("sample {idx} has empty content"));
        }
        Ok(())
    }

    pub fn joined_content(&self) -> String {
        self.samples
            .iter()
            .map(|sample| sample.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn joined_keywords(&self) -> String {
        self.keywords.join(", ")
    }
}
