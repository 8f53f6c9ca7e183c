use serde::{Deserialize, Serialize};

/// The heaviest tokens of one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicTokens {
    pub topic_name: String,
    pub keywords: Vec<String>,
    pub weights: Vec<f32>,
}

/// The value of a score, every variant carries the raw counters needed to merge
/// partial results as well as the derived `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreData {
    Perplexity {
        value: f64,
        raw: f64,
        normalizer: f64,
        zero_words: u64,
    },
    SparsityPhi {
        value: f64,
        zero_tokens: u64,
        total_tokens: u64,
    },
    SparsityTheta {
        value: f64,
        zero_topics: u64,
        total_topics: u64,
    },
    ItemsProcessed {
        value: u64,
        num_batches: u64,
    },
    TopTokens {
        topics: Vec<TopicTokens>,
    },
}

impl ScoreData {
    /// The scalar summary of the score, `None` for non scalar scores.
    pub fn scalar(&self) -> Option<f64> {
        match *self {
            Self::Perplexity { value, .. }
            | Self::SparsityPhi { value, .. }
            | Self::SparsityTheta { value, .. } => Some(value),
            Self::ItemsProcessed { value, .. } => Some(value as f64),
            Self::TopTokens { .. } => None,
        }
    }
}

/// A score computed against a given model version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreValue {
    pub name: String,
    pub model_name: String,
    pub version: u64,
    /// `None` when the score covers every batch processed for the version.
    pub batch_id: Option<String>,
    pub data: ScoreData,
}

/// The history of a score across model versions, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreArray {
    pub name: String,
    pub values: Vec<ScoreValue>,
}
