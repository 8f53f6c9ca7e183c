use serde::{Deserialize, Serialize};

use super::Token;

/// The transferable form of a topic model, `weights[w][t]` is the weight of
/// `tokens[w]` in `topic_names[t]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicModelData {
    pub name: String,
    #[serde(default)]
    pub version: u64,
    pub topic_names: Vec<String>,
    pub tokens: Vec<Token>,
    pub weights: Vec<Vec<f32>>,
}
