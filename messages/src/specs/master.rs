use serde::{Deserialize, Serialize};

use super::{RegularizerConfig, ScoreConfig};

/// The relative weight of one modality during inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassWeight {
    pub class_id: String,
    pub weight: f32,
}

/// The specification for a `MasterComponent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterModelConfig {
    pub topic_names: Vec<String>,
    /// When empty every class weighs `1`, otherwise unlisted classes are ignored.
    #[serde(default)]
    pub class_weights: Vec<ClassWeight>,
    #[serde(default)]
    pub regularizers: Vec<RegularizerConfig>,
    #[serde(default)]
    pub scores: Vec<ScoreConfig>,
    /// Inner inference iterations per document.
    #[serde(default = "default_document_passes")]
    pub num_document_passes: u32,
    #[serde(default)]
    pub reuse_theta: bool,
    #[serde(default = "default_true")]
    pub cache_theta: bool,
    #[serde(default = "default_pwt_name")]
    pub pwt_name: String,
    #[serde(default = "default_nwt_name")]
    pub nwt_name: String,
    /// Model versions retained per theta or score cache slot.
    #[serde(default = "default_cache_retention")]
    pub cache_retention: usize,
    /// Length of the score array history.
    #[serde(default = "default_score_history")]
    pub score_history: usize,
    #[serde(default)]
    pub seed: u64,
}

impl MasterModelConfig {
    /// Creates a configuration with the given topics and every other field defaulted.
    ///
    /// # Arguments
    /// * `topic_names` - The names of the model's topics.
    ///
    /// # Returns
    /// A new `MasterModelConfig` instance.
    pub fn with_topics<I, S>(topic_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topic_names: topic_names.into_iter().map(Into::into).collect(),
            class_weights: Vec::new(),
            regularizers: Vec::new(),
            scores: Vec::new(),
            num_document_passes: default_document_passes(),
            reuse_theta: false,
            cache_theta: default_true(),
            pwt_name: default_pwt_name(),
            nwt_name: default_nwt_name(),
            cache_retention: default_cache_retention(),
            score_history: default_score_history(),
            seed: 0,
        }
    }

    /// The weight of `class_id` during inference, `0` means the class is ignored.
    pub fn class_weight(&self, class_id: &str) -> f32 {
        if self.class_weights.is_empty() {
            return 1.;
        }

        self.class_weights
            .iter()
            .find(|cw| cw.class_id == class_id)
            .map_or(0., |cw| cw.weight)
    }
}

fn default_document_passes() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_pwt_name() -> String {
    "pwt".to_string()
}

fn default_nwt_name() -> String {
    "nwt".to_string()
}

fn default_cache_retention() -> usize {
    4
}

fn default_score_history() -> usize {
    128
}
