use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::data::Token;

/// How the initial weights of a model are generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitMethod {
    #[default]
    Random,
    Uniform,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitializeModelArgs {
    /// Defaults to the master's `pwt_name`.
    #[serde(default)]
    pub model_name: Option<String>,
    pub dictionary_name: String,
    /// Defaults to the master's topics.
    #[serde(default)]
    pub topic_names: Vec<String>,
    /// Defaults to the master's seed.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub method: InitMethod,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportModelArgs {
    #[serde(default)]
    pub model_name: Option<String>,
    pub file_name: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportModelArgs {
    #[serde(default)]
    pub model_name: Option<String>,
    pub file_name: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachModelArgs {
    #[serde(default)]
    pub model_name: Option<String>,
}

/// Selects a part of a topic model, every empty filter selects everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetTopicModelArgs {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub topic_names: Vec<String>,
    #[serde(default)]
    pub class_ids: Vec<String>,
    #[serde(default)]
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedModel {
    pub name: String,
    pub weight: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeModelArgs {
    pub nwt_target_name: String,
    pub nwt_sources: Vec<WeightedModel>,
    /// Defaults to the topics of the first source.
    #[serde(default)]
    pub topic_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegularizeModelArgs {
    pub pwt_source_name: String,
    pub nwt_source_name: String,
    pub rwt_target_name: String,
    /// Regularizers to apply in this order, empty means every registered one.
    #[serde(default)]
    pub regularizer_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizeModelArgs {
    pub pwt_target_name: String,
    pub nwt_source_name: String,
    #[serde(default)]
    pub rwt_source_name: Option<String>,
}
