use serde::{Deserialize, Serialize};

use crate::specs::MasterModelConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegularizerInfo {
    pub name: String,
    pub kind: String,
    pub tau: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreInfo {
    pub name: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryInfo {
    pub name: String,
    pub num_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: u64,
    pub num_topics: usize,
    pub num_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchInfo {
    pub name: String,
    pub num_items: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntryInfo {
    pub kind: String,
    pub model_name: String,
    pub key: String,
    pub version: u64,
    pub byte_size: usize,
}

/// A snapshot of everything a master component owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterComponentInfo {
    pub master_id: u64,
    pub config: MasterModelConfig,
    pub regularizers: Vec<RegularizerInfo>,
    pub scores: Vec<ScoreInfo>,
    pub dictionaries: Vec<DictionaryInfo>,
    pub models: Vec<ModelInfo>,
    pub batches: Vec<BatchInfo>,
    pub cache_entries: Vec<CacheEntryInfo>,
    pub num_processors: usize,
}
