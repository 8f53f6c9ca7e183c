use serde::{Deserialize, Serialize};

/// An inclusive range of model versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRange {
    pub min: u64,
    pub max: u64,
}

impl VersionRange {
    pub fn contains(&self, version: u64) -> bool {
        (self.min..=self.max).contains(&version)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetThetaMatrixArgs {
    /// Defaults to the master's `pwt_name`.
    #[serde(default)]
    pub model_name: Option<String>,
    /// Empty means every cached batch.
    #[serde(default)]
    pub batch_names: Vec<String>,
    /// Empty means every topic.
    #[serde(default)]
    pub topic_names: Vec<String>,
    /// Defaults to the latest cached version of each batch.
    #[serde(default)]
    pub version: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetScoreValueArgs {
    pub score_name: String,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub batch_name: Option<String>,
    #[serde(default)]
    pub version: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetScoreArrayArgs {
    pub score_name: String,
    #[serde(default)]
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetMasterComponentInfoArgs {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClearThetaCacheArgs {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub batch_name: Option<String>,
    #[serde(default)]
    pub versions: Option<VersionRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClearScoreCacheArgs {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub score_name: Option<String>,
    #[serde(default)]
    pub batch_name: Option<String>,
    #[serde(default)]
    pub versions: Option<VersionRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClearScoreArrayCacheArgs {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub score_name: Option<String>,
}
