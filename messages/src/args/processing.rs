use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::data::Batch;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportBatchesArgs {
    pub batches: Vec<Batch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessBatchesArgs {
    /// Names of imported batches or paths of batch files.
    pub batch_names: Vec<String>,
    /// Either empty or one weight per batch.
    #[serde(default)]
    pub batch_weights: Vec<f32>,
    #[serde(default)]
    pub pwt_source_name: Option<String>,
    /// Stores the reduced counters under this name.
    #[serde(default)]
    pub nwt_target_name: Option<String>,
    #[serde(default)]
    pub num_document_passes: Option<u32>,
    #[serde(default = "default_true")]
    pub return_theta: bool,
}

impl Default for ProcessBatchesArgs {
    fn default() -> Self {
        Self {
            batch_names: Vec::new(),
            batch_weights: Vec::new(),
            pwt_source_name: None,
            nwt_target_name: None,
            num_document_passes: None,
            return_theta: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOfflineMasterModelArgs {
    /// Empty means every imported batch.
    #[serde(default)]
    pub batch_names: Vec<String>,
    #[serde(default)]
    pub batch_folder: Option<PathBuf>,
    #[serde(default = "default_passes")]
    pub num_collection_passes: u32,
}

impl Default for FitOfflineMasterModelArgs {
    fn default() -> Self {
        Self {
            batch_names: Vec::new(),
            batch_folder: None,
            num_collection_passes: default_passes(),
        }
    }
}

/// Incremental training over update groups.
///
/// Either `update_after`, `apply_weight` and `decay_weight` are given explicitly
/// (same length, `update_after` holds increasing cumulative batch counts), or the
/// groups are `update_every` batches long and weighted by `rho = (tau0 + update)^-kappa`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOnlineMasterModelArgs {
    #[serde(default)]
    pub batch_names: Vec<String>,
    #[serde(default)]
    pub update_after: Vec<usize>,
    #[serde(default)]
    pub apply_weight: Vec<f32>,
    #[serde(default)]
    pub decay_weight: Vec<f32>,
    #[serde(default = "default_update_every")]
    pub update_every: usize,
    #[serde(default = "default_tau0")]
    pub tau0: f32,
    #[serde(default = "default_kappa")]
    pub kappa: f32,
    #[serde(default)]
    pub asynchronous: bool,
}

impl Default for FitOnlineMasterModelArgs {
    fn default() -> Self {
        Self {
            batch_names: Vec::new(),
            update_after: Vec::new(),
            apply_weight: Vec::new(),
            decay_weight: Vec::new(),
            update_every: default_update_every(),
            tau0: default_tau0(),
            kappa: default_kappa(),
            asynchronous: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformMasterModelArgs {
    #[serde(default)]
    pub batch_names: Vec<String>,
    /// Batches given inline, never registered in the master.
    #[serde(default)]
    pub batches: Vec<Batch>,
    #[serde(default)]
    pub num_document_passes: Option<u32>,
}

/// Converts a text collection where each line reads
/// `title token[:count] ... |class token[:count] ...` into batch files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionParserConfig {
    pub source_path: PathBuf,
    pub target_folder: PathBuf,
    #[serde(default = "default_items_per_batch")]
    pub num_items_per_batch: usize,
    #[serde(default = "default_batch_prefix")]
    pub batch_name_prefix: String,
}

fn default_true() -> bool {
    true
}

fn default_passes() -> u32 {
    1
}

fn default_update_every() -> usize {
    1
}

fn default_tau0() -> f32 {
    1024.
}

fn default_kappa() -> f32 {
    0.7
}

fn default_items_per_batch() -> usize {
    1000
}

fn default_batch_prefix() -> String {
    "batch".to_string()
}
