use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatherDictionaryArgs {
    pub dictionary_target_name: String,
    /// Batches to scan, empty means every batch of the master.
    #[serde(default)]
    pub batch_names: Vec<String>,
    /// Also scans every batch file stored in this folder.
    #[serde(default)]
    pub batch_folder: Option<PathBuf>,
}

/// Thresholds applied to a dictionary, every unset bound is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterDictionaryArgs {
    pub dictionary_name: String,
    pub dictionary_target_name: String,
    /// Restricts filtering to this class, tokens of other classes are kept untouched.
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub min_df: Option<f32>,
    #[serde(default)]
    pub max_df: Option<f32>,
    #[serde(default)]
    pub min_df_rate: Option<f32>,
    #[serde(default)]
    pub max_df_rate: Option<f32>,
    #[serde(default)]
    pub min_tf: Option<f32>,
    #[serde(default)]
    pub max_tf: Option<f32>,
    /// Keeps only the most frequent tokens.
    #[serde(default)]
    pub max_dictionary_size: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetDictionaryArgs {
    pub dictionary_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportDictionaryArgs {
    pub dictionary_name: String,
    pub file_name: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportDictionaryArgs {
    pub dictionary_name: String,
    pub file_name: PathBuf,
}
