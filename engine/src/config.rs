use std::{collections::HashSet, fs, path::Path, thread};

use messages::specs::MasterModelConfig;
use serde::{Deserialize, Serialize};

use crate::{
    error::{EngineErr, Result},
    regularization::RegularizerSet,
    scores::ScoreSet,
};

/// The process wide configuration of an `Engine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The amount of threads of the batch processing pool.
    #[serde(default = "default_num_processors")]
    pub num_processors: usize,
    /// The amount of threads driving asynchronous operations.
    #[serde(default = "default_async_threads")]
    pub async_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_processors: default_num_processors(),
            async_threads: default_async_threads(),
        }
    }
}

impl EngineConfig {
    /// Loads the configuration from a JSON file, missing fields take their default.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read(path).map_err(|e| EngineErr::disk(path, e))?;

        serde_json::from_slice(&content).map_err(|e| {
            EngineErr::invalid(format!("invalid engine config {}: {e}", path.display()))
        })
    }
}

fn default_num_processors() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

fn default_async_threads() -> usize {
    2
}

/// Checks a master model configuration without building anything out of it.
pub fn validate(config: &MasterModelConfig) -> Result<()> {
    if config.topic_names.is_empty() {
        return Err(EngineErr::invalid("topic_names must not be empty"));
    }

    let mut topics = HashSet::with_capacity(config.topic_names.len());
    for topic in &config.topic_names {
        if topic.is_empty() {
            return Err(EngineErr::invalid("topic names must not be empty"));
        }
        if !topics.insert(topic.as_str()) {
            return Err(EngineErr::invalid(format!("repeated topic name {topic}")));
        }
    }

    if config.num_document_passes == 0 {
        return Err(EngineErr::invalid("num_document_passes must be positive"));
    }

    if config.pwt_name.is_empty() || config.nwt_name.is_empty() {
        return Err(EngineErr::invalid("model names must not be empty"));
    }

    if config.pwt_name == config.nwt_name {
        return Err(EngineErr::invalid(format!(
            "pwt_name and nwt_name must differ, both are {}",
            config.pwt_name
        )));
    }

    if let Some(cw) = config
        .class_weights
        .iter()
        .find(|cw| !cw.weight.is_finite() || cw.weight < 0.)
    {
        return Err(EngineErr::invalid(format!(
            "class {} has an invalid weight {}",
            cw.class_id, cw.weight
        )));
    }

    Ok(())
}

/// Everything a master component derives from its configuration, swapped as a
/// whole on reconfiguration.
#[derive(Debug)]
pub struct Settings {
    pub config: MasterModelConfig,
    pub regularizers: RegularizerSet,
    pub scores: ScoreSet,
}

impl Settings {
    /// Validates `config` and builds its regularizers and scores.
    pub fn new(config: MasterModelConfig) -> Result<Self> {
        validate(&config)?;

        Ok(Self {
            regularizers: RegularizerSet::from_configs(&config.regularizers)?,
            scores: ScoreSet::from_configs(&config.scores)?,
            config,
        })
    }
}
