mod versioned;

pub use versioned::VersionedCache;

use std::sync::Arc;

use messages::{
    args::{ClearScoreArrayCacheArgs, ClearScoreCacheArgs, ClearThetaCacheArgs, VersionRange},
    data::{CacheEntryInfo, ScoreData},
    specs::MasterModelConfig,
};

use crate::processing::ThetaBlock;

/// The key of a cached score value, `batch` is `None` for values covering every
/// batch processed at a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScoreSlot {
    pub score: String,
    pub batch: Option<String>,
}

impl ScoreSlot {
    pub fn global(score: impl Into<String>) -> Self {
        Self {
            score: score.into(),
            batch: None,
        }
    }

    pub fn batch(score: impl Into<String>, batch: impl Into<String>) -> Self {
        Self {
            score: score.into(),
            batch: Some(batch.into()),
        }
    }
}

/// The derived results of a master component, keyed by the model version they
/// were computed against.
#[derive(Debug)]
pub struct ResultCaches {
    /// Topic distributions of the processed batches, keyed by batch id.
    pub theta: VersionedCache<String, Arc<ThetaBlock>>,
    pub scores: VersionedCache<ScoreSlot, ScoreData>,
    /// Global score values, keyed by score name, one per version for the score history.
    pub score_arrays: VersionedCache<String, ScoreData>,
}

impl ResultCaches {
    pub fn new(config: &MasterModelConfig) -> Self {
        Self {
            theta: VersionedCache::new("theta", config.cache_retention),
            scores: VersionedCache::new("score", config.cache_retention),
            score_arrays: VersionedCache::new("score_array", config.score_history),
        }
    }

    /// Applies the retention policy of `config` to the upcoming writes.
    pub fn configure(&self, config: &MasterModelConfig) {
        self.theta.set_retention(config.cache_retention);
        self.scores.set_retention(config.cache_retention);
        self.score_arrays.set_retention(config.score_history);
    }

    pub fn clear_theta(&self, args: &ClearThetaCacheArgs) -> usize {
        self.theta.clear_where(args.model_name.as_deref(), |model, batch, version| {
            matches_model(&args.model_name, model)
                && args.batch_name.as_ref().is_none_or(|b| b == batch)
                && in_range(args.versions, version)
        })
    }

    pub fn clear_scores(&self, args: &ClearScoreCacheArgs) -> usize {
        self.scores.clear_where(args.model_name.as_deref(), |model, slot, version| {
            matches_model(&args.model_name, model)
                && args.score_name.as_ref().is_none_or(|s| *s == slot.score)
                && args
                    .batch_name
                    .as_ref()
                    .is_none_or(|b| slot.batch.as_ref() == Some(b))
                && in_range(args.versions, version)
        })
    }

    pub fn clear_score_arrays(&self, args: &ClearScoreArrayCacheArgs) -> usize {
        self.score_arrays.clear_where(args.model_name.as_deref(), |model, score, _| {
            matches_model(&args.model_name, model)
                && args.score_name.as_ref().is_none_or(|s| s == score)
        })
    }

    /// Drops every result derived from the model `name`.
    pub fn clear_model(&self, name: &str) {
        self.theta.clear_where(Some(name), |model, _, _| model == name);
        self.scores.clear_where(Some(name), |model, _, _| model == name);
        self.score_arrays.clear_where(Some(name), |model, _, _| model == name);
    }

    pub fn infos(&self) -> Vec<CacheEntryInfo> {
        let score_size = |_: &ScoreData| size_of::<ScoreData>();

        let mut infos = self.theta.infos(String::clone, |block| block.byte_size());
        infos.extend(self.scores.infos(
            |slot| match &slot.batch {
                Some(batch) => format!("{}@{batch}", slot.score),
                None => slot.score.clone(),
            },
            score_size,
        ));
        infos.extend(self.score_arrays.infos(String::clone, score_size));
        infos
    }
}

fn matches_model(filter: &Option<String>, model: &str) -> bool {
    filter.as_deref().is_none_or(|m| m == model)
}

fn in_range(range: Option<VersionRange>, version: u64) -> bool {
    range.is_none_or(|r| r.contains(version))
}
