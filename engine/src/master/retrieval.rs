use std::sync::Arc;

use messages::{
    args::{
        ClearScoreArrayCacheArgs, ClearScoreCacheArgs, ClearThetaCacheArgs, GetScoreArrayArgs,
        GetScoreValueArgs, GetThetaMatrixArgs,
    },
    data::{MasterComponentInfo, ScoreArray, ScoreData, ScoreValue, ThetaMatrix},
    specs::MasterModelConfig,
};

use super::MasterComponent;
use crate::{
    cache::ScoreSlot,
    error::{EngineErr, Result},
    processing::assemble_theta,
    scores::{ScoreInputs, merge},
    storage::TopicModel,
    training::ProcessOptions,
};

impl MasterComponent {
    /// Assembles the cached distributions of the requested batches.
    ///
    /// # Returns
    /// The matrix, or a `NotFound` error if a named batch has no cached
    /// distributions at the requested version.
    pub fn theta_matrix(&self, args: &GetThetaMatrixArgs) -> Result<ThetaMatrix> {
        let model = args
            .model_name
            .clone()
            .unwrap_or_else(|| self.settings().config.pwt_name.clone());
        let theta = &self.caches.theta;

        let mut blocks = Vec::new();
        if args.batch_names.is_empty() {
            let mut batch_ids = theta.keys(&model);
            batch_ids.sort();

            for id in &batch_ids {
                let block = match args.version {
                    Some(version) => theta.get(&model, id, version).map(|b| (version, b)),
                    None => theta.latest(&model, id),
                };
                blocks.extend(block);
            }
        } else {
            for id in &args.batch_names {
                let block = match args.version {
                    Some(version) => theta.get(&model, id, version).map(|b| (version, b)),
                    None => theta.latest(&model, id),
                };
                let block =
                    block.ok_or_else(|| EngineErr::not_found("theta of batch", id.as_str()))?;
                blocks.push(block);
            }
        }

        assemble_theta(&model, &blocks, &args.topic_names)
    }

    /// The value of a score against a model version.
    ///
    /// Values are served from the cache when possible. Otherwise they're only
    /// computed against the current version of the model: phi scores out of the
    /// model itself, theta scores by inferring the requested batch or every
    /// batch of the master.
    ///
    /// # Returns
    /// The value, or a `NotFound` error for unknown scores, models and batches or
    /// for versions that are neither cached nor current.
    pub fn score_value(&self, args: &GetScoreValueArgs) -> Result<ScoreValue> {
        let settings = self.settings();
        let score = settings.scores.get(&args.score_name)?;
        let model_name = args
            .model_name
            .clone()
            .unwrap_or_else(|| settings.config.pwt_name.clone());

        let batch = match score.inputs() {
            ScoreInputs::Phi => None,
            ScoreInputs::Theta => args.batch_name.clone(),
        };
        let slot = match &batch {
            Some(batch) => ScoreSlot::batch(args.score_name.as_str(), batch.as_str()),
            None => ScoreSlot::global(args.score_name.as_str()),
        };

        let cached = match args.version {
            Some(version) => self
                .caches
                .scores
                .get(&model_name, &slot, version)
                .map(|data| (version, data)),
            None => self.caches.scores.latest(&model_name, &slot),
        };

        let (version, data) = match cached {
            Some(cached) => cached,
            None => {
                let pwt = self.models.get(&model_name)?;
                if let Some(version) = args.version.filter(|&v| v != pwt.version()) {
                    return Err(EngineErr::not_found(
                        "score version",
                        format!("{}@{version}", args.score_name),
                    ));
                }

                let data =
                    self.compute_score(&pwt, &args.score_name, score.inputs(), batch.as_deref())?;
                (pwt.version(), data)
            }
        };

        Ok(ScoreValue {
            name: args.score_name.clone(),
            model_name,
            version,
            batch_id: batch,
            data,
        })
    }

    fn compute_score(
        &self,
        pwt: &Arc<TopicModel>,
        name: &str,
        inputs: ScoreInputs,
        batch: Option<&str>,
    ) -> Result<ScoreData> {
        let trainer = self.trainer();
        let scores = &trainer.settings().scores;

        if inputs == ScoreInputs::Phi {
            let generation = self.caches.scores.generation();
            let data = scores.get(name)?.compute_phi(pwt);
            self.caches.scores.insert(
                generation,
                pwt.name(),
                ScoreSlot::global(name),
                pwt.version(),
                data.clone(),
            );
            return Ok(data);
        }

        let batches = match batch {
            Some(batch) => self.batches.resolve(&[batch.to_string()], None)?,
            None => self.batches.all(),
        };

        let options = ProcessOptions {
            pwt_name: pwt.name().to_string(),
            collect_nwt: false,
            use_cache: batch.is_none(),
            ..trainer.fit_options()
        };

        let generation = self.caches.scores.generation();
        let processed = trainer.process(&batches, &options)?;

        let mut total = scores.get(name)?.empty();
        for outcome in &processed.outcomes {
            if let Some((_, data)) = outcome.scores.iter().find(|(n, _)| n == name) {
                merge(&mut total, data);
            }
        }

        if let Some(batch) = batch {
            self.caches.scores.insert(
                generation,
                processed.pwt.name(),
                ScoreSlot::batch(name, batch),
                processed.pwt.version(),
                total.clone(),
            );
        }

        Ok(total)
    }

    /// Every retained global value of a score, oldest version first.
    pub fn score_array(&self, args: &GetScoreArrayArgs) -> Result<ScoreArray> {
        let settings = self.settings();
        settings.scores.get(&args.score_name)?;
        let model_name = args
            .model_name
            .clone()
            .unwrap_or_else(|| settings.config.pwt_name.clone());

        let values = self
            .caches
            .score_arrays
            .history(&model_name, &args.score_name)
            .into_iter()
            .map(|(version, data)| ScoreValue {
                name: args.score_name.clone(),
                model_name: model_name.clone(),
                version,
                batch_id: None,
                data,
            })
            .collect();

        Ok(ScoreArray {
            name: args.score_name.clone(),
            values,
        })
    }

    pub fn info(&self) -> MasterComponentInfo {
        let settings = self.settings();

        MasterComponentInfo {
            master_id: self.id(),
            config: settings.config.clone(),
            regularizers: settings.regularizers.infos(),
            scores: settings.scores.infos(),
            dictionaries: self.dictionaries.infos(),
            models: self.models.infos(),
            batches: self.batches.infos(),
            cache_entries: self.caches.infos(),
            num_processors: self.pool.num_threads(),
        }
    }

    pub fn config(&self) -> MasterModelConfig {
        self.settings().config.clone()
    }

    pub fn clear_theta_cache(&self, args: &ClearThetaCacheArgs) -> usize {
        self.caches.clear_theta(args)
    }

    pub fn clear_score_cache(&self, args: &ClearScoreCacheArgs) -> usize {
        self.caches.clear_scores(args)
    }

    pub fn clear_score_array_cache(&self, args: &ClearScoreArrayCacheArgs) -> usize {
        self.caches.clear_score_arrays(args)
    }
}
