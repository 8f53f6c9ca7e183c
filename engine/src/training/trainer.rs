use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use log::{debug, info, warn};
use messages::{
    args::InitMethod,
    data::{Batch, ScoreData},
};

use super::{TrainPhase, UpdateGroup};
use crate::{
    cache::{ResultCaches, ScoreSlot},
    config::Settings,
    dictionary::Dictionary,
    error::{EngineErr, Result},
    initialization::initial_model,
    processing::{BatchOutcome, ProcessTask, WorkerPool},
    regularization::{PhiContext, ThetaHook},
    scores::merge,
    storage::{ModelStore, TopicModel},
};

/// How a set of batches gets processed.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// The model the documents are inferred against.
    pub pwt_name: String,
    pub num_document_passes: u32,
    /// The weight of each batch's counters, missing weights are one.
    pub batch_weights: Vec<f32>,
    pub collect_nwt: bool,
    pub collect_scores: bool,
    /// Whether results are read from and written to the result caches.
    pub use_cache: bool,
}

/// The outcome of processing a set of batches against a model snapshot.
#[derive(Debug)]
pub struct Processed {
    pub pwt: Arc<TopicModel>,
    pub outcomes: Vec<BatchOutcome>,
}

/// Drives the model updates of a master component.
///
/// A trainer works on snapshots taken when it was built: the settings, the
/// dictionaries and each model version it reads stay valid even if they are
/// disposed or replaced while it runs.
#[derive(Clone)]
pub struct Trainer {
    pub(super) master_id: u64,
    pub(super) settings: Arc<Settings>,
    pub(super) models: Arc<ModelStore>,
    pub(super) dictionaries: Arc<HashMap<String, Arc<Dictionary>>>,
    pub(super) caches: Arc<ResultCaches>,
    pub(super) pool: Arc<WorkerPool>,
}

impl Trainer {
    /// Creates a new `Trainer`.
    ///
    /// # Arguments
    /// * `master_id` - The master component the trainer works for, used in diagnostics.
    /// * `settings` - The configuration derived state to train with.
    /// * `models` - The model store new versions are published to.
    /// * `dictionaries` - The dictionaries visible to the regularizers.
    /// * `caches` - The result caches of the master component.
    /// * `pool` - The process wide worker pool.
    pub fn new(
        master_id: u64,
        settings: Arc<Settings>,
        models: Arc<ModelStore>,
        dictionaries: HashMap<String, Arc<Dictionary>>,
        caches: Arc<ResultCaches>,
        pool: Arc<WorkerPool>,
    ) -> Self {
        Self {
            master_id,
            settings,
            models,
            dictionaries: Arc::new(dictionaries),
            caches,
            pool,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn models(&self) -> &ModelStore {
        &self.models
    }

    pub fn caches(&self) -> &ResultCaches {
        &self.caches
    }

    /// The options used by the fit operations.
    pub fn fit_options(&self) -> ProcessOptions {
        ProcessOptions {
            pwt_name: self.settings.config.pwt_name.clone(),
            num_document_passes: self.settings.config.num_document_passes,
            batch_weights: Vec::new(),
            collect_nwt: true,
            collect_scores: true,
            use_cache: true,
        }
    }

    pub(super) fn enter(&self, phase: TrainPhase, version: u64) {
        debug!(master_id = self.master_id, version = version; "{phase}");
    }

    /// Processes every batch on the worker pool against the current version of
    /// `options.pwt_name`.
    ///
    /// # Returns
    /// The outcome of every batch in the order of `batches`, a `NotFound` error if
    /// the model doesn't exist or an `InternalError` if a worker panicked.
    pub fn process(&self, batches: &[Arc<Batch>], options: &ProcessOptions) -> Result<Processed> {
        let pwt = self.models.get(&options.pwt_name)?;
        self.enter(TrainPhase::Dispatching, pwt.version());

        let config = &self.settings.config;
        let generations = (
            self.caches.theta.generation(),
            self.caches.scores.generation(),
            self.caches.score_arrays.generation(),
        );
        let hooks: Arc<[ThetaHook]> = self
            .settings
            .regularizers
            .theta_hooks(pwt.topic_names())
            .into();

        let tasks: Vec<_> = batches
            .iter()
            .map(|batch| {
                let warm_start = if options.use_cache && config.reuse_theta {
                    self.caches
                        .theta
                        .latest(pwt.name(), &batch.id)
                        .map(|(_, block)| block)
                } else {
                    None
                };

                let task = ProcessTask {
                    batch: Arc::clone(batch),
                    pwt: Arc::clone(&pwt),
                    settings: Arc::clone(&self.settings),
                    hooks: Arc::clone(&hooks),
                    num_document_passes: options.num_document_passes,
                    warm_start,
                    collect_nwt: options.collect_nwt,
                    collect_scores: options.collect_scores,
                };

                move || task.run()
            })
            .collect();

        let outcomes = self.pool.run_ordered(tasks)?;

        let skipped: usize = outcomes.iter().map(|o| o.skipped.len()).sum();
        if skipped > 0 {
            warn!(master_id = self.master_id; "{skipped} malformed items were skipped");
        }

        if options.use_cache {
            self.cache_results(&pwt, &outcomes, options.collect_scores, generations);
        }

        Ok(Processed { pwt, outcomes })
    }

    fn cache_results(
        &self,
        pwt: &TopicModel,
        outcomes: &[BatchOutcome],
        with_scores: bool,
        generations: (u64, u64, u64),
    ) {
        let (theta_generation, score_generation, array_generation) = generations;
        let (model, version) = (pwt.name(), pwt.version());

        if self.settings.config.cache_theta {
            for outcome in outcomes {
                self.caches.theta.insert(
                    theta_generation,
                    model,
                    outcome.batch_id.clone(),
                    version,
                    Arc::clone(&outcome.theta),
                );
            }
        }

        let mut totals: Vec<(String, ScoreData)> = Vec::new();
        for outcome in outcomes {
            for (name, data) in &outcome.scores {
                self.caches.scores.insert(
                    score_generation,
                    model,
                    ScoreSlot::batch(name.as_str(), outcome.batch_id.as_str()),
                    version,
                    data.clone(),
                );

                match totals.iter_mut().find(|(n, _)| n == name) {
                    Some((_, total)) => merge(total, data),
                    None => totals.push((name.clone(), data.clone())),
                }
            }
        }

        if with_scores {
            totals.extend(self.settings.scores.phi_values(pwt));
        }

        for (name, total) in totals {
            self.caches.scores.insert(
                score_generation,
                model,
                ScoreSlot::global(name.as_str()),
                version,
                total.clone(),
            );
            self.caches
                .score_arrays
                .insert(array_generation, model, name, version, total);
        }
    }

    /// Sums the counters of every outcome in batch order.
    ///
    /// # Returns
    /// The counters laid out like `pwt` under the configured counters name.
    pub fn reduce(
        &self,
        pwt: &TopicModel,
        outcomes: &[BatchOutcome],
        weights: &[f32],
    ) -> Result<TopicModel> {
        self.enter(TrainPhase::Reducing, pwt.version());
        let mut nwt = pwt.zeros_like(self.settings.config.nwt_name.as_str())?;

        for (i, outcome) in outcomes.iter().enumerate() {
            if let Some(delta) = &outcome.nwt {
                delta.apply(&mut nwt, weights.get(i).copied().unwrap_or(1.));
            }
        }

        Ok(nwt)
    }

    /// Regularizes and normalizes `nwt` and publishes both the counters and the
    /// new normalized model at once.
    ///
    /// Nothing is published if a regularizer fails, the previous versions stay
    /// in place.
    ///
    /// # Returns
    /// The new normalized model or a `RegularizationFailed` error.
    pub fn publish(&self, pwt: &TopicModel, nwt: TopicModel) -> Result<Arc<TopicModel>> {
        self.enter(TrainPhase::Regularizing, pwt.version());

        let mut candidate = nwt.clone();
        let ctx = PhiContext {
            pwt,
            nwt: &nwt,
            dictionaries: &self.dictionaries,
        };

        if let Err(e) = self.settings.regularizers.regularize_phi(&ctx, &[], &mut candidate) {
            warn!(
                master_id = self.master_id;
                "update aborted, keeping version {}: {e}", pwt.version()
            );
            return Err(e);
        }

        self.enter(TrainPhase::Normalizing, pwt.version());
        let dead = candidate.normalize();
        if !dead.is_empty() {
            warn!(master_id = self.master_id; "reinitialized {} dead topics uniformly", dead.len());
        }
        candidate.set_name(self.settings.config.pwt_name.as_str());

        let mut published = self.models.publish_all(vec![nwt, candidate]);
        let pwt = published
            .pop()
            .ok_or_else(|| EngineErr::Internal("nothing was published".to_string()))?;

        self.enter(TrainPhase::Published, pwt.version());
        Ok(pwt)
    }

    /// Publishes a seeded random model over the vocabulary of `batches` unless
    /// the configured model already exists.
    pub fn ensure_pwt(&self, batches: &[Arc<Batch>]) -> Result<Arc<TopicModel>> {
        let config = &self.settings.config;
        if let Some(pwt) = self.models.try_get(&config.pwt_name) {
            return Ok(pwt);
        }

        let tokens: BTreeSet<_> = batches
            .iter()
            .flat_map(|batch| (0..batch.tokens.len()).filter_map(|i| batch.token(i)))
            .collect();

        let model = initial_model(
            &config.pwt_name,
            config.topic_names.clone(),
            tokens.into_iter().collect(),
            InitMethod::Random,
            config.seed,
        )?;

        info!(
            master_id = self.master_id;
            "initialized {} over {} tokens", model.name(), model.num_tokens()
        );
        Ok(self.models.publish(model))
    }

    /// Runs `num_passes` full passes over `batches`, publishing a version per pass.
    ///
    /// # Returns
    /// The version of the last published model.
    pub fn fit_offline(&self, batches: &[Arc<Batch>], num_passes: u32) -> Result<u64> {
        if batches.is_empty() {
            return Err(EngineErr::invalid("there are no batches to fit"));
        }

        let mut version = self.ensure_pwt(batches)?.version();
        info!(
            master_id = self.master_id;
            "offline fit over {} batches, {num_passes} passes",
            batches.len()
        );

        let options = self.fit_options();
        for _ in 0..num_passes {
            let processed = self.process(batches, &options)?;
            let nwt = self.reduce(&processed.pwt, &processed.outcomes, &[])?;
            version = self.publish(&processed.pwt, nwt)?.version();
        }

        info!(master_id = self.master_id, version = version; "offline fit done");
        Ok(version)
    }

    /// Merges every update group into the running counters, publishing a version
    /// per group.
    ///
    /// # Returns
    /// The version of the last published model.
    pub fn fit_online(&self, batches: &[Arc<Batch>], groups: &[UpdateGroup]) -> Result<u64> {
        let mut version = self.ensure_pwt(batches)?.version();
        info!(
            master_id = self.master_id;
            "online fit over {} batches, {} updates",
            batches.len(),
            groups.len()
        );

        let options = self.fit_options();
        for group in groups {
            let processed = self.process(&batches[group.batches.clone()], &options)?;
            let mut nwt = self.reduce(&processed.pwt, &processed.outcomes, &[])?;

            let previous = self
                .models
                .try_get(&self.settings.config.nwt_name)
                .filter(|prev| prev.same_layout(&nwt));

            match previous {
                Some(prev) => nwt
                    .values_mut()
                    .iter_mut()
                    .zip(prev.values())
                    .for_each(|(v, &p)| *v = group.decay_weight * p + group.apply_weight * *v),
                None => nwt
                    .values_mut()
                    .iter_mut()
                    .for_each(|v| *v *= group.apply_weight),
            }

            version = self.publish(&processed.pwt, nwt)?.version();
        }

        info!(master_id = self.master_id, version = version; "online fit done");
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use messages::{
        args::{MergeModelArgs, NormalizeModelArgs, RegularizeModelArgs, WeightedModel},
        data::Item,
        specs::{MasterModelConfig, RegularizerConfig, RegularizerKind},
    };

    use super::*;

    fn batch(id: &str) -> Arc<Batch> {
        Arc::new(Batch {
            id: id.into(),
            tokens: vec!["a".into(), "b".into(), "c".into()],
            class_ids: Vec::new(),
            items: vec![
                Item {
                    id: 0,
                    title: None,
                    token_ids: vec![0, 1],
                    token_weights: vec![4., 1.],
                },
                Item {
                    id: 1,
                    title: None,
                    token_ids: vec![1, 2],
                    token_weights: vec![1., 5.],
                },
            ],
        })
    }

    fn trainer(config: MasterModelConfig) -> Trainer {
        let caches = Arc::new(ResultCaches::new(&config));
        Trainer::new(
            0,
            Arc::new(Settings::new(config).unwrap()),
            Arc::default(),
            HashMap::new(),
            caches,
            Arc::new(WorkerPool::new(2).unwrap()),
        )
    }

    #[test]
    fn offline_passes_publish_one_version_each() {
        let trainer = trainer(MasterModelConfig::with_topics(["t0", "t1"]));
        let version = trainer.fit_offline(&[batch("b0"), batch("b1")], 3).unwrap();

        assert_eq!(version, 4);
        let pwt = trainer.models.get("pwt").unwrap();
        for sum in pwt.topic_sums() {
            assert!((sum - 1.).abs() < 1e-6);
        }
        assert!(trainer.models.contains("nwt"));
        assert!(trainer.caches.theta.latest("pwt", &"b1".to_string()).is_some());
    }

    #[test]
    fn failed_regularizers_keep_the_previous_version() {
        let mut config = MasterModelConfig::with_topics(["t0", "t1"]);
        config.regularizers.push(RegularizerConfig {
            name: "smooth".into(),
            tau: 1.,
            kind: RegularizerKind::SmoothSparsePhi {
                topic_names: Vec::new(),
                class_ids: Vec::new(),
                dictionary_name: Some("missing".into()),
            },
        });
        let trainer = trainer(config);

        let err = trainer.fit_offline(&[batch("b0")], 1).unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::RegularizationFailed);
        assert_eq!(trainer.models.get("pwt").unwrap().version(), 1);
        assert!(!trainer.models.contains("nwt"));
    }

    #[test]
    fn stages_compose_into_a_normalized_model() {
        let mut config = MasterModelConfig::with_topics(["t0", "t1"]);
        config.regularizers.push(RegularizerConfig {
            name: "smooth".into(),
            tau: 0.5,
            kind: RegularizerKind::SmoothSparsePhi {
                topic_names: Vec::new(),
                class_ids: Vec::new(),
                dictionary_name: None,
            },
        });
        let trainer = trainer(config);
        trainer.fit_offline(&[batch("b0")], 1).unwrap();

        let merged = trainer
            .merge_model(&MergeModelArgs {
                nwt_target_name: "merged".into(),
                nwt_sources: vec![
                    WeightedModel {
                        name: "nwt".into(),
                        weight: 1.,
                    },
                    WeightedModel {
                        name: "nwt".into(),
                        weight: 1.,
                    },
                ],
                topic_names: Vec::new(),
            })
            .unwrap();
        let nwt = trainer.models.get("nwt").unwrap();
        assert_eq!(merged.values()[0], 2. * nwt.values()[0]);

        let rwt = trainer
            .regularize_model(&RegularizeModelArgs {
                pwt_source_name: "pwt".into(),
                nwt_source_name: "merged".into(),
                rwt_target_name: "rwt".into(),
                regularizer_names: Vec::new(),
            })
            .unwrap();
        assert!(rwt.values().iter().all(|&r| (r - 0.5).abs() < 1e-6));

        let pwt = trainer
            .normalize_model(&NormalizeModelArgs {
                pwt_target_name: "custom".into(),
                nwt_source_name: "merged".into(),
                rwt_source_name: Some("rwt".into()),
            })
            .unwrap();
        for sum in pwt.topic_sums() {
            assert!((sum - 1.).abs() < 1e-6);
        }
    }
}
