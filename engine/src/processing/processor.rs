use std::{collections::BTreeMap, sync::Arc};

use log::warn;
use messages::data::{Batch, Item, ScoreData};

use super::ThetaBlock;
use crate::{
    config::Settings,
    regularization::ThetaHook,
    scores::ItemContext,
    storage::TopicModel,
};

/// The expected counters a batch contributes to the model, keyed by model row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NwtDelta {
    rows: BTreeMap<usize, Vec<f32>>,
}

impl NwtDelta {
    fn add(&mut self, w: usize, num_topics: usize, t: usize, value: f32) {
        self.rows.entry(w).or_insert_with(|| vec![0.; num_topics])[t] += value;
    }

    /// Adds `scale` times the counters to `nwt`, which must share the layout of the
    /// model the batch was processed against.
    pub fn apply(&self, nwt: &mut TopicModel, scale: f32) {
        for (&w, row) in &self.rows {
            nwt.row_mut(w)
                .iter_mut()
                .zip(row)
                .for_each(|(v, &d)| *v += scale * d);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The result of processing a single batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub batch_id: String,
    pub theta: Arc<ThetaBlock>,
    pub nwt: Option<NwtDelta>,
    /// The accumulated value of every theta score over the batch.
    pub scores: Vec<(String, ScoreData)>,
    /// The ids of the malformed items that were skipped.
    pub skipped: Vec<u64>,
}

/// The inference of a single batch against an immutable model snapshot.
pub struct ProcessTask {
    pub batch: Arc<Batch>,
    pub pwt: Arc<TopicModel>,
    pub settings: Arc<Settings>,
    pub hooks: Arc<[ThetaHook]>,
    pub num_document_passes: u32,
    /// Distributions of a previous pass to start the inference from.
    pub warm_start: Option<Arc<ThetaBlock>>,
    pub collect_nwt: bool,
    pub collect_scores: bool,
}

impl ProcessTask {
    /// Infers the topic distribution of every document of the batch and, if
    /// requested, accumulates the batch's counters and theta scores.
    ///
    /// Malformed documents are skipped and reported in the outcome, the rest of
    /// the batch is unaffected.
    pub fn run(self) -> BatchOutcome {
        let batch = &*self.batch;
        let pwt = &*self.pwt;
        let num_topics = pwt.num_topics();

        let token_rows: Vec<Option<usize>> = (0..batch.tokens.len())
            .map(|i| batch.token(i).and_then(|token| pwt.token_id(&token)))
            .collect();

        let class_weights: Vec<f32> = (0..batch.tokens.len())
            .map(|i| self.settings.config.class_weight(batch.class_of(i)))
            .collect();

        let mut theta = ThetaBlock {
            batch_id: batch.id.clone(),
            topic_names: pwt.topic_names().to_vec(),
            item_ids: Vec::with_capacity(batch.items.len()),
            item_titles: Vec::with_capacity(batch.items.len()),
            rows: Vec::with_capacity(batch.items.len()),
        };
        let mut nwt = self.collect_nwt.then(NwtDelta::default);
        let mut scores = if self.collect_scores {
            self.settings.scores.theta_accumulators()
        } else {
            Vec::new()
        };
        let mut skipped = Vec::new();

        for item in &batch.items {
            if let Err(reason) = check_item(batch, item) {
                warn!(batch = batch.id.as_str(), item = item.id; "skipping item: {reason}");
                skipped.push(item.id);
                continue;
            }

            let occurrences: Vec<(usize, f32)> = item
                .token_ids
                .iter()
                .zip(&item.token_weights)
                .filter_map(|(&id, &weight)| {
                    let id = id as usize;
                    let weight = weight * class_weights[id];
                    token_rows[id].filter(|_| weight > 0.).map(|w| (w, weight))
                })
                .collect();

            let initial = self
                .warm_start
                .as_ref()
                .and_then(|block| block.row_of(item.id))
                .filter(|row| row.len() == num_topics);
            let row = self.infer(&occurrences, initial);

            if let Some(nwt) = nwt.as_mut() {
                for &(w, n_dw) in &occurrences {
                    let phi = pwt.row(w);
                    let z: f32 = phi.iter().zip(&row).map(|(p, t)| p * t).sum();
                    if z <= 0. {
                        continue;
                    }

                    for t in 0..num_topics {
                        nwt.add(w, num_topics, t, n_dw * phi[t] * row[t] / z);
                    }
                }
            }

            if self.collect_scores {
                let ctx = ItemContext {
                    batch,
                    item,
                    theta: &row,
                    pwt,
                    token_rows: &token_rows,
                };
                self.settings.scores.append_item(&mut scores, &ctx);
            }

            theta.item_ids.push(item.id);
            theta.item_titles.push(item.title.clone());
            theta.rows.push(row);
        }

        if self.collect_scores {
            self.settings.scores.finish_batch(&mut scores);
        }

        BatchOutcome {
            batch_id: batch.id.clone(),
            theta: Arc::new(theta),
            nwt,
            scores,
            skipped,
        }
    }

    /// Runs the fixed amount of inner iterations for one document.
    fn infer(&self, occurrences: &[(usize, f32)], initial: Option<&[f32]>) -> Vec<f32> {
        let num_topics = self.pwt.num_topics();
        let uniform = 1. / num_topics as f64;

        let mut theta: Vec<f64> = match initial {
            Some(row) => row.iter().map(|&v| v as f64).collect(),
            None => vec![uniform; num_topics],
        };
        let mut counts = vec![0f64; num_topics];

        for pass in 0..self.num_document_passes as usize {
            counts.iter_mut().for_each(|c| *c = 0.);

            for &(w, n_dw) in occurrences {
                let phi = self.pwt.row(w);
                let z: f64 = phi.iter().zip(&theta).map(|(&p, t)| p as f64 * t).sum();
                if z <= 0. {
                    continue;
                }

                for t in 0..num_topics {
                    counts[t] += n_dw as f64 * phi[t] as f64 * theta[t] / z;
                }
            }

            for hook in self.hooks.iter() {
                let alpha = hook.alpha(pass) as f64;
                counts
                    .iter_mut()
                    .zip(&hook.increments)
                    .for_each(|(c, &inc)| *c += alpha * inc as f64);
            }

            counts.iter_mut().filter(|c| c.is_nan() || **c < 0.).for_each(|c| *c = 0.);
            let sum: f64 = counts.iter().sum();

            if sum > 0. && sum.is_finite() {
                theta.iter_mut().zip(&counts).for_each(|(t, &c)| *t = c / sum);
            } else {
                theta.iter_mut().for_each(|t| *t = uniform);
            }
        }

        theta.into_iter().map(|t| t as f32).collect()
    }
}

fn check_item(batch: &Batch, item: &Item) -> Result<(), String> {
    if item.token_ids.len() != item.token_weights.len() {
        return Err(format!(
            "{} token ids but {} weights",
            item.token_ids.len(),
            item.token_weights.len()
        ));
    }

    if let Some(id) = item
        .token_ids
        .iter()
        .find(|&&id| id as usize >= batch.tokens.len())
    {
        return Err(format!("token id {id} out of range"));
    }

    if item.token_weights.iter().any(|w| !w.is_finite() || *w < 0.) {
        return Err("negative or non finite token weight".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use messages::{
        data::Token,
        specs::{MasterModelConfig, RegularizerConfig, RegularizerKind, ScoreConfig, ScoreKind},
    };

    use super::*;

    fn pwt() -> Arc<TopicModel> {
        let tokens = vec![Token::keyword("a"), Token::keyword("b")];
        let mut pwt = TopicModel::zeros("pwt", vec!["t0".into(), "t1".into()], tokens).unwrap();
        pwt.row_mut(0).copy_from_slice(&[0.9, 0.1]);
        pwt.row_mut(1).copy_from_slice(&[0.1, 0.9]);
        Arc::new(pwt)
    }

    fn batch() -> Arc<Batch> {
        let item = |id, token_ids: Vec<u32>, token_weights: Vec<f32>| Item {
            id,
            title: None,
            token_ids,
            token_weights,
        };

        Arc::new(Batch {
            id: "b".into(),
            tokens: vec!["a".into(), "b".into()],
            class_ids: Vec::new(),
            items: vec![
                item(0, vec![0, 0, 1], vec![3., 1., 1.]),
                item(1, vec![1], vec![2.]),
                item(2, vec![7], vec![1.]),
                item(3, vec![0], vec![f32::NAN]),
            ],
        })
    }

    fn task(config: MasterModelConfig) -> ProcessTask {
        let settings = Arc::new(Settings::new(config).unwrap());
        let pwt = pwt();
        let hooks = settings.regularizers.theta_hooks(pwt.topic_names()).into();

        ProcessTask {
            batch: batch(),
            pwt,
            settings,
            hooks,
            num_document_passes: 10,
            warm_start: None,
            collect_nwt: true,
            collect_scores: true,
        }
    }

    #[test]
    fn theta_rows_sum_one_and_malformed_items_are_skipped() {
        let mut config = MasterModelConfig::with_topics(["t0", "t1"]);
        config.scores.push(ScoreConfig {
            name: "items".into(),
            kind: ScoreKind::ItemsProcessed,
        });

        let outcome = task(config).run();

        assert_eq!(outcome.skipped, [2, 3]);
        assert_eq!(outcome.theta.item_ids, [0, 1]);
        for row in &outcome.theta.rows {
            assert!((row.iter().sum::<f32>() - 1.).abs() < 1e-6);
        }
        assert!(outcome.theta.rows[0][0] > outcome.theta.rows[0][1]);
        assert!(outcome.theta.rows[1][1] > outcome.theta.rows[1][0]);
        assert_eq!(
            outcome.scores[0].1,
            ScoreData::ItemsProcessed {
                value: 2,
                num_batches: 1
            }
        );
    }

    #[test]
    fn counters_match_document_lengths() {
        let outcome = task(MasterModelConfig::with_topics(["t0", "t1"])).run();
        let mut nwt = pwt().zeros_like("nwt").unwrap();
        outcome.nwt.unwrap().apply(&mut nwt, 1.);

        let total: f32 = nwt.values().iter().sum();
        assert!((total - 7.).abs() < 1e-4);
    }

    #[test]
    fn theta_regularizers_shift_the_distribution() {
        let mut config = MasterModelConfig::with_topics(["t0", "t1"]);
        config.regularizers.push(RegularizerConfig {
            name: "smooth".into(),
            tau: 100.,
            kind: RegularizerKind::SmoothSparseTheta {
                topic_names: vec!["t1".into()],
                alpha_iter: Vec::new(),
            },
        });

        let outcome = task(config).run();
        assert!(outcome.theta.rows[0][1] > 0.9);
    }

    #[test]
    fn zero_class_weights_leave_uniform_rows() {
        let mut config = MasterModelConfig::with_topics(["t0", "t1"]);
        config.class_weights.push(messages::specs::ClassWeight {
            class_id: "@labels".into(),
            weight: 1.,
        });

        let outcome = task(config).run();
        assert_eq!(outcome.theta.rows[0], [0.5, 0.5]);
        assert!(outcome.nwt.unwrap().is_empty());
    }
}
