use std::collections::HashSet;

use messages::{
    data::{ScoreData, ScoreInfo},
    specs::{ScoreConfig, ScoreKind},
};

use super::{
    ItemContext, ItemsProcessed, Perplexity, Score, ScoreInputs, SparsityPhi, SparsityTheta,
    TopTokens,
};
use crate::{
    error::{EngineErr, Result},
    storage::TopicModel,
};

#[derive(Debug)]
struct Entry {
    config: ScoreConfig,
    score: Box<dyn Score>,
}

/// The scores of a master component.
#[derive(Debug, Default)]
pub struct ScoreSet {
    entries: Vec<Entry>,
}

impl ScoreSet {
    /// Builds the scores described by `configs`.
    ///
    /// # Returns
    /// The set or an `InvalidConfig` error on repeated names.
    pub fn from_configs(configs: &[ScoreConfig]) -> Result<Self> {
        let mut names = HashSet::with_capacity(configs.len());

        let entries = configs
            .iter()
            .map(|config| {
                if config.name.is_empty() {
                    return Err(EngineErr::invalid("a score needs a non empty name"));
                }

                if !names.insert(config.name.as_str()) {
                    return Err(EngineErr::invalid(format!(
                        "repeated score name {}",
                        config.name
                    )));
                }

                Ok(Entry {
                    config: config.clone(),
                    score: build(&config.kind),
                })
            })
            .collect::<Result<_>>()?;

        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Result<&dyn Score> {
        self.entries
            .iter()
            .find(|e| e.config.name == name)
            .map(|e| e.score.as_ref())
            .ok_or_else(|| EngineErr::not_found("score", name))
    }

    /// The value of every phi score for `pwt`.
    pub fn phi_values(&self, pwt: &TopicModel) -> Vec<(String, ScoreData)> {
        self.entries
            .iter()
            .filter(|e| e.score.inputs() == ScoreInputs::Phi)
            .map(|e| (e.config.name.clone(), e.score.compute_phi(pwt)))
            .collect()
    }

    /// Fresh accumulators for every theta score.
    pub fn theta_accumulators(&self) -> Vec<(String, ScoreData)> {
        self.entries
            .iter()
            .filter(|e| e.score.inputs() == ScoreInputs::Theta)
            .map(|e| (e.config.name.clone(), e.score.empty()))
            .collect()
    }

    /// Appends a document to the accumulators built by `theta_accumulators`.
    pub fn append_item(&self, accs: &mut [(String, ScoreData)], ctx: &ItemContext<'_>) {
        for (name, acc) in accs.iter_mut() {
            if let Ok(score) = self.get(name) {
                score.append_item(acc, ctx);
            }
        }
    }

    pub fn finish_batch(&self, accs: &mut [(String, ScoreData)]) {
        for (name, acc) in accs.iter_mut() {
            if let Ok(score) = self.get(name) {
                score.finish_batch(acc);
            }
        }
    }

    pub fn infos(&self) -> Vec<ScoreInfo> {
        self.entries
            .iter()
            .map(|e| ScoreInfo {
                name: e.config.name.clone(),
                kind: e.config.kind.type_name().to_string(),
            })
            .collect()
    }
}

fn build(kind: &ScoreKind) -> Box<dyn Score> {
    match kind.clone() {
        ScoreKind::Perplexity { class_ids } => Box::new(Perplexity::new(class_ids)),
        ScoreKind::SparsityPhi { class_ids, eps } => Box::new(SparsityPhi::new(class_ids, eps)),
        ScoreKind::SparsityTheta { eps } => Box::new(SparsityTheta::new(eps)),
        ScoreKind::ItemsProcessed => Box::new(ItemsProcessed),
        ScoreKind::TopTokens {
            num_tokens,
            class_id,
        } => Box::new(TopTokens::new(num_tokens, class_id)),
    }
}

#[cfg(test)]
mod tests {
    use messages::data::{Batch, Item, Token};

    use super::*;
    use crate::scores::merge;

    fn set() -> ScoreSet {
        ScoreSet::from_configs(&[
            ScoreConfig {
                name: "perplexity".into(),
                kind: ScoreKind::Perplexity {
                    class_ids: Vec::new(),
                },
            },
            ScoreConfig {
                name: "items".into(),
                kind: ScoreKind::ItemsProcessed,
            },
            ScoreConfig {
                name: "top".into(),
                kind: ScoreKind::TopTokens {
                    num_tokens: 1,
                    class_id: None,
                },
            },
        ])
        .unwrap()
    }

    #[test]
    fn theta_scores_accumulate_documents() {
        let set = set();
        let tokens = vec![Token::keyword("a"), Token::keyword("b")];
        let mut pwt = TopicModel::zeros("pwt", vec!["t".into()], tokens).unwrap();
        pwt.row_mut(0)[0] = 0.5;
        pwt.row_mut(1)[0] = 0.5;
        let batch = Batch {
            id: "b".into(),
            tokens: vec!["a".into(), "b".into()],
            class_ids: Vec::new(),
            items: vec![Item {
                id: 0,
                title: None,
                token_ids: vec![0, 1],
                token_weights: vec![1., 1.],
            }],
        };

        let mut accs = set.theta_accumulators();
        assert_eq!(accs.len(), 2);

        let ctx = ItemContext {
            batch: &batch,
            item: &batch.items[0],
            theta: &[1.],
            pwt: &pwt,
            token_rows: &[Some(0), Some(1)],
        };
        set.append_item(&mut accs, &ctx);
        set.finish_batch(&mut accs);

        let mut total = set.get("perplexity").unwrap().empty();
        merge(&mut total, &accs[0].1);
        merge(&mut total, &accs[0].1);

        assert!((total.scalar().unwrap() - 2.).abs() < 1e-9);
        assert_eq!(
            accs[1].1,
            ScoreData::ItemsProcessed {
                value: 1,
                num_batches: 1
            }
        );
    }

    #[test]
    fn top_tokens_rank_by_weight() {
        let set = set();
        let tokens = vec![Token::keyword("a"), Token::keyword("b")];
        let mut pwt = TopicModel::zeros("pwt", vec!["t".into()], tokens).unwrap();
        pwt.row_mut(0)[0] = 0.25;
        pwt.row_mut(1)[0] = 0.75;

        let ScoreData::TopTokens { topics } = set.get("top").unwrap().compute_phi(&pwt) else {
            panic!("unexpected score data");
        };

        assert_eq!(topics[0].keywords, ["b"]);
        assert_eq!(topics[0].weights, [0.75]);
    }

    #[test]
    fn unknown_scores_are_not_found() {
        assert_eq!(
            set().get("missing").unwrap_err().kind(),
            crate::ErrorKind::NotFound
        );
    }
}
