use std::fmt::Debug;

use messages::data::{Batch, Item, ScoreData};

use crate::storage::TopicModel;

/// The inputs a score is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreInputs {
    /// The normalized topic model only.
    Phi,
    /// The topic distributions of the processed documents, together with the
    /// model they were inferred against.
    Theta,
}

/// A document as seen by a theta score.
pub struct ItemContext<'a> {
    pub batch: &'a Batch,
    pub item: &'a Item,
    /// The topic distribution inferred for `item`.
    pub theta: &'a [f32],
    pub pwt: &'a TopicModel,
    /// The `pwt` row of each batch token, `None` for tokens unknown to the model.
    pub token_rows: &'a [Option<usize>],
}

impl ItemContext<'_> {
    /// The occurrences of the item with a valid token, as `(batch token, weight)` pairs.
    pub fn occurrences(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.item
            .token_ids
            .iter()
            .zip(&self.item.token_weights)
            .map(|(&id, &weight)| (id as usize, weight))
            .filter(|&(id, weight)| {
                id < self.batch.tokens.len() && weight.is_finite() && weight >= 0.
            })
    }
}

/// A named metric over a model version.
///
/// Theta scores start from `empty`, accumulate every processed document through
/// `append_item` and are combined across batches with `merge`. Phi scores are
/// computed at once out of the model by `compute_phi`.
pub trait Score: Send + Sync + Debug {
    fn inputs(&self) -> ScoreInputs;

    /// The neutral value of the score.
    fn empty(&self) -> ScoreData;

    fn append_item(&self, acc: &mut ScoreData, ctx: &ItemContext<'_>) {
        let _ = (acc, ctx);
    }

    /// Called once every document of a batch was appended.
    fn finish_batch(&self, acc: &mut ScoreData) {
        let _ = acc;
    }

    fn compute_phi(&self, pwt: &TopicModel) -> ScoreData {
        let _ = pwt;
        self.empty()
    }
}

/// Combines two partial values of the same score into `acc`.
///
/// Every counter is summed and the derived value recomputed, values of different
/// kinds are left untouched.
pub fn merge(acc: &mut ScoreData, other: &ScoreData) {
    match (acc, other) {
        (
            ScoreData::Perplexity {
                value,
                raw,
                normalizer,
                zero_words,
            },
            ScoreData::Perplexity {
                raw: other_raw,
                normalizer: other_normalizer,
                zero_words: other_zero_words,
                ..
            },
        ) => {
            *raw += other_raw;
            *normalizer += other_normalizer;
            *zero_words += other_zero_words;
            *value = perplexity(*raw, *normalizer);
        }
        (
            ScoreData::SparsityTheta {
                value,
                zero_topics,
                total_topics,
            },
            ScoreData::SparsityTheta {
                zero_topics: other_zero,
                total_topics: other_total,
                ..
            },
        ) => {
            *zero_topics += other_zero;
            *total_topics += other_total;
            *value = ratio(*zero_topics, *total_topics);
        }
        (
            ScoreData::ItemsProcessed { value, num_batches },
            ScoreData::ItemsProcessed {
                value: other_value,
                num_batches: other_batches,
            },
        ) => {
            *value += other_value;
            *num_batches += other_batches;
        }
        _ => {}
    }
}

pub(super) fn perplexity(raw: f64, normalizer: f64) -> f64 {
    if normalizer > 0. {
        (-raw / normalizer).exp()
    } else {
        0.
    }
}

pub(super) fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.
    } else {
        part as f64 / total as f64
    }
}
