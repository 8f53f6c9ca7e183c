use messages::data::ScoreData;

use super::{ItemContext, Score, ScoreInputs, score::perplexity};

/// `exp(-sum(n_dw * ln p(w|d)) / sum(n_dw))` over the processed documents.
///
/// Occurrences whose probability under the model is zero are left out of the sum
/// and counted in `zero_words`.
#[derive(Debug)]
pub struct Perplexity {
    class_ids: Vec<String>,
}

impl Perplexity {
    pub fn new(class_ids: Vec<String>) -> Self {
        Self { class_ids }
    }
}

impl Score for Perplexity {
    fn inputs(&self) -> ScoreInputs {
        ScoreInputs::Theta
    }

    fn empty(&self) -> ScoreData {
        ScoreData::Perplexity {
            value: 0.,
            raw: 0.,
            normalizer: 0.,
            zero_words: 0,
        }
    }

    fn append_item(&self, acc: &mut ScoreData, ctx: &ItemContext<'_>) {
        let ScoreData::Perplexity {
            value,
            raw,
            normalizer,
            zero_words,
        } = acc
        else {
            return;
        };

        for (id, weight) in ctx.occurrences() {
            let class_id = ctx.batch.class_of(id);
            if !self.class_ids.is_empty() && !self.class_ids.iter().any(|c| c == class_id) {
                continue;
            }

            let p_dw = ctx.token_rows[id].map_or(0., |w| {
                ctx.pwt
                    .row(w)
                    .iter()
                    .zip(ctx.theta)
                    .map(|(&phi, &theta)| phi as f64 * theta as f64)
                    .sum::<f64>()
            });

            if p_dw > 0. {
                *raw += weight as f64 * p_dw.ln();
                *normalizer += weight as f64;
            } else {
                *zero_words += 1;
            }
        }

        *value = perplexity(*raw, *normalizer);
    }
}
