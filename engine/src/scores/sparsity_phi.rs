use messages::data::ScoreData;

use super::{Score, ScoreInputs, score::ratio};
use crate::storage::TopicModel;

/// The share of model weights below `eps`, restricted to the given classes.
#[derive(Debug)]
pub struct SparsityPhi {
    class_ids: Vec<String>,
    eps: f32,
}

impl SparsityPhi {
    pub fn new(class_ids: Vec<String>, eps: f32) -> Self {
        Self { class_ids, eps }
    }
}

impl Score for SparsityPhi {
    fn inputs(&self) -> ScoreInputs {
        ScoreInputs::Phi
    }

    fn empty(&self) -> ScoreData {
        ScoreData::SparsityPhi {
            value: 0.,
            zero_tokens: 0,
            total_tokens: 0,
        }
    }

    fn compute_phi(&self, pwt: &TopicModel) -> ScoreData {
        let mut zero_tokens = 0;
        let mut total_tokens = 0;

        for (w, token) in pwt.tokens().iter().enumerate() {
            if !self.class_ids.is_empty() && !self.class_ids.contains(&token.class_id) {
                continue;
            }

            let row = pwt.row(w);
            zero_tokens += row.iter().filter(|&&v| v < self.eps).count() as u64;
            total_tokens += row.len() as u64;
        }

        ScoreData::SparsityPhi {
            value: ratio(zero_tokens, total_tokens),
            zero_tokens,
            total_tokens,
        }
    }
}
