use messages::data::ScoreData;

use super::{ItemContext, Score, ScoreInputs, score::ratio};

/// The share of document topic weights below `eps`.
#[derive(Debug)]
pub struct SparsityTheta {
    eps: f32,
}

impl SparsityTheta {
    pub fn new(eps: f32) -> Self {
        Self { eps }
    }
}

impl Score for SparsityTheta {
    fn inputs(&self) -> ScoreInputs {
        ScoreInputs::Theta
    }

    fn empty(&self) -> ScoreData {
        ScoreData::SparsityTheta {
            value: 0.,
            zero_topics: 0,
            total_topics: 0,
        }
    }

    fn append_item(&self, acc: &mut ScoreData, ctx: &ItemContext<'_>) {
        if let ScoreData::SparsityTheta {
            value,
            zero_topics,
            total_topics,
        } = acc
        {
            *zero_topics += ctx.theta.iter().filter(|&&v| v < self.eps).count() as u64;
            *total_topics += ctx.theta.len() as u64;
            *value = ratio(*zero_topics, *total_topics);
        }
    }
}
