use messages::data::ScoreData;

use super::{ItemContext, Score, ScoreInputs};

#[derive(Debug)]
pub struct ItemsProcessed;

impl Score for ItemsProcessed {
    fn inputs(&self) -> ScoreInputs {
        ScoreInputs::Theta
    }

    fn empty(&self) -> ScoreData {
        ScoreData::ItemsProcessed {
            value: 0,
            num_batches: 0,
        }
    }

    fn append_item(&self, acc: &mut ScoreData, _: &ItemContext<'_>) {
        if let ScoreData::ItemsProcessed { value, .. } = acc {
            *value += 1;
        }
    }

    fn finish_batch(&self, acc: &mut ScoreData) {
        if let ScoreData::ItemsProcessed { num_batches, .. } = acc {
            *num_batches += 1;
        }
    }
}
