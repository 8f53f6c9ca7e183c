use serde::{Deserialize, Serialize};

/// Per document topic distributions, `item_weights[d][t]` is the weight of
/// `topic_names[t]` in the document `item_ids[d]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThetaMatrix {
    pub model_name: String,
    pub version: u64,
    pub topic_names: Vec<String>,
    pub batch_ids: Vec<String>,
    pub item_ids: Vec<u64>,
    pub item_titles: Vec<Option<String>>,
    pub item_weights: Vec<Vec<f32>>,
}

impl ThetaMatrix {
    /// The amount of documents in the matrix.
    pub fn len(&self) -> usize {
        self.item_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }
}
