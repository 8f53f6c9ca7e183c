use std::sync::Arc;

use messages::data::ThetaMatrix;

use crate::error::{EngineErr, Result};

/// The topic distributions inferred for the documents of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ThetaBlock {
    pub batch_id: String,
    pub topic_names: Vec<String>,
    pub item_ids: Vec<u64>,
    pub item_titles: Vec<Option<String>>,
    /// One distribution per document, each summing to one.
    pub rows: Vec<Vec<f32>>,
}

impl ThetaBlock {
    /// The distribution of the document `item_id`, if the block has one.
    pub fn row_of(&self, item_id: u64) -> Option<&[f32]> {
        self.item_ids
            .iter()
            .position(|&id| id == item_id)
            .map(|i| self.rows[i].as_slice())
    }

    pub fn byte_size(&self) -> usize {
        self.rows.len() * self.topic_names.len() * size_of::<f32>()
            + self.item_ids.len() * size_of::<u64>()
    }
}

/// Concatenates theta blocks into a single matrix.
///
/// # Arguments
/// * `model_name` - The model the distributions were inferred against.
/// * `blocks` - The blocks with the model version each one was computed at.
/// * `topic_names` - The topics to keep, empty keeps all of them.
///
/// # Returns
/// The matrix, versioned after its most recent block, or a `NotFound` error if
/// a requested topic is unknown.
pub fn assemble_theta(
    model_name: &str,
    blocks: &[(u64, Arc<ThetaBlock>)],
    topic_names: &[String],
) -> Result<ThetaMatrix> {
    let mut matrix = ThetaMatrix {
        model_name: model_name.to_string(),
        version: blocks.iter().map(|(v, _)| *v).max().unwrap_or_default(),
        ..Default::default()
    };

    for (_, block) in blocks {
        let columns: Vec<usize> = if topic_names.is_empty() {
            (0..block.topic_names.len()).collect()
        } else {
            topic_names
                .iter()
                .map(|name| {
                    block
                        .topic_names
                        .iter()
                        .position(|t| t == name)
                        .ok_or_else(|| EngineErr::not_found("topic", name.as_str()))
                })
                .collect::<Result<_>>()?
        };

        if matrix.topic_names.is_empty() {
            matrix.topic_names = columns.iter().map(|&t| block.topic_names[t].clone()).collect();
        }

        for (i, row) in block.rows.iter().enumerate() {
            matrix.batch_ids.push(block.batch_id.clone());
            matrix.item_ids.push(block.item_ids[i]);
            matrix.item_titles.push(block.item_titles[i].clone());
            matrix.item_weights.push(columns.iter().map(|&t| row[t]).collect());
        }
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(batch: &str, rows: Vec<Vec<f32>>) -> Arc<ThetaBlock> {
        Arc::new(ThetaBlock {
            batch_id: batch.into(),
            topic_names: vec!["t0".into(), "t1".into()],
            item_ids: (0..rows.len() as u64).collect(),
            item_titles: vec![None; rows.len()],
            rows,
        })
    }

    #[test]
    fn blocks_are_concatenated() {
        let blocks = [
            (2, block("a", vec![vec![0.5, 0.5]])),
            (3, block("b", vec![vec![0.25, 0.75], vec![1., 0.]])),
        ];

        let matrix = assemble_theta("pwt", &blocks, &["t1".to_string()]).unwrap();

        assert_eq!(matrix.version, 3);
        assert_eq!(matrix.topic_names, ["t1"]);
        assert_eq!(matrix.batch_ids, ["a", "b", "b"]);
        assert_eq!(matrix.item_weights, [vec![0.5], vec![0.75], vec![0.]]);
    }

    #[test]
    fn unknown_topics_are_not_found() {
        let blocks = [(1, block("a", vec![vec![0.5, 0.5]]))];
        let err = assemble_theta("pwt", &blocks, &["t9".to_string()]).unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }
}
