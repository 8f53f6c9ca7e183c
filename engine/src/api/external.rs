use messages::data::{ThetaMatrix, TopicModelData};

/// A result whose dense weights can travel apart from its metadata.
pub trait DenseMatrix {
    /// Moves the weights out row by row, leaving the metadata in place.
    fn take_values(&mut self) -> Vec<f32>;
}

impl DenseMatrix for ThetaMatrix {
    fn take_values(&mut self) -> Vec<f32> {
        self.item_weights.drain(..).flatten().collect()
    }
}

impl DenseMatrix for TopicModelData {
    fn take_values(&mut self) -> Vec<f32> {
        self.weights.drain(..).flatten().collect()
    }
}

/// The values as native endian bytes.
pub fn to_bytes(values: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theta_rows_are_flattened_in_item_order() {
        let mut theta = ThetaMatrix {
            model_name: "pwt".into(),
            version: 1,
            topic_names: vec!["t0".into(), "t1".into()],
            batch_ids: vec!["b".into(), "b".into()],
            item_ids: vec![0, 1],
            item_titles: vec![None, None],
            item_weights: vec![vec![0.25, 0.75], vec![1., 0.]],
        };

        assert_eq!(theta.take_values(), [0.25, 0.75, 1., 0.]);
        assert!(theta.item_weights.is_empty());
        assert_eq!(theta.len(), 2);
    }

    #[test]
    fn bytes_keep_the_value_layout() {
        let bytes = to_bytes(&[1.5, -2.]);

        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], 1.5f32.to_ne_bytes());
        assert_eq!(&bytes[4..], (-2f32).to_ne_bytes());
    }
}
