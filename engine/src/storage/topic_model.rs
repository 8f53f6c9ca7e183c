use std::collections::{HashMap, HashSet};

use messages::{
    args::GetTopicModelArgs,
    data::{Token, TopicModelData},
};

use crate::error::{EngineErr, Result};

/// A dense `tokens x topics` matrix of non negative weights.
///
/// The same structure holds normalized distributions (`pwt`), raw expected
/// counters (`nwt`) and regularizer increments (`rwt`). Published models are
/// immutable, writers work on a private copy and publish it as a new version.
#[derive(Debug, Clone)]
pub struct TopicModel {
    name: String,
    version: u64,
    topic_names: Vec<String>,
    tokens: Vec<Token>,
    index: HashMap<Token, usize>,
    values: Vec<f32>,
}

impl TopicModel {
    /// Creates a new `TopicModel` filled with zeros.
    ///
    /// # Arguments
    /// * `name` - The name of the model.
    /// * `topic_names` - The unique names of the topics.
    /// * `tokens` - The unique tokens of the vocabulary.
    ///
    /// # Returns
    /// The new model, an `InvalidConfig` error on empty or repeated topics and tokens
    /// or `OutOfMemory` if the matrix can't be allocated.
    pub fn zeros(
        name: impl Into<String>,
        topic_names: Vec<String>,
        tokens: Vec<Token>,
    ) -> Result<Self> {
        if topic_names.is_empty() {
            return Err(EngineErr::invalid("a topic model needs at least one topic"));
        }

        let mut seen = HashSet::with_capacity(topic_names.len());
        if let Some(dup) = topic_names.iter().find(|t| !seen.insert(t.as_str())) {
            return Err(EngineErr::invalid(format!("repeated topic name {dup}")));
        }

        let mut index = HashMap::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            if index.insert(token.clone(), i).is_some() {
                return Err(EngineErr::invalid(format!(
                    "repeated token {}:{}",
                    token.class_id, token.keyword
                )));
            }
        }

        let len = topic_names.len() * tokens.len();
        let mut values = Vec::new();
        values.try_reserve_exact(len)?;
        values.resize(len, 0.);

        Ok(Self {
            name: name.into(),
            version: 0,
            topic_names,
            tokens,
            index,
            values,
        })
    }

    /// Creates a new `TopicModel` with the same topics and tokens as `self`, filled with zeros.
    pub fn zeros_like(&self, name: impl Into<String>) -> Result<Self> {
        let mut values = Vec::new();
        values.try_reserve_exact(self.values.len())?;
        values.resize(self.values.len(), 0.);

        Ok(Self {
            name: name.into(),
            version: 0,
            topic_names: self.topic_names.clone(),
            tokens: self.tokens.clone(),
            index: self.index.clone(),
            values,
        })
    }

    /// Builds a model out of its transferable form.
    ///
    /// # Returns
    /// The new model or an `InvalidConfig` error if the weights don't match the
    /// declared topics and tokens or any weight is not finite.
    pub fn from_data(data: TopicModelData) -> Result<Self> {
        if data.weights.len() != data.tokens.len() {
            return Err(EngineErr::invalid(format!(
                "model {} has {} tokens but {} weight rows",
                data.name,
                data.tokens.len(),
                data.weights.len()
            )));
        }

        let mut model = Self::zeros(data.name, data.topic_names, data.tokens)?;
        model.version = data.version;

        let num_topics = model.num_topics();
        for (w, row) in data.weights.iter().enumerate() {
            if row.len() != num_topics {
                return Err(EngineErr::invalid(format!(
                    "token row {w} has {} weights, expected {num_topics}",
                    row.len()
                )));
            }

            if row.iter().any(|v| !v.is_finite()) {
                return Err(EngineErr::invalid(format!("token row {w} has non finite weights")));
            }

            model.row_mut(w).copy_from_slice(row);
        }

        Ok(model)
    }

    /// Extracts the selected part of the model into its transferable form.
    ///
    /// # Arguments
    /// * `args` - The topics, classes and tokens to select, empty filters select everything.
    ///
    /// # Returns
    /// The selected data or a `NotFound` error if a requested topic doesn't exist.
    pub fn to_data(&self, args: &GetTopicModelArgs) -> Result<TopicModelData> {
        let topics = if args.topic_names.is_empty() {
            (0..self.num_topics()).collect()
        } else {
            args.topic_names
                .iter()
                .map(|name| {
                    self.topic_id(name)
                        .ok_or_else(|| EngineErr::not_found("topic", name.as_str()))
                })
                .collect::<Result<Vec<_>>>()?
        };

        let rows: Vec<usize> = if args.tokens.is_empty() {
            (0..self.num_tokens())
                .filter(|&w| {
                    args.class_ids.is_empty() || args.class_ids.contains(&self.tokens[w].class_id)
                })
                .collect()
        } else {
            args.tokens.iter().filter_map(|t| self.token_id(t)).collect()
        };

        Ok(TopicModelData {
            name: self.name.clone(),
            version: self.version,
            topic_names: topics.iter().map(|&t| self.topic_names[t].clone()).collect(),
            tokens: rows.iter().map(|&w| self.tokens[w].clone()).collect(),
            weights: rows
                .iter()
                .map(|&w| {
                    let row = self.row(w);
                    topics.iter().map(|&t| row[t]).collect()
                })
                .collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn topic_names(&self) -> &[String] {
        &self.topic_names
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn num_topics(&self) -> usize {
        self.topic_names.len()
    }

    pub fn num_tokens(&self) -> usize {
        self.tokens.len()
    }

    pub fn token_id(&self, token: &Token) -> Option<usize> {
        self.index.get(token).copied()
    }

    pub fn topic_id(&self, name: &str) -> Option<usize> {
        self.topic_names.iter().position(|t| t == name)
    }

    /// The weights of the `w`-th token, one per topic.
    pub fn row(&self, w: usize) -> &[f32] {
        let t = self.num_topics();
        &self.values[w * t..(w + 1) * t]
    }

    pub fn row_mut(&mut self, w: usize) -> &mut [f32] {
        let t = self.num_topics();
        &mut self.values[w * t..(w + 1) * t]
    }

    /// The flat token major weights.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// Whether both models share the exact same topics and tokens in the same order.
    pub fn same_layout(&self, other: &TopicModel) -> bool {
        self.topic_names == other.topic_names && self.tokens == other.tokens
    }

    /// The total mass of each topic.
    pub fn topic_sums(&self) -> Vec<f64> {
        let mut sums = vec![0f64; self.num_topics()];

        for row in self.values.chunks_exact(self.num_topics()) {
            sums.iter_mut().zip(row).for_each(|(s, &v)| *s += v as f64);
        }

        sums
    }

    /// Approximate amount of memory held by the weights.
    pub fn byte_size(&self) -> usize {
        self.values.len() * size_of::<f32>()
    }

    /// Clamps negative weights to zero and rescales every topic to sum one.
    ///
    /// Topics whose mass collapses to zero are reinitialized uniformly over the vocabulary.
    ///
    /// # Returns
    /// The indices of the recovered topics.
    pub fn normalize(&mut self) -> Vec<usize> {
        let num_topics = self.num_topics();
        let num_tokens = self.num_tokens();

        for v in self.values.iter_mut() {
            if v.is_nan() || *v < 0. {
                *v = 0.;
            }
        }

        let sums = self.topic_sums();
        let mut dead = Vec::new();

        for (t, &sum) in sums.iter().enumerate() {
            if sum > 0. && sum.is_finite() {
                continue;
            }

            dead.push(t);
            if num_tokens > 0 {
                let uniform = 1. / num_tokens as f32;
                self.values
                    .iter_mut()
                    .skip(t)
                    .step_by(num_topics)
                    .for_each(|v| *v = uniform);
            }
        }

        for row in self.values.chunks_exact_mut(num_topics) {
            for (t, v) in row.iter_mut().enumerate() {
                if !dead.contains(&t) {
                    *v = (*v as f64 / sums[t]) as f32;
                }
            }
        }

        dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(rows: &[[f32; 2]]) -> TopicModel {
        let tokens = (0..rows.len()).map(|i| Token::keyword(format!("w{i}"))).collect();
        let topics = vec!["t0".to_string(), "t1".to_string()];
        let mut model = TopicModel::zeros("m", topics, tokens).unwrap();

        for (w, row) in rows.iter().enumerate() {
            model.row_mut(w).copy_from_slice(row);
        }

        model
    }

    #[test]
    fn normalize_makes_topics_sum_one() {
        let mut m = model(&[[1., 2.], [3., 2.], [0., 4.]]);
        let dead = m.normalize();

        assert!(dead.is_empty());
        for sum in m.topic_sums() {
            assert!((sum - 1.).abs() < 1e-6);
        }
        assert!((m.row(0)[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn normalize_clamps_negative_weights() {
        let mut m = model(&[[-1., 1.], [2., 1.]]);
        m.normalize();

        assert_eq!(m.row(0)[0], 0.);
        assert_eq!(m.row(1)[0], 1.);
    }

    #[test]
    fn dead_topics_are_reinitialized_uniformly() {
        let mut m = model(&[[0., 1.], [-3., 1.], [0., 2.], [0., 0.]]);
        let dead = m.normalize();

        assert_eq!(dead, [0]);
        for w in 0..4 {
            assert_eq!(m.row(w)[0], 0.25);
        }
    }

    #[test]
    fn repeated_tokens_are_rejected() {
        let tokens = vec![Token::keyword("a"), Token::keyword("a")];
        let err = TopicModel::zeros("m", vec!["t".into()], tokens).unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::InvalidConfig);
    }

    #[test]
    fn to_data_selects_topics_and_classes() {
        let tokens = vec![Token::keyword("a"), Token::new("@labels", "spam")];
        let mut m = TopicModel::zeros("m", vec!["t0".into(), "t1".into()], tokens).unwrap();
        m.row_mut(0).copy_from_slice(&[0.1, 0.2]);
        m.row_mut(1).copy_from_slice(&[0.3, 0.4]);

        let args = GetTopicModelArgs {
            topic_names: vec!["t1".into()],
            class_ids: vec!["@labels".into()],
            ..Default::default()
        };
        let data = m.to_data(&args).unwrap();

        assert_eq!(data.tokens, [Token::new("@labels", "spam")]);
        assert_eq!(data.weights, [vec![0.4]]);
        assert_eq!(TopicModel::from_data(data).unwrap().num_topics(), 1);
    }
}
