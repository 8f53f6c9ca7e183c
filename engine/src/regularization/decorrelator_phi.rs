use super::{
    PhiContext, Regularizer,
    regularizer::{class_selected, topic_mask},
};
use crate::storage::TopicModel;

/// Pushes the selected topics apart, each counter is decreased by
/// `tau * p_wt * sum(p_ws)` over the other selected topics `s`.
#[derive(Debug)]
pub struct DecorrelatorPhi {
    topic_names: Vec<String>,
    class_ids: Vec<String>,
}

impl DecorrelatorPhi {
    pub fn new(topic_names: Vec<String>, class_ids: Vec<String>) -> Self {
        Self {
            topic_names,
            class_ids,
        }
    }
}

impl Regularizer for DecorrelatorPhi {
    fn regularize_phi(
        &self,
        ctx: &PhiContext<'_>,
        tau: f32,
        candidate: &mut TopicModel,
    ) -> Result<(), String> {
        if ctx.pwt.topic_names() != candidate.topic_names() {
            return Err(format!(
                "model {} and {} have different topics",
                ctx.pwt.name(),
                candidate.name()
            ));
        }

        let mask = topic_mask(candidate.topic_names(), &self.topic_names);

        for w in 0..candidate.num_tokens() {
            let token = candidate.tokens()[w].clone();
            if !class_selected(&self.class_ids, &token) {
                continue;
            }

            let Some(pwt) = ctx.pwt_row(&token) else {
                continue;
            };

            let total: f32 = pwt
                .iter()
                .zip(&mask)
                .filter_map(|(p, selected)| selected.then_some(*p))
                .sum();

            for ((v, &p), selected) in candidate.row_mut(w).iter_mut().zip(pwt).zip(&mask) {
                if *selected {
                    *v -= tau * p * (total - p);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use messages::data::Token;

    use super::*;

    #[test]
    fn penalizes_shared_tokens() {
        let topics = vec!["t0".to_string(), "t1".to_string()];
        let mut pwt = TopicModel::zeros("pwt", topics, vec![Token::keyword("a")]).unwrap();
        pwt.row_mut(0).copy_from_slice(&[0.5, 0.25]);
        let mut nwt = pwt.zeros_like("nwt").unwrap();
        nwt.row_mut(0).copy_from_slice(&[1., 1.]);
        let mut candidate = nwt.clone();
        let dictionaries = HashMap::new();
        let ctx = PhiContext {
            pwt: &pwt,
            nwt: &nwt,
            dictionaries: &dictionaries,
        };

        DecorrelatorPhi::new(Vec::new(), Vec::new())
            .regularize_phi(&ctx, 2., &mut candidate)
            .unwrap();

        assert!((candidate.row(0)[0] - 0.75).abs() < 1e-6);
        assert!((candidate.row(0)[1] - 0.75).abs() < 1e-6);
    }
}
