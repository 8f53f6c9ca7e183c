use super::{
    PhiContext, Regularizer,
    regularizer::{class_selected, topic_mask},
};
use crate::storage::TopicModel;

/// Adds `tau` to every selected counter, a positive tau smooths the topics and
/// a negative one sparses them.
///
/// When a dictionary is given each token's increment is scaled by its
/// dictionary value, tokens missing from the dictionary are left untouched.
#[derive(Debug)]
pub struct SmoothSparsePhi {
    topic_names: Vec<String>,
    class_ids: Vec<String>,
    dictionary_name: Option<String>,
}

impl SmoothSparsePhi {
    pub fn new(
        topic_names: Vec<String>,
        class_ids: Vec<String>,
        dictionary_name: Option<String>,
    ) -> Self {
        Self {
            topic_names,
            class_ids,
            dictionary_name,
        }
    }
}

impl Regularizer for SmoothSparsePhi {
    fn regularize_phi(
        &self,
        ctx: &PhiContext<'_>,
        tau: f32,
        candidate: &mut TopicModel,
    ) -> Result<(), String> {
        let dictionary = match &self.dictionary_name {
            Some(name) => Some(
                ctx.dictionaries
                    .get(name)
                    .ok_or_else(|| format!("dictionary {name} not found"))?,
            ),
            None => None,
        };

        let mask = topic_mask(candidate.topic_names(), &self.topic_names);

        for w in 0..candidate.num_tokens() {
            let token = &candidate.tokens()[w];
            if !class_selected(&self.class_ids, token) {
                continue;
            }

            let coef = match dictionary {
                Some(dictionary) => match dictionary.entry(token) {
                    Some(entry) => entry.value,
                    None => continue,
                },
                None => 1.,
            };

            let increment = tau * coef;
            candidate
                .row_mut(w)
                .iter_mut()
                .zip(&mask)
                .filter(|(_, selected)| **selected)
                .for_each(|(v, _)| *v += increment);
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
    fn adds_tau_to_selected_topics() {
        let tokens = vec![Token::keyword("a"), Token::new("@labels", "x")];
        let nwt = TopicModel::zeros("nwt", vec!["t0".into(), "t1".into()], tokens).unwrap();
        let mut candidate = nwt.clone();
        let dictionaries = HashMap::new();
        let ctx = PhiContext {
            pwt: &nwt,
            nwt: &nwt,
            dictionaries: &dictionaries,
        };

        SmoothSparsePhi::new(vec!["t1".into()], vec![messages::DEFAULT_CLASS.into()], None)
            .regularize_phi(&ctx, 0.5, &mut candidate)
            .unwrap();

        assert_eq!(candidate.row(0), [0., 0.5]);
        assert_eq!(candidate.row(1), [0., 0.]);
    }

    #[test]
    fn missing_dictionary_fails() {
        let nwt = TopicModel::zeros("nwt", vec!["t".into()], vec![Token::keyword("a")]).unwrap();
        let mut candidate = nwt.clone();
        let dictionaries = HashMap::new();
        let ctx = PhiContext {
            pwt: &nwt,
            nwt: &nwt,
            dictionaries: &dictionaries,
        };

        let err = SmoothSparsePhi::new(Vec::new(), Vec::new(), Some("gone".into()))
            .regularize_phi(&ctx, 1., &mut candidate)
            .unwrap_err();
        assert!(err.contains("gone"));
    }
}
