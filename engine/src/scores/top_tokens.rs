use messages::data::{ScoreData, TopicTokens};

use super::{Score, ScoreInputs};
use crate::storage::TopicModel;

/// The `num_tokens` heaviest tokens of every topic, ties broken by token order.
#[derive(Debug)]
pub struct TopTokens {
    num_tokens: usize,
    class_id: Option<String>,
}

impl TopTokens {
    pub fn new(num_tokens: usize, class_id: Option<String>) -> Self {
        Self {
            num_tokens,
            class_id,
        }
    }
}

impl Score for TopTokens {
    fn inputs(&self) -> ScoreInputs {
        ScoreInputs::Phi
    }

    fn empty(&self) -> ScoreData {
        ScoreData::TopTokens { topics: Vec::new() }
    }

    fn compute_phi(&self, pwt: &TopicModel) -> ScoreData {
        let rows: Vec<usize> = (0..pwt.num_tokens())
            .filter(|&w| {
                self.class_id
                    .as_ref()
                    .is_none_or(|c| *c == pwt.tokens()[w].class_id)
            })
            .collect();

        let topics = pwt
            .topic_names()
            .iter()
            .enumerate()
            .map(|(t, topic_name)| {
                let mut ranked = rows.clone();
                ranked.sort_by(|&a, &b| {
                    pwt.row(b)[t]
                        .total_cmp(&pwt.row(a)[t])
                        .then_with(|| pwt.tokens()[a].cmp(&pwt.tokens()[b]))
                });
                ranked.truncate(self.num_tokens);

                TopicTokens {
                    topic_name: topic_name.clone(),
                    keywords: ranked.iter().map(|&w| pwt.tokens()[w].keyword.clone()).collect(),
                    weights: ranked.iter().map(|&w| pwt.row(w)[t]).collect(),
                }
            })
            .collect();

        ScoreData::TopTokens { topics }
    }
}
