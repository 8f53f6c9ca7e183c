use std::{collections::HashMap, fmt::Debug, sync::Arc};

use messages::data::Token;

use crate::{dictionary::Dictionary, storage::TopicModel};

/// What a phi regularizer gets to see besides the candidate it transforms.
pub struct PhiContext<'a> {
    /// The normalized model the candidate counters were inferred against.
    pub pwt: &'a TopicModel,
    /// The merged counters before any regularizer ran.
    pub nwt: &'a TopicModel,
    /// The dictionaries of the master when the invocation started.
    pub dictionaries: &'a HashMap<String, Arc<Dictionary>>,
}

impl PhiContext<'_> {
    /// The normalized weights of `token`, `None` when `pwt` doesn't know it.
    pub fn pwt_row(&self, token: &Token) -> Option<&[f32]> {
        self.pwt.token_id(token).map(|w| self.pwt.row(w))
    }
}

/// An additive term applied to every document's topic counters on each inner iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ThetaHook {
    /// The per topic increment, already scaled by the regularizer's tau.
    pub increments: Vec<f32>,
    /// Per iteration multipliers, iterations past its end use one.
    pub alpha_iter: Vec<f32>,
}

impl ThetaHook {
    pub fn alpha(&self, pass: usize) -> f32 {
        self.alpha_iter.get(pass).copied().unwrap_or(1.)
    }
}

/// A named transform biasing the topic model during training.
///
/// Phi regularizers add their increments to the candidate counters after the
/// statistics of a pass are merged and before the candidate is normalized.
/// Theta regularizers adjust the per document inference of the batch processor.
pub trait Regularizer: Send + Sync + Debug {
    /// Adds the regularizer's increments to `candidate`.
    ///
    /// # Arguments
    /// * `ctx` - The models and dictionaries the increments are computed from.
    /// * `tau` - The coefficient of the regularizer.
    /// * `candidate` - The not yet published counters, laid out like `ctx.nwt`.
    ///
    /// # Returns
    /// A description of the problem if the regularizer rejects its input.
    fn regularize_phi(
        &self,
        ctx: &PhiContext<'_>,
        tau: f32,
        candidate: &mut TopicModel,
    ) -> Result<(), String> {
        let _ = (ctx, tau, candidate);
        Ok(())
    }

    /// The hook this regularizer applies during document inference, if any.
    fn theta_hook(&self, topic_names: &[String], tau: f32) -> Option<ThetaHook> {
        let _ = (topic_names, tau);
        None
    }
}

/// Whether each of `topic_names` is selected, an empty selection selects all of them.
pub(super) fn topic_mask(topic_names: &[String], selected: &[String]) -> Vec<bool> {
    topic_names
        .iter()
        .map(|t| selected.is_empty() || selected.contains(t))
        .collect()
}

pub(super) fn class_selected(class_ids: &[String], token: &Token) -> bool {
    class_ids.is_empty() || class_ids.contains(&token.class_id)
}
