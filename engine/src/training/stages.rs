use std::sync::Arc;

use log::warn;
use messages::args::{MergeModelArgs, NormalizeModelArgs, RegularizeModelArgs};

use super::{TrainPhase, Trainer};
use crate::{
    error::{EngineErr, Result},
    regularization::PhiContext,
    storage::TopicModel,
};

impl Trainer {
    /// Publishes the weighted sum of several counter models as `nwt_target_name`.
    ///
    /// The target takes the vocabulary of the first source and the requested
    /// topics, tokens missing from a source don't receive anything from it.
    ///
    /// # Returns
    /// The published model, a `NotFound` error for unknown models or topics, or an
    /// `InvalidConfig` error without sources.
    pub fn merge_model(&self, args: &MergeModelArgs) -> Result<Arc<TopicModel>> {
        let sources = args
            .nwt_sources
            .iter()
            .map(|source| {
                if !source.weight.is_finite() {
                    return Err(EngineErr::invalid(format!(
                        "model {} has a non finite weight",
                        source.name
                    )));
                }
                Ok((self.models.get(&source.name)?, source.weight))
            })
            .collect::<Result<Vec<_>>>()?;

        let Some((first, _)) = sources.first() else {
            return Err(EngineErr::invalid("merging needs at least one source model"));
        };
        self.enter(TrainPhase::Reducing, first.version());

        let topic_names = if args.topic_names.is_empty() {
            first.topic_names().to_vec()
        } else {
            args.topic_names.clone()
        };
        let mut target = TopicModel::zeros(
            args.nwt_target_name.as_str(),
            topic_names.clone(),
            first.tokens().to_vec(),
        )?;

        for (source, weight) in &sources {
            let columns = topic_names
                .iter()
                .map(|name| {
                    source
                        .topic_id(name)
                        .ok_or_else(|| EngineErr::not_found("topic", name.as_str()))
                })
                .collect::<Result<Vec<_>>>()?;

            for w in 0..target.num_tokens() {
                let Some(sw) = source.token_id(&target.tokens()[w]) else {
                    continue;
                };

                let row = source.row(sw);
                target
                    .row_mut(w)
                    .iter_mut()
                    .zip(&columns)
                    .for_each(|(v, &t)| *v += weight * row[t]);
            }
        }

        Ok(self.models.publish(target))
    }

    /// Publishes the increments of the selected regularizers as `rwt_target_name`.
    ///
    /// # Returns
    /// The published increments, a `NotFound` error for unknown models or
    /// regularizers, or a `RegularizationFailed` error.
    pub fn regularize_model(&self, args: &RegularizeModelArgs) -> Result<Arc<TopicModel>> {
        let pwt = self.models.get(&args.pwt_source_name)?;
        let nwt = self.models.get(&args.nwt_source_name)?;

        if pwt.topic_names() != nwt.topic_names() {
            return Err(EngineErr::invalid(format!(
                "models {} and {} have different topics",
                pwt.name(),
                nwt.name()
            )));
        }

        self.enter(TrainPhase::Regularizing, nwt.version());
        let mut rwt = TopicModel::clone(&nwt);
        let ctx = PhiContext {
            pwt: &pwt,
            nwt: &nwt,
            dictionaries: &self.dictionaries,
        };
        self.settings
            .regularizers
            .regularize_phi(&ctx, &args.regularizer_names, &mut rwt)?;

        rwt.values_mut()
            .iter_mut()
            .zip(nwt.values())
            .for_each(|(r, &n)| *r -= n);
        rwt.set_name(args.rwt_target_name.as_str());

        Ok(self.models.publish(rwt))
    }

    /// Publishes `normalize(nwt + rwt)` as `pwt_target_name`.
    ///
    /// # Returns
    /// The published model, a `NotFound` error for unknown models or an
    /// `InvalidConfig` error if the increments don't match the counters.
    pub fn normalize_model(&self, args: &NormalizeModelArgs) -> Result<Arc<TopicModel>> {
        let nwt = self.models.get(&args.nwt_source_name)?;
        self.enter(TrainPhase::Normalizing, nwt.version());

        let mut pwt = TopicModel::clone(&nwt);
        if let Some(name) = &args.rwt_source_name {
            let rwt = self.models.get(name)?;
            if !rwt.same_layout(&nwt) {
                return Err(EngineErr::invalid(format!(
                    "model {name} is not laid out like {}",
                    nwt.name()
                )));
            }

            pwt.values_mut()
                .iter_mut()
                .zip(rwt.values())
                .for_each(|(p, &r)| *p += r);
        }

        let dead = pwt.normalize();
        if !dead.is_empty() {
            warn!(master_id = self.master_id; "reinitialized {} dead topics uniformly", dead.len());
        }
        pwt.set_name(args.pwt_target_name.as_str());

        let pwt = self.models.publish(pwt);
        self.enter(TrainPhase::Published, pwt.version());
        Ok(pwt)
    }
}
