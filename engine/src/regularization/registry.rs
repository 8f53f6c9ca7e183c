use std::collections::HashSet;

use messages::{
    data::RegularizerInfo,
    specs::{RegularizerConfig, RegularizerKind},
};

use super::{
    DecorrelatorPhi, PhiContext, Regularizer, SmoothSparsePhi, SmoothSparseTheta, ThetaHook,
};
use crate::{
    error::{EngineErr, Result},
    storage::TopicModel,
};

#[derive(Debug)]
struct Entry {
    config: RegularizerConfig,
    regularizer: Box<dyn Regularizer>,
}

/// The regularizers of a master component in registration order.
#[derive(Debug, Default)]
pub struct RegularizerSet {
    entries: Vec<Entry>,
}

impl RegularizerSet {
    /// Builds the regularizers described by `configs`.
    ///
    /// # Returns
    /// The set or an `InvalidConfig` error on repeated names or non finite coefficients.
    pub fn from_configs(configs: &[RegularizerConfig]) -> Result<Self> {
        let mut names = HashSet::with_capacity(configs.len());

        let entries = configs
            .iter()
            .map(|config| {
                if config.name.is_empty() {
                    return Err(EngineErr::invalid("a regularizer needs a non empty name"));
                }

                if !names.insert(config.name.as_str()) {
                    return Err(EngineErr::invalid(format!(
                        "repeated regularizer name {}",
                        config.name
                    )));
                }

                if !config.tau.is_finite() {
                    return Err(EngineErr::invalid(format!(
                        "regularizer {} has a non finite tau",
                        config.name
                    )));
                }

                Ok(Entry {
                    config: config.clone(),
                    regularizer: build(&config.kind)?,
                })
            })
            .collect::<Result<_>>()?;

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.config.name == name)
    }

    /// The theta hooks of every regularizer, in registration order.
    pub fn theta_hooks(&self, topic_names: &[String]) -> Vec<ThetaHook> {
        self.entries
            .iter()
            .filter_map(|e| e.regularizer.theta_hook(topic_names, e.config.tau))
            .collect()
    }

    /// Runs the phi regularizers over `candidate` in registration order, each one
    /// sees the output of the previous ones.
    ///
    /// # Arguments
    /// * `ctx` - The inputs shared by every regularizer.
    /// * `names` - The regularizers to run, empty runs all of them.
    /// * `candidate` - The counters to transform.
    ///
    /// # Returns
    /// A `NotFound` error for unknown names or a `RegularizationFailed` error if a
    /// regularizer rejects its input or produces non finite weights.
    pub fn regularize_phi(
        &self,
        ctx: &PhiContext<'_>,
        names: &[String],
        candidate: &mut TopicModel,
    ) -> Result<()> {
        if let Some(name) = names.iter().find(|n| !self.contains(n)) {
            return Err(EngineErr::not_found("regularizer", name.as_str()));
        }

        let selected = self
            .entries
            .iter()
            .filter(|e| names.is_empty() || names.contains(&e.config.name));

        for entry in selected {
            let failed = |reason: String| EngineErr::RegularizationFailed {
                regularizer: entry.config.name.clone(),
                reason,
            };

            entry
                .regularizer
                .regularize_phi(ctx, entry.config.tau, candidate)
                .map_err(failed)?;

            if candidate.values().iter().any(|v| !v.is_finite()) {
                return Err(failed("produced non finite weights".to_string()));
            }
        }

        Ok(())
    }

    pub fn infos(&self) -> Vec<RegularizerInfo> {
        self.entries
            .iter()
            .map(|e| RegularizerInfo {
                name: e.config.name.clone(),
                kind: e.config.kind.type_name().to_string(),
                tau: e.config.tau,
            })
            .collect()
    }
}

fn build(kind: &RegularizerKind) -> Result<Box<dyn Regularizer>> {
    let regularizer: Box<dyn Regularizer> = match kind.clone() {
        RegularizerKind::SmoothSparsePhi {
            topic_names,
            class_ids,
            dictionary_name,
        } => Box::new(SmoothSparsePhi::new(topic_names, class_ids, dictionary_name)),
        RegularizerKind::SmoothSparseTheta {
            topic_names,
            alpha_iter,
        } => {
            if alpha_iter.iter().any(|a| !a.is_finite()) {
                return Err(EngineErr::invalid("alpha_iter must be finite"));
            }
            Box::new(SmoothSparseTheta::new(topic_names, alpha_iter))
        }
        RegularizerKind::DecorrelatorPhi {
            topic_names,
            class_ids,
        } => Box::new(DecorrelatorPhi::new(topic_names, class_ids)),
    };

    Ok(regularizer)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use messages::data::Token;

    use super::*;

    fn smooth(name: &str, tau: f32) -> RegularizerConfig {
        RegularizerConfig {
            name: name.into(),
            tau,
            kind: RegularizerKind::SmoothSparsePhi {
                topic_names: Vec::new(),
                class_ids: Vec::new(),
                dictionary_name: None,
            },
        }
    }

    #[test]
    fn repeated_names_are_rejected() {
        let err = RegularizerSet::from_configs(&[smooth("a", 1.), smooth("a", 2.)]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidConfig);
    }

    #[test]
    fn regularizers_run_in_order() {
        let set = RegularizerSet::from_configs(&[smooth("a", 1.), smooth("b", -3.)]).unwrap();
        let nwt = TopicModel::zeros("nwt", vec!["t".into()], vec![Token::keyword("w")]).unwrap();
        let mut candidate = nwt.clone();
        let dictionaries = HashMap::new();
        let ctx = PhiContext {
            pwt: &nwt,
            nwt: &nwt,
            dictionaries: &dictionaries,
        };

        set.regularize_phi(&ctx, &["a".to_string()], &mut candidate)
            .unwrap();
        assert_eq!(candidate.row(0), [1.]);

        set.regularize_phi(&ctx, &[], &mut candidate).unwrap();
        assert_eq!(candidate.row(0), [-1.]);

        let err = set
            .regularize_phi(&ctx, &["c".to_string()], &mut candidate)
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }

    #[test]
    fn overflow_fails_the_regularizer() {
        let set = RegularizerSet::from_configs(&[smooth("huge", f32::MAX)]).unwrap();
        let mut nwt =
            TopicModel::zeros("nwt", vec!["t".into()], vec![Token::keyword("w")]).unwrap();
        nwt.row_mut(0)[0] = f32::MAX;
        let mut candidate = nwt.clone();
        let dictionaries = HashMap::new();
        let ctx = PhiContext {
            pwt: &nwt,
            nwt: &nwt,
            dictionaries: &dictionaries,
        };

        let err = set.regularize_phi(&ctx, &[], &mut candidate).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::RegularizationFailed);
    }
}
