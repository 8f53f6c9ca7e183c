use super::{Regularizer, ThetaHook, regularizer::topic_mask};

/// Adds `tau` to the topic counters of every document on each inner iteration,
/// optionally scaled per iteration.
#[derive(Debug)]
pub struct SmoothSparseTheta {
    topic_names: Vec<String>,
    alpha_iter: Vec<f32>,
}

impl SmoothSparseTheta {
    pub fn new(topic_names: Vec<String>, alpha_iter: Vec<f32>) -> Self {
        Self {
            topic_names,
            alpha_iter,
        }
    }
}

impl Regularizer for SmoothSparseTheta {
    fn theta_hook(&self, topic_names: &[String], tau: f32) -> Option<ThetaHook> {
        let increments = topic_mask(topic_names, &self.topic_names)
            .into_iter()
            .map(|selected| if selected { tau } else { 0. })
            .collect();

        Some(ThetaHook {
            increments,
            alpha_iter: self.alpha_iter.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_targets_selected_topics() {
        let topics = ["t0".to_string(), "t1".to_string()];
        let hook = SmoothSparseTheta::new(vec!["t0".into()], vec![0.5])
            .theta_hook(&topics, 2.)
            .unwrap();

        assert_eq!(hook.increments, [2., 0.]);
        assert_eq!(hook.alpha(0), 0.5);
        assert_eq!(hook.alpha(3), 1.);
    }
}
