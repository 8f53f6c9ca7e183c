use std::ops::Range;

use messages::args::FitOnlineMasterModelArgs;

use crate::error::{EngineErr, Result};

/// A group of consecutive batches merged into the model at once.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateGroup {
    pub batches: Range<usize>,
    /// The weight of the group's counters.
    pub apply_weight: f32,
    /// The weight of the previously accumulated counters.
    pub decay_weight: f32,
}

/// Splits `num_batches` batches into update groups.
///
/// Explicit `update_after` boundaries take their weights from `apply_weight` and
/// `decay_weight`. Otherwise every `update_every` batches form a group whose
/// weights follow `rho = (tau0 + k) ^ -kappa` for the `k`-th update, applying
/// `rho` and decaying by `1 - rho`.
///
/// # Returns
/// The groups or an `InvalidConfig` error on inconsistent arguments.
pub fn online_schedule(
    args: &FitOnlineMasterModelArgs,
    num_batches: usize,
) -> Result<Vec<UpdateGroup>> {
    if num_batches == 0 {
        return Err(EngineErr::invalid("an online fit needs at least one batch"));
    }

    if args.update_after.is_empty() {
        return automatic(args, num_batches);
    }

    let n = args.update_after.len();
    if args.apply_weight.len() != n || args.decay_weight.len() != n {
        return Err(EngineErr::invalid(format!(
            "update_after has {n} entries but apply_weight has {} and decay_weight {}",
            args.apply_weight.len(),
            args.decay_weight.len()
        )));
    }

    if args.update_after.last() != Some(&num_batches) {
        return Err(EngineErr::invalid(format!(
            "update_after must end at the amount of batches, {num_batches}"
        )));
    }

    let mut start = 0;
    let mut groups = Vec::with_capacity(n);

    for (i, &end) in args.update_after.iter().enumerate() {
        if end <= start {
            return Err(EngineErr::invalid("update_after must be strictly increasing"));
        }

        let (apply_weight, decay_weight) = (args.apply_weight[i], args.decay_weight[i]);
        if [apply_weight, decay_weight].iter().any(|w| !w.is_finite() || *w < 0.) {
            return Err(EngineErr::invalid("update weights must be finite and non negative"));
        }

        groups.push(UpdateGroup {
            batches: start..end,
            apply_weight,
            decay_weight,
        });
        start = end;
    }

    Ok(groups)
}

fn automatic(args: &FitOnlineMasterModelArgs, num_batches: usize) -> Result<Vec<UpdateGroup>> {
    if args.update_every == 0 {
        return Err(EngineErr::invalid("update_every must be positive"));
    }

    if !(args.tau0.is_finite() && args.tau0 > 0.) || !(args.kappa.is_finite() && args.kappa >= 0.) {
        return Err(EngineErr::invalid("tau0 must be positive and kappa non negative"));
    }

    let groups = (0..num_batches)
        .step_by(args.update_every)
        .enumerate()
        .map(|(k, start)| {
            let rho = (args.tau0 + k as f32).powf(-args.kappa).min(1.);
            UpdateGroup {
                batches: start..(start + args.update_every).min(num_batches),
                apply_weight: rho,
                decay_weight: 1. - rho,
            }
        })
        .collect();

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn automatic_groups_follow_the_decay_schedule() {
        let args = FitOnlineMasterModelArgs {
            update_every: 2,
            tau0: 1.,
            kappa: 1.,
            ..Default::default()
        };

        let groups = online_schedule(&args, 5).unwrap();

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[2].batches, 4..5);
        assert_eq!((groups[0].apply_weight, groups[0].decay_weight), (1., 0.));
        assert_eq!((groups[1].apply_weight, groups[1].decay_weight), (0.5, 0.5));
    }

    #[test]
    fn explicit_groups_use_the_given_weights() {
        let args = FitOnlineMasterModelArgs {
            update_after: vec![1, 3],
            apply_weight: vec![1., 0.5],
            decay_weight: vec![0., 0.75],
            ..Default::default()
        };

        let groups = online_schedule(&args, 3).unwrap();

        assert_eq!(groups[1].batches, 1..3);
        assert_eq!(groups[1].decay_weight, 0.75);
    }

    #[test]
    fn inconsistent_boundaries_are_rejected() {
        let args = FitOnlineMasterModelArgs {
            update_after: vec![2, 2],
            apply_weight: vec![1., 1.],
            decay_weight: vec![0., 0.],
            ..Default::default()
        };
        assert!(online_schedule(&args, 2).is_err());

        let args = FitOnlineMasterModelArgs {
            update_after: vec![1],
            apply_weight: vec![1.],
            decay_weight: vec![0.],
            ..Default::default()
        };
        assert!(online_schedule(&args, 2).is_err());
    }
}
