use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Uniform};

use super::ParamGen;
use crate::error::{EngineErr, Result};

/// A parameter generator that follows a certain probabilistic distribution.
pub struct RandParamGen<R: Rng, D: Distribution<f32>> {
    rng: R,
    distribution: D,
    remaining: usize,
}

impl<R: Rng, D: Distribution<f32>> RandParamGen<R, D> {
    /// Creates a new `RandParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `distribution` - The distribution to sample the random numbers from.
    /// * `limit` - The maximum amount of numbers to generate.
    pub fn new(rng: R, distribution: D, limit: usize) -> Self {
        Self {
            rng,
            distribution,
            remaining: limit,
        }
    }
}

impl RandParamGen<StdRng, Uniform<f32>> {
    /// Creates a new seeded `RandParamGen` with a uniform distribution.
    ///
    /// The same seed always yields the same sequence of weights.
    ///
    /// # Arguments
    /// * `seed` - The seed of the random number generator.
    /// * `limit` - The maximum amount of numbers to generate.
    /// * `low` - The inclusive lower limit.
    /// * `high` - The exclusive upper limit.
    ///
    /// # Returns
    /// An `InvalidConfig` error if the range is invalid.
    pub fn seeded_uniform(seed: u64, limit: usize, low: f32, high: f32) -> Result<Self> {
        let distribution = Uniform::new(low, high)
            .map_err(|e| EngineErr::invalid(format!("invalid initialization range: {e}")))?;

        Ok(Self::new(StdRng::seed_from_u64(seed), distribution, limit))
    }
}

impl<R: Rng, D: Distribution<f32>> ParamGen for RandParamGen<R, D> {
    fn fill_row(&mut self, row: &mut [f32]) -> bool {
        if self.remaining < row.len() {
            return false;
        }

        self.remaining -= row.len();
        for (w, v) in row.iter_mut().zip((&self.distribution).sample_iter(&mut self.rng)) {
            *w = v;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_weights() {
        let mut a = RandParamGen::seeded_uniform(7, 10, 0., 1.).unwrap();
        let mut b = RandParamGen::seeded_uniform(7, 10, 0., 1.).unwrap();
        let (mut row_a, mut row_b) = ([0.; 10], [0.; 10]);

        assert!(a.fill_row(&mut row_a));
        assert!(b.fill_row(&mut row_b));
        assert_eq!(row_a, row_b);
        assert!(row_a.iter().all(|v| (0. ..1.).contains(v)));
        assert!(!a.fill_row(&mut [0.; 1]));
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(RandParamGen::seeded_uniform(0, 1, 1., 0.).is_err());
    }
}
