//! Seeded random number generation for evolution operators.

use rand::distributions::{Distribution, WeightedIndex};
use rand::prelude::*;

/// Random number generator wrapper for genome operations.
///
/// A single instance is owned by the run context so that a fixed
/// `random_seed` reproduces the whole run.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform random value in `[lower, upper]`.
    ///
    /// Returns `lower` for an empty or NaN range. Ranges wider than
    /// `f64::MAX` are sampled by interpolating between the endpoints.
    pub fn uniform(&mut self, lower: f64, upper: f64) -> f64 {
        if lower.is_nan() || upper.is_nan() || lower >= upper {
            return lower;
        }
        if (upper - lower).is_finite() {
            return self.rng.gen_range(lower..=upper);
        }
        let t: f64 = self.rng.r#gen();
        (lower * (1.0 - t) + upper * t).clamp(lower, upper)
    }

    /// Standard normal sample.
    pub fn standard_normal(&mut self) -> f64 {
        self.rng.sample(rand_distr::StandardNormal)
    }

    /// Uniform random index in `0..len`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Draw `count` indices with replacement, with probability proportional
    /// to `weights`. Falls back to uniform sampling when the weights are not
    /// a valid distribution (all zero, negative or non-finite).
    pub fn weighted_indices(&mut self, weights: &[f64], count: usize) -> Vec<usize> {
        if weights.is_empty() {
            return Vec::new();
        }
        match WeightedIndex::new(weights) {
            Ok(dist) => (0..count).map(|_| dist.sample(&mut self.rng)).collect(),
            Err(err) => {
                log::warn!("Invalid selection weights ({err}), sampling uniformly");
                (0..count).map(|_| self.index(weights.len())).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_reproducible() {
        let mut a = GenomeRng::new(42);
        let mut b = GenomeRng::new(42);
        for _ in 0..10 {
            assert_eq!(a.uniform(0.0, 1.0), b.uniform(0.0, 1.0));
            assert_eq!(a.index(100), b.index(100));
        }
    }

    #[test]
    fn test_uniform_in_bounds() {
        let mut rng = GenomeRng::new(1);
        for _ in 0..1000 {
            let v = rng.uniform(-2.0, 3.0);
            assert!((-2.0..=3.0).contains(&v));
        }
        assert_eq!(rng.uniform(1.5, 1.5), 1.5);
        assert_eq!(rng.uniform(0.0, f64::NAN), 0.0);
    }

    #[test]
    fn test_uniform_overflowing_width() {
        let mut rng = GenomeRng::new(3);
        for _ in 0..1000 {
            let v = rng.uniform(-1e308, 1e308);
            assert!(v.is_finite());
            assert!((-1e308..=1e308).contains(&v));
        }
        let v = rng.uniform(f64::MIN, f64::MAX);
        assert!(v.is_finite());
    }

    #[test]
    fn test_weighted_indices_respect_zero_weight() {
        let mut rng = GenomeRng::new(7);
        let picks = rng.weighted_indices(&[0.0, 1.0, 3.0], 500);
        assert_eq!(picks.len(), 500);
        assert!(picks.iter().all(|&i| i != 0));
        let heavy = picks.iter().filter(|&&i| i == 2).count();
        assert!(heavy > 250);
    }

    #[test]
    fn test_weighted_indices_fallback() {
        let mut rng = GenomeRng::new(7);
        let picks = rng.weighted_indices(&[0.0, 0.0], 10);
        assert_eq!(picks.len(), 10);
        assert!(picks.iter().all(|&i| i < 2));
    }
}
