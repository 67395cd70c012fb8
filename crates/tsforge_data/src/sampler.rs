//! Window orderings for loaders.

use rand::seq::SliceRandom;

use tsforge_core::Seed;

/// Produces the window order for one epoch.
pub trait Sampler: Send + Sync {
    /// Window indices to visit this epoch, each of `0..n_windows` once.
    fn epoch_indices(&mut self, n_windows: usize) -> Vec<usize>;
}

/// Visits windows in dataset order. Used for inference.
#[derive(Debug, Clone, Default)]
pub struct SequentialSampler;

impl Sampler for SequentialSampler {
    fn epoch_indices(&mut self, n_windows: usize) -> Vec<usize> {
        (0..n_windows).collect()
    }
}

/// Shuffles windows, with a fresh permutation every epoch.
///
/// Epoch `k` draws from a stream derived from the seed and `k`, so a run can
/// be replayed epoch by epoch from the seed alone.
#[derive(Debug, Clone)]
pub struct RandomSampler {
    seed: Seed,
    epoch: u64,
}

impl RandomSampler {
    /// Create a sampler replaying the permutations of `seed`.
    #[must_use]
    pub fn new(seed: Seed) -> Self {
        Self { seed, epoch: 0 }
    }

    /// Create a sampler seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(Seed::from_entropy())
    }

    /// Number of epochs sampled so far.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl Sampler for RandomSampler {
    fn epoch_indices(&mut self, n_windows: usize) -> Vec<usize> {
        let mut rng = self.seed.derive(&format!("epoch-{}", self.epoch)).to_rng();
        self.epoch += 1;

        let mut order: Vec<usize> = (0..n_windows).collect();
        order.shuffle(&mut rng);
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_order() {
        assert_eq!(SequentialSampler.epoch_indices(4), vec![0, 1, 2, 3]);
        assert!(SequentialSampler.epoch_indices(0).is_empty());
    }

    #[test]
    fn test_same_seed_replays_epochs() {
        let mut a = RandomSampler::new(Seed::new(42));
        let mut b = RandomSampler::new(Seed::new(42));
        for _ in 0..3 {
            assert_eq!(a.epoch_indices(20), b.epoch_indices(20));
        }
        assert_eq!(a.epoch(), 3);
    }

    #[test]
    fn test_each_epoch_is_a_new_permutation() {
        let mut sampler = RandomSampler::new(Seed::new(7));
        let first = sampler.epoch_indices(100);
        let second = sampler.epoch_indices(100);
        assert_ne!(first, second);

        let mut sorted = second;
        sorted.sort_unstable();
        assert_eq!(sorted, (0..100).collect::<Vec<_>>());
    }
}
