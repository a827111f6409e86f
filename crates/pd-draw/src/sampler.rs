//! CSPRNG Sampler
//!
//! Uniform permutations and without-replacement samples. The generator must
//! implement [`CryptoRng`]; production draws use the operating system RNG.

use rand::rand_core::UnwrapErr;
use rand::rngs::OsRng;
use rand::{CryptoRng, Rng, TryRngCore};

use pd_core::{DrawError, DrawResult};

/// OS entropy source, panicking only if the OS RNG itself is broken
pub type SystemRng = UnwrapErr<OsRng>;

pub struct DrawSampler<R: CryptoRng = SystemRng> {
    rng: R,
}

impl DrawSampler<SystemRng> {
    /// Sampler backed by the operating system RNG
    pub fn system() -> Self {
        Self::with_rng(OsRng.unwrap_err())
    }
}

impl Default for DrawSampler<SystemRng> {
    fn default() -> Self {
        Self::system()
    }
}

impl<R: CryptoRng> DrawSampler<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// In-place Fisher–Yates shuffle
    pub fn shuffle_permutation<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.rng.random_range(0..=i);
            items.swap(i, j);
        }
    }

    /// Draw `k` distinct elements in draw order.
    ///
    /// Each pick is uniform over the elements still remaining. Fails with
    /// `InsufficientPool` when `k` exceeds the pool.
    pub fn sample_without_replacement<T: Clone>(
        &mut self,
        pool: &[T],
        k: usize,
    ) -> DrawResult<Vec<T>> {
        if k > pool.len() {
            return Err(DrawError::InsufficientPool {
                requested: k,
                available: pool.len(),
            });
        }

        let mut remaining: Vec<T> = pool.to_vec();
        let mut picked = Vec::with_capacity(k);
        for _ in 0..k {
            let index = self.rng.random_range(0..remaining.len());
            picked.push(remaining.swap_remove(index));
        }
        Ok(picked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_shuffle_is_permutation() {
        let mut sampler = DrawSampler::system();
        let original: Vec<u32> = (0..500).collect();
        let mut shuffled = original.clone();
        sampler.shuffle_permutation(&mut shuffled);

        assert_eq!(shuffled.len(), original.len());
        let mut sorted = shuffled.clone();
        sorted.sort();
        assert_eq!(sorted, original);
    }

    #[test]
    fn test_shuffle_trivial_inputs() {
        let mut sampler = DrawSampler::system();
        let mut empty: Vec<u8> = vec![];
        sampler.shuffle_permutation(&mut empty);
        let mut one = vec![7];
        sampler.shuffle_permutation(&mut one);
        assert_eq!(one, vec![7]);
    }

    #[test]
    fn test_sample_distinct_members() {
        let mut sampler = DrawSampler::system();
        let pool: Vec<u32> = (0..50).collect();
        let picked = sampler.sample_without_replacement(&pool, 30).unwrap();

        assert_eq!(picked.len(), 30);
        let unique: HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 30);
        assert!(picked.iter().all(|p| pool.contains(p)));
    }

    #[test]
    fn test_sample_whole_pool() {
        let mut sampler = DrawSampler::system();
        let pool = vec!["a", "b", "c"];
        let mut picked = sampler.sample_without_replacement(&pool, 3).unwrap();
        picked.sort();
        assert_eq!(picked, pool);
    }

    #[test]
    fn test_sample_insufficient_pool() {
        let mut sampler = DrawSampler::system();
        let err = sampler.sample_without_replacement(&[1, 2], 3).unwrap_err();
        assert_eq!(
            err,
            DrawError::InsufficientPool {
                requested: 3,
                available: 2
            }
        );
    }

    #[test]
    fn test_injected_rng_is_reproducible() {
        let pool: Vec<u32> = (0..100).collect();
        let a = DrawSampler::with_rng(StdRng::seed_from_u64(9))
            .sample_without_replacement(&pool, 10)
            .unwrap();
        let b = DrawSampler::with_rng(StdRng::seed_from_u64(9))
            .sample_without_replacement(&pool, 10)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_first_position_roughly_uniform() {
        // 4 items, 4000 shuffles: each item should lead about 1000 times.
        let mut sampler = DrawSampler::system();
        let mut counts = [0usize; 4];
        for _ in 0..4000 {
            let mut items = [0usize, 1, 2, 3];
            sampler.shuffle_permutation(&mut items);
            counts[items[0]] += 1;
        }
        assert!(counts.iter().all(|&c| (800..1200).contains(&c)), "{:?}", counts);
    }
}
