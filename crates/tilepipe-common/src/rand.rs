pub use rand::{Rng, SeedableRng, rngs::StdRng};

use alloc::vec::Vec;

use crate::Element;

/// Returns a random number generator seeded with a fixed value.
#[inline(always)]
pub fn get_seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Generates `len` values uniformly distributed in `[-1, 1)`, deterministic for a given seed.
///
/// Integer types receive the rounded values, which keeps them in `{-1, 0, 1}`.
pub fn sample<E: Element>(len: usize, seed: u64) -> Vec<E> {
    let mut rng = get_seeded_rng(seed);
    (0..len)
        .map(|_| E::from_f64(rng.random_range(-1.0..1.0)))
        .collect()
}
