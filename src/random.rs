//! Seeded randomness.
//!
//! Every generation call owns its own generator. With a seed the stream is
//! fully reproducible; without one a fresh seed is drawn once per call.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Generator type used throughout the crate.
pub type MatrixRng = ChaCha8Rng;

/// Creates a deterministic generator from a 64-bit seed.
pub fn create_rng(seed: u64) -> MatrixRng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Seeded generator when `seed` is given, otherwise one seeded from the
/// thread-local entropy source.
pub fn rng_for(seed: Option<u64>) -> MatrixRng {
    match seed {
        Some(seed) => create_rng(seed),
        None => create_rng(rand::random()),
    }
}

/// Draws up to `n` distinct elements without replacement, in draw order.
pub fn pick_n<T: Clone, R: Rng>(items: &[T], n: usize, rng: &mut R) -> Vec<T> {
    let mut remaining: Vec<&T> = items.iter().collect();
    let mut out = Vec::with_capacity(n.min(items.len()));
    while !remaining.is_empty() && out.len() < n {
        let idx = rng.random_range(0..remaining.len());
        out.push(remaining.swap_remove(idx).clone());
    }
    out
}

/// Uniform choice; `None` for an empty slice.
pub fn choose<'a, T, R: Rng>(items: &'a [T], rng: &mut R) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        Some(&items[rng.random_range(0..items.len())])
    }
}
