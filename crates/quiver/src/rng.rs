//! Seeded randomness for the simulator.
//!
//! Randomness enters evaluation only through `oneOf` and `actionAny`. The
//! generator is owned by the evaluation context rather than pulled from a
//! global, and the seed is always recorded so a failing run can be replayed
//! deterministically.

use num_bigint::{BigInt, BigUint};
use num_traits::{ToPrimitive, Zero};
use rand::{Rng as _, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Replayable pseudo-random generator with an exposed seed.
#[derive(Debug, Clone)]
pub struct Rng {
    seed: u64,
    inner: ChaCha8Rng,
}

impl Rng {
    /// Creates a generator from an explicit seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Creates a generator from OS entropy, still recording the seed.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    /// The seed this generator was built from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform `f64` in `[0, 1)`, built from the top 53 bits of one draw.
    pub fn next_f64(&mut self) -> f64 {
        (self.inner.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform integer in `[0, bound)`.
    ///
    /// Bounds above `u64::MAX` (powersets, set-of-maps) are sampled by
    /// rejection over the bound's bit length, which keeps the distribution
    /// exactly uniform.
    ///
    /// # Panics
    /// Panics if `bound` is not positive; callers check for empty sets first.
    pub fn next_index(&mut self, bound: &BigInt) -> BigInt {
        let magnitude = bound.to_biguint().expect("next_index bound must be positive");
        assert!(!magnitude.is_zero(), "next_index bound must be positive");
        if let Some(small) = magnitude.to_u64() {
            return BigInt::from(self.inner.gen_range(0..small));
        }
        let bits = magnitude.bits();
        let nbytes = usize::try_from(bits.div_ceil(8)).expect("bound bit length fits usize");
        let excess = (8 * nbytes as u64 - bits) as u32;
        let mut buf = vec![0u8; nbytes];
        loop {
            self.inner.fill_bytes(&mut buf);
            buf[nbytes - 1] &= 0xffu8 >> excess;
            let candidate = BigUint::from_bytes_le(&buf);
            if candidate < magnitude {
                return BigInt::from(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Rng::new(17);
        let mut b = Rng::new(17);
        for _ in 0..32 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
        }
    }

    #[test]
    fn f64_stays_in_unit_interval() {
        let mut rng = Rng::new(3);
        for _ in 0..1000 {
            let x = rng.next_f64();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn big_index_stays_below_bound() {
        let mut rng = Rng::new(9);
        let bound = BigInt::from(1u8) << 130;
        for _ in 0..50 {
            let idx = rng.next_index(&bound);
            assert!(idx >= BigInt::from(0) && idx < bound);
        }
    }
}
