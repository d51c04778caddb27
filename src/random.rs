//! Random source abstraction for level sampling.
//!
//! The level distribution needs a uniform value in `(0, 1)`; the index takes
//! it from a [`RandomSource`] so deterministic seeding stays testable. Any
//! [`rand::RngCore`] qualifies through the blanket impl.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Source of uniform 63-bit non-negative integers.
pub trait RandomSource: Send {
    /// Returns a uniform value in `[0, 2^63)`.
    fn next_i63(&mut self) -> i64;
}

impl<R: RngCore + Send> RandomSource for R {
    #[inline]
    fn next_i63(&mut self) -> i64 {
        (self.next_u64() >> 1) as i64
    }
}

/// Entropy-seeded default source.
pub(crate) fn default_source() -> StdRng {
    StdRng::from_entropy()
}
