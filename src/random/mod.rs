//! Injectable randomness.
//!
//! Every random draw the engine makes goes through a [`RandomSource`] that the caller passes
//! in, never through a process-wide generator. Two runs over the same graph and parameters
//! that are handed identically seeded sources produce identical days.
//!
//! [`SeededRandom`] is the default source. Like named random streams elsewhere, its seed is the
//! caller's base seed offset by a hash of the stream name, so independent streams derived from
//! one base seed do not share a sequence.
mod sampling_algorithms;

use log::trace;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::hashing::hash_str;

pub use sampling_algorithms::{sample_indexes, sample_multiple_from_known_length};

/// The name of the stream used by [`SeededRandom::new`].
pub const DEFAULT_STREAM: &str = "SpreadRng";

/// A uniform random generator the engine draws from.
///
/// Implementors only need [`RandomSource::uniform`] and [`RandomSource::index`]; the other
/// draws are derived from them.
pub trait RandomSource {
    /// Returns a uniformly distributed value in `[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// Returns a uniformly distributed integer in `[0, upper)`. `upper` must be positive.
    fn index(&mut self, upper: usize) -> usize;

    /// Returns a uniformly distributed value in `[low, high)`, or `low` when the range is
    /// empty. Always consumes exactly one draw.
    fn uniform_range(&mut self, low: f64, high: f64) -> f64 {
        let u = self.uniform();
        if high <= low {
            return low;
        }
        low + (high - low) * u
    }

    /// Returns `true` with probability `p`. A `p` of zero never succeeds and a `p` of one
    /// always does.
    fn bernoulli(&mut self, p: f64) -> bool {
        self.uniform() < p
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn uniform(&mut self) -> f64 {
        (**self).uniform()
    }

    fn index(&mut self, upper: usize) -> usize {
        (**self).index(upper)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn uniform(&mut self) -> f64 {
        (**self).uniform()
    }

    fn index(&mut self, upper: usize) -> usize {
        (**self).index(upper)
    }
}

/// A [`RandomSource`] backed by a seeded `SmallRng`.
#[derive(Clone, Debug)]
pub struct SeededRandom {
    base_seed: u64,
    name: &'static str,
    rng: SmallRng,
}

impl SeededRandom {
    /// Creates the default stream for `base_seed`.
    #[must_use]
    pub fn new(base_seed: u64) -> Self {
        SeededRandom::named(base_seed, DEFAULT_STREAM)
    }

    /// Creates an independent stream for `base_seed`, keyed by `name`.
    #[must_use]
    pub fn named(base_seed: u64, name: &'static str) -> Self {
        trace!("creating new RNG (seed={base_seed}) for stream {name}");
        let seed_offset = hash_str(name);
        SeededRandom {
            base_seed,
            name,
            rng: SmallRng::seed_from_u64(base_seed.wrapping_add(seed_offset)),
        }
    }

    /// Restarts the stream from its original seed.
    pub fn reset(&mut self) {
        *self = SeededRandom::named(self.base_seed, self.name);
    }

    #[must_use]
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }
}

impl RandomSource for SeededRandom {
    fn uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    fn index(&mut self, upper: usize) -> usize {
        // This little trick with `u32` keeps the draw cheap for realistic graph sizes.
        if let Ok(upper) = u32::try_from(upper) {
            return self.rng.random_range(0..upper) as usize;
        }
        self.rng.random_range(0..upper)
    }
}
