use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::error::CipherError;

pub const DEFAULT_MIN: i32 = -255;
pub const DEFAULT_MAX: i32 = 255;

/// Reproducible stream of integers drawn uniformly from `min..=max`.
///
/// Two generators built from the same seed and bounds yield the same sequence.
/// The stream never ends and cannot be rewound; build a new generator to start
/// over.
#[derive(Debug, Clone)]
pub struct ByteGenerator {
    rng: Pcg32,
    min: i32,
    max: i32,
    position: u64,
}

impl ByteGenerator {
    /// Generator over the default `-255..=255` bound.
    #[must_use]
    pub fn new(seed: i64) -> Self {
        Self::build(seed, DEFAULT_MIN, DEFAULT_MAX)
    }

    pub fn with_range(seed: i64, min: i32, max: i32) -> Result<Self, CipherError> {
        if min > max {
            return Err(CipherError::InvalidRange { min, max });
        }
        Ok(Self::build(seed, min, max))
    }

    fn build(seed: i64, min: i32, max: i32) -> Self {
        Self {
            // Negative seeds map to their two's complement bits.
            rng: Pcg32::seed_from_u64(seed as u64),
            min,
            max,
            position: 0,
        }
    }

    pub fn next_value(&mut self) -> i32 {
        self.position += 1;
        self.rng.random_range(self.min..=self.max)
    }

    /// Number of values produced so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    #[must_use]
    pub fn bounds(&self) -> (i32, i32) {
        (self.min, self.max)
    }
}

impl Iterator for ByteGenerator {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        Some(self.next_value())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}
