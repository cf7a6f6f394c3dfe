//! Deterministic uniform stream used to draw obstacle layouts.
//!
//! The stream is ChaCha8 keyed through `seed_from_u64`. Each draw takes the
//! top 53 bits of one `u64` output and scales them by 2^-53, so values are
//! uniform in `[0, 1)` and bit-identical on every platform.

use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};

const UNIT_SCALE: f64 = 1.0 / (1_u64 << 53) as f64;

pub(super) struct UnitStream {
    rng: ChaCha8Rng,
}

impl UnitStream {
    pub(super) fn new(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    pub(super) fn next_unit(&mut self) -> f64 {
        (self.rng.next_u64() >> 11) as f64 * UNIT_SCALE
    }
}
