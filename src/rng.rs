//! Non-cryptographic randomness for retransmission timing.
//!
//! Seeding through [`Config::rng_seed`](crate::Config::rng_seed) makes flight
//! jitter reproducible. Key material never comes from here, it comes from
//! the crypto provider.

use rand::distributions::{Distribution, Standard};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Config;

/// Jitter source, deterministic when seeded.
///
/// Unseeded it draws from the thread-local generator.
pub struct SeededRng {
    seeded: Option<StdRng>,
}

impl SeededRng {
    pub fn new(seed: Option<u64>) -> Self {
        SeededRng {
            seeded: seed.map(StdRng::seed_from_u64),
        }
    }

    /// Seeded from the config if it carries a seed.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.rng_seed())
    }

    pub fn random<T>(&mut self) -> T
    where
        Standard: Distribution<T>,
    {
        match self.seeded.as_mut() {
            Some(rng) => rng.gen(),
            None => rand::random(),
        }
    }

    /// A value in `[-range / 2, range / 2)`.
    pub fn jitter(&mut self, range: f32) -> f32 {
        self.random::<f32>() * range - range / 2.0
    }
}

impl std::fmt::Debug for SeededRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeededRng")
            .field("seeded", &self.seeded.is_some())
            .finish()
    }
}
