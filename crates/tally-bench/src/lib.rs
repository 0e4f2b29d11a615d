//! Benchmark profiles and workload generators for Tally.
//!
//! - [`tap_counter_profile`]: the default host configuration (10 s
//!   interval, 20 MiB budget)
//! - [`small_profile`]: a 1 MiB, 6-bucket buffer that rotates often
//! - [`KeyStream`]: deterministic key sequence with a hot subset

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tally_engine::BufferConfig;

/// The original tap counter's defaults.
pub fn tap_counter_profile() -> BufferConfig {
    BufferConfig {
        name: "bench_tap_counter".to_string(),
        ..BufferConfig::default()
    }
}

/// 1 MiB budget, six 1-second buckets.
pub fn small_profile() -> BufferConfig {
    BufferConfig {
        name: "bench_small".to_string(),
        interval_secs: 1,
        max_bytes: 1024 * 1024,
        bucket_count: Some(6),
    }
}

/// Deterministic key generator.
///
/// Draws from `0..key_space`; with probability `hot_percent / 100` the
/// key comes from the first `hot_keys` keys instead.
pub struct KeyStream {
    rng: ChaCha8Rng,
    key_space: u32,
    hot_keys: u32,
    hot_percent: u32,
}

impl KeyStream {
    /// Uniform keys over `0..key_space`.
    pub fn uniform(seed: u64, key_space: u32) -> Self {
        Self::skewed(seed, key_space, key_space, 0)
    }

    /// Keys with a hot subset of `hot_keys` receiving `hot_percent`
    /// percent of draws.
    pub fn skewed(seed: u64, key_space: u32, hot_keys: u32, hot_percent: u32) -> Self {
        assert!(key_space > 0, "key_space must be positive");
        assert!(hot_keys > 0 && hot_keys <= key_space, "hot_keys must be in 1..=key_space");
        assert!(hot_percent <= 100, "hot_percent must be <= 100");
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            key_space,
            hot_keys,
            hot_percent,
        }
    }

    /// Next key.
    pub fn next_key(&mut self) -> u32 {
        let roll = self.rng.next_u32() % 100;
        let range = if roll < self.hot_percent {
            self.hot_keys
        } else {
            self.key_space
        };
        self.rng.next_u32() % range
    }

    /// The next `n` keys.
    pub fn take_keys(&mut self, n: usize) -> Vec<u32> {
        (0..n).map(|_| self.next_key()).collect()
    }
}
