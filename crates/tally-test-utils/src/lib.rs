//! Test fixtures for Tally development.
//!
//! Provides the tap-counter key and value types, a summing aggregator,
//! and a [`RecordingAggregator`] that remembers every eviction so tests
//! can assert on exactly what left the ring.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{CountKey, CountValue, RecordingAggregator, SumAggregator};

use tally_core::Timestamp;

/// Shorthand for `Timestamp(secs)`.
pub fn ts(secs: u64) -> Timestamp {
    Timestamp(secs)
}
