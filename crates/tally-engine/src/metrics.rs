//! Cumulative counters for a time buffer.
//!
//! [`BufferMetrics`] is a point-in-time copy of the buffer's counters
//! plus its layout, suitable for telemetry and capacity planning.
//! Counters are relaxed atomics: each is individually exact, but a
//! snapshot is not a consistent cut across all of them.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a buffer's counters and layout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferMetrics {
    /// Successful `put` calls.
    pub puts: u64,
    /// Puts that created a new key in the current bucket.
    pub inserts: u64,
    /// Puts that merged into an existing key.
    pub merges: u64,
    /// Puts dropped because the current bucket was full.
    pub table_full_rejections: u64,
    /// `tick` calls.
    pub ticks: u64,
    /// Buckets rotated in, counting every skipped interval.
    pub rotations: u64,
    /// Entries reported to `on_evict`.
    pub evicted_entries: u64,
    /// Queries answered.
    pub queries: u64,
    /// `reset_stats` calls.
    pub resets: u64,
    /// Ring length.
    pub bucket_count: usize,
    /// Maximum distinct keys per bucket.
    pub table_capacity: usize,
    /// Bytes accounted to the region.
    pub region_bytes: usize,
}

#[derive(Default)]
pub(crate) struct Counters {
    pub inserts: AtomicU64,
    pub merges: AtomicU64,
    pub table_full_rejections: AtomicU64,
    pub ticks: AtomicU64,
    pub rotations: AtomicU64,
    pub evicted_entries: AtomicU64,
    pub queries: AtomicU64,
    pub resets: AtomicU64,
}

impl Counters {
    /// Increment `counter` by `n`, returning the previous value.
    pub fn bump(counter: &AtomicU64, n: u64) -> u64 {
        counter.fetch_add(n, Ordering::Relaxed)
    }

    pub fn load(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
