//! Reusable aggregation fixtures.
//!
//! - [`CountKey`] / [`CountValue`]: 4-byte key and value of the tap
//!   counter workload.
//! - [`SumAggregator`]: integer addition, the commutative monoid most
//!   tests use.
//! - [`RecordingAggregator`]: addition plus a log of every eviction.

use std::sync::{Mutex, PoisonError};

use tally_core::Aggregator;

/// Key of the tap counter: one `i32`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountKey {
    pub foo: i32,
}

impl CountKey {
    pub fn new(foo: i32) -> Self {
        Self { foo }
    }
}

/// Value of the tap counter: a running count.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CountValue {
    pub count: i32,
}

impl CountValue {
    pub fn new(count: i32) -> Self {
        Self { count }
    }
}

/// Adds values; ignores evictions.
#[derive(Clone, Copy, Debug, Default)]
pub struct SumAggregator;

impl<K> Aggregator<K, CountValue> for SumAggregator {
    fn combine(&self, acc: &mut CountValue, incoming: &CountValue) {
        acc.count = acc.count.wrapping_add(incoming.count);
    }
}

impl<K> Aggregator<K, u64> for SumAggregator {
    fn combine(&self, acc: &mut u64, incoming: &u64) {
        *acc = acc.wrapping_add(*incoming);
    }
}

/// Adds values and records every `(key, value)` passed to `on_evict`,
/// in call order.
pub struct RecordingAggregator<K, V> {
    evicted: Mutex<Vec<(K, V)>>,
}

impl<K, V> RecordingAggregator<K, V> {
    pub fn new() -> Self {
        Self {
            evicted: Mutex::new(Vec::new()),
        }
    }

    /// Everything evicted so far.
    pub fn evicted(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.lock().clone()
    }

    /// Number of evictions so far.
    pub fn evicted_count(&self) -> usize {
        self.lock().len()
    }

    /// Forget recorded evictions.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(K, V)>> {
        self.evicted.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> Default for RecordingAggregator<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Aggregator<K, CountValue> for RecordingAggregator<K, CountValue>
where
    K: Copy + Send,
{
    fn combine(&self, acc: &mut CountValue, incoming: &CountValue) {
        acc.count = acc.count.wrapping_add(incoming.count);
    }

    fn on_evict(&self, key: &K, value: &CountValue) {
        self.lock().push((*key, *value));
    }
}

impl<K> Aggregator<K, u64> for RecordingAggregator<K, u64>
where
    K: Copy + Send,
{
    fn combine(&self, acc: &mut u64, incoming: &u64) {
        *acc = acc.wrapping_add(*incoming);
    }

    fn on_evict(&self, key: &K, value: &u64) {
        self.lock().push((*key, *value));
    }
}
