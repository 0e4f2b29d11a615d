//! Capability traits injected into a region at construction.

use std::hash::Hash;

use crate::id::Timestamp;

/// Bound for keys stored in a bucket table.
///
/// Keys are small fixed-size values compared with `Eq`; for plain
/// `#[repr(C)]` structs this is bitwise equality.
pub trait Key: Copy + Eq + Hash + Send + 'static {}

impl<T: Copy + Eq + Hash + Send + 'static> Key for T {}

/// Bound for aggregated values.
///
/// `Default::default()` is the identity: a freshly inserted key starts
/// from it, and queries that match nothing return it.
pub trait Value: Copy + Default + Send + 'static {}

impl<T: Copy + Default + Send + 'static> Value for T {}

/// Merge and eviction strategy for a region.
///
/// One `combine` serves both same-key accumulation inside a bucket and
/// the cross-bucket, cross-key reduction performed by queries. Callers
/// must supply an operation that is associative and commutative with
/// `V::default()` as its identity; the region does not check this, and
/// a non-commutative `combine` makes query results depend on bucket
/// visiting order.
pub trait Aggregator<K, V>: Send + Sync {
    /// Fold `incoming` into `acc` in place.
    fn combine(&self, acc: &mut V, incoming: &V);

    /// Observe an entry that is about to be discarded by rotation.
    ///
    /// The return value is not consumed and the entry cannot be saved.
    fn on_evict(&self, _key: &K, _value: &V) {}
}

impl<K, V, A: Aggregator<K, V> + ?Sized> Aggregator<K, V> for Box<A> {
    fn combine(&self, acc: &mut V, incoming: &V) {
        (**self).combine(acc, incoming)
    }

    fn on_evict(&self, key: &K, value: &V) {
        (**self).on_evict(key, value)
    }
}

/// An [`Aggregator`] built from a pair of closures.
///
/// ```
/// use tally_core::{Aggregator, FnAggregator};
///
/// let sum = FnAggregator::new(|acc: &mut u64, v: &u64| *acc += *v, |_: &u32, _: &u64| {});
/// let mut total = 0u64;
/// Aggregator::<u32, u64>::combine(&sum, &mut total, &5);
/// assert_eq!(total, 5);
/// ```
pub struct FnAggregator<C, E> {
    combine: C,
    on_evict: E,
}

impl<C, E> FnAggregator<C, E> {
    /// Wrap a combine closure and an eviction observer.
    pub fn new(combine: C, on_evict: E) -> Self {
        Self { combine, on_evict }
    }
}

impl<K, V, C, E> Aggregator<K, V> for FnAggregator<C, E>
where
    C: Fn(&mut V, &V) + Send + Sync,
    E: Fn(&K, &V) + Send + Sync,
{
    fn combine(&self, acc: &mut V, incoming: &V) {
        (self.combine)(acc, incoming)
    }

    fn on_evict(&self, key: &K, value: &V) {
        (self.on_evict)(key, value)
    }
}

/// Source of "now" for the rotation driver.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> Timestamp;
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
