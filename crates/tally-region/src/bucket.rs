//! A ring slot: one [`BucketTable`] plus the interval it covers.
//!
//! Slot lifecycle, cyclic:
//!
//! ```text
//! Empty ──assign──▶ Active ──(ring moves on)──▶ Retired ──reclaim──▶ Active
//! ```
//!
//! Whether a live bucket is `Active` or `Retired` is a property of the
//! ring (is it the current position?), so [`Bucket`] itself only tracks
//! `Empty` versus live-with-sequence-tag.

use tally_core::{Aggregator, BucketSeq, Interval, Key, Value};

use crate::table::BucketTable;

/// Externally visible state of a ring slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BucketState {
    /// Never assigned an interval.
    Empty,
    /// The current bucket, accepting writes.
    Active,
    /// Historical, read-only until reclaimed.
    Retired,
}

/// One ring slot.
pub struct Bucket<K, V> {
    tag: Option<(BucketSeq, Interval)>,
    table: BucketTable<K, V>,
}

impl<K: Key, V: Value> Bucket<K, V> {
    /// An empty slot with a preallocated table.
    pub fn new(slot_count: usize, capacity: usize) -> Self {
        Self {
            tag: None,
            table: BucketTable::new(slot_count, capacity),
        }
    }

    /// Make this slot live for `interval` at ring position `seq`.
    ///
    /// Any surviving entries are evicted through `aggregator` first.
    /// Returns the number of entries evicted.
    pub fn reclaim<A>(&mut self, seq: BucketSeq, interval: Interval, aggregator: &A) -> usize
    where
        A: Aggregator<K, V> + ?Sized,
    {
        let evicted = self.table.clear(aggregator);
        self.tag = Some((seq, interval));
        evicted
    }

    /// Whether this slot currently holds the bucket at `seq`.
    pub fn holds(&self, seq: BucketSeq) -> bool {
        matches!(self.tag, Some((s, _)) if s == seq)
    }

    /// Ring position of the bucket held, if any.
    pub fn seq(&self) -> Option<BucketSeq> {
        self.tag.map(|(s, _)| s)
    }

    /// Interval covered, if live.
    pub fn interval(&self) -> Option<Interval> {
        self.tag.map(|(_, iv)| iv)
    }

    /// The bucket's entries.
    pub fn table(&self) -> &BucketTable<K, V> {
        &self.table
    }

    /// Mutable access for `put`.
    pub fn table_mut(&mut self) -> &mut BucketTable<K, V> {
        &mut self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tally_core::Timestamp;

    #[derive(Default)]
    struct CountEvictions(AtomicUsize);

    impl Aggregator<u32, u32> for CountEvictions {
        fn combine(&self, acc: &mut u32, incoming: &u32) {
            *acc += *incoming;
        }

        fn on_evict(&self, _key: &u32, _value: &u32) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn new_bucket_is_empty_and_untagged() {
        let bucket = Bucket::<u32, u32>::new(8, 7);
        assert_eq!(bucket.seq(), None);
        assert_eq!(bucket.interval(), None);
        assert!(!bucket.holds(BucketSeq(0)));
        assert!(bucket.table().is_empty());
    }

    #[test]
    fn reclaim_evicts_and_retags() {
        let agg = CountEvictions::default();
        let mut bucket = Bucket::<u32, u32>::new(8, 7);
        let first = Interval::starting_at(Timestamp(0), 10);
        assert_eq!(bucket.reclaim(BucketSeq(0), first, &agg), 0);
        bucket.table_mut().upsert(1, &1, &agg).unwrap();
        bucket.table_mut().upsert(2, &1, &agg).unwrap();

        let later = Interval::starting_at(Timestamp(40), 10);
        assert_eq!(bucket.reclaim(BucketSeq(4), later, &agg), 2);
        assert_eq!(agg.0.load(Ordering::Relaxed), 2);
        assert!(bucket.holds(BucketSeq(4)));
        assert!(!bucket.holds(BucketSeq(0)));
        assert_eq!(bucket.interval(), Some(later));
        assert!(bucket.table().is_empty());
    }
}
