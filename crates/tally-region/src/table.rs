//! Fixed-capacity open-addressed key→value table.
//!
//! A [`BucketTable`] owns a power-of-two slot array allocated once at
//! construction. Lookup and insert use linear probing; entries are only
//! ever removed all at once by [`clear`](BucketTable::clear) or
//! [`discard`](BucketTable::discard), so no tombstones are needed. The
//! logical capacity is kept strictly below the slot count, which
//! guarantees every probe sequence reaches an empty slot.
//!
//! Alongside the slots the table keeps the slot index of each key in
//! insertion order, also preallocated. Enumeration, eviction and reset
//! walk that list, so entries come out in the order they were first
//! inserted and clearing touches only occupied slots.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;

use tally_core::{Aggregator, Key, TallyError, Value};

/// Outcome of a successful [`BucketTable::upsert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upsert {
    /// The key was new and now occupies a slot.
    Inserted,
    /// The key was present and its value was combined in place.
    Merged,
}

/// Fixed-capacity map from `K` to `V` with merge-on-insert.
pub struct BucketTable<K, V> {
    slots: Box<[Option<(K, V)>]>,
    /// Occupied slot indices, oldest insert first. `order.len()` is the
    /// number of keys stored.
    order: Vec<usize>,
    capacity: usize,
    hasher: RandomState,
}

impl<K: Key, V: Value> BucketTable<K, V> {
    /// Create an empty table with `slot_count` slots admitting at most
    /// `capacity` keys.
    ///
    /// # Panics
    ///
    /// Panics if `slot_count` is not a power of two or if `capacity` is
    /// not below `slot_count`. [`RegionLayout`](crate::RegionLayout)
    /// never produces such a pair.
    pub fn new(slot_count: usize, capacity: usize) -> Self {
        assert!(
            slot_count.is_power_of_two(),
            "slot_count must be a power of two, got {slot_count}"
        );
        assert!(
            capacity < slot_count,
            "capacity {capacity} must be below slot_count {slot_count}"
        );
        let slots = (0..slot_count).map(|_| None).collect::<Vec<_>>();
        Self {
            slots: slots.into_boxed_slice(),
            order: Vec::with_capacity(capacity),
            capacity,
            hasher: RandomState::new(),
        }
    }

    /// Merge `value` into the entry for `key`, inserting it if absent.
    ///
    /// Returns [`TallyError::TableFull`] without touching the table when
    /// `key` is new and the table already holds `capacity` keys.
    pub fn upsert<A>(&mut self, key: K, value: &V, aggregator: &A) -> Result<Upsert, TallyError>
    where
        A: Aggregator<K, V> + ?Sized,
    {
        match self.find(&key) {
            Ok(idx) => match &mut self.slots[idx] {
                Some((_, existing)) => {
                    aggregator.combine(existing, value);
                    Ok(Upsert::Merged)
                }
                None => Err(TallyError::Corrupted {
                    reason: format!("probe matched empty slot {idx}"),
                }),
            },
            Err(idx) => {
                if self.order.len() >= self.capacity {
                    return Err(TallyError::TableFull {
                        capacity: self.capacity,
                    });
                }
                self.slots[idx] = Some((key, *value));
                self.order.push(idx);
                Ok(Upsert::Inserted)
            }
        }
    }

    /// Look up the value stored for `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        let idx = self.find(key).ok()?;
        self.slots[idx].as_ref().map(|(_, v)| v)
    }

    /// Iterate over current entries in insertion order.
    ///
    /// The iterator is lazy and borrows the table; call again for a
    /// fresh pass.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.order
            .iter()
            .filter_map(|&idx| self.slots[idx].as_ref().map(|(k, v)| (k, v)))
    }

    /// Evict every entry, reporting each to `aggregator.on_evict`, and
    /// leave the table empty. Returns the number of entries evicted.
    pub fn clear<A>(&mut self, aggregator: &A) -> usize
    where
        A: Aggregator<K, V> + ?Sized,
    {
        let mut evicted = 0;
        for idx in self.order.drain(..) {
            if let Some((key, value)) = self.slots[idx].take() {
                aggregator.on_evict(&key, &value);
                evicted += 1;
            }
        }
        evicted
    }

    /// Drop every entry without notifying anyone.
    pub fn discard(&mut self) {
        for idx in self.order.drain(..) {
            self.slots[idx] = None;
        }
    }

    /// Number of keys stored.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the table holds no keys.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Maximum number of keys.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether a new key would be rejected.
    pub fn is_full(&self) -> bool {
        self.order.len() >= self.capacity
    }

    /// `Ok(idx)` of the slot holding `key`, or `Err(idx)` of the empty
    /// slot where it would go.
    fn find(&self, key: &K) -> Result<usize, usize> {
        let mask = self.slots.len() - 1;
        let mut idx = (self.hasher.hash_one(key) as usize) & mask;
        loop {
            match &self.slots[idx] {
                Some((k, _)) if k == key => return Ok(idx),
                Some(_) => idx = (idx + 1) & mask,
                None => return Err(idx),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Sum;

    impl Aggregator<u32, u64> for Sum {
        fn combine(&self, acc: &mut u64, incoming: &u64) {
            *acc += *incoming;
        }
    }

    #[derive(Default)]
    struct Recorder {
        evicted: Mutex<Vec<(u32, u64)>>,
    }

    impl Aggregator<u32, u64> for Recorder {
        fn combine(&self, acc: &mut u64, incoming: &u64) {
            *acc += *incoming;
        }

        fn on_evict(&self, key: &u32, value: &u64) {
            self.evicted.lock().unwrap().push((*key, *value));
        }
    }

    #[test]
    fn insert_then_merge() {
        let mut table = BucketTable::<u32, u64>::new(8, 7);
        assert_eq!(table.upsert(1, &5, &Sum), Ok(Upsert::Inserted));
        assert_eq!(table.upsert(1, &3, &Sum), Ok(Upsert::Merged));
        assert_eq!(table.get(&1), Some(&8));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn full_table_rejects_new_key_but_merges_existing() {
        let mut table = BucketTable::<u32, u64>::new(4, 3);
        for k in 0..3 {
            table.upsert(k, &1, &Sum).unwrap();
        }
        assert!(table.is_full());
        assert_eq!(
            table.upsert(99, &1, &Sum),
            Err(TallyError::TableFull { capacity: 3 })
        );
        assert_eq!(table.get(&99), None);
        assert_eq!(table.upsert(2, &10, &Sum), Ok(Upsert::Merged));
        assert_eq!(table.get(&2), Some(&11));
    }

    #[test]
    fn clear_reports_each_entry_once() {
        let recorder = Recorder::default();
        let mut table = BucketTable::<u32, u64>::new(16, 14);
        for k in 0..5 {
            table.upsert(k, &(k as u64 * 10), &recorder).unwrap();
        }
        assert_eq!(table.clear(&recorder), 5);
        assert!(table.is_empty());
        let mut evicted = recorder.evicted.lock().unwrap().clone();
        evicted.sort_unstable();
        assert_eq!(evicted, vec![(0, 0), (1, 10), (2, 20), (3, 30), (4, 40)]);

        // A second clear has nothing to report.
        assert_eq!(table.clear(&recorder), 0);
        assert_eq!(recorder.evicted.lock().unwrap().len(), 5);
    }

    #[test]
    fn iteration_and_eviction_follow_insertion_order() {
        let recorder = Recorder::default();
        // Fresh tables hash with fresh seeds; order must not depend on it.
        for _ in 0..32 {
            let mut table = BucketTable::<u32, u64>::new(16, 14);
            for k in [3, 1, 9, 4] {
                table.upsert(k, &1, &recorder).unwrap();
            }
            table.upsert(1, &1, &recorder).unwrap();
            let keys: Vec<u32> = table.iter().map(|(k, _)| *k).collect();
            assert_eq!(keys, vec![3, 1, 9, 4]);

            recorder.evicted.lock().unwrap().clear();
            table.clear(&recorder);
            assert_eq!(
                *recorder.evicted.lock().unwrap(),
                vec![(3, 1), (1, 2), (9, 1), (4, 1)]
            );
        }
    }

    #[test]
    fn discard_is_silent() {
        let recorder = Recorder::default();
        let mut table = BucketTable::<u32, u64>::new(8, 7);
        table.upsert(1, &1, &recorder).unwrap();
        table.discard();
        assert!(table.is_empty());
        assert!(recorder.evicted.lock().unwrap().is_empty());
    }

    #[test]
    fn table_is_reusable_after_clear() {
        let mut table = BucketTable::<u32, u64>::new(4, 3);
        for k in 0..3 {
            table.upsert(k, &1, &Sum).unwrap();
        }
        table.clear(&Sum);
        for k in 10..13 {
            assert_eq!(table.upsert(k, &2, &Sum), Ok(Upsert::Inserted));
        }
        assert_eq!(table.iter().map(|(_, v)| *v).sum::<u64>(), 6);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn non_power_of_two_slots_panics() {
        BucketTable::<u32, u64>::new(6, 3);
    }

    #[test]
    #[should_panic(expected = "must be below slot_count")]
    fn capacity_equal_to_slots_panics() {
        BucketTable::<u32, u64>::new(4, 4);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashMap;

        proptest! {
            #[test]
            fn within_capacity_every_upsert_succeeds(
                puts in proptest::collection::vec((0u32..48, 1u64..1000), 0..400),
            ) {
                // 48 possible keys always fit in a 56-key table.
                let mut table = BucketTable::<u32, u64>::new(64, 56);
                let mut expected: HashMap<u32, u64> = HashMap::new();
                for &(k, v) in &puts {
                    prop_assert!(table.upsert(k, &v, &Sum).is_ok());
                    *expected.entry(k).or_default() += v;
                }
                prop_assert_eq!(table.len(), expected.len());
                for (k, v) in &expected {
                    prop_assert_eq!(table.get(k), Some(v));
                }
            }

            #[test]
            fn insertion_order_does_not_change_totals(
                mut puts in proptest::collection::vec((0u32..8, 1u64..1000), 1..64),
            ) {
                let mut forward = BucketTable::<u32, u64>::new(16, 14);
                for &(k, v) in &puts {
                    forward.upsert(k, &v, &Sum).unwrap();
                }
                puts.reverse();
                let mut backward = BucketTable::<u32, u64>::new(16, 14);
                for &(k, v) in &puts {
                    backward.upsert(k, &v, &Sum).unwrap();
                }
                for k in 0..8 {
                    prop_assert_eq!(forward.get(&k), backward.get(&k));
                }
            }

            #[test]
            fn len_never_exceeds_capacity(
                keys in proptest::collection::vec(any::<u32>(), 0..200),
            ) {
                let mut table = BucketTable::<u32, u64>::new(32, 28);
                for k in keys {
                    let _ = table.upsert(k, &1, &Sum);
                    prop_assert!(table.len() <= table.capacity());
                }
            }
        }
    }
}
