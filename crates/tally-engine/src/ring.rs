//! Fixed-length ring of lockable bucket slots.
//!
//! [`BucketRing`] stores one `Mutex<Bucket>` per slot and an atomic
//! "current" position. Positions are monotonic [`BucketSeq`] values
//! (never wrapping); the slot index is `seq % bucket_count`. Each slot
//! records the sequence number of the bucket it holds so that a reader
//! can verify, after taking the lock, that the slot was not reclaimed
//! for a newer interval between choosing the position and locking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tally_core::{BucketSeq, Interval, Key, Value};
use tally_region::{Bucket, RegionLayout};

/// Ring of `bucket_count` bucket slots.
///
/// Single rotation driver: only [`Rotation`](crate::rotation) prepares
/// slots and publishes positions, and it does so under its own guard.
/// Any number of threads may lock slots for writing or reading.
pub struct BucketRing<K, V> {
    slots: Vec<Mutex<Bucket<K, V>>>,
    /// Sequence number of the bucket accepting writes. Published with
    /// release ordering only after its slot has been reclaimed and
    /// tagged.
    current: AtomicU64,
    /// Oldest position that may still be live. Raised before a slot is
    /// reclaimed so readers stop visiting the bucket being evicted.
    floor: AtomicU64,
}

// Compile-time assertion: BucketRing must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<BucketRing<u64, u64>>();
};

impl<K: Key, V: Value> BucketRing<K, V> {
    /// Preallocate every slot described by `layout`.
    ///
    /// All slots start [`Empty`](tally_region::BucketState::Empty); the
    /// first bucket is installed by the rotation engine.
    ///
    /// # Panics
    ///
    /// Panics if `layout.bucket_count < 2`.
    pub fn new(layout: &RegionLayout) -> Self {
        assert!(
            layout.bucket_count >= 2,
            "BucketRing bucket_count must be >= 2, got {}",
            layout.bucket_count
        );
        let slots = (0..layout.bucket_count)
            .map(|_| Mutex::new(Bucket::new(layout.slots_per_bucket, layout.table_capacity)))
            .collect();
        Self {
            slots,
            current: AtomicU64::new(0),
            floor: AtomicU64::new(0),
        }
    }

    /// Number of slots.
    pub fn bucket_count(&self) -> usize {
        self.slots.len()
    }

    /// Position of the bucket currently accepting writes.
    pub fn current_seq(&self) -> BucketSeq {
        BucketSeq(self.current.load(Ordering::Acquire))
    }

    /// Lock the slot for `seq` if it still holds that bucket.
    ///
    /// Returns `None` if the position was never materialised or has
    /// been reclaimed for a newer interval.
    pub fn lock(&self, seq: BucketSeq) -> Option<MutexGuard<'_, Bucket<K, V>>> {
        let guard = self.lock_slot(seq);
        guard.holds(seq).then_some(guard)
    }

    /// Lock the current bucket.
    ///
    /// Retries if a rotation reclaims the observed slot before the lock
    /// is taken; each retry observes a strictly newer position, so the
    /// loop ends as soon as the rotation driver stops lapping the ring.
    pub fn lock_current(&self) -> (BucketSeq, MutexGuard<'_, Bucket<K, V>>) {
        loop {
            let seq = self.current_seq();
            if let Some(guard) = self.lock(seq) {
                return (seq, guard);
            }
            std::hint::spin_loop();
        }
    }

    /// Positions still resident in the ring, oldest first.
    ///
    /// A position whose slot is being reclaimed is not included. Some of
    /// these may still turn out to be unmaterialised or reclaimed by the
    /// time they are locked; [`lock`](Self::lock) reports that.
    pub fn retained(&self) -> impl Iterator<Item = BucketSeq> {
        let floor = self.floor.load(Ordering::Acquire);
        let current = self.current_seq().0;
        let oldest = current
            .saturating_sub(self.slots.len() as u64 - 1)
            .max(floor);
        (oldest..=current).map(BucketSeq)
    }

    /// Interval of the current bucket.
    ///
    /// Takes only the current slot's lock, never a slot being reclaimed.
    pub fn current_interval(&self) -> Option<Interval> {
        self.lock_current().1.interval()
    }

    /// Lock the slot that `seq` maps to, whatever it holds.
    ///
    /// A poisoned lock is recovered: a panicking callback cannot leave a
    /// table over capacity, only with fewer entries than it counts.
    pub(crate) fn lock_slot(&self, seq: BucketSeq) -> MutexGuard<'_, Bucket<K, V>> {
        self.slots[seq.slot(self.slots.len())]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Announce that the slot for `seq` is about to be reclaimed: the
    /// position it held leaves the retained window now.
    pub(crate) fn retire_for(&self, seq: BucketSeq) {
        let floor = seq.0.saturating_sub(self.slots.len() as u64 - 1);
        self.floor.fetch_max(floor, Ordering::AcqRel);
    }

    /// Make `seq` the current position. Its slot must already be tagged.
    pub(crate) fn publish(&self, seq: BucketSeq) {
        self.current.store(seq.0, Ordering::Release);
    }

    /// Iterate over every slot in index order, locking one at a time.
    pub(crate) fn for_each_slot(&self, mut f: impl FnMut(&mut Bucket<K, V>)) {
        for slot in &self.slots {
            let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut guard);
        }
    }
}
