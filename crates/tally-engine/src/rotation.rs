//! Rotation engine: advance the current bucket as wall time passes.
//!
//! [`Rotation`] remembers the current position and its interval. It is
//! kept behind the buffer's rotation guard, which serialises rotations;
//! puts and queries never take that guard, they only observe the
//! positions it publishes on the ring.
//!
//! Catch-up after a stall rotates once per elapsed interval. Once a full
//! lap of the ring has been reclaimed every remaining slot is empty, so
//! the intervals before the last lap are skipped arithmetically: the
//! final state and the eviction callbacks are identical to rotating
//! through each one, and the work is bounded by the ring length.

use tally_core::{Aggregator, BucketSeq, Interval, Key, Timestamp, Value};

use crate::ring::BucketRing;

/// What one `tick` did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Intervals rotated through, including skipped empty ones.
    pub rotations: u64,
    /// Entries reported to `on_evict`.
    pub evicted_entries: u64,
}

impl TickReport {
    /// Whether the current bucket changed.
    pub fn rotated(&self) -> bool {
        self.rotations > 0
    }
}

/// Current position of the rotation driver.
#[derive(Debug)]
pub(crate) struct Rotation {
    seq: BucketSeq,
    current: Interval,
}

impl Rotation {
    /// Install the first bucket at position 0 covering `first`.
    pub fn start<K, V, A>(ring: &BucketRing<K, V>, first: Interval, aggregator: &A) -> Self
    where
        K: Key,
        V: Value,
        A: Aggregator<K, V> + ?Sized,
    {
        let seq = BucketSeq(0);
        ring.lock_slot(seq).reclaim(seq, first, aggregator);
        ring.publish(seq);
        Self {
            seq,
            current: first,
        }
    }

    /// Interval of the current bucket.
    pub fn current(&self) -> Interval {
        self.current
    }

    /// Rotate until the current bucket's interval contains or follows
    /// `now`. A `now` before the current bucket's end is a no-op.
    pub fn advance<K, V, A>(
        &mut self,
        ring: &BucketRing<K, V>,
        now: Timestamp,
        aggregator: &A,
    ) -> TickReport
    where
        K: Key,
        V: Value,
        A: Aggregator<K, V> + ?Sized,
    {
        let len = self.current.len_secs();
        // An interval clamped at the end of time has nowhere to rotate to.
        if now < self.current.end || len == 0 {
            return TickReport::default();
        }

        let elapsed = now.saturating_since(self.current.end) / len + 1;
        let lap = ring.bucket_count() as u64;

        let skip = elapsed.saturating_sub(lap);
        if skip > 0 {
            let start = self.current.start.saturating_add(skip.saturating_mul(len));
            self.seq = BucketSeq(self.seq.0.saturating_add(skip));
            self.current = Interval::starting_at(start, len);
        }

        let mut evicted_entries = 0;
        for _ in 0..elapsed.min(lap) {
            let seq = BucketSeq(self.seq.0 + 1);
            let interval = self.current.next();
            ring.retire_for(seq);
            let evicted = ring.lock_slot(seq).reclaim(seq, interval, aggregator);
            ring.publish(seq);
            self.seq = seq;
            self.current = interval;
            evicted_entries += evicted as u64;
        }

        TickReport {
            rotations: elapsed,
            evicted_entries,
        }
    }
}
