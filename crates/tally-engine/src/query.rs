//! Query engine: merge buckets into one aggregate.
//!
//! Buckets are visited oldest to newest, one lock at a time, so a query
//! running alongside a rotation sees a per-bucket-consistent composition
//! rather than an atomic snapshot of the whole window. Each selected
//! bucket's entries are folded per key into the query's own scratch map;
//! the scratch map is then reduced across keys with the same combine.

use indexmap::IndexMap;

use tally_core::{Aggregator, Interval, Key, Timestamp, Value};

use crate::ring::BucketRing;

/// Which buckets a query merges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryRange {
    /// Every bucket still resident in the ring.
    All,
    /// Buckets whose interval overlaps `[from, to)`.
    Between {
        /// Inclusive lower bound.
        from: Timestamp,
        /// Exclusive upper bound.
        to: Timestamp,
    },
}

impl QueryRange {
    fn selects(&self, interval: &Interval) -> bool {
        match *self {
            Self::All => true,
            Self::Between { from, to } => interval.overlaps(from, to),
        }
    }
}

/// Result of a stats query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stats<V> {
    /// All matching values combined; the identity if nothing matched.
    pub value: V,
    /// Distinct keys seen across the merged buckets.
    pub distinct_keys: usize,
    /// Start of the earliest merged bucket, or the requested start if
    /// no bucket matched.
    pub from: Timestamp,
    /// End of the latest merged bucket, or the requested end if no
    /// bucket matched.
    pub to: Timestamp,
}

/// Per-key merge of the selected buckets plus the span they cover.
pub(crate) struct Merged<K, V> {
    pub per_key: IndexMap<K, V>,
    pub span: Option<Interval>,
}

impl<K: Key, V: Value> Merged<K, V> {
    /// Reduce across keys into a single [`Stats`].
    ///
    /// `fallback` supplies the bounds reported when no bucket matched.
    /// It is only called in that case.
    pub fn into_stats<A, F>(self, aggregator: &A, fallback: F) -> Stats<V>
    where
        A: Aggregator<K, V> + ?Sized,
        F: FnOnce() -> (Timestamp, Timestamp),
    {
        let mut value = V::default();
        for v in self.per_key.values() {
            aggregator.combine(&mut value, v);
        }
        let (from, to) = self.span.map_or_else(fallback, |iv| (iv.start, iv.end));
        Stats {
            value,
            distinct_keys: self.per_key.len(),
            from,
            to,
        }
    }
}

/// Fold every bucket selected by `range` into a fresh scratch map.
pub(crate) fn merge<K, V, A>(
    ring: &BucketRing<K, V>,
    range: QueryRange,
    aggregator: &A,
) -> Merged<K, V>
where
    K: Key,
    V: Value,
    A: Aggregator<K, V> + ?Sized,
{
    let mut per_key: IndexMap<K, V> = IndexMap::new();
    let mut span: Option<Interval> = None;

    for seq in ring.retained() {
        let Some(bucket) = ring.lock(seq) else {
            continue;
        };
        let Some(interval) = bucket.interval() else {
            continue;
        };
        if !range.selects(&interval) {
            continue;
        }
        for (key, value) in bucket.table().iter() {
            per_key
                .entry(*key)
                .and_modify(|acc| aggregator.combine(acc, value))
                .or_insert(*value);
        }
        span = Some(match span {
            None => interval,
            Some(s) => Interval {
                start: s.start.min(interval.start),
                end: s.end.max(interval.end),
            },
        });
    }

    Merged { per_key, span }
}
