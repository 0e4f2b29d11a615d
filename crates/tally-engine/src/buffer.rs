//! User-facing [`TimeBuffer`]: put, tick, query.
//!
//! A `TimeBuffer` owns the bucket ring, the rotation state and the
//! aggregator. It is `Sync`: share it behind an `Arc` between writer
//! threads, reader threads and one [`Ticker`](crate::Ticker) (or any
//! other thread calling [`tick`](TimeBuffer::tick)).
//!
//! Lock order: only `tick` takes the rotation guard, and while holding
//! it locks one ring slot at a time. `put` locks the current slot only.
//! Queries lock retained slots one at a time, oldest first, and skip a
//! slot as soon as rotation starts reclaiming it, so a slow `on_evict`
//! never stalls a reader. `reset_stats` locks every slot once, in ring
//! index order. No path holds two slot locks at once, and no path takes
//! the rotation guard while holding a slot.

use std::sync::{Mutex, PoisonError};

use tally_core::{
    Aggregator, BucketSeq, Clock, Interval, Key, SystemClock, TallyError, Timestamp, Value,
};
use tally_region::{BucketState, ConfigError, RegionLayout, Upsert};

use crate::config::BufferConfig;
use crate::metrics::{BufferMetrics, Counters};
use crate::query::{self, QueryRange, Stats};
use crate::ring::BucketRing;
use crate::rotation::{Rotation, TickReport};

/// Every this many `TableFull` rejections one warning is logged.
const TABLE_FULL_LOG_EVERY: u64 = 1024;

// ── BucketInfo ───────────────────────────────────────────────────

/// Point-in-time description of one ring slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BucketInfo {
    /// Ring position, or `None` for a slot never assigned an interval.
    pub seq: Option<BucketSeq>,
    /// Interval covered, or `None` for an empty slot.
    pub interval: Option<Interval>,
    /// Lifecycle state.
    pub state: BucketState,
    /// Distinct keys held.
    pub len: usize,
}

// ── TimeBuffer ───────────────────────────────────────────────────

/// Fixed-capacity, time-windowed aggregator.
///
/// Keys written with [`put`](Self::put) are merged into the current
/// bucket with the aggregator's `combine`. [`tick`](Self::tick) rotates
/// the ring as time passes, evicting the oldest bucket through
/// `on_evict`. Queries merge any subset of the retained buckets.
///
/// `combine` must be associative and commutative, with `V::default()`
/// as its identity. Queries merge buckets oldest first and keys in
/// first-seen order, so a combine that violates this still produces a
/// deterministic, but order-dependent, result.
pub struct TimeBuffer<K, V, A> {
    name: String,
    interval_secs: u64,
    layout: RegionLayout,
    ring: BucketRing<K, V>,
    rotation: Mutex<Rotation>,
    aggregator: A,
    counters: Counters,
}

// Compile-time assertion: TimeBuffer must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<TimeBuffer<u64, u64, ()>>();
};

impl<K, V, A> TimeBuffer<K, V, A>
where
    K: Key,
    V: Value,
    A: Aggregator<K, V>,
{
    /// Lay out the region and start the first bucket at the current
    /// wall-clock time, truncated to the interval.
    pub fn new(config: BufferConfig, aggregator: A) -> Result<Self, ConfigError> {
        Self::with_start(config, aggregator, SystemClock.now())
    }

    /// Like [`new`](Self::new) with an explicit start time.
    pub fn with_start(
        config: BufferConfig,
        aggregator: A,
        now: Timestamp,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = RegionLayout::for_types::<K, V>(config.max_bytes, config.bucket_count)?;
        let ring = BucketRing::new(&layout);
        let first = Interval::starting_at(now.truncate(config.interval_secs), config.interval_secs);
        let rotation = Rotation::start(&ring, first, &aggregator);

        log::info!(
            "time buffer {:?}: {} buckets x {} keys, {}s interval, {} bytes, first bucket {}",
            config.name,
            layout.bucket_count,
            layout.table_capacity,
            config.interval_secs,
            layout.total_bytes(),
            first,
        );

        Ok(Self {
            name: config.name,
            interval_secs: config.interval_secs,
            layout,
            ring,
            rotation: Mutex::new(rotation),
            aggregator,
            counters: Counters::default(),
        })
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Merge `value` into `key`'s entry in the current bucket.
    ///
    /// Returns [`TallyError::TableFull`] if `key` is new and the bucket
    /// has no free capacity; the bucket is left untouched.
    pub fn put(&self, key: K, value: V) -> Result<Upsert, TallyError> {
        let result = {
            let (_, mut bucket) = self.ring.lock_current();
            bucket.table_mut().upsert(key, &value, &self.aggregator)
        };
        match result {
            Ok(outcome) => {
                let counter = match outcome {
                    Upsert::Inserted => &self.counters.inserts,
                    Upsert::Merged => &self.counters.merges,
                };
                Counters::bump(counter, 1);
                Ok(outcome)
            }
            Err(err @ TallyError::TableFull { .. }) => {
                let prev = Counters::bump(&self.counters.table_full_rejections, 1);
                if prev % TABLE_FULL_LOG_EVERY == 0 {
                    log::warn!(
                        "time buffer {:?}: {err}; dropped event ({} rejections so far)",
                        self.name,
                        prev + 1
                    );
                }
                Err(err)
            }
            Err(err) => {
                log::error!("time buffer {:?}: {err}", self.name);
                Err(err)
            }
        }
    }

    // ── Rotation ─────────────────────────────────────────────────

    /// Rotate the ring so the current bucket covers `now`.
    ///
    /// A `now` before the current bucket's end is a no-op. Every
    /// interval elapsed since the last rotation counts as one rotation,
    /// and every entry of every reclaimed bucket is passed to
    /// `on_evict` exactly once before its slot is reused.
    pub fn tick(&self, now: Timestamp) -> TickReport {
        let mut rotation = self.rotation.lock().unwrap_or_else(PoisonError::into_inner);
        let report = rotation.advance(&self.ring, now, &self.aggregator);
        let current = rotation.current();
        drop(rotation);

        Counters::bump(&self.counters.ticks, 1);
        if report.rotated() {
            Counters::bump(&self.counters.rotations, report.rotations);
            Counters::bump(&self.counters.evicted_entries, report.evicted_entries);
            log::debug!(
                "time buffer {:?}: rotated {} interval(s), evicted {} entries, current {}",
                self.name,
                report.rotations,
                report.evicted_entries,
                current,
            );
        }
        report
    }

    /// Drop every retained entry without calling `on_evict`.
    ///
    /// Bucket intervals and the current position are unchanged.
    pub fn reset_stats(&self) {
        let mut discarded = 0;
        self.ring.for_each_slot(|bucket| {
            discarded += bucket.table().len();
            bucket.table_mut().discard();
        });
        Counters::bump(&self.counters.resets, 1);
        log::info!("time buffer {:?}: reset, discarded {discarded} entries", self.name);
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Merge every retained bucket.
    ///
    /// The bounds are the oldest retained bucket's start and the
    /// current bucket's end.
    pub fn get_stats(&self) -> Stats<V> {
        self.stats(QueryRange::All, || {
            let current = self.current_interval();
            (current.start, current.end)
        })
    }

    /// Merge the buckets whose interval overlaps `[from, to)`.
    ///
    /// With no overlapping bucket (including `from >= to`) the result is
    /// the identity value, zero keys, and the requested bounds.
    pub fn get_stats_time_interval(&self, from: Timestamp, to: Timestamp) -> Stats<V> {
        self.stats(QueryRange::Between { from, to }, || (from, to))
    }

    /// Per-key merged values for `range`, in first-seen order walking
    /// the buckets oldest to newest.
    pub fn get_stats_by_key(&self, range: QueryRange) -> Vec<(K, V)> {
        Counters::bump(&self.counters.queries, 1);
        query::merge(&self.ring, range, &self.aggregator)
            .per_key
            .into_iter()
            .collect()
    }

    fn stats<F>(&self, range: QueryRange, fallback: F) -> Stats<V>
    where
        F: FnOnce() -> (Timestamp, Timestamp),
    {
        Counters::bump(&self.counters.queries, 1);
        query::merge(&self.ring, range, &self.aggregator).into_stats(&self.aggregator, fallback)
    }

    // ── Introspection ────────────────────────────────────────────

    /// Name from the configuration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bucket interval length in seconds.
    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// The region layout chosen at construction.
    pub fn layout(&self) -> &RegionLayout {
        &self.layout
    }

    /// The injected aggregator.
    pub fn aggregator(&self) -> &A {
        &self.aggregator
    }

    /// Interval of the bucket currently accepting writes.
    ///
    /// Read from the ring, so it does not wait for a rotation in
    /// progress.
    pub fn current_interval(&self) -> Interval {
        match self.ring.current_interval() {
            Some(interval) => interval,
            None => self
                .rotation
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .current(),
        }
    }

    /// State of every retained ring position, oldest first.
    ///
    /// Positions not yet materialised (before the ring has filled once)
    /// are reported as [`BucketState::Empty`].
    pub fn buckets(&self) -> Vec<BucketInfo> {
        let current = self.ring.current_seq();
        let mut out = Vec::with_capacity(self.ring.bucket_count());
        for seq in self.ring.retained() {
            let info = match self.ring.lock(seq) {
                Some(bucket) => BucketInfo {
                    seq: bucket.seq(),
                    interval: bucket.interval(),
                    state: if seq == current {
                        BucketState::Active
                    } else {
                        BucketState::Retired
                    },
                    len: bucket.table().len(),
                },
                None => BucketInfo {
                    seq: None,
                    interval: None,
                    state: BucketState::Empty,
                    len: 0,
                },
            };
            out.push(info);
        }
        out
    }

    /// Snapshot of the cumulative counters and the layout.
    pub fn metrics(&self) -> BufferMetrics {
        let c = &self.counters;
        let inserts = Counters::load(&c.inserts);
        let merges = Counters::load(&c.merges);
        BufferMetrics {
            puts: inserts + merges,
            inserts,
            merges,
            table_full_rejections: Counters::load(&c.table_full_rejections),
            ticks: Counters::load(&c.ticks),
            rotations: Counters::load(&c.rotations),
            evicted_entries: Counters::load(&c.evicted_entries),
            queries: Counters::load(&c.queries),
            resets: Counters::load(&c.resets),
            bucket_count: self.layout.bucket_count,
            table_capacity: self.layout.table_capacity,
            region_bytes: self.layout.total_bytes(),
        }
    }
}

impl<K, V, A> std::fmt::Debug for TimeBuffer<K, V, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeBuffer")
            .field("name", &self.name)
            .field("interval_secs", &self.interval_secs)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Sum {
        evicted: AtomicUsize,
    }

    impl Aggregator<u32, u64> for Sum {
        fn combine(&self, acc: &mut u64, incoming: &u64) {
            *acc += *incoming;
        }

        fn on_evict(&self, _key: &u32, _value: &u64) {
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn config(buckets: usize) -> BufferConfig {
        BufferConfig {
            name: "test".to_string(),
            interval_secs: 10,
            max_bytes: 64 * 1024,
            bucket_count: Some(buckets),
        }
    }

    fn buffer(buckets: usize) -> TimeBuffer<u32, u64, Sum> {
        TimeBuffer::with_start(config(buckets), Sum::default(), Timestamp(3)).unwrap()
    }

    #[test]
    fn first_bucket_is_truncated_to_interval() {
        let buf = buffer(4);
        assert_eq!(buf.current_interval(), Interval::starting_at(Timestamp(0), 10));
        assert_eq!(buf.name(), "test");
        assert_eq!(buf.interval_secs(), 10);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = config(4);
        cfg.interval_secs = 0;
        let err = TimeBuffer::<u32, u64, Sum>::with_start(cfg, Sum::default(), Timestamp(0))
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroInterval);

        let mut cfg = config(4);
        cfg.max_bytes = 8;
        let err = TimeBuffer::<u32, u64, Sum>::with_start(cfg, Sum::default(), Timestamp(0))
            .unwrap_err();
        assert!(matches!(err, ConfigError::BudgetTooSmall { .. }));
    }

    #[test]
    fn put_reports_insert_then_merge() {
        let buf = buffer(4);
        assert_eq!(buf.put(1, 2).unwrap(), Upsert::Inserted);
        assert_eq!(buf.put(1, 3).unwrap(), Upsert::Merged);
        let stats = buf.get_stats();
        assert_eq!(stats.value, 5);
        assert_eq!(stats.distinct_keys, 1);
        let m = buf.metrics();
        assert_eq!((m.puts, m.inserts, m.merges), (2, 1, 1));
    }

    #[test]
    fn get_stats_bounds_cover_retained_window() {
        let buf = buffer(3);
        buf.put(1, 1).unwrap();
        buf.tick(Timestamp(10));
        buf.put(1, 1).unwrap();
        buf.tick(Timestamp(20));
        buf.put(1, 1).unwrap();
        let stats = buf.get_stats();
        assert_eq!(stats.value, 3);
        assert_eq!((stats.from, stats.to), (Timestamp(0), Timestamp(30)));

        // One more rotation drops [0, 10).
        buf.tick(Timestamp(30));
        let stats = buf.get_stats();
        assert_eq!(stats.value, 2);
        assert_eq!((stats.from, stats.to), (Timestamp(10), Timestamp(40)));
        assert_eq!(buf.aggregator().evicted.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn empty_buffer_reports_current_interval() {
        let buf = buffer(4);
        let stats = buf.get_stats();
        assert_eq!(stats.value, 0);
        assert_eq!(stats.distinct_keys, 0);
        assert_eq!((stats.from, stats.to), (Timestamp(0), Timestamp(10)));
    }

    #[test]
    fn inverted_range_is_empty() {
        let buf = buffer(4);
        buf.put(1, 1).unwrap();
        let stats = buf.get_stats_time_interval(Timestamp(9), Timestamp(0));
        assert_eq!(stats.value, 0);
        assert_eq!(stats.distinct_keys, 0);
        assert_eq!((stats.from, stats.to), (Timestamp(9), Timestamp(0)));
    }

    #[test]
    fn reset_discards_without_eviction() {
        let buf = buffer(3);
        buf.put(1, 1).unwrap();
        buf.tick(Timestamp(10));
        buf.put(2, 1).unwrap();
        buf.reset_stats();

        assert_eq!(buf.get_stats().distinct_keys, 0);
        assert_eq!(buf.current_interval(), Interval::starting_at(Timestamp(10), 10));
        buf.tick(Timestamp(100));
        assert_eq!(buf.aggregator().evicted.load(Ordering::Relaxed), 0);
        assert_eq!(buf.metrics().resets, 1);
    }

    #[test]
    fn buckets_reports_states_oldest_first() {
        let buf = buffer(3);
        let infos = buf.buckets();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].state, BucketState::Active);

        buf.put(7, 1).unwrap();
        buf.tick(Timestamp(10));
        let infos = buf.buckets();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].state, BucketState::Retired);
        assert_eq!(infos[0].len, 1);
        assert_eq!(infos[0].interval, Some(Interval::starting_at(Timestamp(0), 10)));
        assert_eq!(infos[1].state, BucketState::Active);
        assert_eq!(infos[1].seq, Some(BucketSeq(1)));
    }

    #[test]
    fn tick_counts_into_metrics() {
        let buf = buffer(4);
        buf.put(1, 1).unwrap();
        buf.tick(Timestamp(5));
        let report = buf.tick(Timestamp(45));
        assert_eq!(report.rotations, 4);
        assert_eq!(report.evicted_entries, 1);
        let m = buf.metrics();
        assert_eq!(m.ticks, 2);
        assert_eq!(m.rotations, 4);
        assert_eq!(m.evicted_entries, 1);
        assert_eq!(m.bucket_count, 4);
    }

    #[test]
    fn by_key_returns_breakdown() {
        let buf = buffer(4);
        buf.put(3, 1).unwrap();
        buf.put(1, 2).unwrap();
        buf.put(3, 4).unwrap();
        assert_eq!(buf.get_stats_by_key(QueryRange::All), vec![(3, 5), (1, 2)]);
    }

    #[test]
    fn by_key_order_does_not_depend_on_hash_seed() {
        for _ in 0..64 {
            let buf = buffer(4);
            buf.put(3, 1).unwrap();
            buf.put(1, 1).unwrap();
            assert_eq!(buf.get_stats_by_key(QueryRange::All), vec![(3, 1), (1, 1)]);
        }
    }

    #[derive(Default)]
    struct SlowEvict {
        evicting: AtomicBool,
    }

    impl Aggregator<u32, u64> for SlowEvict {
        fn combine(&self, acc: &mut u64, incoming: &u64) {
            *acc += *incoming;
        }

        fn on_evict(&self, _key: &u32, _value: &u64) {
            self.evicting.store(true, Ordering::Release);
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    #[test]
    fn queries_do_not_wait_for_slow_eviction() {
        let buf: TimeBuffer<u32, u64, SlowEvict> =
            TimeBuffer::with_start(config(2), SlowEvict::default(), Timestamp(3)).unwrap();
        for key in 0..10 {
            buf.put(key, 1).unwrap();
        }
        buf.tick(Timestamp(10));
        buf.put(100, 7).unwrap();

        std::thread::scope(|s| {
            // Reclaiming [0, 10) takes about half a second.
            let rotating = s.spawn(|| buf.tick(Timestamp(20)));
            while !buf.aggregator().evicting.load(Ordering::Acquire) {
                std::thread::yield_now();
            }

            let started = Instant::now();
            let stats = buf.get_stats();
            let by_key = buf.get_stats_by_key(QueryRange::All);
            let current = buf.current_interval();
            assert!(started.elapsed() < Duration::from_millis(250));

            assert_eq!(stats.value, 7);
            assert_eq!(stats.distinct_keys, 1);
            assert_eq!((stats.from, stats.to), (Timestamp(10), Timestamp(20)));
            assert_eq!(by_key, vec![(100, 7)]);
            assert_eq!(current, Interval::starting_at(Timestamp(10), 10));

            let report = rotating.join().unwrap();
            assert_eq!(report.evicted_entries, 10);
        });
        assert_eq!(buf.current_interval(), Interval::starting_at(Timestamp(20), 10));
    }
}
