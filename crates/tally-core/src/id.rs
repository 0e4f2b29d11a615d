//! Timestamps, bucket intervals, and ring sequence numbers.

use std::fmt;

/// Wall-clock instant in whole seconds since the Unix epoch.
///
/// Bucket boundaries are aligned to multiples of the configured
/// interval length, so second granularity is sufficient.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Round down to the nearest multiple of `interval_secs`.
    ///
    /// An `interval_secs` of zero returns `self` unchanged.
    pub fn truncate(self, interval_secs: u64) -> Self {
        if interval_secs == 0 {
            return self;
        }
        Self(self.0 - self.0 % interval_secs)
    }

    /// Add `secs`, saturating at `u64::MAX`.
    pub fn saturating_add(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds elapsed since `earlier`, or zero if `earlier` is later.
    pub fn saturating_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Half-open time range `[start, end)` covered by one bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Interval {
    /// Inclusive lower bound.
    pub start: Timestamp,
    /// Exclusive upper bound.
    pub end: Timestamp,
}

impl Interval {
    /// An interval of `len_secs` seconds beginning at `start`.
    pub fn starting_at(start: Timestamp, len_secs: u64) -> Self {
        Self {
            start,
            end: start.saturating_add(len_secs),
        }
    }

    /// The interval immediately after this one, with the same length.
    pub fn next(&self) -> Self {
        Self::starting_at(self.end, self.len_secs())
    }

    /// Length in seconds.
    pub fn len_secs(&self) -> u64 {
        self.end.saturating_since(self.start)
    }

    /// Whether `ts` falls inside `[start, end)`.
    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts < self.end
    }

    /// Whether this interval shares any instant with `[from, to)`.
    ///
    /// An empty or inverted request range never overlaps.
    pub fn overlaps(&self, from: Timestamp, to: Timestamp) -> bool {
        from < to && self.start < to && from < self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Monotonic position of a bucket in the ring.
///
/// Incremented on every rotation and never wraps in practice. The ring
/// slot holding a bucket is `seq % bucket_count`; the sequence number is
/// stored alongside the bucket so readers can detect that a slot was
/// reclaimed between choosing it and locking it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketSeq(pub u64);

impl BucketSeq {
    /// Index into a ring of `len` slots.
    pub fn slot(self, len: usize) -> usize {
        (self.0 % len as u64) as usize
    }
}

impl fmt::Display for BucketSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for BucketSeq {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
