//! Region layout arithmetic.
//!
//! Splits a byte budget into `bucket_count` equal buckets, each holding a
//! fixed header and a power-of-two slot array. The logical table capacity
//! is 7/8 of the slot count so open-addressing probes stay short and
//! always find a free slot.

use std::mem::size_of;

use crate::error::ConfigError;

/// Bytes reserved per bucket for its header (sequence tag, interval,
/// length counter, lock word).
pub const BUCKET_OVERHEAD: usize = 64;

/// Ring length chosen when the caller does not ask for one.
///
/// Six ten-second buckets retain one minute of history.
pub const DEFAULT_BUCKET_COUNT: usize = 6;

/// A ring needs one bucket being written and one retiring.
pub const MIN_BUCKET_COUNT: usize = 2;

/// Sizing of every bucket in a region.
///
/// Immutable after [`compute`](RegionLayout::compute); the budget
/// invariant `total_bytes() <= max_bytes` holds for every value this
/// module returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionLayout {
    /// Number of ring slots.
    pub bucket_count: usize,
    /// Physical slots in each bucket's table (a power of two).
    pub slots_per_bucket: usize,
    /// Maximum distinct keys per bucket.
    pub table_capacity: usize,
    /// Bytes accounted to one table slot.
    pub slot_bytes: usize,
}

impl RegionLayout {
    /// Lay out a region for keys and values of the given byte sizes.
    ///
    /// Each slot is accounted as `key_size + value_size + 1` bytes (one
    /// occupancy byte). With `bucket_count = None` the default ring
    /// length is used, shortened toward [`MIN_BUCKET_COUNT`] if the
    /// budget is too small for it.
    pub fn compute(
        max_bytes: usize,
        key_size: usize,
        value_size: usize,
        bucket_count: Option<usize>,
    ) -> Result<Self, ConfigError> {
        if key_size == 0 {
            return Err(ConfigError::ZeroSizedKey);
        }
        if value_size == 0 {
            return Err(ConfigError::ZeroSizedValue);
        }
        let slot_bytes = key_size
            .checked_add(value_size)
            .and_then(|n| n.checked_add(1))
            .ok_or(ConfigError::SizeOverflow)?;
        Self::with_slot_bytes(max_bytes, slot_bytes, bucket_count)
    }

    /// Lay out a region for the concrete key and value types `K` and `V`.
    ///
    /// Accounts each slot at no less than its in-memory size, so the
    /// budget also bounds real memory use.
    pub fn for_types<K, V>(
        max_bytes: usize,
        bucket_count: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let key_size = size_of::<K>();
        let value_size = size_of::<V>();
        if key_size == 0 {
            return Err(ConfigError::ZeroSizedKey);
        }
        if value_size == 0 {
            return Err(ConfigError::ZeroSizedValue);
        }
        let packed = key_size
            .checked_add(value_size)
            .and_then(|n| n.checked_add(1))
            .ok_or(ConfigError::SizeOverflow)?;
        let slot_bytes = packed.max(size_of::<Option<(K, V)>>());
        Self::with_slot_bytes(max_bytes, slot_bytes, bucket_count)
    }

    fn with_slot_bytes(
        max_bytes: usize,
        slot_bytes: usize,
        bucket_count: Option<usize>,
    ) -> Result<Self, ConfigError> {
        if max_bytes == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        match bucket_count {
            Some(n) if n < MIN_BUCKET_COUNT => {
                Err(ConfigError::BucketCountTooSmall { configured: n })
            }
            Some(n) => Self::fit(max_bytes, slot_bytes, n).ok_or(ConfigError::BudgetTooSmall {
                max_bytes,
                required: min_budget(slot_bytes, n),
            }),
            None => (MIN_BUCKET_COUNT..=DEFAULT_BUCKET_COUNT)
                .rev()
                .find_map(|n| Self::fit(max_bytes, slot_bytes, n))
                .ok_or(ConfigError::BudgetTooSmall {
                    max_bytes,
                    required: min_budget(slot_bytes, MIN_BUCKET_COUNT),
                }),
        }
    }

    /// Largest layout of exactly `bucket_count` buckets inside the budget,
    /// or `None` if a bucket cannot hold even one key.
    fn fit(max_bytes: usize, slot_bytes: usize, bucket_count: usize) -> Option<Self> {
        let per_bucket = max_bytes / bucket_count;
        let raw_slots = per_bucket.checked_sub(BUCKET_OVERHEAD)? / slot_bytes;
        let slots_per_bucket = prev_power_of_two(raw_slots)?;
        let table_capacity = capacity_for_slots(slots_per_bucket);
        (table_capacity > 0).then_some(Self {
            bucket_count,
            slots_per_bucket,
            table_capacity,
            slot_bytes,
        })
    }

    /// Bytes accounted to one bucket, header included.
    pub fn bucket_bytes(&self) -> usize {
        self.slots_per_bucket * self.slot_bytes + BUCKET_OVERHEAD
    }

    /// Bytes accounted to the whole region.
    pub fn total_bytes(&self) -> usize {
        self.bucket_count * self.bucket_bytes()
    }
}

/// Capacity-planning helper: how many distinct keys one bucket holds when
/// `budget_bytes` is split across `interval_count` buckets of
/// `record_size`-byte records (key plus value).
///
/// Pure; touches no region. Returns 0 when not even one key fits.
pub fn items_count(interval_count: usize, budget_bytes: usize, record_size: usize) -> usize {
    if interval_count == 0 || record_size == 0 {
        return 0;
    }
    let Some(slot_bytes) = record_size.checked_add(1) else {
        return 0;
    };
    RegionLayout::fit(budget_bytes, slot_bytes, interval_count).map_or(0, |l| l.table_capacity)
}

fn min_budget(slot_bytes: usize, bucket_count: usize) -> usize {
    // Two slots is the smallest table with a free slot left over.
    slot_bytes
        .saturating_mul(2)
        .saturating_add(BUCKET_OVERHEAD)
        .saturating_mul(bucket_count)
}

fn prev_power_of_two(n: usize) -> Option<usize> {
    if n == 0 {
        return None;
    }
    Some(1 << (usize::BITS - 1 - n.leading_zeros()))
}

fn capacity_for_slots(slots: usize) -> usize {
    (slots / 8) * 7 + (slots % 8) * 7 / 8
}
