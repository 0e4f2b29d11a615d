//! Tally: fixed-capacity, time-windowed aggregation.
//!
//! Many threads record `(key, value)` events; events are merged per key
//! into the bucket for the current time interval with a caller-supplied
//! associative combine. A ring of buckets holds a bounded window of
//! history, the oldest bucket is evicted as time advances, and queries
//! merge any part of the window.
//!
//! This is the facade crate re-exporting the public API of the Tally
//! sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use tally::prelude::*;
//!
//! struct AddCounts;
//! impl Aggregator<u32, u64> for AddCounts {
//!     fn combine(&self, acc: &mut u64, incoming: &u64) {
//!         *acc += *incoming;
//!     }
//! }
//!
//! let config = BufferConfig {
//!     interval_secs: 10,
//!     max_bytes: 1024 * 1024,
//!     ..BufferConfig::default()
//! };
//! let buffer: TimeBuffer<u32, u64, _> =
//!     TimeBuffer::with_start(config, AddCounts, Timestamp(0)).unwrap();
//! for _ in 0..5 {
//!     buffer.put(0, 1).unwrap();
//! }
//! assert_eq!(buffer.get_stats().value, 5);
//!
//! buffer.tick(Timestamp(15));
//! assert_eq!(buffer.get_stats_time_interval(Timestamp(0), Timestamp(10)).value, 5);
//! assert_eq!(buffer.get_stats_time_interval(Timestamp(10), Timestamp(20)).distinct_keys, 0);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tally-core` | Timestamps, intervals, errors, `Aggregator`, `Clock` |
//! | [`region`] | `tally-region` | Budget layout and per-bucket tables |
//! | [`engine`] | `tally-engine` | `TimeBuffer`, queries, `Ticker`, registry |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and traits (`tally-core`).
pub use tally_core as types;

/// Region layout and per-bucket tables (`tally-region`).
///
/// [`region::RegionLayout`] and [`region::items_count`] size a buffer
/// before it is built.
pub use tally_region as region;

/// Time buffers, queries and the rotation driver (`tally-engine`).
pub use tally_engine as engine;

/// Common imports.
pub mod prelude {
    pub use tally_core::{
        Aggregator, Clock, FnAggregator, Interval, ManualClock, SystemClock, TallyError, Timestamp,
    };
    pub use tally_engine::{
        items_count, BufferConfig, BufferMetrics, BufferRegistry, ConfigError, LogEvictor,
        QueryRange, Stats, TickReport, Ticker, TimeBuffer, Upsert,
    };
}
