//! Time-bucketed aggregation engine for Tally.
//!
//! Provides [`TimeBuffer`], a fixed-capacity ring of per-interval
//! key→value tables shared by many concurrent writers and readers and
//! advanced by a single rotation driver.
//!
//! # Architecture
//!
//! ```text
//! Writer threads            Ticker thread               Reader threads
//!     |                          |                           |
//!     |--put(key, value)-------->| lock current slot         |
//!     |   merge via Aggregator   |                           |
//!     |                          |--tick(now)                |
//!     |                          |  lock rotation guard      |
//!     |                          |  reclaim next slot        |
//!     |                          |  (on_evict per entry)     |
//!     |                          |  publish new position     |
//!     |                          |                           |
//!     |                          |     get_stats*()--------->|
//!     |                          |     lock slots one at a   |
//!     |                          |     time, oldest first    |
//! ```
//!
//! Every slot carries its ring sequence number, so a caller that races a
//! rotation sees either the bucket it chose or notices the slot was
//! reclaimed, never a half-rotated bucket.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod config;
pub mod evict;
pub mod metrics;
pub mod query;
pub mod registry;
pub mod ring;
pub mod rotation;
pub mod ticker;

pub use buffer::{BucketInfo, TimeBuffer};
pub use config::BufferConfig;
pub use evict::LogEvictor;
pub use metrics::BufferMetrics;
pub use query::{QueryRange, Stats};
pub use registry::{BufferRegistry, RegistryError};
pub use rotation::TickReport;
pub use ticker::{Ticker, TickerError, TickerReport};

pub use tally_region::{items_count, ConfigError, RegionLayout, Upsert};
