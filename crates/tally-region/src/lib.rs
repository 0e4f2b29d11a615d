//! Fixed-budget region layout and per-bucket tables for Tally.
//!
//! A region is carved once, at startup, out of a byte budget:
//!
//! ```text
//! Region (max_bytes)
//! ├── Bucket × bucket_count        (ring slots, see tally-engine)
//! │   ├── header                   (BUCKET_OVERHEAD bytes: seq, interval, lock)
//! │   └── BucketTable              (slots_per_bucket open-addressed slots)
//! │       └── Option<(K, V)> × slots_per_bucket
//! ```
//!
//! [`RegionLayout`] does the arithmetic, [`BucketTable`] is the
//! fixed-capacity key→value map, and [`Bucket`] pairs a table with the
//! interval it currently covers. Nothing here allocates after
//! construction.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bucket;
pub mod error;
pub mod layout;
pub mod table;

pub use bucket::{Bucket, BucketState};
pub use error::ConfigError;
pub use layout::{items_count, RegionLayout, BUCKET_OVERHEAD, DEFAULT_BUCKET_COUNT};
pub use table::{BucketTable, Upsert};
