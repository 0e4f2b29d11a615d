//! Core types and traits for the Tally time-bucketed aggregator.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Tally workspace:
//! timestamps and bucket intervals, error types, the [`Aggregator`]
//! capability that merges and observes values, and the [`Clock`] that
//! feeds wall time to the rotation driver.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod error;
pub mod id;
pub mod traits;

pub use clock::{ManualClock, SystemClock};
pub use error::TallyError;
pub use id::{BucketSeq, Interval, Timestamp};
pub use traits::{Aggregator, Clock, FnAggregator, Key, Value};
