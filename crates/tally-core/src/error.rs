//! Error types raised by bucket operations.
//!
//! Configuration failures live next to the layout code in `tally-region`;
//! this enum covers what can go wrong once a region exists.

use std::error::Error;
use std::fmt;

/// Errors from `put` and rotation on a live region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TallyError {
    /// The current bucket's table is at capacity and the key is not
    /// already present. The event is dropped; existing entries are
    /// untouched.
    TableFull {
        /// Logical capacity of the table that rejected the insert.
        capacity: usize,
    },
    /// A bucket's bookkeeping no longer matches the ring layout.
    ///
    /// Treated as an unrecoverable invariant violation by callers.
    Corrupted {
        /// Description of the violated invariant.
        reason: String,
    },
}

impl fmt::Display for TallyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableFull { capacity } => {
                write!(f, "bucket table full: capacity {capacity} keys")
            }
            Self::Corrupted { reason } => write!(f, "bucket state corrupted: {reason}"),
        }
    }
}

impl Error for TallyError {}
