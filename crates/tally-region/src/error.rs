//! Region configuration errors.

use std::error::Error;
use std::fmt;

/// Invalid or unsatisfiable region parameters.
///
/// Fatal to initialisation: a region is never constructed from a
/// configuration that produces one of these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `interval_secs` is zero.
    ZeroInterval,
    /// `max_bytes` is zero.
    ZeroBudget,
    /// The key type has size zero.
    ZeroSizedKey,
    /// The value type has size zero.
    ZeroSizedValue,
    /// An explicit bucket count below the minimum of 2.
    BucketCountTooSmall {
        /// The configured count.
        configured: usize,
    },
    /// The budget cannot hold the requested ring with at least one key
    /// per bucket.
    BudgetTooSmall {
        /// The configured budget.
        max_bytes: usize,
        /// Smallest budget that would have fit.
        required: usize,
    },
    /// Slot or budget arithmetic overflowed `usize`.
    SizeOverflow,
    /// The region name is empty.
    EmptyName,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroInterval => write!(f, "interval_secs must be at least 1"),
            Self::ZeroBudget => write!(f, "max_bytes must be at least 1"),
            Self::ZeroSizedKey => write!(f, "key type has zero size"),
            Self::ZeroSizedValue => write!(f, "value type has zero size"),
            Self::BucketCountTooSmall { configured } => {
                write!(f, "bucket_count {configured} is below minimum of 2")
            }
            Self::BudgetTooSmall {
                max_bytes,
                required,
            } => write!(
                f,
                "budget of {max_bytes} bytes cannot hold the ring, need at least {required} bytes"
            ),
            Self::SizeOverflow => write!(f, "region size arithmetic overflowed"),
            Self::EmptyName => write!(f, "region name must not be empty"),
        }
    }
}

impl Error for ConfigError {}
