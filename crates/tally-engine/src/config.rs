//! Buffer configuration and environment overlay.
//!
//! [`BufferConfig`] is the input to [`TimeBuffer`](crate::TimeBuffer)
//! construction. [`validate()`](BufferConfig::validate) checks the
//! parameters that do not depend on the key and value types; the byte
//! layout itself is checked when the region is laid out.

use tally_region::layout::MIN_BUCKET_COUNT;
use tally_region::ConfigError;

/// Upper bound accepted for `TALLY_BUFFER_SIZE_MB`.
pub const MAX_BUFFER_SIZE_MB: usize = 5120;

const MIB: usize = 1024 * 1024;

/// Parameters for one time buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferConfig {
    /// Name the buffer is registered under. Default: `"tally"`.
    pub name: String,
    /// Length of one bucket's interval in seconds. Default: 10.
    pub interval_secs: u64,
    /// Byte budget for the whole ring. Default: 20 MiB.
    pub max_bytes: usize,
    /// Ring length. `None` derives it from the budget (see
    /// [`RegionLayout::compute`](tally_region::RegionLayout::compute)).
    pub bucket_count: Option<usize>,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            name: "tally".to_string(),
            interval_secs: 10,
            max_bytes: 20 * MIB,
            bucket_count: None,
        }
    }
}

impl BufferConfig {
    /// Defaults overlaid with environment variables.
    ///
    /// - `TALLY_NAME`
    /// - `TALLY_INTERVAL_SECS`
    /// - `TALLY_BUFFER_SIZE_MB` (1..=5120)
    /// - `TALLY_BUCKET_COUNT`
    ///
    /// Unparseable or out-of-range values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`, which maps a
    /// variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(name) = lookup("TALLY_NAME").filter(|n| !n.is_empty()) {
            config.name = name;
        }
        if let Some(secs) = parse_var(&lookup, "TALLY_INTERVAL_SECS", |v: &u64| *v > 0) {
            config.interval_secs = secs;
        }
        if let Some(mb) = parse_var(&lookup, "TALLY_BUFFER_SIZE_MB", |v: &usize| {
            (1..=MAX_BUFFER_SIZE_MB).contains(v)
        }) {
            config.max_bytes = mb * MIB;
        }
        if let Some(n) = parse_var(&lookup, "TALLY_BUCKET_COUNT", |v: &usize| {
            *v >= MIN_BUCKET_COUNT
        }) {
            config.bucket_count = Some(n);
        }

        config
    }

    /// Check the type-independent invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.max_bytes == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        if let Some(n) = self.bucket_count {
            if n < MIN_BUCKET_COUNT {
                return Err(ConfigError::BucketCountTooSmall { configured: n });
            }
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    accept: impl Fn(&T) -> bool,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) if accept(&v) => Some(v),
        _ => {
            log::warn!("ignoring {key}={raw:?}: not a valid value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_tap_counter_host() {
        let config = BufferConfig::default();
        assert_eq!(config.name, "tally");
        assert_eq!(config.interval_secs, 10);
        assert_eq!(config.max_bytes, 20 * MIB);
        assert_eq!(config.bucket_count, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn lookup_overlays_defaults() {
        let config = BufferConfig::from_lookup(lookup_from(&[
            ("TALLY_NAME", "taps"),
            ("TALLY_INTERVAL_SECS", "60"),
            ("TALLY_BUFFER_SIZE_MB", "64"),
            ("TALLY_BUCKET_COUNT", "24"),
        ]));
        assert_eq!(config.name, "taps");
        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.max_bytes, 64 * MIB);
        assert_eq!(config.bucket_count, Some(24));
    }

    #[test]
    fn malformed_values_fall_back() {
        let config = BufferConfig::from_lookup(lookup_from(&[
            ("TALLY_NAME", ""),
            ("TALLY_INTERVAL_SECS", "0"),
            ("TALLY_BUFFER_SIZE_MB", "9999"),
            ("TALLY_BUCKET_COUNT", "one"),
        ]));
        assert_eq!(config, BufferConfig::default());
    }

    #[test]
    fn validate_rejects_each_bad_field() {
        let base = BufferConfig::default();
        let cases = [
            (
                BufferConfig {
                    name: String::new(),
                    ..base.clone()
                },
                ConfigError::EmptyName,
            ),
            (
                BufferConfig {
                    interval_secs: 0,
                    ..base.clone()
                },
                ConfigError::ZeroInterval,
            ),
            (
                BufferConfig {
                    max_bytes: 0,
                    ..base.clone()
                },
                ConfigError::ZeroBudget,
            ),
            (
                BufferConfig {
                    bucket_count: Some(1),
                    ..base.clone()
                },
                ConfigError::BucketCountTooSmall { configured: 1 },
            ),
        ];
        for (config, expected) in cases {
            assert_eq!(config.validate(), Err(expected));
        }
    }
}
