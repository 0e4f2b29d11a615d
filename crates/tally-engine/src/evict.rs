//! Eviction logging.

use std::fmt::Debug;

use tally_core::{Aggregator, Key, Value};

/// Aggregator wrapper that logs each evicted entry at `info` level
/// under the `tally::evict` target, then forwards to the wrapped
/// aggregator.
#[derive(Clone, Debug)]
pub struct LogEvictor<A> {
    label: String,
    inner: A,
}

impl<A> LogEvictor<A> {
    /// Wrap `inner`; `label` prefixes every log line.
    pub fn new(label: impl Into<String>, inner: A) -> Self {
        Self {
            label: label.into(),
            inner,
        }
    }

    /// The wrapped aggregator.
    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<K, V, A> Aggregator<K, V> for LogEvictor<A>
where
    K: Key + Debug,
    V: Value + Debug,
    A: Aggregator<K, V>,
{
    fn combine(&self, acc: &mut V, incoming: &V) {
        self.inner.combine(acc, incoming);
    }

    fn on_evict(&self, key: &K, value: &V) {
        log::info!(target: "tally::evict", "{}: evicted {key:?} = {value:?}", self.label);
        self.inner.on_evict(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        evicted: AtomicUsize,
    }

    impl Aggregator<u8, u8> for Counting {
        fn combine(&self, acc: &mut u8, incoming: &u8) {
            *acc = acc.wrapping_add(*incoming);
        }

        fn on_evict(&self, _key: &u8, _value: &u8) {
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn forwards_combine_and_eviction() {
        let agg = LogEvictor::new("taps", Counting::default());
        let mut acc = 1u8;
        Aggregator::<u8, u8>::combine(&agg, &mut acc, &2);
        assert_eq!(acc, 3);
        Aggregator::<u8, u8>::on_evict(&agg, &1, &3);
        assert_eq!(agg.inner().evicted.load(Ordering::Relaxed), 1);
    }
}
