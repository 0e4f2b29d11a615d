//! Tally tap counter: count taps per key in 10-second buckets.
//!
//! Demonstrates:
//!   1. Loading a `BufferConfig` from the environment
//!   2. Registering a named buffer with a logging evictor
//!   3. Recording taps from several threads while a `Ticker` rotates
//!   4. Querying the whole window, an absolute range, and per key
//!
//! A `ManualClock` stands in for wall time so the demo finishes in
//! milliseconds instead of minutes.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example tap_counter

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tally_core::{Aggregator, ManualClock, Timestamp};
use tally_engine::{BufferConfig, BufferRegistry, LogEvictor, QueryRange, Ticker, TimeBuffer};

// ─── Key and value ──────────────────────────────────────────────

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct TapKey {
    foo: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct TapCount {
    count: i32,
}

struct AddCounts;

impl Aggregator<TapKey, TapCount> for AddCounts {
    fn combine(&self, acc: &mut TapCount, incoming: &TapCount) {
        acc.count += incoming.count;
    }
}

type TapBuffer = TimeBuffer<TapKey, TapCount, LogEvictor<AddCounts>>;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = BufferConfig {
        name: "tap_counter".to_string(),
        bucket_count: Some(3),
        ..BufferConfig::from_env()
    };
    let interval = config.interval_secs;
    let registry = BufferRegistry::new();
    let buffer: TimeBuffer<TapKey, TapCount, _> = TimeBuffer::with_start(
        config,
        LogEvictor::new("tap_counter", AddCounts),
        Timestamp(0),
    )?;
    registry.register(buffer)?;

    let clock = Arc::new(ManualClock::new(Timestamp(0)));
    let taps = registry.get::<TapKey, TapCount, LogEvictor<AddCounts>>("tap_counter")?;
    let ticker = Ticker::spawn(Arc::clone(&taps), Arc::clone(&clock), Duration::from_millis(5))?;

    // Four intervals of taps from two threads.
    for _ in 0..4 {
        let writers: Vec<_> = (0..2)
            .map(|t| {
                let taps = Arc::clone(&taps);
                thread::spawn(move || {
                    for i in 0..10 {
                        let key = TapKey { foo: t * 10 + i % 3 };
                        // Dropping the event on TableFull matches the host's policy.
                        let _ = taps.put(key, TapCount { count: 1 });
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().map_err(|_| "writer panicked")?;
        }
        let target = clock.advance(interval);
        while taps.current_interval().end <= target {
            thread::sleep(Duration::from_millis(1));
        }
    }

    show(&registry)?;
    show_by_time(&registry, Timestamp(interval), Timestamp(3 * interval))?;

    let report = ticker.shutdown()?;
    println!(
        "ticker: {} ticks, {} rotations, {} evicted",
        report.ticks, report.rotations, report.evicted_entries
    );
    println!("metrics: {:?}", taps.metrics());
    Ok(())
}

fn lookup(registry: &BufferRegistry) -> Result<Arc<TapBuffer>, Box<dyn std::error::Error>> {
    Ok(registry.get::<TapKey, TapCount, LogEvictor<AddCounts>>("tap_counter")?)
}

fn show(registry: &BufferRegistry) -> Result<(), Box<dyn std::error::Error>> {
    let taps = lookup(registry)?;
    let stats = taps.get_stats();
    println!(
        "window {}..{}: {} taps over {} keys",
        stats.from, stats.to, stats.value.count, stats.distinct_keys
    );
    for (key, value) in taps.get_stats_by_key(QueryRange::All) {
        println!("  foo={:<3} count={}", key.foo, value.count);
    }
    Ok(())
}

fn show_by_time(
    registry: &BufferRegistry,
    from: Timestamp,
    to: Timestamp,
) -> Result<(), Box<dyn std::error::Error>> {
    let stats = lookup(registry)?.get_stats_time_interval(from, to);
    println!(
        "range {from}..{to} -> {}..{}: {} taps over {} keys",
        stats.from, stats.to, stats.value.count, stats.distinct_keys
    );
    Ok(())
}
