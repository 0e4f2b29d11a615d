//! Put throughput with several writer threads and a rotating ticker.

use std::sync::Arc;
use std::thread;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tally_bench::{small_profile, KeyStream};
use tally_core::Timestamp;
use tally_engine::TimeBuffer;
use tally_test_utils::SumAggregator;

const PUTS_PER_THREAD: usize = 10_000;

fn bench_contended_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_put");
    for threads in [1usize, 2, 4, 8] {
        group.throughput(Throughput::Elements((threads * PUTS_PER_THREAD) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            let buf = Arc::new(
                TimeBuffer::<u32, u64, _>::with_start(small_profile(), SumAggregator, Timestamp(0))
                    .unwrap(),
            );
            let keys: Arc<Vec<u32>> =
                Arc::new(KeyStream::uniform(3, 2_000).take_keys(PUTS_PER_THREAD));
            let mut now = 0;
            b.iter(|| {
                now += 1;
                buf.tick(Timestamp(now));
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let buf = Arc::clone(&buf);
                        let keys = Arc::clone(&keys);
                        thread::spawn(move || {
                            for &k in keys.iter() {
                                let _ = buf.put(k, 1);
                            }
                        })
                    })
                    .collect();
                for h in handles {
                    h.join().unwrap();
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_contended_put);
criterion_main!(benches);
