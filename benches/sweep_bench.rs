use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use causal_core::testing::message;
use causal_core::{CausalProcess, GroupConfig, Message, ProcessId};

/// A receiver plus `depth` messages from P0 in reverse order; the last
/// arrival releases the whole chain in a single sweep.
fn reversed_chain(depth: u64) -> (CausalProcess<u64>, Vec<Message<u64>>) {
    let process = CausalProcess::new(ProcessId(1), &GroupConfig::new(4)).unwrap();
    let arrivals = (1..=depth).rev().map(|seq| message(0, &[1], &[seq, 0, 0, 0], seq)).collect();
    (process, arrivals)
}

fn sweep_benchmarks(c: &mut Criterion) {
    for depth in [16u64, 256] {
        c.bench_function(&format!("release_reversed_chain_{}", depth), |b| {
            b.iter_batched(
                || reversed_chain(depth),
                |(mut process, arrivals)| {
                    for m in arrivals {
                        let _ = process.deliver_incoming(m);
                    }
                    process
                },
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(benches, sweep_benchmarks);
criterion_main!(benches);
