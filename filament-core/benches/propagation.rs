//! Propagation benchmarks: signal fan-out and store path matching.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;

use filament_core::{create_signal, create_store, create_wire, produce, Runtime, Wire};

// =============================================================================
// Signal fan-out
// =============================================================================

fn bench_signal_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_fanout");

    for subscribers in [1usize, 16, 256] {
        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, &subscribers| {
                let rt = Runtime::new();
                let source = create_signal(&rt, 0u64);
                let wires: Vec<Wire<u64>> = (0..subscribers)
                    .map(|i| {
                        let read = source.clone();
                        create_wire(&rt, move |t, _| Ok(t.get(&read)? + i as u64))
                    })
                    .collect();
                for wire in &wires {
                    wire.run().unwrap();
                }

                let mut next = 0u64;
                b.iter(|| {
                    next += 1;
                    source.set(black_box(next)).unwrap();
                });
                rt.teardown();
            },
        );
    }

    group.finish();
}

// =============================================================================
// Store path matching
// =============================================================================

fn bench_store_writes(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_writes");

    for readers in [16usize, 256] {
        group.bench_with_input(
            BenchmarkId::new("element_assign", readers),
            &readers,
            |b, &readers| {
                let rt = Runtime::new();
                let items: Vec<_> = (0..readers).map(|i| json!({"value": i})).collect();
                let store = create_store(&rt, json!({ "items": items })).unwrap();
                let wires: Vec<Wire<serde_json::Value>> = (0..readers)
                    .map(|i| {
                        let cursor = store.field("items").index(i).field("value");
                        create_wire(&rt, move |t, _| t.read(&cursor))
                    })
                    .collect();
                for wire in &wires {
                    wire.run().unwrap();
                }

                let target = store.field("items").index(readers / 2);
                let mut next = 0u64;
                b.iter(|| {
                    next += 1;
                    produce(&target, |draft| draft.set("value", black_box(next))).unwrap();
                });
                rt.teardown();
            },
        );

        group.bench_with_input(
            BenchmarkId::new("push_with_element_readers", readers),
            &readers,
            |b, &readers| {
                let rt = Runtime::new();
                let items: Vec<_> = (0..readers).map(|i| json!(i)).collect();
                let store = create_store(&rt, json!({ "items": items })).unwrap();
                let wires: Vec<Wire<serde_json::Value>> = (0..readers)
                    .map(|i| {
                        let cursor = store.field("items").index(i);
                        create_wire(&rt, move |t, _| t.read(&cursor))
                    })
                    .collect();
                for wire in &wires {
                    wire.run().unwrap();
                }

                let list = store.field("items");
                b.iter(|| {
                    produce(&list, |draft| {
                        draft.push(0)?;
                        draft.pop().map(drop)
                    })
                    .unwrap();
                });
                rt.teardown();
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_signal_fanout, bench_store_writes);
criterion_main!(benches);
