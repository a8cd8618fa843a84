//! Criterion benchmarks for logpipe

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use logpipe::core::{event_store, ConfigTree, Level, OverflowPolicy, RingBuffer};
use logpipe::pipeline::AsyncPipeline;
use logpipe::sinks::{BufferedSinkManager, MemorySink, SinkHandle};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn memory_tree(buffer_size: usize) -> ConfigTree {
    ConfigTree::builder()
        .sink(SinkHandle::new(BufferedSinkManager::new(
            "mem",
            Box::new(MemorySink::new("mem")),
            buffer_size,
        )))
        .root(Level::Trace, ["mem"])
        .build()
        .unwrap()
}

// ============================================================================
// Event Slot Benchmarks
// ============================================================================

fn bench_event_slot_recycling(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_slot");
    group.throughput(Throughput::Elements(1));

    group.bench_function("acquire_fill_release", |b| {
        b.iter(|| {
            let handle = event_store::acquire();
            {
                let mut event = handle.event_mut();
                event.logger_name.push_str(black_box("bench.logger"));
                event.level = Level::Info;
                event.message.push_str(black_box("benchmark message"));
            }
            black_box(&handle);
        });
    });

    group.finish();
}

// ============================================================================
// Transport Benchmarks
// ============================================================================

fn bench_ring_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    group.bench_function("claim_publish_drain", |b| {
        let ring = RingBuffer::with_capacity(1024);
        b.iter(|| {
            if let logpipe::core::Claim::Granted(seq) =
                ring.try_claim(Level::Info, OverflowPolicy::Block, || {})
            {
                ring.publish(seq, |slot| {
                    slot.level = Level::Info;
                });
            }
            ring.drain(|event| {
                black_box(event.level);
            });
        });
    });

    group.finish();
}

// ============================================================================
// End-to-End Benchmarks
// ============================================================================

fn bench_pipeline_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(1));

    let mut pipeline = AsyncPipeline::builder()
        .capacity(8192)
        .tree(memory_tree(100))
        .build()
        .unwrap();
    pipeline.start();

    group.bench_function("info", |b| {
        b.iter(|| {
            pipeline.info(black_box("bench.app"), black_box("Info message"));
        });
    });

    group.bench_function("filtered_out_debug", |b| {
        let mut filtered = AsyncPipeline::builder()
            .tree(
                ConfigTree::builder()
                    .root(Level::Warn, Vec::<String>::new())
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        filtered.start();
        b.iter(|| {
            filtered.debug(black_box("bench.app"), black_box("Debug message"));
        });
        filtered.stop(Duration::from_secs(5));
    });

    group.finish();
    pipeline.stop(Duration::from_secs(5));
}

fn bench_concurrent_producers(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("4_producers_1000_events", |b| {
        b.iter(|| {
            let mut pipeline = AsyncPipeline::builder()
                .capacity(4096)
                .tree(memory_tree(0))
                .build()
                .unwrap();
            pipeline.start();
            let pipeline = Arc::new(pipeline);

            let mut producers = Vec::new();
            for _ in 0..4 {
                let pipeline = Arc::clone(&pipeline);
                producers.push(thread::spawn(move || {
                    for i in 0..250 {
                        pipeline.info("bench.app", &format!("event {}", i));
                    }
                }));
            }
            for producer in producers {
                producer.join().unwrap();
            }
            let mut pipeline =
                Arc::try_unwrap(pipeline).unwrap_or_else(|_| panic!("pipeline still shared"));
            pipeline.stop(Duration::from_secs(5));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_event_slot_recycling,
    bench_ring_throughput,
    bench_pipeline_logging,
    bench_concurrent_producers
);
criterion_main!(benches);
