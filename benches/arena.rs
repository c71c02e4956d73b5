use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use strata::{Arena, ArenaConfig, GrowthPolicy};

/// Benchmark a frame of small allocations followed by a bulk reset
fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));

        // Arena: blocks retained across frames
        group.bench_with_input(BenchmarkId::new("Arena", count), count, |b, &count| {
            let mut arena = Arena::new(4096);
            b.iter(|| {
                for i in 0..count {
                    black_box(arena.alloc_copy(i as u64).unwrap());
                }
                arena.reset();
            });
        });

        // Arena freed every frame, so growth is paid each time
        group.bench_with_input(BenchmarkId::new("ArenaFree", count), count, |b, &count| {
            let mut arena = Arena::new(4096);
            b.iter(|| {
                for i in 0..count {
                    black_box(arena.alloc_copy(i as u64).unwrap());
                }
                arena.free();
            });
        });

        // Box: one heap allocation per value
        group.bench_with_input(BenchmarkId::new("Box", count), count, |b, &count| {
            b.iter(|| {
                let boxes: Vec<Box<u64>> = (0..count).map(|i| Box::new(i as u64)).collect();
                black_box(boxes);
            });
        });
    }

    group.finish();
}

/// Benchmark both growth policies on a workload that outgrows its first block every frame
fn bench_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("growth");

    for (name, growth) in [
        ("ReuseNext", GrowthPolicy::ReuseNext),
        ("AlwaysSplice", GrowthPolicy::AlwaysSplice),
    ] {
        group.bench_function(name, |b| {
            let config = ArenaConfig::default().with_capacity(256).with_growth(growth);
            let mut arena = Arena::with_config(config);
            b.iter(|| {
                for size in (1..64).cycle().take(512) {
                    black_box(arena.alloc(size, 8).unwrap());
                }
                // Bound the chain so AlwaysSplice doesn't grow without limit
                if arena.block_count() > 64 {
                    arena.free();
                } else {
                    arena.reset();
                }
            });
        });
    }

    group.finish();
}

/// Benchmark packing a multi-block arena
fn bench_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack");

    for size in [1_024, 65_536, 1_048_576].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::new("Arena", size), size, |b, &size| {
            let mut arena = Arena::new(1024);
            for chunk in 0..size / 64 {
                arena.alloc_unaligned(64).unwrap().fill(chunk as u8);
            }
            b.iter(|| black_box(arena.pack().unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_frame, bench_growth, bench_pack);
criterion_main!(benches);
