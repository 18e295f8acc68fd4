use criterion::*;
use std::hint::black_box;

mod common;
use common::*;

fn spawn_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");

    group.bench_function("create_10k", |b| {
        b.iter_batched(
            make_world,
            |mut fixture| {
                for _ in 0..CAPACITY {
                    black_box(fixture.world.create_entity().unwrap());
                }
                black_box(fixture);
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("create_with_components_5k", |b| {
        b.iter_batched(
            make_world,
            |mut fixture| {
                populate(&mut fixture, 5_000);
                black_box(fixture);
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("destroy_5k", |b| {
        b.iter_batched(
            || {
                let mut fixture = make_world();
                populate(&mut fixture, 5_000);
                fixture
            },
            |mut fixture| {
                fixture.world.purge().unwrap();
                black_box(fixture);
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, spawn_benchmark);
criterion_main!(benches);
