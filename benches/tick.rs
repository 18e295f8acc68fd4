use criterion::*;
use std::hint::black_box;

mod common;
use common::*;

/// One simulated frame: integrate positions through the change-tracked
/// proxy, then close the refresh window.
fn tick(fixture: &mut Fixture, entities: &[u32]) {
    let speeds: Vec<(f64, f64)> = {
        let dx: &[f64] = fixture.world.view(&fixture.velocity, "dx").unwrap();
        let dy: &[f64] = fixture.world.view(&fixture.velocity, "dy").unwrap();
        entities
            .iter()
            .map(|&entity| (dx[entity as usize], dy[entity as usize]))
            .collect()
    };

    let mut proxy = fixture.world.proxy(&fixture.position).unwrap();
    for (&entity, &(dx, dy)) in entities.iter().zip(&speeds) {
        proxy.set_entity(entity).unwrap();
        let x = proxy.get("x").unwrap();
        let y = proxy.get("y").unwrap();
        proxy.set("x", x + dx).unwrap();
        proxy.set("y", y + dy).unwrap();
    }
    drop(proxy);

    fixture.world.refresh(false).unwrap();
}

fn tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    group.bench_function("integrate_and_refresh_10k", |b| {
        b.iter_batched(
            || {
                let mut fixture = make_world();
                populate(&mut fixture, CAPACITY);
                let query = moving_query(&fixture);
                let entities = fixture.world.query_entities(&query).unwrap();
                (fixture, entities)
            },
            |(mut fixture, entities)| {
                tick(&mut fixture, &entities);
                black_box(fixture);
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("refresh_only_10k", |b| {
        b.iter_batched(
            || {
                let mut fixture = make_world();
                populate(&mut fixture, CAPACITY);
                fixture
            },
            |mut fixture| {
                fixture.world.refresh(false).unwrap();
                black_box(fixture);
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, tick_benchmark);
criterion_main!(benches);
