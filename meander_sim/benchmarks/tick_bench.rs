use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use meander_sim::scenario::seed_springs;
use meander_sim::{CollisionGrid, FlatTerrain, NullPresenter, RiverConfig, WaterCycle};

fn grown_network(springs: usize, ticks: usize) -> (WaterCycle, RiverConfig) {
    let mut config = RiverConfig {
        total_coeff: 0.05,
        ..RiverConfig::default()
    };
    let terrain = FlatTerrain::default();
    let mut cycle = WaterCycle::new();
    seed_springs(&mut cycle, &config, &terrain, springs, 64.0, 7);
    for _ in 0..ticks {
        cycle.tick(&mut config, &terrain, &mut NullPresenter);
    }
    (cycle, config)
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    for springs in [1usize, 4, 16, 32] {
        group.bench_with_input(BenchmarkId::new("springs", springs), &springs, |b, &springs| {
            b.iter_batched(
                || grown_network(springs, 50),
                |(mut cycle, mut config)| {
                    cycle.tick(&mut config, &FlatTerrain::default(), &mut NullPresenter);
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_collision_grid(c: &mut Criterion) {
    let (cycle, _) = grown_network(32, 100);
    c.bench_function("collision_grid/32_springs", |b| {
        b.iter(|| CollisionGrid::build(cycle.collision_points()).collisions())
    });
}

criterion_group!(tick_benches, bench_tick, bench_collision_grid);
criterion_main!(tick_benches);
