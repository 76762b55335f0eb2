//! Index and query benchmarks using criterion.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rgb_index::{ComponentType, Engine, Entity, EntityRecord, QueryMask};

#[derive(Clone, Copy, Default)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy, Default)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy, Default)]
struct Health(f32);

struct Fixture {
    engine: Engine,
    records: Vec<EntityRecord>,
    pos: ComponentType<Position>,
    vel: ComponentType<Velocity>,
    health: ComponentType<Health>,
}

/// `count` entities spread over four signatures.
fn populated(count: u32) -> Fixture {
    let mut engine = Engine::new();
    let pos = engine.register::<Position>();
    let vel = engine.register::<Velocity>();
    let health = engine.register::<Health>();

    let records: Vec<EntityRecord> = (0..count)
        .map(|i| {
            let mut record = EntityRecord::new(Entity::from_raw(i));
            record.add_component(pos, Position::default()).unwrap();
            if i % 2 == 0 {
                record.add_component(vel, Velocity::default()).unwrap();
            }
            if i % 3 == 0 {
                record.add_component(health, Health(100.0)).unwrap();
            }
            engine.add_entity(&record);
            record
        })
        .collect();

    Fixture {
        engine,
        records,
        pos,
        vel,
        health,
    }
}

fn index_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("index");

    for count in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(u64::from(count)));

        group.bench_with_input(BenchmarkId::new("add_entity", count), &count, |b, &count| {
            b.iter(|| black_box(populated(count).engine.entity_count()));
        });

        group.bench_with_input(
            BenchmarkId::new("set_entities", count),
            &count,
            |b, &count| {
                let Fixture {
                    mut engine, records, ..
                } = populated(count);
                b.iter(|| {
                    engine.set_entities(&records);
                    black_box(engine.entity_count());
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("toggle_component", count),
            &count,
            |b, &count| {
                let mut fixture = populated(count);
                let health = fixture.health;
                b.iter(|| {
                    for record in &mut fixture.records {
                        if record.has_component(health) {
                            record.remove_component(health).unwrap();
                        } else {
                            record.add_component(health, Health(1.0)).unwrap();
                        }
                        fixture.engine.update_entity(record);
                    }
                });
            },
        );
    }

    group.finish();
}

fn query_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    for count in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(u64::from(count)));

        group.bench_with_input(BenchmarkId::new("cold", count), &count, |b, &count| {
            let fixture = populated(count);
            let mask = QueryMask::new(&[fixture.pos.id(), fixture.vel.id()]);
            b.iter(|| black_box(fixture.engine.query_uncached(&mask).count()));
        });

        group.bench_with_input(BenchmarkId::new("warm", count), &count, |b, &count| {
            let mut fixture = populated(count);
            let mask = QueryMask::new(&[fixture.pos.id(), fixture.vel.id()]);
            fixture.engine.query(&mask);
            b.iter(|| black_box(fixture.engine.query(&mask).count()));
        });

        group.bench_with_input(BenchmarkId::new("excluding", count), &count, |b, &count| {
            let fixture = populated(count);
            let mask = QueryMask::new(&[fixture.pos.id()]).without(&[fixture.health.id()]);
            b.iter(|| black_box(fixture.engine.query_uncached(&mask).count()));
        });
    }

    group.finish();
}

fn reactive_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("reactive");

    for subscribers in [1, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("update_notify", subscribers),
            &subscribers,
            |b, &subscribers| {
                let mut fixture = populated(1000);
                let vel = fixture.vel;
                for _ in 0..subscribers {
                    let query = fixture.engine.create_reactive_query(&[fixture.pos.id(), vel.id()]);
                    fixture
                        .engine
                        .subscribe(query, |change| {
                            black_box(change.added.len());
                        })
                        .unwrap();
                }

                let record = &mut fixture.records[1];
                b.iter(|| {
                    if record.has_component(vel) {
                        record.remove_component(vel).unwrap();
                    } else {
                        record.add_component(vel, Velocity::default()).unwrap();
                    }
                    fixture.engine.update_entity(record);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, index_benchmarks, query_benchmarks, reactive_benchmarks);
criterion_main!(benches);
