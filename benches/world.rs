use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use statecs::prelude::*;

#[derive(Clone, Debug)]
struct CompInt(i32);

#[derive(Clone, Debug)]
struct CompBool(bool);

struct Hot;

statecs::schema! {
    struct Bench {
        components {
            ints: CompInt,
            bools: CompBool,
        }
        tags { Hot }
    }
}

fn populated() -> EntityManager<Bench> {
    let mut m = EntityManager::new();
    for i in 0..1024 {
        let mut e = m.create();
        m.add_component(&mut e, CompInt(i)).unwrap();
        // CompBool is the sparse side, so pair queries iterate it.
        if i % 32 == 0 {
            m.add_component(&mut e, CompBool(i % 64 == 0)).unwrap();
        }
        if i % 2 == 0 {
            m.set_tag::<Hot>(&mut e, true).unwrap();
        }
    }
    m
}

fn create(c: &mut Criterion) {
    c.bench_function("create_entity", |b| {
        b.iter_batched(
            EntityManager::<Bench>::new,
            |mut m| {
                m.create();
                m
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("create_entity_with_component", |b| {
        b.iter_batched(
            EntityManager::<Bench>::new,
            |mut m| {
                let mut e = m.create();
                m.add_component(&mut e, CompInt(0)).unwrap();
                m
            },
            BatchSize::SmallInput,
        )
    });
}

fn iterate(c: &mut Criterion) {
    let mut m = populated();

    c.bench_function("for_each_sparse_pair", |b| {
        b.iter(|| {
            let mut sum = 0;
            m.for_each::<(CompInt, CompBool), _>(|_entity, (int, _)| sum += int.0);
            black_box(sum)
        })
    });

    c.bench_function("for_each_tagged", |b| {
        b.iter(|| {
            let mut count = 0;
            m.for_each::<(Hot,), _>(|_entity, _| count += 1);
            black_box(count)
        })
    });

    c.bench_function("get_entities_all", |b| {
        b.iter(|| black_box(m.get_entities::<()>().len()))
    });
}

criterion_group!(benches, create, iterate);
criterion_main!(benches);
