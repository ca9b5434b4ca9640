use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferrous_injector::*;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

// ===== Micro Benchmarks =====

fn bench_value_hit(c: &mut Criterion) {
    let rt = runtime();
    let token = Token::of::<u64>();
    let injector = Injector::builder()
        .provider(Provider::value(token.clone(), 42u64))
        .build()
        .unwrap();
    rt.block_on(injector.ready());

    c.bench_function("value_hit_u64", |b| {
        b.iter(|| {
            let v = rt.block_on(injector.inject::<u64>(&token)).unwrap();
            black_box(v);
        })
    });
}

fn bench_singleton_vs_factory(c: &mut Criterion) {
    struct Service {
        data: [u8; 64],
    }

    let rt = runtime();
    let singleton = Token::named("Singleton");
    let factory = Token::named("Factory");
    let injector = Injector::builder()
        .provider(Provider::factory(singleton.clone(), vec![], |_| Ok(Service { data: [0; 64] })).singleton())
        .provider(Provider::factory(factory.clone(), vec![], |_| Ok(Service { data: [0; 64] })))
        .build()
        .unwrap();

    // Prime the singleton
    rt.block_on(injector.inject::<Service>(&singleton)).unwrap();

    let mut group = c.benchmark_group("singleton_vs_factory");
    group.bench_function("singleton_hit", |b| {
        b.iter(|| {
            let v = rt.block_on(injector.inject::<Service>(&singleton)).unwrap();
            black_box(v.data[0]);
        })
    });
    group.bench_function("factory", |b| {
        b.iter(|| {
            let v = rt.block_on(injector.inject::<Service>(&factory)).unwrap();
            black_box(v.data[0]);
        })
    });
    group.finish();
}

fn bench_singleton_cold(c: &mut Criterion) {
    struct ExpensiveToCreate {
        data: Vec<u64>,
    }

    let rt = runtime();
    let token = Token::named("Expensive");
    c.bench_function("singleton_cold_expensive", |b| {
        b.iter_batched(
            || {
                Injector::builder()
                    .provider(
                        Provider::factory(token.clone(), vec![], |_| {
                            Ok(ExpensiveToCreate {
                                data: (0..1000).collect(),
                            })
                        })
                        .singleton(),
                    )
                    .build()
                    .unwrap()
            },
            |injector| {
                let v = rt.block_on(injector.inject::<ExpensiveToCreate>(&token)).unwrap();
                black_box(v.data.len());
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_multi_binding_scaling(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("multi_binding_scaling");

    for count in [1usize, 8, 32, 128] {
        let token = Token::named("Plugin");
        let injector = Injector::builder()
            .providers((0..count).map(|i| Provider::value(token.clone(), i).multi()))
            .build()
            .unwrap();

        group.bench_with_input(BenchmarkId::new("inject_all", count), &count, |b, _| {
            b.iter(|| {
                let all = rt.block_on(injector.inject_all::<usize>(&token)).unwrap();
                black_box(all.len());
            })
        });
    }
    group.finish();
}

fn bench_scope_lifecycle(c: &mut Criterion) {
    let rt = runtime();
    let token = Token::named("Config");
    let root = Injector::builder()
        .provider(Provider::value(token.clone(), "prod".to_string()))
        .build()
        .unwrap();

    let mut group = c.benchmark_group("scope_lifecycle");
    group.bench_function("empty_scope_create_dispose", |b| {
        b.iter(|| {
            let child = root.create_child(Scope::named("request"), vec![]).unwrap();
            rt.block_on(child.dispose("done"));
        })
    });
    group.bench_function("scope_with_parent_lookup", |b| {
        b.iter(|| {
            let child = root.create_child(Scope::named("request"), vec![]).unwrap();
            let v = rt.block_on(child.inject::<String>(&token)).unwrap();
            black_box(v.len());
            rt.block_on(child.dispose("done"));
        })
    });
    group.finish();
}

fn bench_dependency_chain(c: &mut Criterion) {
    let rt = runtime();
    let tokens: Vec<Token> = (0..8).map(|i| Token::named(format!("Link{i}"))).collect();
    let mut providers: Vec<Provider> = tokens
        .windows(2)
        .map(|pair| {
            Provider::factory(pair[0].clone(), vec![Dependency::new(&pair[1])], |args| {
                Ok(*args.get::<usize>(0)? + 1)
            })
        })
        .collect();
    providers.push(Provider::value(tokens[7].clone(), 0usize));
    let injector = Injector::builder().providers(providers).build().unwrap();

    let mut group = c.benchmark_group("dependency_chain");
    group.bench_function("chain_depth_8", |b| {
        b.iter(|| {
            let v = rt.block_on(injector.inject::<usize>(&tokens[0])).unwrap();
            black_box(*v);
        })
    });
    group.finish();
}

fn bench_contention(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .build()
        .unwrap();
    let mut group = c.benchmark_group("contention");

    for tasks in [2usize, 8, 32] {
        group.bench_with_input(BenchmarkId::new("cold_singleton", tasks), &tasks, |b, &tasks| {
            b.iter(|| {
                let token = Token::named("Shared");
                let injector = Injector::builder()
                    .provider(Provider::factory(token.clone(), vec![], |_| Ok(Arc::new(0u64))).singleton())
                    .build()
                    .unwrap();
                rt.block_on(async {
                    let handles: Vec<_> = (0..tasks)
                        .map(|_| {
                            let injector = injector.clone();
                            let token = token.clone();
                            tokio::spawn(async move { injector.inject::<Arc<u64>>(&token).await })
                        })
                        .collect();
                    for handle in handles {
                        black_box(handle.await.unwrap().unwrap());
                    }
                });
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_value_hit,
    bench_singleton_vs_factory,
    bench_singleton_cold,
    bench_multi_binding_scaling,
    bench_scope_lifecycle,
    bench_dependency_chain,
    bench_contention
);
criterion_main!(benches);
