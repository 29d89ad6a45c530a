use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use space_compression::importance::{CorrelationImportance, ImportanceProvider};
use space_compression::step::{DimensionSelection, Quantization, RandomEmbedding, RangeCompression};
use space_compression::{CompressionPipeline, Direction, FanovaImportance, History, Parameter, ParameterSpace};

/// A space of `dims` float parameters plus one wide integer.
fn build_space(dims: usize) -> ParameterSpace {
    let mut params: Vec<Parameter> = (0..dims)
        .map(|i| Parameter::float(format!("x{i}"), -5.0, 5.0))
        .collect();
    params.push(Parameter::int("n", 0, 100_000));
    ParameterSpace::new(params).unwrap()
}

/// `n` random evaluations of the sphere function.
fn build_history(space: &ParameterSpace, n: usize) -> History {
    let mut rng = fastrand::Rng::with_seed(42);
    let mut history = History::new(Direction::Minimize);
    for _ in 0..n {
        let cfg = space.sample(&mut rng);
        let value: f64 = cfg
            .iter()
            .filter(|(name, _)| name.starts_with('x'))
            .map(|(_, v)| v.as_f64() * v.as_f64())
            .sum();
        history.push(cfg, value);
    }
    history
}

fn bench_importance(c: &mut Criterion) {
    let mut group = c.benchmark_group("importance");
    let space = build_space(20);
    let spearman = CorrelationImportance::spearman();
    let fanova = FanovaImportance::default();

    for history_size in [50, 200, 1000] {
        let history = build_history(&space, history_size);
        group.bench_with_input(
            BenchmarkId::new("spearman", history_size),
            &history,
            |b, history| {
                b.iter(|| spearman.importance(&space, history).unwrap());
            },
        );
        if history_size <= 200 {
            group.bench_with_input(
                BenchmarkId::new("fanova", history_size),
                &history,
                |b, history| {
                    b.iter(|| fanova.importance(&space, history).unwrap());
                },
            );
        }
    }
    group.finish();
}

fn bench_compress_space(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress_space");

    for dims in [10, 50, 200] {
        let space = build_space(dims);
        let history = build_history(&space, 200);
        group.bench_with_input(BenchmarkId::new("dims", dims), &history, |b, history| {
            b.iter(|| {
                let mut pipeline = CompressionPipeline::builder(space.clone())
                    .step(DimensionSelection::correlation(dims / 2))
                    .step(RangeCompression::boundary(0.8, 2.0))
                    .step(Quantization::new(10))
                    .build()
                    .unwrap();
                pipeline
                    .compress_space(core::slice::from_ref(history), None)
                    .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_unproject(c: &mut Criterion) {
    let mut group = c.benchmark_group("unproject_point");
    let space = build_space(100);
    let history = build_history(&space, 100);

    for low_dim in [2, 10, 50] {
        let mut pipeline = CompressionPipeline::builder(space.clone())
            .step(RandomEmbedding::rembo(low_dim))
            .build()
            .unwrap();
        pipeline
            .compress_space(core::slice::from_ref(&history), None)
            .unwrap();
        let candidates = pipeline.get_sampling_strategy().unwrap().sample(64);
        group.bench_with_input(
            BenchmarkId::new("rembo", low_dim),
            &candidates,
            |b, candidates| {
                b.iter(|| {
                    for candidate in candidates {
                        let point = pipeline.unproject_point(candidate).unwrap();
                        std::hint::black_box(pipeline.complete_config(&point));
                    }
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_importance,
    bench_compress_space,
    bench_unproject
);
criterion_main!(benches);
