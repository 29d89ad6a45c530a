use space_compression::step::{DimensionSelection, KernelPca, Quantization, RandomEmbedding};
use space_compression::{CompressionPipeline, Direction, History, Parameter, ParameterSpace};

fn space(d: usize) -> ParameterSpace {
    ParameterSpace::new((0..d).map(|i| Parameter::float(format!("x{i}"), -2.0, 2.0))).unwrap()
}

fn history(space: &ParameterSpace, seed: u64) -> History {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut history = History::new(Direction::Minimize);
    for _ in 0..30 {
        let cfg = space.sample(&mut rng);
        let y = cfg["x0"].as_f64().powi(2) + cfg["x1"].as_f64();
        history.push(cfg, y);
    }
    history
}

#[test]
fn rembo_candidates_complete_into_the_original_space() {
    let original = space(6);
    let mut pipeline = CompressionPipeline::builder(original.clone())
        .step(DimensionSelection::correlation(4))
        .step(RandomEmbedding::rembo(2))
        .seed(3)
        .build()
        .unwrap();
    let (_, sample) = pipeline.compress_space(&[history(&original, 1)], None).unwrap();
    assert_eq!(sample.names(), vec!["rembo_0", "rembo_1"]);
    assert_eq!(pipeline.get_unprojected_space().unwrap().len(), 4);

    let strategy = pipeline.get_sampling_strategy().unwrap();
    for candidate in strategy.sample(25) {
        let full = pipeline.complete_config(&pipeline.unproject_point(&candidate).unwrap());
        assert!(original.contains(&full), "{full:?}");
    }
}

#[test]
fn quantized_hesbo_levels_are_integers() {
    let original = space(5);
    let mut pipeline = CompressionPipeline::builder(original.clone())
        .step(RandomEmbedding::hesbo(3).quantized(8))
        .build()
        .unwrap();
    let (_, sample) = pipeline.compress_space(&[], None).unwrap();
    for param in &sample {
        assert_eq!(param.domain().cardinality(), Some(8));
    }
    let candidate = pipeline.get_sampling_strategy().unwrap().sample(1).remove(0);
    let back = pipeline.unproject_point(&candidate).unwrap();
    assert!(original.contains(&back));
}

#[test]
fn kernel_pca_only_touches_the_surrogate() {
    let original = ParameterSpace::new([
        Parameter::float("x0", -2.0, 2.0),
        Parameter::float("x1", -2.0, 2.0),
        Parameter::int("n", 0, 50_000),
    ])
    .unwrap();
    let mut pipeline = CompressionPipeline::builder(original.clone())
        .step(Quantization::new(16))
        .step(KernelPca::new(2))
        .build()
        .unwrap();
    let (surrogate, sample) = pipeline.compress_space(&[history(&original, 2)], None).unwrap();
    assert_eq!(sample.names(), vec!["x0", "x1", "n|q"]);
    assert_eq!(surrogate.names(), vec!["kpca_0", "kpca_1"]);
    assert!(pipeline.needs_unprojection());
    assert_eq!(pipeline.get_unprojected_space().unwrap(), &original);

    let point = original.default_config();
    let in_surrogate = pipeline.convert_config_to_surrogate_space(&point).unwrap();
    assert!(surrogate.contains(&in_surrogate));
    let in_sample = pipeline.convert_config_to_sample_space(&point).unwrap();
    assert!(sample.contains(&in_sample));
}
