use space_compression::kde::DensityProvider;
use space_compression::step::{CompressionStep, Quantization, RangeCompression};
use space_compression::{
    Configuration, Direction, History, ParamValue, Parameter, ParameterSpace, Result, SourceSimilarities,
};

use crate::history_of;

fn unit_space() -> ParameterSpace {
    ParameterSpace::new([Parameter::float("x", 0.0, 100.0)]).unwrap()
}

fn bounds_of(space: &ParameterSpace) -> (f64, f64) {
    space.get("x").unwrap().domain().bounds().unwrap()
}

#[test]
fn sources_are_pooled_by_similarity() {
    let near = history_of(&[(10.0, 1.0), (10.0, 2.0)], Direction::Minimize);
    let far = history_of(&[(30.0, 1.0), (30.0, 2.0)], Direction::Minimize);
    let similarities = SourceSimilarities::from_weights(&[0.75, 0.25]);

    let mut step = RangeCompression::boundary(1.0, 1.0);
    let out = step.apply(&unit_space(), &[near, far], Some(&similarities)).unwrap();
    // Weighted mean 15, weighted variance 75.
    let (low, high) = bounds_of(&out);
    let half = 75.0_f64.sqrt();
    assert!((low - (15.0 - half)).abs() < 1e-9, "low = {low}");
    assert!((high - (15.0 + half)).abs() < 1e-9, "high = {high}");
}

#[test]
fn zero_similarity_source_does_not_move_the_interval() {
    let near = history_of(&[(18.0, 1.0), (22.0, 1.0)], Direction::Minimize);
    let far = history_of(&[(80.0, 0.0), (90.0, 0.0)], Direction::Minimize);
    let similarities = SourceSimilarities::from_weights(&[1.0, 0.0]);

    let mut step = RangeCompression::boundary(1.0, 2.0);
    let out = step.apply(&unit_space(), &[near, far], Some(&similarities)).unwrap();
    let (low, high) = bounds_of(&out);
    assert!((low - 16.0).abs() < 1e-9);
    assert!((high - 24.0).abs() < 1e-9);
}

#[test]
fn weighted_method_centres_on_the_best() {
    let history = history_of(&[(10.0, 0.0), (30.0, 1.0), (90.0, 2.0)], Direction::Minimize);
    let mut step = RangeCompression::weighted(1.0, 1.0);
    let out = step.apply(&unit_space(), &[history], None).unwrap();
    let (low, high) = bounds_of(&out);
    // Weights 1, 1/2 and 0.
    assert!(((low + high) / 2.0 - 50.0 / 3.0).abs() < 1e-9);
    assert!(high < 90.0);
    assert!(low < 10.0);
}

#[test]
fn maximize_keeps_the_high_values() {
    let history = history_of(
        &[(70.0, 9.0), (74.0, 8.0), (10.0, 0.0), (12.0, 1.0), (14.0, 0.5)],
        Direction::Maximize,
    );
    let mut step = RangeCompression::boundary(0.4, 1.0);
    let out = step.apply(&unit_space(), &[history], None).unwrap();
    let (low, high) = bounds_of(&out);
    assert!((low - 70.0).abs() < 1e-9);
    assert!((high - 74.0).abs() < 1e-9);
}

/// Always claims the same interval.
#[derive(Debug)]
struct FixedDensity(f64, f64);

impl DensityProvider for FixedDensity {
    fn coverage_interval(&self, _values: &[f64], _weights: &[f64], _bounds: (f64, f64), _coverage: f64) -> Result<(f64, f64)> {
        Ok((self.0, self.1))
    }
}

#[test]
fn custom_density_is_clipped_to_bounds() {
    let history = history_of(&[(20.0, 1.0), (25.0, 2.0), (30.0, 3.0)], Direction::Minimize);
    let mut step = RangeCompression::density(1.0, 0.6).density_provider(FixedDensity(-10.0, 40.0));
    let out = step.apply(&unit_space(), &[history], None).unwrap();
    assert_eq!(bounds_of(&out), (0.0, 40.0));
}

#[test]
fn quantizing_a_compressed_range() {
    let space = ParameterSpace::new([Parameter::int("n", 0, 100_000)]).unwrap();
    let mut history = History::new(Direction::Minimize);
    for (n, y) in [(40_000, 1.0), (60_000, 1.0), (40_000, 1.5), (60_000, 1.5), (5, 9.0)] {
        let mut cfg = Configuration::new();
        cfg.insert("n".into(), ParamValue::Int(n));
        history.push(cfg, y);
    }
    let mut range = RangeCompression::boundary(0.8, 1.0);
    let narrowed = range.apply(&space, &[history.clone()], None).unwrap();
    assert_eq!(narrowed.get("n").unwrap().domain().bounds(), Some((40_000.0, 60_000.0)));

    let mut quantization = Quantization::new(20);
    let levels = quantization.apply(&narrowed, &[history], None).unwrap();
    for level in 1..=20 {
        let mut point = Configuration::new();
        point.insert("n|q".into(), ParamValue::Int(level));
        let back = quantization.unproject_point(&point).unwrap();
        assert!(narrowed.contains(&back), "level {level} gave {back:?}");
    }
    assert_eq!(levels.get("n|q").unwrap().domain().cardinality(), Some(20));
}
