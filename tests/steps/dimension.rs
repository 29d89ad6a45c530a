use std::collections::BTreeMap;

use space_compression::importance::{ImportanceProvider, ImportanceScores};
use space_compression::step::{CompressionStep, DimensionSelection};
use space_compression::{
    Configuration, Direction, Error, History, Parameter, ParameterSpace, Result, SourceSimilarities,
};

fn space() -> ParameterSpace {
    ParameterSpace::new((0..4).map(|i| Parameter::float(format!("x{i}"), 0.0, 1.0))).unwrap()
}

fn sampled(seed: u64, task: &str, objective: impl Fn(&Configuration) -> f64) -> History {
    let space = space();
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut history = History::new(Direction::Minimize).with_task_id(task);
    for _ in 0..60 {
        let cfg = space.sample(&mut rng);
        let y = objective(&cfg);
        history.push(cfg, y);
    }
    history
}

/// Scores every parameter by a fixed table chosen from the history's task id.
#[derive(Debug)]
struct TaskTable(BTreeMap<String, Vec<f64>>);

impl ImportanceProvider for TaskTable {
    fn name(&self) -> &'static str {
        "task_table"
    }

    fn importance(&self, space: &ParameterSpace, history: &History) -> Result<ImportanceScores> {
        let row = history
            .task_id()
            .and_then(|id| self.0.get(id))
            .ok_or_else(|| Error::Estimator("unknown task".into()))?;
        Ok(space.names().into_iter().map(str::to_owned).zip(row.iter().copied()).collect())
    }
}

fn table() -> TaskTable {
    TaskTable(
        [
            ("a".to_owned(), vec![0.9, 0.1, 0.8, 0.0]),
            ("b".to_owned(), vec![0.0, 1.0, 0.0, 0.9]),
        ]
        .into_iter()
        .collect(),
    )
}

#[test]
fn custom_provider_drives_selection() {
    let mut step = DimensionSelection::top_k(table(), 2);
    let out = step.apply(&space(), &[sampled(1, "a", |_| 0.0)], None).unwrap();
    assert_eq!(out.names(), vec!["x0", "x2"]);
    assert_eq!(step.selected().unwrap(), ["x0", "x2"]);
    assert!((step.scores().unwrap()["x0"] - 0.9).abs() < f64::EPSILON);
}

#[test]
fn similarity_decides_between_sources() {
    let histories = [sampled(1, "a", |_| 0.0), sampled(2, "b", |_| 0.0)];
    let mut step = DimensionSelection::top_k(table(), 2);

    let favour_b = SourceSimilarities::from_weights(&[0.1, 0.9]);
    let out = step.apply(&space(), &histories, Some(&favour_b)).unwrap();
    assert_eq!(out.names(), vec!["x1", "x3"]);

    let only_a = SourceSimilarities::from_weights(&[1.0, 0.0]);
    let out = step.apply(&space(), &histories, Some(&only_a)).unwrap();
    assert_eq!(out.names(), vec!["x0", "x2"]);
}

#[test]
fn failing_provider_keeps_declared_prefix() {
    let mut step = DimensionSelection::top_k(table(), 3);
    let out = step.apply(&space(), &[sampled(3, "unknown", |_| 0.0)], None).unwrap();
    assert_eq!(out.names(), vec!["x0", "x1", "x2"]);
}

#[test]
fn fanova_finds_non_monotone_effect() {
    let history = sampled(4, "bowl", |cfg| (cfg["x2"].as_f64() - 0.5).powi(2));
    let mut step = DimensionSelection::fanova(1);
    let out = step.apply(&space(), &[history], None).unwrap();
    assert_eq!(out.names(), vec!["x2"]);
}

#[test]
fn include_then_top_k_chain() {
    let history = sampled(5, "line", |cfg| cfg["x3"].as_f64());
    let mut include = DimensionSelection::include(["x1", "x3"]);
    let narrowed = include.apply(&space(), &[history.clone()], None).unwrap();
    let mut top = DimensionSelection::correlation(1);
    let out = top.apply(&narrowed, &[history], None).unwrap();
    assert_eq!(out.names(), vec!["x3"]);
}

#[test]
fn zero_weight_source_cannot_decide_alone() {
    let histories = [sampled(6, "unknown", |_| 0.0), sampled(7, "b", |_| 0.0)];
    let only_failing = SourceSimilarities::from_weights(&[1.0, 0.0]);
    let mut step = DimensionSelection::top_k(table(), 2);
    let out = step.apply(&space(), &histories, Some(&only_failing)).unwrap();
    assert_eq!(out.names(), vec!["x0", "x1"]);
    assert!(step.scores().unwrap().values().all(|s| s.abs() < f64::EPSILON));
}
