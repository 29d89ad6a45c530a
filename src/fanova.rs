//! Random-forest functional ANOVA.
//!
//! [`FanovaImportance`] fits a bagged regression forest on unit-scaled
//! configurations and scores each parameter by the variance of the forest's
//! one-dimensional marginal `E[f | x_j]`, evaluated at the observed values of
//! `x_j`. Scores are shares of the summed main-effect variance.
//!
//! See Hutter, Hoos & Leyton-Brown, "An Efficient Approach for Assessing
//! Hyperparameter Importance", ICML 2014.
//!
//! # Example
//!
//! ```
//! use space_compression::importance::ImportanceProvider;
//! use space_compression::{
//!     Configuration, Direction, FanovaImportance, History, ParamValue, Parameter, ParameterSpace,
//! };
//!
//! let space = ParameterSpace::new([
//!     Parameter::float("x", 0.0, 10.0),
//!     Parameter::float("y", 0.0, 10.0),
//! ])
//! .unwrap();
//! let mut rng = fastrand::Rng::with_seed(0);
//! let mut history = History::new(Direction::Minimize);
//! for _ in 0..60 {
//!     let cfg = space.sample(&mut rng);
//!     let x = cfg["x"].as_f64();
//!     history.push(cfg, 3.0 * x);
//! }
//! let scores = FanovaImportance::default().importance(&space, &history).unwrap();
//! assert!(scores["x"] > scores["y"]);
//! ```

use crate::error::{Error, Result};
use crate::history::History;
use crate::importance::{ImportanceProvider, ImportanceScores};
use crate::space::ParameterSpace;

/// Forest settings for [`FanovaImportance`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FanovaConfig {
    /// Trees in the forest (default: 64).
    pub n_trees: usize,
    /// Depth limit per tree. `None` grows until leaves are pure or too small (default: `None`).
    pub max_depth: Option<usize>,
    /// Smallest node that may still be split (default: 2).
    pub min_samples_split: usize,
    /// Smallest allowed child (default: 1).
    pub min_samples_leaf: usize,
    /// Features tried per split. `None` uses `ceil(sqrt(d))` (default: `None`).
    pub max_features: Option<usize>,
    /// Seed for bootstrapping and feature sampling (default: 42).
    pub seed: u64,
}

impl Default for FanovaConfig {
    fn default() -> Self {
        Self {
            n_trees: 64,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }
}

/// Importance provider backed by fANOVA main effects.
#[derive(Debug, Clone, Default)]
pub struct FanovaImportance {
    config: FanovaConfig,
}

impl FanovaImportance {
    /// Creates a provider with the given forest settings.
    #[must_use]
    pub fn new(config: FanovaConfig) -> Self {
        Self { config }
    }

    /// The forest settings.
    #[must_use]
    pub fn config(&self) -> &FanovaConfig {
        &self.config
    }
}

impl ImportanceProvider for FanovaImportance {
    fn name(&self) -> &'static str {
        "fanova"
    }

    fn importance(&self, space: &ParameterSpace, history: &History) -> Result<ImportanceScores> {
        if space.is_empty() || self.config.n_trees == 0 {
            return Err(Error::Estimator("fANOVA needs parameters and trees".into()));
        }
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for obs in history.valid() {
            rows.push(space.to_unit(&obs.config));
            targets.push(obs.objective);
        }
        if rows.len() < 2 {
            return Err(Error::Estimator(format!(
                "fANOVA needs at least two observations, got {}",
                rows.len()
            )));
        }

        let forest = Forest::fit(&rows, &targets, &self.config);
        let shares = forest.main_effects(&rows);
        trace_debug!(trees = forest.trees.len(), observations = rows.len(), "fANOVA forest fitted");
        Ok(space
            .names()
            .into_iter()
            .map(str::to_owned)
            .zip(shares)
            .collect())
    }
}

/// A tree node. `mass` is the fraction of the tree's bootstrap sample that
/// reaches it.
#[derive(Debug, Clone, Copy)]
struct Node {
    mass: f64,
    kind: NodeKind,
}

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Leaf(f64),
    Branch {
        feature: usize,
        cut: f64,
        below: usize,
        above: usize,
    },
}

/// Regression tree stored as an arena; node 0 is the root.
#[derive(Debug)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Prediction with `feature` fixed to `value` and every other feature
    /// integrated out by branch mass.
    fn marginal(&self, feature: usize, value: f64) -> f64 {
        self.marginal_from(0, feature, value)
    }

    fn marginal_from(&self, at: usize, feature: usize, value: f64) -> f64 {
        let node = self.nodes[at];
        match node.kind {
            NodeKind::Leaf(mean) => mean,
            NodeKind::Branch {
                feature: f,
                cut,
                below,
                above,
            } if f == feature => {
                let next = if value <= cut { below } else { above };
                self.marginal_from(next, feature, value)
            }
            NodeKind::Branch { below, above, .. } => {
                let low = self.nodes[below].mass * self.marginal_from(below, feature, value);
                let high = self.nodes[above].mass * self.marginal_from(above, feature, value);
                (low + high) / node.mass
            }
        }
    }
}

struct Split {
    feature: usize,
    cut: f64,
    gain: f64,
}

/// Grows one tree over a bootstrap sample of row indices.
struct Grower<'a> {
    rows: &'a [Vec<f64>],
    targets: &'a [f64],
    config: &'a FanovaConfig,
    tried: usize,
    total: f64,
    nodes: Vec<Node>,
}

impl Grower<'_> {
    #[allow(clippy::cast_precision_loss)]
    fn grow(&mut self, sample: &mut [usize], depth: usize, rng: &mut fastrand::Rng) -> usize {
        let mean = sample.iter().map(|&i| self.targets[i]).sum::<f64>() / sample.len() as f64;
        let at = self.nodes.len();
        self.nodes.push(Node {
            mass: sample.len() as f64 / self.total,
            kind: NodeKind::Leaf(mean),
        });

        let splittable = sample.len() >= self.config.min_samples_split.max(2)
            && self.config.max_depth.is_none_or(|limit| depth < limit);
        if !splittable {
            return at;
        }
        let Some(split) = self.best_split(sample, rng) else {
            return at;
        };

        let rows = self.rows;
        sample.sort_unstable_by_key(|&i| rows[i][split.feature] > split.cut);
        let boundary = sample
            .iter()
            .take_while(|&&i| rows[i][split.feature] <= split.cut)
            .count();
        if boundary == 0 || boundary == sample.len() {
            return at;
        }
        let (low, high) = sample.split_at_mut(boundary);
        let below = self.grow(low, depth + 1, rng);
        let above = self.grow(high, depth + 1, rng);
        self.nodes[at].kind = NodeKind::Branch {
            feature: split.feature,
            cut: split.cut,
            below,
            above,
        };
        at
    }

    /// The cut with the largest squared-error reduction over a random subset
    /// of features, found by one prefix-sum sweep per feature.
    #[allow(clippy::cast_precision_loss, clippy::float_cmp)]
    fn best_split(&self, sample: &[usize], rng: &mut fastrand::Rng) -> Option<Split> {
        let first = self.targets[sample[0]];
        if sample.iter().all(|&i| self.targets[i] == first) {
            return None;
        }
        let n = sample.len();
        let sum: f64 = sample.iter().map(|&i| self.targets[i]).sum();
        let sum_sq: f64 = sample.iter().map(|&i| self.targets[i].powi(2)).sum();
        let parent = sum_sq - sum * sum / n as f64;
        let min_leaf = self.config.min_samples_leaf.max(1);

        let mut features: Vec<usize> = (0..self.rows[0].len()).collect();
        rng.shuffle(&mut features);
        features.truncate(self.tried);

        let mut order = sample.to_vec();
        let mut best: Option<Split> = None;
        for feature in features {
            order.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));
            let (mut left_sum, mut left_sq) = (0.0, 0.0);
            for k in 1..n {
                let y = self.targets[order[k - 1]];
                left_sum += y;
                left_sq += y * y;
                let lo = self.rows[order[k - 1]][feature];
                let hi = self.rows[order[k]][feature];
                if lo >= hi || k < min_leaf || n - k < min_leaf {
                    continue;
                }
                let left = left_sq - left_sum * left_sum / k as f64;
                let right = (sum_sq - left_sq) - (sum - left_sum).powi(2) / (n - k) as f64;
                let gain = parent - left - right;
                if gain > 0.0 && best.as_ref().is_none_or(|b| gain > b.gain) {
                    best = Some(Split {
                        feature,
                        cut: f64::midpoint(lo, hi),
                        gain,
                    });
                }
            }
        }
        best
    }
}

/// Bagged regression trees.
#[derive(Debug)]
struct Forest {
    trees: Vec<Tree>,
}

impl Forest {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn fit(rows: &[Vec<f64>], targets: &[f64], config: &FanovaConfig) -> Self {
        let n = rows.len();
        let dims = rows.first().map_or(0, Vec::len);
        let tried = config
            .max_features
            .unwrap_or_else(|| (dims as f64).sqrt().ceil() as usize)
            .clamp(1, dims.max(1));
        let mut rng = fastrand::Rng::with_seed(config.seed);

        let trees = (0..config.n_trees)
            .map(|_| {
                let mut sample: Vec<usize> = (0..n).map(|_| rng.usize(..n)).collect();
                let mut grower = Grower {
                    rows,
                    targets,
                    config,
                    tried,
                    total: n as f64,
                    nodes: Vec::new(),
                };
                grower.grow(&mut sample, 0, &mut rng);
                Tree { nodes: grower.nodes }
            })
            .collect();
        Self { trees }
    }

    #[allow(clippy::cast_precision_loss)]
    fn marginal(&self, feature: usize, value: f64) -> f64 {
        self.trees.iter().map(|t| t.marginal(feature, value)).sum::<f64>() / self.trees.len() as f64
    }

    /// Main-effect variance of every feature as a share of the total; all
    /// zero when the forest is constant.
    fn main_effects(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        let dims = rows.first().map_or(0, Vec::len);
        let raw: Vec<f64> = (0..dims)
            .map(|j| {
                let curve: Vec<f64> = rows.iter().map(|row| self.marginal(j, row[j])).collect();
                population_variance(&curve)
            })
            .collect();
        let total: f64 = raw.iter().sum();
        if total > 0.0 {
            raw.into_iter().map(|v| v / total).collect()
        } else {
            vec![0.0; dims]
        }
    }
}

/// Welford's running variance, population form.
fn population_variance(values: &[f64]) -> f64 {
    let (count, _, m2) = values.iter().fold((0.0, 0.0, 0.0), |(count, mean, m2), &x| {
        let count = count + 1.0;
        let delta = x - mean;
        let mean = mean + delta / count;
        (count, mean, m2 + delta * (x - mean))
    });
    if count > 0.0 { m2 / count } else { 0.0 }
}
