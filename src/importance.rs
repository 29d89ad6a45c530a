//! Parameter importance estimation and multi-source combination.
//!
//! An [`ImportanceProvider`] scores every parameter of a space from one
//! history. [`combined_importance`] runs the provider once per source
//! history and merges the per-source vectors with an [`ImportanceCombiner`],
//! [`WeightedAverage`] by default.
//!
//! | Provider | Signal | Notes |
//! |----------|--------|-------|
//! | [`CorrelationImportance::spearman`] | absolute rank correlation | robust to monotone transforms |
//! | [`CorrelationImportance::pearson`] | absolute linear correlation | |
//! | [`FanovaImportance`](crate::FanovaImportance) | random-forest main effects | detects non-linear effects |

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::history::{History, SourceSimilarities, source_weight};
use crate::space::ParameterSpace;

/// Parameter name to importance score. Higher means more important.
pub type ImportanceScores = BTreeMap<String, f64>;

/// Estimates per-parameter importance from one history.
pub trait ImportanceProvider: Send + Sync + core::fmt::Debug {
    /// Short identifier used in logs and descriptors.
    fn name(&self) -> &'static str;

    /// Scores every parameter of `space` from `history`.
    ///
    /// Categorical values are scored through their choice index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Estimator`] if the history cannot support an estimate.
    fn importance(&self, space: &ParameterSpace, history: &History) -> Result<ImportanceScores>;
}

/// Merges per-source importance vectors into one.
pub trait ImportanceCombiner: Send + Sync + core::fmt::Debug {
    /// Combines `(scores, weight)` pairs, one per source that produced scores.
    fn combine(&self, sources: &[(ImportanceScores, f64)]) -> ImportanceScores;
}

/// Weighted arithmetic mean, `Σ wᵢ sᵢ / Σ wᵢ` over sources with `wᵢ > 0`.
///
/// Zero-weight sources never contribute. When no source has a positive
/// weight the result is empty, unless [`WeightedAverage::uniform_fallback`]
/// was enabled, in which case every source counts equally.
#[derive(Clone, Copy, Debug, Default)]
pub struct WeightedAverage {
    uniform_fallback: bool,
}

impl WeightedAverage {
    /// Ignores zero-weight sources, with no fallback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Averages all sources uniformly when every weight is zero.
    #[must_use]
    pub fn uniform_fallback(mut self, enabled: bool) -> Self {
        self.uniform_fallback = enabled;
        self
    }
}

impl ImportanceCombiner for WeightedAverage {
    fn combine(&self, sources: &[(ImportanceScores, f64)]) -> ImportanceScores {
        let mut used: Vec<(&ImportanceScores, f64)> = sources
            .iter()
            .filter(|(_, w)| *w > 0.0)
            .map(|(s, w)| (s, *w))
            .collect();
        if used.is_empty() && self.uniform_fallback {
            used = sources.iter().map(|(s, _)| (s, 1.0)).collect();
        }

        let total: f64 = used.iter().map(|(_, w)| w).sum();
        let mut combined = ImportanceScores::new();
        if total <= 0.0 {
            return combined;
        }
        for (scores, w) in &used {
            for (name, score) in *scores {
                *combined.entry(name.clone()).or_insert(0.0) += w * score;
            }
        }
        for score in combined.values_mut() {
            *score /= total;
        }
        combined
    }
}

/// Runs `provider` on every positively weighted source and combines the results.
///
/// Zero-weight sources are not evaluated. Sources whose provider call fails
/// are skipped.
///
/// # Errors
///
/// Returns [`Error::Estimator`] when no positively weighted source produced
/// scores, or when the combiner returns nothing.
pub fn combined_importance(
    provider: &dyn ImportanceProvider,
    combiner: &dyn ImportanceCombiner,
    space: &ParameterSpace,
    histories: &[History],
    similarities: Option<&SourceSimilarities>,
) -> Result<ImportanceScores> {
    let mut per_source = Vec::with_capacity(histories.len());
    for (i, history) in histories.iter().enumerate() {
        let weight = source_weight(similarities, i);
        if weight <= 0.0 {
            trace_debug!(source = i, "zero-weight source ignored");
            continue;
        }
        match provider.importance(space, history) {
            Ok(scores) => per_source.push((scores, weight)),
            Err(_) => {
                trace_debug!(source = i, provider = provider.name(), "source skipped");
            }
        }
    }
    let combined = if per_source.is_empty() {
        ImportanceScores::new()
    } else {
        combiner.combine(&per_source)
    };
    if combined.is_empty() {
        return Err(Error::Estimator(format!(
            "{} produced no scores from {} weighted histories",
            provider.name(),
            histories.len()
        )));
    }
    Ok(combined)
}

/// Correlation flavour used by [`CorrelationImportance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CorrelationMethod {
    /// Spearman rank correlation.
    Spearman,
    /// Pearson linear correlation.
    Pearson,
}

/// Absolute correlation between each parameter and the objective.
///
/// Undefined correlations (constant columns) score `0.0`.
///
/// # Examples
///
/// ```
/// use space_compression::importance::{CorrelationImportance, ImportanceProvider};
/// use space_compression::{Configuration, Direction, History, ParamValue, Parameter, ParameterSpace};
///
/// let space = ParameterSpace::new([
///     Parameter::float("x", 0.0, 10.0),
///     Parameter::float("y", 0.0, 10.0),
/// ])
/// .unwrap();
/// let mut history = History::new(Direction::Minimize);
/// for i in 0..10 {
///     let mut cfg = Configuration::new();
///     cfg.insert("x".into(), ParamValue::Float(f64::from(i)));
///     cfg.insert("y".into(), ParamValue::Float(f64::from((i * 7) % 10)));
///     history.push(cfg, f64::from(i) * 2.0);
/// }
/// let scores = CorrelationImportance::spearman().importance(&space, &history).unwrap();
/// assert!(scores["x"] > scores["y"]);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct CorrelationImportance {
    method: CorrelationMethod,
}

impl CorrelationImportance {
    /// Rank correlation.
    #[must_use]
    pub fn spearman() -> Self {
        Self {
            method: CorrelationMethod::Spearman,
        }
    }

    /// Linear correlation.
    #[must_use]
    pub fn pearson() -> Self {
        Self {
            method: CorrelationMethod::Pearson,
        }
    }

    /// The configured correlation flavour.
    #[must_use]
    pub fn method(&self) -> CorrelationMethod {
        self.method
    }
}

impl Default for CorrelationImportance {
    fn default() -> Self {
        Self::spearman()
    }
}

impl ImportanceProvider for CorrelationImportance {
    fn name(&self) -> &'static str {
        match self.method {
            CorrelationMethod::Spearman => "spearman",
            CorrelationMethod::Pearson => "pearson",
        }
    }

    fn importance(&self, space: &ParameterSpace, history: &History) -> Result<ImportanceScores> {
        if history.valid().count() < 2 {
            return Err(Error::Estimator(
                "correlation needs at least two observations".into(),
            ));
        }
        let mut scores = ImportanceScores::new();
        for param in space {
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for obs in history.valid() {
                if let Some(v) = obs.config.get(param.name()) {
                    xs.push(v.as_f64());
                    ys.push(obs.objective);
                }
            }
            let corr = if xs.len() < 2 {
                0.0
            } else {
                match self.method {
                    CorrelationMethod::Spearman => spearman(&xs, &ys),
                    CorrelationMethod::Pearson => pearson(&xs, &ys),
                }
            };
            scores.insert(param.name().to_owned(), corr.abs());
        }
        Ok(scores)
    }
}

/// Pearson correlation coefficient; `0.0` when either input is constant.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let nf = n as f64;
    let mx = x[..n].iter().sum::<f64>() / nf;
    let my = y[..n].iter().sum::<f64>() / nf;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x[..n].iter().zip(&y[..n]) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom <= f64::EPSILON || !denom.is_finite() {
        0.0
    } else {
        (sxy / denom).clamp(-1.0, 1.0)
    }
}

/// Spearman rank correlation with average ranks for ties.
pub(crate) fn spearman(x: &[f64], y: &[f64]) -> f64 {
    pearson(&ranks(x), &ranks(y))
}

/// Fractional ranks (1-based), ties share their mean rank.
#[allow(clippy::cast_precision_loss)]
fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(core::cmp::Ordering::Equal)
    });
    let mut out = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        #[allow(clippy::float_cmp)]
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            out[idx] = rank;
        }
        i = j + 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> ImportanceScores {
        pairs.iter().map(|(n, s)| ((*n).to_owned(), *s)).collect()
    }

    #[test]
    fn spearman_monotone_is_one() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 4.0, 9.0, 16.0, 25.0];
        assert!((spearman(&x, &y) - 1.0).abs() < 1e-12);
        assert!(pearson(&x, &y) < 1.0);
    }

    #[test]
    fn constant_column_scores_zero() {
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).abs() < f64::EPSILON);
    }

    #[test]
    fn ranks_average_ties() {
        assert_eq!(ranks(&[10.0, 20.0, 10.0]), vec![1.5, 3.0, 1.5]);
    }

    #[test]
    fn weighted_average_matches_linear_combination() {
        let s0 = scores(&[("a", 0.9), ("b", 0.1)]);
        let s1 = scores(&[("a", 0.2), ("b", 0.7)]);
        let out = WeightedAverage::new().combine(&[(s0, 0.8), (s1, 0.2)]);
        assert!((out["a"] - (0.8 * 0.9 + 0.2 * 0.2)).abs() < 1e-12);
        assert!((out["b"] - (0.8 * 0.1 + 0.2 * 0.7)).abs() < 1e-12);
    }

    #[test]
    fn zero_weight_sources_ignored() {
        let s0 = scores(&[("a", 0.5)]);
        let s1 = scores(&[("a", 100.0)]);
        let out = WeightedAverage::new().combine(&[(s0, 1.0), (s1, 0.0)]);
        assert!((out["a"] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn all_zero_weights_need_the_fallback() {
        let sources = [(scores(&[("a", 1.0)]), 0.0), (scores(&[("a", 3.0)]), 0.0)];
        assert!(WeightedAverage::new().combine(&sources).is_empty());
        let out = WeightedAverage::new().uniform_fallback(true).combine(&sources);
        assert!((out["a"] - 2.0).abs() < 1e-12);
    }
}
