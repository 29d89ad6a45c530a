//! Range compression: keep every parameter, tighten numeric bounds.
//!
//! | Method | Interval | Sample weights |
//! |--------|----------|----------------|
//! | [`RangeMethod::Boundary`] | `μ ± sigma·σ` of the top observations | source similarity |
//! | [`RangeMethod::Density`] | highest-density coverage interval | rank × similarity |
//! | [`RangeMethod::Weighted`] | `μ ± sigma·σ` | improvement × similarity |
//! | [`RangeMethod::Fixed`] | caller-supplied | - |
//!
//! Every interval is clipped into the input bounds. A parameter with fewer than
//! two usable observations keeps its bounds. Degenerate intervals widen by one
//! integer step or 1 % of the float range. Categorical parameters pass through.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::history::{History, SourceSimilarities, source_weight};
use crate::kde::{DensityProvider, KdeDensity};
use crate::param::ParamValue;
use crate::sampling::{MixedRangeSampling, SamplingStrategy};
use crate::space::{Configuration, ParameterSpace};
use crate::step::{CompressionStep, StepKind};

/// Fraction of a float range used to widen a degenerate interval.
const FLOAT_WIDEN_FRACTION: f64 = 0.01;

/// How a [`RangeCompression`] derives its intervals.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RangeMethod {
    /// Weighted mean and spread of the best observations.
    Boundary {
        /// Fraction of each source's observations used, best first.
        top_ratio: f64,
        /// Half-width in standard deviations.
        sigma: f64,
    },
    /// Highest-density interval of the best observations.
    Density {
        /// Fraction of each source's observations used, best first.
        top_ratio: f64,
        /// Fraction of estimated mass the interval must hold.
        coverage: f64,
    },
    /// Like `Boundary`, with observations weighted by their improvement over
    /// the worst retained objective.
    Weighted {
        /// Fraction of each source's observations used, best first.
        top_ratio: f64,
        /// Half-width in standard deviations.
        sigma: f64,
    },
    /// Caller-supplied intervals, intersected with the input bounds.
    Fixed(BTreeMap<String, (f64, f64)>),
}

#[derive(Clone, Copy)]
enum Weighting {
    Similarity,
    Rank,
    Improvement,
}

/// Narrows numeric bounds from history or caller intervals.
///
/// # Examples
///
/// ```
/// use space_compression::step::{CompressionStep, RangeCompression};
/// use space_compression::{Configuration, Direction, History, ParamValue, Parameter, ParameterSpace};
///
/// let space = ParameterSpace::new([Parameter::float("x", 0.0, 100.0)]).unwrap();
/// let mut history = History::new(Direction::Minimize);
/// for (x, y) in [(35.0, 1.0), (45.0, 1.0), (35.0, 2.0), (45.0, 2.0), (90.0, 50.0)] {
///     let mut cfg = Configuration::new();
///     cfg.insert("x".into(), ParamValue::Float(x));
///     history.push(cfg, y);
/// }
///
/// let mut step = RangeCompression::boundary(0.8, 2.0);
/// let out = step.apply(&space, &[history], None).unwrap();
/// assert_eq!(out.get("x").unwrap().domain().bounds(), Some((30.0, 50.0)));
/// ```
#[derive(Debug)]
pub struct RangeCompression {
    method: RangeMethod,
    density: Box<dyn DensityProvider>,
    mixed_sampling: Option<f64>,
    input: Option<ParameterSpace>,
    output: Option<ParameterSpace>,
}

impl RangeCompression {
    /// Creates a step from an explicit method.
    #[must_use]
    pub fn new(method: RangeMethod) -> Self {
        Self {
            method,
            density: Box::new(KdeDensity::default()),
            mixed_sampling: None,
            input: None,
            output: None,
        }
    }

    /// `μ ± sigma·σ` of the top `top_ratio` observations.
    #[must_use]
    pub fn boundary(top_ratio: f64, sigma: f64) -> Self {
        Self::new(RangeMethod::Boundary { top_ratio, sigma })
    }

    /// Highest-density interval covering `coverage` of the top observations' mass.
    #[must_use]
    pub fn density(top_ratio: f64, coverage: f64) -> Self {
        Self::new(RangeMethod::Density { top_ratio, coverage })
    }

    /// Improvement-weighted `μ ± sigma·σ`.
    #[must_use]
    pub fn weighted(top_ratio: f64, sigma: f64) -> Self {
        Self::new(RangeMethod::Weighted { top_ratio, sigma })
    }

    /// Caller-supplied `(name, low, high)` intervals.
    #[must_use]
    pub fn fixed<I, S>(ranges: I) -> Self
    where
        I: IntoIterator<Item = (S, f64, f64)>,
        S: Into<String>,
    {
        Self::new(RangeMethod::Fixed(
            ranges
                .into_iter()
                .map(|(name, low, high)| (name.into(), (low, high)))
                .collect(),
        ))
    }

    /// Replaces the density estimator used by [`RangeMethod::Density`].
    #[must_use]
    pub fn density_provider(mut self, provider: impl DensityProvider + 'static) -> Self {
        self.density = Box::new(provider);
        self
    }

    /// Offers a [`MixedRangeSampling`] strategy drawing from the compressed
    /// space with probability `initial_prob`.
    #[must_use]
    pub fn mixed_sampling(mut self, initial_prob: f64) -> Self {
        self.mixed_sampling = Some(initial_prob);
        self
    }

    /// The configured method.
    #[must_use]
    pub fn method(&self) -> &RangeMethod {
        &self.method
    }

    fn interval(
        &self,
        name: &str,
        bounds: (f64, f64),
        histories: &[History],
        similarities: Option<&SourceSimilarities>,
    ) -> Option<(f64, f64)> {
        match &self.method {
            RangeMethod::Boundary { top_ratio, sigma } => {
                let (values, weights) =
                    weighted_samples(name, histories, similarities, *top_ratio, Weighting::Similarity);
                mean_spread(&values, &weights, *sigma)
            }
            RangeMethod::Weighted { top_ratio, sigma } => {
                let (values, weights) =
                    weighted_samples(name, histories, similarities, *top_ratio, Weighting::Improvement);
                mean_spread(&values, &weights, *sigma)
            }
            RangeMethod::Density { top_ratio, coverage } => {
                let (values, weights) =
                    weighted_samples(name, histories, similarities, *top_ratio, Weighting::Rank);
                if values.len() < 2 {
                    return None;
                }
                match self.density.coverage_interval(&values, &weights, bounds, *coverage) {
                    Ok(interval) => Some(interval),
                    Err(_) => {
                        trace_warn!(parameter = name, "density estimate failed, using observed extent");
                        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
                        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                        Some((lo, hi))
                    }
                }
            }
            RangeMethod::Fixed(ranges) => {
                let &(low, high) = ranges.get(name)?;
                let lo = low.max(bounds.0);
                let hi = high.min(bounds.1);
                if lo.is_nan() || hi.is_nan() || lo > hi {
                    trace_warn!(parameter = name, "fixed interval misses the parameter bounds, skipped");
                    return None;
                }
                Some((lo, hi))
            }
        }
    }
}

/// Numeric values of `name` from each source's top observations, with weights.
#[allow(clippy::cast_precision_loss)]
fn weighted_samples(
    name: &str,
    histories: &[History],
    similarities: Option<&SourceSimilarities>,
    top_ratio: f64,
    weighting: Weighting,
) -> (Vec<f64>, Vec<f64>) {
    let mut values = Vec::new();
    let mut weights = Vec::new();
    for (i, history) in histories.iter().enumerate() {
        let similarity = source_weight(similarities, i);
        if similarity <= 0.0 {
            continue;
        }
        let top = history.top_fraction(top_ratio);
        let n = top.len();
        let best = top.first().map_or(0.0, |o| o.objective);
        let worst = top.last().map_or(0.0, |o| o.objective);
        let spread = (worst - best).abs();
        for (rank, obs) in top.iter().enumerate() {
            let value = match obs.config.get(name) {
                Some(ParamValue::Float(v)) => *v,
                Some(ParamValue::Int(v)) => *v as f64,
                _ => continue,
            };
            if !value.is_finite() {
                continue;
            }
            let factor = match weighting {
                Weighting::Similarity => 1.0,
                Weighting::Rank => (n - rank) as f64,
                Weighting::Improvement if spread > 0.0 => (worst - obs.objective).abs() / spread,
                Weighting::Improvement => 1.0,
            };
            values.push(value);
            weights.push(factor * similarity);
        }
    }
    (values, weights)
}

/// `[μ - sigma·σ, μ + sigma·σ]` with weighted mean and population deviation.
fn mean_spread(values: &[f64], weights: &[f64], sigma: f64) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    let mean = values.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / total;
    let variance = values
        .iter()
        .zip(weights)
        .map(|(v, w)| w * (v - mean).powi(2))
        .sum::<f64>()
        / total;
    let spread = sigma * variance.sqrt();
    Some((mean - spread, mean + spread))
}

/// Clips `[lo, hi]` into `bounds` and widens it if it collapsed to a point.
fn finalize(domain: &Domain, (lo, hi): (f64, f64), (low, high): (f64, f64)) -> (f64, f64) {
    let mut lo = lo.clamp(low, high);
    let mut hi = hi.clamp(low, high);
    if lo > hi {
        core::mem::swap(&mut lo, &mut hi);
    }
    if hi - lo <= 0.0 && high > low {
        let step = match domain {
            Domain::Int(_) => 1.0,
            _ => FLOAT_WIDEN_FRACTION * (high - low),
        };
        hi = (hi + step).min(high);
        if hi - lo <= 0.0 {
            lo = (lo - step).max(low);
        }
    }
    (lo, hi)
}

fn check_ratio(name: &'static str, value: f64) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidRatio { name, value })
    }
}

impl CompressionStep for RangeCompression {
    fn name(&self) -> &str {
        match self.method {
            RangeMethod::Boundary { .. } => "range_boundary",
            RangeMethod::Density { .. } => "range_kde",
            RangeMethod::Weighted { .. } => "range_weighted",
            RangeMethod::Fixed(_) => "range_expert",
        }
    }

    fn kind(&self) -> StepKind {
        StepKind::Range
    }

    fn apply(
        &mut self,
        input: &ParameterSpace,
        histories: &[History],
        similarities: Option<&SourceSimilarities>,
    ) -> Result<ParameterSpace> {
        let mut output = input.clone();
        let needs_history = !matches!(self.method, RangeMethod::Fixed(_));
        if needs_history && histories.iter().all(History::is_empty) {
            trace_debug!(step = self.name(), "no history, ranges unchanged");
        } else {
            for param in input {
                let Some(bounds) = param.domain().bounds() else {
                    continue;
                };
                let Some(interval) = self.interval(param.name(), bounds, histories, similarities) else {
                    continue;
                };
                let (lo, hi) = finalize(param.domain(), interval, bounds);
                output = output.with_bounds(param.name(), lo, hi)?;
                trace_debug!(parameter = param.name(), low = lo, high = hi, "range compressed");
            }
        }
        trace_info!(step = self.name(), dims = output.len(), "range compression applied");
        self.input = Some(input.clone());
        self.output = Some(output.clone());
        Ok(output)
    }

    fn project_point(&self, point: &Configuration) -> Result<Configuration> {
        let output = self.output.as_ref().ok_or(Error::NotCompressed)?;
        Ok(output.clip_config(point))
    }

    fn sampling_strategy(&self, seed: u64) -> Option<Box<dyn SamplingStrategy>> {
        let p = self.mixed_sampling?;
        let (input, output) = (self.input.as_ref()?, self.output.as_ref()?);
        Some(Box::new(MixedRangeSampling::new(output.clone(), input.clone(), p, seed)))
    }

    fn validate(&self, _original: &ParameterSpace) -> Result<()> {
        match &self.method {
            RangeMethod::Boundary { top_ratio, sigma } | RangeMethod::Weighted { top_ratio, sigma } => {
                check_ratio("top_ratio", *top_ratio)?;
                if !(sigma.is_finite() && *sigma >= 0.0) {
                    return Err(Error::InvalidRatio {
                        name: "sigma",
                        value: *sigma,
                    });
                }
            }
            RangeMethod::Density { top_ratio, coverage } => {
                check_ratio("top_ratio", *top_ratio)?;
                check_ratio("coverage", *coverage)?;
            }
            RangeMethod::Fixed(_) => {}
        }
        if let Some(p) = self.mixed_sampling {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::InvalidRatio {
                    name: "initial_prob",
                    value: p,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::Parameter;
    use crate::types::Direction;

    fn space() -> ParameterSpace {
        ParameterSpace::new([
            Parameter::float("x", 0.0, 100.0),
            Parameter::int("n", 0, 10),
            Parameter::categorical("c", ["a", "b"]),
        ])
        .unwrap()
    }

    fn history(points: &[(f64, i64, f64)]) -> History {
        let mut h = History::new(Direction::Minimize);
        for &(x, n, y) in points {
            let mut cfg = Configuration::new();
            cfg.insert("x".into(), ParamValue::Float(x));
            cfg.insert("n".into(), ParamValue::Int(n));
            cfg.insert("c".into(), ParamValue::Categorical(1));
            h.push(cfg, y);
        }
        h
    }

    #[test]
    fn boundary_overflow_is_clipped() {
        let h = history(&[(1.0, 0, 1.0), (9.0, 10, 1.0), (1.0, 0, 1.0), (9.0, 10, 1.0)]);
        let mut step = RangeCompression::boundary(1.0, 3.0);
        let out = step.apply(&space(), &[h], None).unwrap();
        assert_eq!(out.get("x").unwrap().domain().bounds(), Some((0.0, 17.0)));
        assert_eq!(out.get("n").unwrap().domain().bounds(), Some((0.0, 10.0)));
    }

    #[test]
    fn single_point_is_noop() {
        let h = history(&[(50.0, 5, 1.0)]);
        let mut step = RangeCompression::boundary(1.0, 2.0);
        let out = step.apply(&space(), &[h], None).unwrap();
        assert_eq!(out, space());
    }

    #[test]
    fn degenerate_interval_widens() {
        let h = history(&[(50.0, 5, 1.0), (50.0, 5, 2.0)]);
        let mut step = RangeCompression::boundary(1.0, 2.0);
        let out = step.apply(&space(), &[h], None).unwrap();
        assert_eq!(out.get("x").unwrap().domain().bounds(), Some((50.0, 51.0)));
        assert_eq!(out.get("n").unwrap().domain().bounds(), Some((5.0, 6.0)));
    }

    #[test]
    fn categoricals_pass_through() {
        let h = history(&[(10.0, 1, 1.0), (20.0, 2, 2.0), (30.0, 3, 3.0)]);
        let mut step = RangeCompression::density(1.0, 0.6);
        let out = step.apply(&space(), &[h], None).unwrap();
        assert_eq!(out.get("c"), space().get("c"));
    }

    #[test]
    fn density_interval_is_nested() {
        let h = history(&[(40.0, 4, 1.0), (45.0, 4, 2.0), (50.0, 5, 3.0), (55.0, 6, 4.0)]);
        let mut step = RangeCompression::density(1.0, 0.6);
        let out = step.apply(&space(), &[h], None).unwrap();
        let (lo, hi) = out.get("x").unwrap().domain().bounds().unwrap();
        assert!(0.0 <= lo && lo <= hi && hi <= 100.0);
        assert!(hi - lo < 100.0);
    }

    #[test]
    fn zero_similarity_source_ignored() {
        let good = history(&[(10.0, 1, 1.0), (20.0, 2, 2.0)]);
        let other = history(&[(90.0, 9, 1.0), (95.0, 9, 2.0)]);
        let sims = SourceSimilarities::from_weights(&[1.0, 0.0]);
        let mut step = RangeCompression::boundary(1.0, 1.0);
        let out = step.apply(&space(), &[good, other], Some(&sims)).unwrap();
        assert_eq!(out.get("x").unwrap().domain().bounds(), Some((10.0, 20.0)));
    }

    #[test]
    fn fixed_intervals_intersect() {
        let mut step = RangeCompression::fixed([("x", -10.0, 20.0), ("n", 50.0, 60.0)]);
        let out = step.apply(&space(), &[], None).unwrap();
        assert_eq!(out.get("x").unwrap().domain().bounds(), Some((0.0, 20.0)));
        assert_eq!(out.get("n").unwrap().domain().bounds(), Some((0.0, 10.0)));
    }

    #[test]
    fn project_clips_into_compressed_bounds() {
        let mut step = RangeCompression::fixed([("x", 10.0, 20.0)]);
        step.apply(&space(), &[], None).unwrap();
        let mut cfg = space().default_config();
        cfg.insert("x".into(), ParamValue::Float(80.0));
        assert_eq!(step.project_point(&cfg).unwrap()["x"], ParamValue::Float(20.0));
    }

    #[test]
    fn mixed_sampling_offered_after_apply() {
        let mut step = RangeCompression::fixed([("x", 10.0, 20.0)]).mixed_sampling(0.9);
        assert!(step.sampling_strategy(1).is_none());
        step.apply(&space(), &[], None).unwrap();
        let strategy = step.sampling_strategy(1).unwrap();
        assert!(strategy.spaces().1.is_some());
    }

    #[test]
    fn invalid_ratios_rejected() {
        assert!(RangeCompression::boundary(0.0, 2.0).validate(&space()).is_err());
        assert!(RangeCompression::boundary(0.5, -1.0).validate(&space()).is_err());
        assert!(RangeCompression::density(0.5, 1.5).validate(&space()).is_err());
        assert!(RangeCompression::boundary(0.5, 2.0).mixed_sampling(2.0).validate(&space()).is_err());
        assert!(RangeCompression::weighted(0.5, 2.0).validate(&space()).is_ok());
    }
}
