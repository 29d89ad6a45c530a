//! Density-based coverage intervals for range compression.
//!
//! - `univariate`: weighted Gaussian KDE
//!
//! A [`DensityProvider`] turns weighted samples of one parameter into the
//! narrowest-looking interval that holds a requested fraction of the mass.
//! [`KdeDensity`] does this by evaluating a KDE on an evenly spaced grid over
//! the parameter's bounds and collecting the highest-density grid points.

mod univariate;

pub(crate) use univariate::KernelDensityEstimator;

use crate::error::{Error, Result};

/// Estimates a coverage interval for one parameter from weighted samples.
pub trait DensityProvider: Send + Sync + core::fmt::Debug {
    /// Returns `(lower, upper)` inside `bounds` covering `coverage` of the estimated mass.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Estimator`] if no density can be fitted.
    fn coverage_interval(
        &self,
        values: &[f64],
        weights: &[f64],
        bounds: (f64, f64),
        coverage: f64,
    ) -> Result<(f64, f64)>;
}

/// Settings for [`KdeDensity`].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KdeConfig {
    /// Number of evaluation points over the parameter bounds (default: 1000).
    pub grid_points: usize,
    /// Fixed bandwidth. `None` uses Scott's rule (default: `None`).
    pub bandwidth: Option<f64>,
}

impl Default for KdeConfig {
    fn default() -> Self {
        Self {
            grid_points: 1000,
            bandwidth: None,
        }
    }
}

/// Highest-density coverage from a weighted Gaussian KDE.
#[derive(Clone, Debug, Default)]
pub struct KdeDensity {
    config: KdeConfig,
}

impl KdeDensity {
    /// Creates a provider with the given settings.
    #[must_use]
    pub fn new(config: KdeConfig) -> Self {
        Self { config }
    }
}

impl DensityProvider for KdeDensity {
    #[allow(clippy::cast_precision_loss)]
    fn coverage_interval(
        &self,
        values: &[f64],
        weights: &[f64],
        bounds: (f64, f64),
        coverage: f64,
    ) -> Result<(f64, f64)> {
        let (low, high) = bounds;
        if !(high > low && low.is_finite() && high.is_finite()) {
            return Err(Error::Estimator("degenerate bounds".into()));
        }
        let kde = match self.config.bandwidth {
            Some(h) => KernelDensityEstimator::with_bandwidth(values.to_vec(), weights.to_vec(), h)?,
            None => KernelDensityEstimator::new(values.to_vec(), weights.to_vec())?,
        };

        let n = self.config.grid_points.max(2);
        let step = (high - low) / (n - 1) as f64;
        let grid: Vec<f64> = (0..n).map(|i| low + step * i as f64).collect();
        let density: Vec<f64> = grid.iter().map(|&x| kde.pdf(x)).collect();
        let total: f64 = density.iter().sum();
        if !(total > 0.0 && total.is_finite()) {
            return Err(Error::Estimator("density vanishes on the grid".into()));
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            density[b]
                .partial_cmp(&density[a])
                .unwrap_or(core::cmp::Ordering::Equal)
        });

        let target = coverage.clamp(0.0, 1.0) * total;
        let mut mass = 0.0;
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for idx in order {
            lo = lo.min(grid[idx]);
            hi = hi.max(grid[idx]);
            mass += density[idx];
            if mass >= target {
                break;
            }
        }
        Ok((lo, hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_surrounds_the_mode() {
        let values = vec![48.0, 49.0, 50.0, 51.0, 52.0];
        let weights = vec![1.0; 5];
        let (lo, hi) = KdeDensity::default()
            .coverage_interval(&values, &weights, (0.0, 100.0), 0.6)
            .unwrap();
        assert!(lo < 50.0 && hi > 50.0);
        assert!(lo > 30.0 && hi < 70.0, "[{lo}, {hi}]");
    }

    #[test]
    fn more_coverage_is_wider() {
        let values = vec![20.0, 25.0, 30.0, 35.0];
        let weights = vec![1.0; 4];
        let kde = KdeDensity::default();
        let (a, b) = kde.coverage_interval(&values, &weights, (0.0, 100.0), 0.3).unwrap();
        let (c, d) = kde.coverage_interval(&values, &weights, (0.0, 100.0), 0.9).unwrap();
        assert!(d - c >= b - a);
    }

    #[test]
    fn degenerate_bounds_fail() {
        let err = KdeDensity::default().coverage_interval(&[1.0], &[1.0], (1.0, 1.0), 0.5);
        assert!(matches!(err, Err(Error::Estimator(_))));
    }
}
