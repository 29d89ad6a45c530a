//! Weighted Gaussian kernel density estimation for a single parameter.

use crate::error::{Error, Result};

/// `1 / sqrt(2π)`.
const FRAC_1_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// A weighted Gaussian kernel density estimator.
///
/// Places a Gaussian kernel at each sample, scaled by that sample's weight.
/// Weights are normalised to sum to one.
#[derive(Clone, Debug)]
pub(crate) struct KernelDensityEstimator {
    samples: Vec<f64>,
    weights: Vec<f64>,
    bandwidth: f64,
}

impl KernelDensityEstimator {
    /// Creates a KDE with Scott's-rule bandwidth.
    ///
    /// # Errors
    ///
    /// Returns `Error::Estimator` if `samples` is empty, the lengths differ, or
    /// the weights do not sum to a positive finite value.
    pub(crate) fn new(samples: Vec<f64>, weights: Vec<f64>) -> Result<Self> {
        let weights = Self::normalized_weights(&samples, weights)?;
        let bandwidth = Self::scotts_rule(&samples, &weights);
        Ok(Self {
            samples,
            weights,
            bandwidth,
        })
    }

    /// Creates a KDE with an explicit bandwidth.
    ///
    /// # Errors
    ///
    /// As [`new`](Self::new), plus `Error::Estimator` for a non-positive bandwidth.
    pub(crate) fn with_bandwidth(samples: Vec<f64>, weights: Vec<f64>, bandwidth: f64) -> Result<Self> {
        if !(bandwidth > 0.0 && bandwidth.is_finite()) {
            return Err(Error::Estimator(format!("bandwidth {bandwidth} must be positive")));
        }
        let weights = Self::normalized_weights(&samples, weights)?;
        Ok(Self {
            samples,
            weights,
            bandwidth,
        })
    }

    fn normalized_weights(samples: &[f64], weights: Vec<f64>) -> Result<Vec<f64>> {
        if samples.is_empty() {
            return Err(Error::Estimator("KDE requires at least one sample".into()));
        }
        if samples.len() != weights.len() {
            return Err(Error::Estimator(format!(
                "{} samples but {} weights",
                samples.len(),
                weights.len()
            )));
        }
        let total: f64 = weights.iter().sum();
        if !(total > 0.0 && total.is_finite()) || weights.iter().any(|w| *w < 0.0) {
            return Err(Error::Estimator("KDE weights must be non-negative with a positive sum".into()));
        }
        Ok(weights.into_iter().map(|w| w / total).collect())
    }

    /// Scott's rule on the weighted sample: h = `n_eff`^(-1/5) * sigma,
    /// with `n_eff` = 1 / Σ w².
    fn scotts_rule(samples: &[f64], weights: &[f64]) -> f64 {
        let mean: f64 = samples.iter().zip(weights).map(|(x, w)| x * w).sum();
        let variance: f64 = samples
            .iter()
            .zip(weights)
            .map(|(x, w)| w * (x - mean).powi(2))
            .sum();
        let std_dev = variance.sqrt();
        let n_eff = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();

        // Identical samples: fall back to a unit bandwidth.
        if std_dev < f64::EPSILON {
            return 1.0;
        }

        n_eff.powf(-0.2) * std_dev
    }

    /// Probability density at `x`: f(x) = Σ wᵢ φ((x - xᵢ) / h) / h.
    pub(crate) fn pdf(&self, x: f64) -> f64 {
        let h = self.bandwidth;
        let kernel_sum: f64 = self
            .samples
            .iter()
            .zip(&self.weights)
            .map(|(&xi, &w)| w * (-0.5 * ((x - xi) / h).powi(2)).exp())
            .sum();
        kernel_sum * FRAC_1_SQRT_2PI / h
    }

    /// Returns the bandwidth of this KDE.
    #[cfg(test)]
    pub(crate) fn bandwidth(&self) -> f64 {
        self.bandwidth
    }
}
