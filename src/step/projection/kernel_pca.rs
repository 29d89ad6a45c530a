//! RBF kernel PCA over the numeric parameters, for the surrogate only.
//!
//! The fit uses every valid observation of every source: values are min-max
//! normalized against the input bounds, standardized per column, and fed to an
//! RBF kernel `exp(-gamma ||x - y||²)` with `gamma = 1 / n_features` unless set.
//! The centred kernel matrix is eigen-decomposed and the leading components
//! become `kpca_0 .. kpca_{k-1}`, each on `[-√d, √d]` with `d` the number of
//! numeric parameters. Categorical parameters are appended unchanged.
//!
//! The map has no inverse, so the step leaves the sample space alone:
//! `affects_sampling_space()` is `false`. Without history it is a no-op.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::history::{History, SourceSimilarities};
use crate::param::ParamValue;
use crate::parameter::Parameter;
use crate::space::{Configuration, ParameterSpace};
use crate::step::{CompressionStep, StepKind};

/// Eigenvalues at or below this are treated as zero.
const EIGEN_EPS: f64 = 1e-12;
/// Column deviations below this are treated as constant columns.
const STD_EPS: f64 = 1e-12;

#[derive(Clone, Debug)]
struct Model {
    input: ParameterSpace,
    numeric: Vec<usize>,
    passthrough: Vec<String>,
    mean: Vec<f64>,
    std: Vec<f64>,
    train: Vec<Vec<f64>>,
    gamma: f64,
    alphas: DMatrix<f64>,
    kernel_col_means: DVector<f64>,
    kernel_mean: f64,
    names: Vec<String>,
    bound: f64,
}

impl Model {
    fn features(&self, point: &Configuration) -> Vec<f64> {
        let unit = self.input.to_unit(point);
        self.numeric
            .iter()
            .enumerate()
            .map(|(c, &j)| (unit[j] - self.mean[c]) / self.std[c])
            .collect()
    }

    fn transform(&self, point: &Configuration) -> Vec<f64> {
        let x = self.features(point);
        let k = DVector::from_fn(self.train.len(), |i, _| rbf(&x, &self.train[i], self.gamma));
        let k_mean = k.mean();
        let centred = DVector::from_fn(k.len(), |i, _| {
            k[i] - k_mean - self.kernel_col_means[i] + self.kernel_mean
        });
        (self.alphas.transpose() * centred).iter().copied().collect()
    }
}

#[derive(Clone, Debug)]
enum Fit {
    Unfitted,
    Identity,
    Model(Box<Model>),
}

fn rbf(a: &[f64], b: &[f64], gamma: f64) -> f64 {
    let sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
    (-gamma * sq).exp()
}

/// Kernel PCA surrogate representation.
///
/// # Examples
///
/// ```
/// use space_compression::step::{CompressionStep, KernelPca};
/// use space_compression::{Parameter, ParameterSpace};
///
/// let space = ParameterSpace::new([Parameter::float("a", 0.0, 1.0), Parameter::float("b", 0.0, 1.0)]).unwrap();
/// let mut step = KernelPca::new(2);
/// // No history: nothing to fit, the space passes through.
/// assert_eq!(step.apply(&space, &[], None).unwrap(), space);
/// assert!(!step.affects_sampling_space());
/// ```
#[derive(Clone, Debug)]
pub struct KernelPca {
    n_components: usize,
    gamma: Option<f64>,
    fit: Fit,
}

impl KernelPca {
    /// Keeps at most `n_components` components.
    #[must_use]
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            gamma: None,
            fit: Fit::Unfitted,
        }
    }

    /// Sets the RBF kernel width.
    #[must_use]
    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }

    /// Number of components of the last fit, `None` when the step was a no-op.
    #[must_use]
    pub fn fitted_components(&self) -> Option<usize> {
        match &self.fit {
            Fit::Model(m) => Some(m.names.len()),
            Fit::Unfitted | Fit::Identity => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn fit_model(&self, input: &ParameterSpace, histories: &[History]) -> Option<Model> {
        let numeric: Vec<usize> = input
            .iter()
            .enumerate()
            .filter(|(_, p)| p.domain().is_numeric())
            .map(|(j, _)| j)
            .collect();
        let rows: Vec<Vec<f64>> = histories
            .iter()
            .flat_map(History::valid)
            .map(|obs| {
                let unit = input.to_unit(&obs.config);
                numeric.iter().map(|&j| unit[j]).collect()
            })
            .collect();
        let n = rows.len();
        let f = numeric.len();
        if n < 2 || f == 0 {
            return None;
        }

        let mean: Vec<f64> = (0..f).map(|c| rows.iter().map(|r| r[c]).sum::<f64>() / n as f64).collect();
        let std: Vec<f64> = (0..f)
            .map(|c| {
                let var = rows.iter().map(|r| (r[c] - mean[c]).powi(2)).sum::<f64>() / n as f64;
                let s = var.sqrt();
                if s < STD_EPS { 1.0 } else { s }
            })
            .collect();
        let train: Vec<Vec<f64>> = rows
            .iter()
            .map(|r| (0..f).map(|c| (r[c] - mean[c]) / std[c]).collect())
            .collect();

        let gamma = self.gamma.unwrap_or(1.0 / f as f64);
        let kernel = DMatrix::from_fn(n, n, |i, j| rbf(&train[i], &train[j], gamma));
        let col_means = DVector::from_fn(n, |j, _| kernel.column(j).mean());
        let total_mean = kernel.mean();
        let centred = DMatrix::from_fn(n, n, |i, j| kernel[(i, j)] - col_means[i] - col_means[j] + total_mean);

        let eigen = centred.symmetric_eigen();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
        let wanted = self.n_components.min(n).min(f);
        let kept: Vec<usize> = order
            .into_iter()
            .filter(|&i| eigen.eigenvalues[i] > EIGEN_EPS)
            .take(wanted)
            .collect();
        if kept.is_empty() {
            return None;
        }

        let alphas = DMatrix::from_fn(n, kept.len(), |i, c| {
            let idx = kept[c];
            eigen.eigenvectors[(i, idx)] / eigen.eigenvalues[idx].sqrt()
        });
        let names: Vec<String> = (0..kept.len()).map(|i| format!("kpca_{i}")).collect();
        let passthrough = input
            .iter()
            .filter(|p| !p.domain().is_numeric())
            .map(|p| p.name().to_owned())
            .collect();

        Some(Model {
            input: input.clone(),
            numeric,
            passthrough,
            mean,
            std,
            train,
            gamma,
            alphas,
            kernel_col_means: col_means,
            kernel_mean: total_mean,
            names,
            bound: (f as f64).sqrt(),
        })
    }
}

impl CompressionStep for KernelPca {
    fn name(&self) -> &str {
        "kernel_pca"
    }

    fn kind(&self) -> StepKind {
        StepKind::Projection
    }

    fn apply(
        &mut self,
        input: &ParameterSpace,
        histories: &[History],
        _similarities: Option<&SourceSimilarities>,
    ) -> Result<ParameterSpace> {
        let Some(model) = self.fit_model(input, histories) else {
            trace_debug!(step = self.name(), "not enough history for kernel PCA, surrogate unchanged");
            self.fit = Fit::Identity;
            return Ok(input.clone());
        };
        let bound = model.bound;
        let mut params: Vec<Parameter> = model
            .names
            .iter()
            .map(|name| Parameter::float(name.clone(), -bound, bound).default_value(0.0))
            .collect();
        params.extend(
            model
                .passthrough
                .iter()
                .filter_map(|name| input.get(name).cloned()),
        );
        let output = ParameterSpace::new(params)?;
        trace_info!(
            step = self.name(),
            input_dims = input.len(),
            components = model.names.len(),
            "kernel PCA fitted"
        );
        self.fit = Fit::Model(Box::new(model));
        Ok(output)
    }

    fn affects_sampling_space(&self) -> bool {
        false
    }

    fn project_point(&self, point: &Configuration) -> Result<Configuration> {
        match &self.fit {
            Fit::Unfitted => Err(Error::NotCompressed),
            Fit::Identity => Ok(point.clone()),
            Fit::Model(model) => {
                let z = model.transform(point);
                let mut out: Configuration = model
                    .names
                    .iter()
                    .zip(z)
                    .map(|(name, v)| (name.clone(), ParamValue::Float(v.clamp(-model.bound, model.bound))))
                    .collect();
                for name in &model.passthrough {
                    if let Some(value) = point.get(name) {
                        out.insert(name.clone(), *value);
                    }
                }
                Ok(out)
            }
        }
    }

    fn validate(&self, _original: &ParameterSpace) -> Result<()> {
        if self.n_components == 0 {
            return Err(Error::InvalidCardinality {
                name: "n_components",
                value: 0,
            });
        }
        if let Some(gamma) = self.gamma
            && !(gamma > 0.0 && gamma.is_finite())
        {
            return Err(Error::InvalidRatio { name: "gamma", value: gamma });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    fn space() -> ParameterSpace {
        ParameterSpace::new([
            Parameter::float("a", 0.0, 10.0),
            Parameter::float("b", 0.0, 10.0),
            Parameter::int("n", 0, 100),
            Parameter::categorical("c", ["x", "y"]),
        ])
        .unwrap()
    }

    fn history(n: usize) -> History {
        let mut rng = fastrand::Rng::with_seed(4);
        let mut h = History::new(Direction::Minimize);
        for _ in 0..n {
            let cfg = space().sample(&mut rng);
            let y = cfg["a"].as_f64() + cfg["n"].as_f64() / 10.0;
            h.push(cfg, y);
        }
        h
    }

    #[test]
    fn components_are_bounded_by_features() {
        let mut step = KernelPca::new(10);
        let out = step.apply(&space(), &[history(30)], None).unwrap();
        assert_eq!(step.fitted_components(), Some(3));
        assert_eq!(out.names(), vec!["kpca_0", "kpca_1", "kpca_2", "c"]);
    }

    #[test]
    fn few_observations_limit_components() {
        let mut step = KernelPca::new(10);
        step.apply(&space(), &[history(2)], None).unwrap();
        assert!(step.fitted_components().unwrap() <= 2);
    }

    #[test]
    fn projection_lands_in_output_space() {
        let mut step = KernelPca::new(2);
        let out = step.apply(&space(), &[history(25)], None).unwrap();
        let mut rng = fastrand::Rng::with_seed(8);
        for _ in 0..10 {
            let projected = step.project_point(&space().sample(&mut rng)).unwrap();
            assert!(out.contains(&projected));
        }
    }

    #[test]
    fn projection_is_deterministic() {
        let mut step = KernelPca::new(2);
        step.apply(&space(), &[history(20)], None).unwrap();
        let p = space().default_config();
        assert_eq!(step.project_point(&p).unwrap(), step.project_point(&p).unwrap());
        let z = step.project_point(&p).unwrap();
        assert!(matches!(z["kpca_0"], ParamValue::Float(_)));
    }

    #[test]
    fn no_history_is_identity() {
        let mut step = KernelPca::new(2);
        assert!(matches!(
            step.project_point(&Configuration::new()),
            Err(Error::NotCompressed)
        ));
        let out = step.apply(&space(), &[], None).unwrap();
        assert_eq!(out, space());
        let p = space().default_config();
        assert_eq!(step.project_point(&p).unwrap(), p);
    }

    #[test]
    fn rejects_zero_components() {
        assert!(KernelPca::new(0).validate(&space()).is_err());
        assert!(KernelPca::new(1).gamma(-1.0).validate(&space()).is_err());
    }
}
