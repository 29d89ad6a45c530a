//! Random linear embeddings into a low-dimensional box.
//!
//! Both flavours work on unit-cube coordinates of the input space, so every
//! parameter kind is embedded (categoricals through their cell centres).
//!
//! **REMBO** draws a Gaussian basis `A` (d × `low_dim`) and searches
//! `z ∈ [-√low_dim, √low_dim]^low_dim`. A low point maps up as
//! `u = clip01((A z + b) / 2b)` with `b = √low_dim`; a high point maps down
//! through the Moore-Penrose pseudo-inverse of `A`, clipped into the box.
//!
//! **HesBO** hashes each input dimension `j` to a bucket `h(j)` with sign
//! `σ(j) = ±1` and searches `z ∈ [-1, 1]^low_dim`. Up: `x_j = σ(j) z_{h(j)}`.
//! Down: each bucket averages `σ(j) x_j` over its members.
//!
//! Neither inverse is exact; unprojected points are clipped into the input
//! bounds. The basis is a pure function of the pipeline seed and the input
//! dimension, so repeated applies give the same embedding.

use nalgebra::{DMatrix, DVector};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::sample_standard_normal;
use crate::error::{Error, Result};
use crate::history::{History, SourceSimilarities};
use crate::param::ParamValue;
use crate::parameter::Parameter;
use crate::pipeline::DEFAULT_SEED;
use crate::space::{Configuration, ParameterSpace};
use crate::step::{CompressionStep, StepKind};

/// Tolerance for singular values in the pseudo-inverse.
const PINV_EPS: f64 = 1e-10;

/// Embedding flavour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EmbeddingKind {
    /// Gaussian random embedding.
    Rembo,
    /// Hashing-enhanced subspace embedding.
    Hesbo,
}

impl EmbeddingKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Rembo => "rembo",
            Self::Hesbo => "hesbo",
        }
    }
}

#[derive(Clone, Debug)]
enum Basis {
    Gaussian { a: DMatrix<f64>, pinv: DMatrix<f64> },
    Hash { buckets: Vec<usize>, signs: Vec<f64> },
}

#[derive(Clone, Debug)]
struct Embedded {
    input: ParameterSpace,
    names: Vec<String>,
    basis: Basis,
    bound: f64,
}

/// Maps the space into a `low_dim`-dimensional box through a fixed random basis.
///
/// # Examples
///
/// ```
/// use space_compression::step::{CompressionStep, RandomEmbedding};
/// use space_compression::{Parameter, ParameterSpace};
///
/// let space = ParameterSpace::new((0..6).map(|i| Parameter::float(format!("x{i}"), 0.0, 1.0))).unwrap();
/// let mut step = RandomEmbedding::hesbo(2);
/// step.bind_seed(7);
/// let low = step.apply(&space, &[], None).unwrap();
/// assert_eq!(low.names(), vec!["hesbo_0", "hesbo_1"]);
///
/// let high = step.unproject_point(&low.default_config()).unwrap();
/// assert!(space.contains(&high));
/// ```
#[derive(Clone, Debug)]
pub struct RandomEmbedding {
    kind: EmbeddingKind,
    low_dim: usize,
    max_num_values: Option<usize>,
    seed: u64,
    state: Option<Embedded>,
}

impl RandomEmbedding {
    /// Creates an embedding of the given flavour.
    #[must_use]
    pub fn new(kind: EmbeddingKind, low_dim: usize) -> Self {
        Self {
            kind,
            low_dim,
            max_num_values: None,
            seed: DEFAULT_SEED,
            state: None,
        }
    }

    /// Gaussian random embedding.
    #[must_use]
    pub fn rembo(low_dim: usize) -> Self {
        Self::new(EmbeddingKind::Rembo, low_dim)
    }

    /// Hashing embedding.
    #[must_use]
    pub fn hesbo(low_dim: usize) -> Self {
        Self::new(EmbeddingKind::Hesbo, low_dim)
    }

    /// Exposes the low coordinates as integers on `[1, levels]` instead of floats.
    #[must_use]
    pub fn quantized(mut self, levels: usize) -> Self {
        self.max_num_values = Some(levels);
        self
    }

    /// The embedding flavour.
    #[must_use]
    pub fn embedding_kind(&self) -> EmbeddingKind {
        self.kind
    }

    /// The requested low dimension.
    #[must_use]
    pub fn low_dim(&self) -> usize {
        self.low_dim
    }

    fn draw_basis(&self, high_dim: usize, low_dim: usize) -> Result<Basis> {
        let mut rng = fastrand::Rng::with_seed(self.seed);
        match self.kind {
            EmbeddingKind::Rembo => {
                let a = DMatrix::from_fn(high_dim, low_dim, |_, _| sample_standard_normal(&mut rng));
                let pinv = a.clone().pseudo_inverse(PINV_EPS).map_err(Error::Internal)?;
                Ok(Basis::Gaussian { a, pinv })
            }
            EmbeddingKind::Hesbo => {
                let buckets = (0..high_dim).map(|_| rng.usize(0..low_dim)).collect();
                let signs = (0..high_dim)
                    .map(|_| if rng.bool() { 1.0 } else { -1.0 })
                    .collect();
                Ok(Basis::Hash { buckets, signs })
            }
        }
    }

    fn state(&self) -> Result<&Embedded> {
        self.state.as_ref().ok_or(Error::NotCompressed)
    }

    /// Low coordinate `z` to its exposed value.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_precision_loss
    )]
    fn encode(&self, z: f64, bound: f64) -> ParamValue {
        let z = z.clamp(-bound, bound);
        match self.max_num_values {
            Some(levels) => {
                let levels = levels as i64;
                let level = ((z + bound) / (2.0 * bound) * (levels - 1) as f64 + 1.0).round() as i64;
                ParamValue::Int(level.clamp(1, levels))
            }
            None => ParamValue::Float(z),
        }
    }

    /// Exposed value back to the low coordinate `z`.
    #[allow(clippy::cast_precision_loss)]
    fn decode(&self, value: &ParamValue, bound: f64) -> f64 {
        let z = match self.max_num_values {
            Some(levels) => -bound + (value.as_f64() - 1.0) * 2.0 * bound / (levels - 1) as f64,
            None => value.as_f64(),
        };
        z.clamp(-bound, bound)
    }
}

impl CompressionStep for RandomEmbedding {
    fn name(&self) -> &str {
        self.kind.prefix()
    }

    fn kind(&self) -> StepKind {
        StepKind::Projection
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    fn apply(
        &mut self,
        input: &ParameterSpace,
        _histories: &[History],
        _similarities: Option<&SourceSimilarities>,
    ) -> Result<ParameterSpace> {
        let low_dim = self.low_dim.clamp(1, input.len().max(1));
        let bound = match self.kind {
            EmbeddingKind::Rembo => (low_dim as f64).sqrt(),
            EmbeddingKind::Hesbo => 1.0,
        };
        let basis = self.draw_basis(input.len(), low_dim)?;
        let names: Vec<String> = (0..low_dim).map(|i| format!("{}_{i}", self.kind.prefix())).collect();
        let output = ParameterSpace::new(names.iter().map(|name| match self.max_num_values {
            Some(levels) => Parameter::int(name.clone(), 1, levels as i64),
            None => Parameter::float(name.clone(), -bound, bound).default_value(0.0),
        }))?;
        trace_info!(
            step = self.name(),
            input_dims = input.len(),
            output_dims = low_dim,
            seed = self.seed,
            "random embedding drawn"
        );
        self.state = Some(Embedded {
            input: input.clone(),
            names,
            basis,
            bound,
        });
        Ok(output)
    }

    fn needs_unprojection(&self) -> bool {
        true
    }

    #[allow(clippy::cast_precision_loss)]
    fn project_point(&self, point: &Configuration) -> Result<Configuration> {
        let state = self.state()?;
        let unit = state.input.to_unit(point);
        let z: Vec<f64> = match &state.basis {
            Basis::Gaussian { pinv, .. } => {
                let b = state.bound;
                let x = DVector::from_iterator(unit.len(), unit.iter().map(|u| u * 2.0 * b - b));
                (pinv * x).iter().copied().collect()
            }
            Basis::Hash { buckets, signs } => {
                let mut sums = vec![0.0; state.names.len()];
                let mut counts = vec![0_usize; state.names.len()];
                for (j, u) in unit.iter().enumerate() {
                    sums[buckets[j]] += signs[j] * (2.0 * u - 1.0);
                    counts[buckets[j]] += 1;
                }
                sums.iter()
                    .zip(&counts)
                    .map(|(s, &c)| if c == 0 { 0.0 } else { s / c as f64 })
                    .collect()
            }
        };
        Ok(state
            .names
            .iter()
            .zip(z)
            .map(|(name, z)| (name.clone(), self.encode(z, state.bound)))
            .collect())
    }

    fn unproject_point(&self, point: &Configuration) -> Result<Configuration> {
        let state = self.state()?;
        let mut z = Vec::with_capacity(state.names.len());
        for name in &state.names {
            let value = point.get(name).ok_or_else(|| Error::UnknownParameter(name.clone()))?;
            z.push(self.decode(value, state.bound));
        }
        let unit: Vec<f64> = match &state.basis {
            Basis::Gaussian { a, .. } => {
                let b = state.bound;
                let x = a * DVector::from_vec(z);
                x.iter().map(|v| ((v + b) / (2.0 * b)).clamp(0.0, 1.0)).collect()
            }
            Basis::Hash { buckets, signs } => buckets
                .iter()
                .zip(signs)
                .map(|(&h, s)| ((s * z[h] + 1.0) / 2.0).clamp(0.0, 1.0))
                .collect(),
        };
        Ok(state.input.from_unit(&unit))
    }

    fn bind_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    fn validate(&self, original: &ParameterSpace) -> Result<()> {
        if self.low_dim == 0 || self.low_dim > original.len() {
            return Err(Error::IncompatibleStep {
                step: self.name().to_owned(),
                reason: format!(
                    "low_dim {} must lie in [1, {}]",
                    self.low_dim,
                    original.len()
                ),
            });
        }
        if let Some(levels) = self.max_num_values
            && levels < 2
        {
            return Err(Error::InvalidCardinality {
                name: "max_num_values",
                value: levels,
            });
        }
        Ok(())
    }
}
