//! Compression steps: the units a pipeline threads a space through.
//!
//! Every step maps an input space (plus optional history) to an output space
//! and knows how to move points between the two.
//!
//! | Family | Type | Invertible | Affects sampling |
//! |--------|------|------------|------------------|
//! | Dimension selection | [`DimensionSelection`] | yes (via filling) | yes |
//! | Range compression | [`RangeCompression`] | yes | yes |
//! | Quantization | [`Quantization`] | exact lookup | yes |
//! | Random embedding | [`RandomEmbedding`] | approximate, clipped | yes |
//! | Kernel PCA | [`KernelPca`] | no | no, surrogate only |

pub mod dimension;
pub mod projection;
pub mod range;

pub use dimension::DimensionSelection;
pub use projection::{EmbeddingKind, KernelPca, Quantization, RandomEmbedding};
pub use range::{RangeCompression, RangeMethod};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::Result;
use crate::history::{History, SourceSimilarities};
use crate::parameter::Parameter;
use crate::sampling::SamplingStrategy;
use crate::space::{Configuration, ParameterSpace};

/// The family a step belongs to. Pipelines order them dimension, range, projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StepKind {
    /// Removes parameters.
    Dimension,
    /// Tightens bounds.
    Range,
    /// Changes the coordinate system.
    Projection,
}

/// The extent of one parameter, as recorded in a [`CompressionRecord`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParamRange {
    /// Numeric bounds.
    Numeric {
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
    /// Number of categorical choices.
    Choices(usize),
}

impl ParamRange {
    /// The extent of `param`'s domain.
    #[must_use]
    pub fn of(param: &Parameter) -> Self {
        match param.domain() {
            Domain::Categorical(d) => Self::Choices(d.choices.len()),
            other => {
                let (low, high) = other.bounds().unwrap_or((0.0, 0.0));
                Self::Numeric { low, high }
            }
        }
    }

    /// Width of a numeric range, or the number of choices.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn width(&self) -> f64 {
        match *self {
            Self::Numeric { low, high } => high - low,
            Self::Choices(n) => n as f64,
        }
    }
}

/// Per-parameter outcome of one step execution.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompressionRecord {
    /// Parameter name in the step's output.
    pub parameter: String,
    /// Extent in the step's input, `None` for synthetic coordinates.
    pub original_range: Option<ParamRange>,
    /// Extent in the step's output.
    pub compressed_range: ParamRange,
    /// Compressed width over original width (`1.0` when undefined).
    pub compression_ratio: f64,
    /// Number of discrete levels after re-quantization, if any.
    pub cardinality: Option<u64>,
}

impl CompressionRecord {
    /// Record for an output parameter derived from `original`.
    #[must_use]
    pub fn between(original: Option<&Parameter>, compressed: &Parameter) -> Self {
        let compressed_range = ParamRange::of(compressed);
        let original_range = original.map(ParamRange::of);
        let compression_ratio = match original_range {
            Some(orig) if orig.width() > 0.0 => compressed_range.width() / orig.width(),
            _ => 1.0,
        };
        Self {
            parameter: compressed.name().to_owned(),
            original_range,
            compressed_range,
            compression_ratio,
            cardinality: None,
        }
    }
}

/// One step execution: kind, dimension counts and per-parameter records.
///
/// Created once per execution and never modified; the pipeline keeps them
/// in an append-only log.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepDescriptor {
    /// The step's name.
    pub step: String,
    /// The step's family.
    pub kind: StepKind,
    /// Parameters in the step's input.
    pub input_dims: usize,
    /// Parameters in the step's output.
    pub output_dims: usize,
    /// Per-parameter records.
    pub records: Vec<CompressionRecord>,
}

impl StepDescriptor {
    /// `output_dims / input_dims`, `1.0` for an empty input.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn dimension_ratio(&self) -> f64 {
        if self.input_dims == 0 {
            1.0
        } else {
            self.output_dims as f64 / self.input_dims as f64
        }
    }

    /// Mean per-parameter compression ratio, `1.0` without records.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_compression_ratio(&self) -> f64 {
        if self.records.is_empty() {
            return 1.0;
        }
        self.records.iter().map(|r| r.compression_ratio).sum::<f64>() / self.records.len() as f64
    }
}

/// The shared contract of every compression step.
///
/// `apply` derives the output space and stores whatever the step needs to map
/// points later. The two flags drive pipeline bookkeeping: a step with
/// `affects_sampling_space() == false` only changes the surrogate
/// representation, and a step with `needs_unprojection() == true` joins the
/// unprojection chain.
pub trait CompressionStep: Send + Sync + core::fmt::Debug {
    /// Short identifier used in descriptors and logs.
    fn name(&self) -> &str;

    /// The step's family.
    fn kind(&self) -> StepKind;

    /// Derives the output space from `input`.
    ///
    /// Insufficient history is never an error: the step degrades to a no-op
    /// or a clamped default instead.
    ///
    /// # Errors
    ///
    /// Returns an error only for violated invariants of the step's own state.
    fn apply(
        &mut self,
        input: &ParameterSpace,
        histories: &[History],
        similarities: Option<&SourceSimilarities>,
    ) -> Result<ParameterSpace>;

    /// `false` when the step changes only the surrogate-training representation.
    fn affects_sampling_space(&self) -> bool {
        true
    }

    /// `true` when points in the output must pass through [`unproject_point`](Self::unproject_point)
    /// before they can be evaluated.
    fn needs_unprojection(&self) -> bool {
        false
    }

    /// Maps a point from input to output coordinates.
    ///
    /// Parameters the output does not contain are dropped by the pipeline's
    /// filling pass afterwards; missing ones are filled there too.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCompressed`](crate::Error::NotCompressed) if called before `apply`.
    fn project_point(&self, point: &Configuration) -> Result<Configuration> {
        Ok(point.clone())
    }

    /// Maps a point from output back to input coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCompressed`](crate::Error::NotCompressed) if called before `apply`.
    fn unproject_point(&self, point: &Configuration) -> Result<Configuration> {
        Ok(point.clone())
    }

    /// Per-parameter records of the last execution.
    fn records(&self, input: &ParameterSpace, output: &ParameterSpace) -> Vec<CompressionRecord> {
        output
            .iter()
            .map(|p| CompressionRecord::between(input.get(p.name()), p))
            .collect()
    }

    /// A sampling strategy this step wants the optimizer to use, if any.
    fn sampling_strategy(&self, _seed: u64) -> Option<Box<dyn SamplingStrategy>> {
        None
    }

    /// Current top-K target for steps the update controller can drive.
    fn target_dimensions(&self) -> Option<usize> {
        None
    }

    /// Sets a new top-K target. Ignored by steps without one.
    fn set_target_dimensions(&mut self, _k: usize) {}

    /// Receives the pipeline seed. Only randomized steps keep it.
    fn bind_seed(&mut self, _seed: u64) {}

    /// Construction-time check against the pipeline's original space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompatibleStep`](crate::Error::IncompatibleStep) or a
    /// configuration error.
    fn validate(&self, _original: &ParameterSpace) -> Result<()> {
        Ok(())
    }
}
