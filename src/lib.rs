#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! History-driven compression of hyperparameter search spaces.
//!
//! A [`CompressionPipeline`] takes a configuration space and evaluation
//! histories (from the current task or related ones, weighted by similarity)
//! and derives smaller spaces for an external optimizer: a *sample space* to
//! draw candidates from and a *surrogate space* to train a model in. Any
//! sampled point can be mapped back into a fully specified configuration of
//! the original space for evaluation.
//!
//! # Getting Started
//!
//! ```
//! use space_compression::prelude::*;
//!
//! let space = ParameterSpace::new([
//!     Parameter::float("x1", 1.0, 100.0),
//!     Parameter::int("x2", -5, 1028),
//!     Parameter::float("x3", 3140.0, 7890.0),
//! ])
//! .unwrap();
//!
//! let mut rng = fastrand::Rng::with_seed(1);
//! let mut history = History::new(Direction::Minimize);
//! for _ in 0..50 {
//!     let cfg = space.sample(&mut rng);
//!     let y = cfg["x1"].as_f64() + cfg["x3"].as_f64() / 50.0;
//!     history.push(cfg, y);
//! }
//!
//! let mut pipeline = CompressionPipeline::builder(space)
//!     .step(DimensionSelection::correlation(2))
//!     .step(RangeCompression::boundary(0.8, 2.0))
//!     .build()
//!     .unwrap();
//! let (_surrogate, sample) = pipeline.compress_space(&[history], None).unwrap();
//! assert_eq!(sample.names(), vec!["x1", "x3"]);
//!
//! // Draw a candidate and turn it into a full configuration.
//! let candidate = pipeline.get_sampling_strategy().unwrap().sample(1).remove(0);
//! let unprojected = pipeline.unproject_point(&candidate).unwrap();
//! let full = pipeline.complete_config(&unprojected);
//! assert_eq!(full.len(), 3);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`ParameterSpace`] | Ordered, validated, immutable set of [`Parameter`]s. |
//! | [`History`] | Evaluated configurations of one task, with [`SourceSimilarities`] for transfer. |
//! | [`CompressionStep`](step::CompressionStep) | One transformation: dimension, range or projection. |
//! | [`CompressionPipeline`] | Runs the steps, keeps the named spaces, maps points both ways. |
//! | [`UpdateController`](controller::UpdateController) | Adapts the top-K target from optimization progress. |
//! | [`AuditTrail`](audit::AuditTrail) | Append-only record of every compression. |
//!
//! # Steps
//!
//! | Step | Family | Output | Inverse |
//! |------|--------|--------|---------|
//! | [`DimensionSelection`](step::DimensionSelection) | dimension | parameter subset | filling strategy |
//! | [`RangeCompression`](step::RangeCompression) | range | tighter bounds | identity |
//! | [`Quantization`](step::Quantization) | projection | bounded integer levels | level lookup |
//! | [`RandomEmbedding`](step::RandomEmbedding) | projection | REMBO / HesBO box | approximate, clipped |
//! | [`KernelPca`](step::KernelPca) | projection | surrogate components | none |
//!
//! Steps run in family order. Pipelines can also be described by string
//! identifiers through [`factory::PipelineConfig`].
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on public types, [`AuditTrail::to_json`](audit::AuditTrail::to_json) | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at key compression points | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::warn!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

pub mod audit;
pub mod controller;
mod domain;
mod error;
pub mod factory;
mod fanova;
pub mod filling;
mod history;
pub mod importance;
pub mod kde;
mod param;
pub mod parameter;
mod pipeline;
pub mod sampling;
mod space;
pub mod step;
mod types;

pub use domain::{CategoricalDomain, Domain, FloatDomain, IntDomain};
pub use error::{Error, Result};
pub use fanova::{FanovaConfig, FanovaImportance};
pub use history::{History, Observation, SourceSimilarities};
pub use param::ParamValue;
pub use parameter::Parameter;
pub use pipeline::{CompressionPipeline, DEFAULT_SEED, PipelineBuilder};
pub use space::{Configuration, ParameterSpace};
pub use types::Direction;

/// Convenient wildcard import for the most common types.
///
/// ```
/// use space_compression::prelude::*;
/// ```
pub mod prelude {
    pub use crate::audit::{AuditEntry, AuditTrail, CompressionEvent, CompressionSummary};
    pub use crate::controller::{
        CompositeUpdate, HybridUpdate, ImprovementUpdate, PeriodicUpdate, Progress, StagnationUpdate,
        UpdateController, UpdateStrategy,
    };
    pub use crate::error::{Error, Result};
    pub use crate::factory::PipelineConfig;
    pub use crate::fanova::{FanovaConfig, FanovaImportance};
    pub use crate::filling::{ClippingFilling, DefaultValueFilling, FillingStrategy};
    pub use crate::history::{History, Observation, SourceSimilarities};
    pub use crate::importance::{CorrelationImportance, ImportanceCombiner, ImportanceProvider, WeightedAverage};
    pub use crate::kde::{DensityProvider, KdeConfig, KdeDensity};
    pub use crate::param::ParamValue;
    pub use crate::parameter::Parameter;
    pub use crate::pipeline::{CompressionPipeline, PipelineBuilder};
    pub use crate::sampling::{MixedRangeSampling, SampleOrigin, SamplingStrategy, StandardSampling};
    pub use crate::space::{Configuration, ParameterSpace};
    pub use crate::step::{
        CompressionStep, DimensionSelection, KernelPca, Quantization, RandomEmbedding, RangeCompression,
        RangeMethod, StepKind,
    };
    pub use crate::types::Direction;
}
