//! Pipelines described by string identifiers.
//!
//! | Identifier | Step |
//! |------------|------|
//! | `d_corr` | top-K by Spearman (or Pearson) correlation |
//! | `d_fanova` | top-K by random-forest main effects |
//! | `d_expert` | caller include list |
//! | `r_boundary` | `μ ± sigma·σ` of the top observations |
//! | `r_kde` | KDE highest-density interval |
//! | `r_weighted` | improvement-weighted boundary |
//! | `r_expert` | caller intervals |
//! | `p_quant` | integer re-quantization |
//! | `p_rembo` / `p_hesbo` | random embeddings |
//! | `p_kpca` | kernel PCA, surrogate only |
//! | `d_none` / `r_none` / `p_none` | no step |
//!
//! Update strategies: `periodic`, `stagnation`, `improvement`, `hybrid`,
//! `composite` and `none`.
//!
//! # Examples
//!
//! ```
//! use space_compression::factory::PipelineConfig;
//! use space_compression::{Parameter, ParameterSpace};
//!
//! let space = ParameterSpace::new([
//!     Parameter::float("a", 0.0, 1.0),
//!     Parameter::int("b", 0, 10_000),
//! ])
//! .unwrap();
//! let config = PipelineConfig {
//!     dimension_step: "d_corr".into(),
//!     projection_step: "p_quant".into(),
//!     ..PipelineConfig::default()
//! };
//! let pipeline = config.build(space).unwrap();
//! assert_eq!(pipeline.step_names(), vec!["topk_spearman", "quantization"]);
//! ```

use core::str::FromStr;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::controller::{
    CompositeUpdate, HybridUpdate, ImprovementUpdate, PeriodicUpdate, StagnationUpdate, UpdateController,
    UpdateStrategy,
};
use crate::error::{Error, Result};
use crate::filling::{ClippingFilling, DefaultValueFilling, FillingStrategy};
use crate::importance::{CorrelationImportance, CorrelationMethod};
use crate::pipeline::{CompressionPipeline, DEFAULT_SEED};
use crate::space::ParameterSpace;
use crate::step::{
    CompressionStep, DimensionSelection, KernelPca, Quantization, RandomEmbedding, RangeCompression, StepKind,
};
use crate::{FanovaConfig, FanovaImportance};

/// A step identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepId {
    /// `d_corr`
    Correlation,
    /// `d_fanova`
    Fanova,
    /// `d_expert`
    ExpertDimension,
    /// `d_none`
    NoDimension,
    /// `r_boundary`
    Boundary,
    /// `r_kde`
    Kde,
    /// `r_weighted`
    WeightedBoundary,
    /// `r_expert`
    ExpertRange,
    /// `r_none`
    NoRange,
    /// `p_quant`
    Quantization,
    /// `p_rembo`
    Rembo,
    /// `p_hesbo`
    Hesbo,
    /// `p_kpca`
    KernelPca,
    /// `p_none`
    NoProjection,
}

impl StepId {
    /// Every identifier, grouped dimension, range, projection.
    pub const ALL: [Self; 14] = [
        Self::Correlation,
        Self::Fanova,
        Self::ExpertDimension,
        Self::NoDimension,
        Self::Boundary,
        Self::Kde,
        Self::WeightedBoundary,
        Self::ExpertRange,
        Self::NoRange,
        Self::Quantization,
        Self::Rembo,
        Self::Hesbo,
        Self::KernelPca,
        Self::NoProjection,
    ];

    /// The string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Correlation => "d_corr",
            Self::Fanova => "d_fanova",
            Self::ExpertDimension => "d_expert",
            Self::NoDimension => "d_none",
            Self::Boundary => "r_boundary",
            Self::Kde => "r_kde",
            Self::WeightedBoundary => "r_weighted",
            Self::ExpertRange => "r_expert",
            Self::NoRange => "r_none",
            Self::Quantization => "p_quant",
            Self::Rembo => "p_rembo",
            Self::Hesbo => "p_hesbo",
            Self::KernelPca => "p_kpca",
            Self::NoProjection => "p_none",
        }
    }

    /// The family of steps this identifier creates.
    #[must_use]
    pub fn kind(self) -> StepKind {
        match self {
            Self::Correlation | Self::Fanova | Self::ExpertDimension | Self::NoDimension => StepKind::Dimension,
            Self::Boundary | Self::Kde | Self::WeightedBoundary | Self::ExpertRange | Self::NoRange => {
                StepKind::Range
            }
            Self::Quantization | Self::Rembo | Self::Hesbo | Self::KernelPca | Self::NoProjection => {
                StepKind::Projection
            }
        }
    }

    /// Identifiers of one family.
    pub fn of_kind(kind: StepKind) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |id| id.kind() == kind)
    }
}

impl FromStr for StepId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::UnknownStep(s.to_owned()))
    }
}

impl core::fmt::Display for StepId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step settings shared by every identifier; each step reads the fields it needs.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StepOptions {
    /// Top-K of `d_corr` / `d_fanova` (default: 20).
    pub topk: usize,
    /// Correlation flavour of `d_corr` (default: Spearman).
    pub correlation: CorrelationMethod,
    /// Forest settings of `d_fanova`.
    pub fanova: FanovaConfig,
    /// Include list of `d_expert`.
    pub expert_params: Vec<String>,
    /// Parameters dropped before any dimension step runs.
    pub exclude_params: Vec<String>,
    /// `top_ratio` of `r_boundary` / `r_weighted` (default: 0.8).
    pub top_ratio: f64,
    /// `sigma` of `r_boundary` / `r_weighted` (default: 2.0).
    pub sigma: f64,
    /// `top_ratio` of `r_kde` (default: 0.3).
    pub source_top_ratio: f64,
    /// Coverage of `r_kde` (default: 0.6).
    pub kde_coverage: f64,
    /// Intervals of `r_expert`.
    pub expert_ranges: BTreeMap<String, (f64, f64)>,
    /// Whether data-driven range steps offer mixed sampling (default: `true`).
    pub enable_mixed_sampling: bool,
    /// Initial compressed-space probability of mixed sampling (default: 0.9).
    pub initial_prob: f64,
    /// Level count of `p_quant`, and of embeddings when `quantize_embedding` is set (default: 10).
    pub max_num_values: usize,
    /// Quantizes the embedding coordinates of `p_rembo` / `p_hesbo`.
    pub quantize_embedding: bool,
    /// Target dimension of `p_rembo` / `p_hesbo` (default: 10).
    pub low_dim: usize,
    /// Components of `p_kpca` (default: 10).
    pub n_components: usize,
    /// RBF width of `p_kpca`; `None` uses `1 / d`.
    pub gamma: Option<f64>,
}

impl Default for StepOptions {
    fn default() -> Self {
        Self {
            topk: 20,
            correlation: CorrelationMethod::Spearman,
            fanova: FanovaConfig::default(),
            expert_params: Vec::new(),
            exclude_params: Vec::new(),
            top_ratio: 0.8,
            sigma: 2.0,
            source_top_ratio: 0.3,
            kde_coverage: 0.6,
            expert_ranges: BTreeMap::new(),
            enable_mixed_sampling: true,
            initial_prob: 0.9,
            max_num_values: 10,
            quantize_embedding: false,
            low_dim: 10,
            n_components: 10,
            gamma: None,
        }
    }
}

/// Creates the steps behind `id`, in pipeline order.
///
/// `*_none` yields no step. A non-empty `exclude_params` list puts an
/// exclusion step in front of any dimension step.
///
/// # Errors
///
/// Returns [`Error::UnknownStep`] for an unrecognised identifier.
pub fn create_steps(id: &str, options: &StepOptions) -> Result<Vec<Box<dyn CompressionStep>>> {
    let id: StepId = id.parse()?;
    let mut steps: Vec<Box<dyn CompressionStep>> = Vec::new();
    if id.kind() == StepKind::Dimension && !options.exclude_params.is_empty() {
        steps.push(Box::new(DimensionSelection::exclude(options.exclude_params.iter().cloned())));
    }

    let mixed = |step: RangeCompression| {
        if options.enable_mixed_sampling {
            step.mixed_sampling(options.initial_prob)
        } else {
            step
        }
    };
    let embedding = |step: RandomEmbedding| {
        if options.quantize_embedding {
            step.quantized(options.max_num_values)
        } else {
            step
        }
    };

    let step: Option<Box<dyn CompressionStep>> = match id {
        StepId::Correlation => {
            let provider = match options.correlation {
                CorrelationMethod::Spearman => CorrelationImportance::spearman(),
                CorrelationMethod::Pearson => CorrelationImportance::pearson(),
            };
            Some(Box::new(DimensionSelection::top_k(provider, options.topk)))
        }
        StepId::Fanova => Some(Box::new(DimensionSelection::top_k(
            FanovaImportance::new(options.fanova.clone()),
            options.topk,
        ))),
        StepId::ExpertDimension => Some(Box::new(DimensionSelection::include(
            options.expert_params.iter().cloned(),
        ))),
        StepId::Boundary => Some(Box::new(mixed(RangeCompression::boundary(
            options.top_ratio,
            options.sigma,
        )))),
        StepId::Kde => Some(Box::new(mixed(RangeCompression::density(
            options.source_top_ratio,
            options.kde_coverage,
        )))),
        StepId::WeightedBoundary => Some(Box::new(mixed(RangeCompression::weighted(
            options.top_ratio,
            options.sigma,
        )))),
        StepId::ExpertRange => Some(Box::new(RangeCompression::fixed(
            options
                .expert_ranges
                .iter()
                .map(|(name, &(low, high))| (name.clone(), low, high)),
        ))),
        StepId::Quantization => Some(Box::new(Quantization::new(options.max_num_values))),
        StepId::Rembo => Some(Box::new(embedding(RandomEmbedding::rembo(options.low_dim)))),
        StepId::Hesbo => Some(Box::new(embedding(RandomEmbedding::hesbo(options.low_dim)))),
        StepId::KernelPca => {
            let mut kpca = KernelPca::new(options.n_components);
            if let Some(gamma) = options.gamma {
                kpca = kpca.gamma(gamma);
            }
            Some(Box::new(kpca))
        }
        StepId::NoDimension | StepId::NoRange | StepId::NoProjection => None,
    };
    steps.extend(step);
    trace_debug!(id = id.as_str(), created = steps.len(), "steps created from identifier");
    Ok(steps)
}

/// Update strategy settings; unset fields use the per-strategy defaults.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UpdateOptions {
    /// Period of `periodic` (default 5) and `hybrid` (default 10).
    pub period: Option<usize>,
    /// Threshold of `stagnation` (default 5); optional trigger of `hybrid`.
    pub stagnation_threshold: Option<usize>,
    /// Threshold of `improvement` (default 3); optional trigger of `hybrid`.
    pub improvement_threshold: Option<usize>,
    /// Member identifiers of `composite`.
    pub composite_strategies: Vec<String>,
}

/// Creates the strategy named `id`; `none` yields `None`.
///
/// A `composite` without usable members falls back to `periodic` with period 5.
///
/// # Errors
///
/// Returns [`Error::UnknownUpdateStrategy`] for an unrecognised or nested
/// `composite` identifier.
pub fn create_update_strategy(id: &str, options: &UpdateOptions) -> Result<Option<Box<dyn UpdateStrategy>>> {
    create_strategy(id, options, true)
}

fn create_strategy(id: &str, options: &UpdateOptions, allow_composite: bool) -> Result<Option<Box<dyn UpdateStrategy>>> {
    let strategy: Box<dyn UpdateStrategy> = match id.to_ascii_lowercase().as_str() {
        "none" => return Ok(None),
        "periodic" => Box::new(PeriodicUpdate {
            period: options.period.unwrap_or(5),
        }),
        "stagnation" => Box::new(StagnationUpdate {
            threshold: options.stagnation_threshold.unwrap_or(5),
        }),
        "improvement" => Box::new(ImprovementUpdate {
            threshold: options.improvement_threshold.unwrap_or(3),
        }),
        "hybrid" => Box::new(HybridUpdate {
            period: options.period.unwrap_or(10),
            stagnation_threshold: options.stagnation_threshold,
            improvement_threshold: options.improvement_threshold,
        }),
        "composite" if allow_composite => {
            let mut composite = CompositeUpdate::new();
            let mut members = 0_usize;
            for member in &options.composite_strategies {
                if let Some(strategy) = create_strategy(member, options, false)? {
                    composite = composite.with_boxed(strategy);
                    members += 1;
                }
            }
            if members == 0 {
                trace_warn!("composite update strategy has no members, using periodic(5)");
                Box::new(PeriodicUpdate { period: 5 })
            } else {
                Box::new(composite)
            }
        }
        _ => return Err(Error::UnknownUpdateStrategy(id.to_owned())),
    };
    Ok(Some(strategy))
}

/// Which filling strategy a configured pipeline uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FillingKind {
    /// [`DefaultValueFilling`].
    #[default]
    Default,
    /// [`ClippingFilling`].
    Clipping,
}

/// A whole pipeline described by identifiers and plain settings.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// A `d_*` identifier (default: `d_none`).
    pub dimension_step: String,
    /// An `r_*` identifier (default: `r_none`).
    pub range_step: String,
    /// A `p_*` identifier (default: `p_none`).
    pub projection_step: String,
    /// Settings for the steps.
    pub step_options: StepOptions,
    /// An update strategy name (default: `none`).
    pub update_strategy: String,
    /// Settings for the update strategy.
    pub update_options: UpdateOptions,
    /// Controller shrink/grow fraction (default: 0.2).
    pub reduction_ratio: f64,
    /// Controller floor (default: 5).
    pub min_dimensions: usize,
    /// Controller ceiling.
    pub max_dimensions: Option<usize>,
    /// Filling strategy.
    pub filling: FillingKind,
    /// Pipeline seed (default: 42).
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dimension_step: "d_none".to_owned(),
            range_step: "r_none".to_owned(),
            projection_step: "p_none".to_owned(),
            step_options: StepOptions::default(),
            update_strategy: "none".to_owned(),
            update_options: UpdateOptions::default(),
            reduction_ratio: 0.2,
            min_dimensions: 5,
            max_dimensions: None,
            filling: FillingKind::Default,
            seed: DEFAULT_SEED,
        }
    }
}

impl PipelineConfig {
    /// Builds the described pipeline over `space`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownStep`] or [`Error::UnknownUpdateStrategy`] for
    /// bad identifiers, [`Error::IncompatibleStep`] when an identifier is used
    /// in the wrong slot, or any error of [`PipelineBuilder::build`](crate::PipelineBuilder::build).
    pub fn build(&self, space: ParameterSpace) -> Result<CompressionPipeline> {
        let mut builder = CompressionPipeline::builder(space).seed(self.seed);
        for (slot, id) in [
            (StepKind::Dimension, &self.dimension_step),
            (StepKind::Range, &self.range_step),
            (StepKind::Projection, &self.projection_step),
        ] {
            let parsed: StepId = id.parse()?;
            if parsed.kind() != slot {
                return Err(Error::IncompatibleStep {
                    step: id.clone(),
                    reason: format!("expected a {slot:?} step identifier"),
                });
            }
            for step in create_steps(id, &self.step_options)? {
                builder = builder.boxed_step(step);
            }
        }

        let filling: Box<dyn FillingStrategy> = match self.filling {
            FillingKind::Default => Box::new(DefaultValueFilling::new()),
            FillingKind::Clipping => Box::new(ClippingFilling::new()),
        };
        builder = builder.boxed_filling(filling);

        if let Some(strategy) = create_update_strategy(&self.update_strategy, &self.update_options)? {
            let mut controller = UpdateController::from_boxed(strategy)
                .reduction_ratio(self.reduction_ratio)
                .min_dimensions(self.min_dimensions);
            if let Some(max) = self.max_dimensions {
                controller = controller.max_dimensions(max);
            }
            builder = builder.controller(controller);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_round_trip() {
        for id in StepId::ALL {
            assert_eq!(id.as_str().parse::<StepId>().unwrap(), id);
        }
        assert!(matches!("d_shap".parse::<StepId>(), Err(Error::UnknownStep(_))));
        assert_eq!(StepId::of_kind(StepKind::Range).count(), 5);
    }

    #[test]
    fn none_creates_nothing() {
        for id in ["d_none", "r_none", "p_none"] {
            assert!(create_steps(id, &StepOptions::default()).unwrap().is_empty());
        }
    }

    #[test]
    fn exclusion_precedes_selection() {
        let options = StepOptions {
            exclude_params: vec!["a".into()],
            ..StepOptions::default()
        };
        let steps = create_steps("d_corr", &options).unwrap();
        let names: Vec<&str> = steps.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["expert_exclude", "topk_spearman"]);
    }

    #[test]
    fn strategy_defaults() {
        let options = UpdateOptions::default();
        assert!(create_update_strategy("none", &options).unwrap().is_none());
        let periodic = create_update_strategy("periodic", &options).unwrap().unwrap();
        assert_eq!(periodic.name(), "periodic(every 5 iterations)");
        let hybrid = create_update_strategy("Hybrid", &options).unwrap().unwrap();
        assert_eq!(hybrid.name(), "periodic(10)");
        assert!(create_update_strategy("bogus", &options).is_err());
    }

    #[test]
    fn empty_composite_falls_back_to_periodic() {
        let strategy = create_update_strategy("composite", &UpdateOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(strategy.name(), "periodic(every 5 iterations)");
    }

    #[test]
    fn nested_composite_is_rejected() {
        let options = UpdateOptions {
            composite_strategies: vec!["composite".into()],
            ..UpdateOptions::default()
        };
        assert!(create_update_strategy("composite", &options).is_err());
    }
}
