//! Dimension selection: keep the parameters that matter.
//!
//! Three selection methods share one step type:
//!
//! - **top-K**: rank by an [`ImportanceProvider`], combine sources with an
//!   [`ImportanceCombiner`], keep the K best. Equal scores keep the parameter
//!   declared first. K is clamped to the available count.
//! - **include**: keep an explicit list of names.
//! - **exclude**: drop an explicit list of names.
//!
//! Without usable history every score is zero, so top-K keeps the first K
//! declared parameters.

use crate::error::{Error, Result};
use crate::fanova::FanovaImportance;
use crate::history::{History, SourceSimilarities};
use crate::importance::{
    CorrelationImportance, ImportanceCombiner, ImportanceProvider, ImportanceScores, WeightedAverage,
    combined_importance,
};
use crate::space::{Configuration, ParameterSpace};
use crate::step::{CompressionStep, StepKind};

#[derive(Debug)]
enum Method {
    TopK {
        provider: Box<dyn ImportanceProvider>,
        combiner: Box<dyn ImportanceCombiner>,
        k: usize,
    },
    Include(Vec<String>),
    Exclude(Vec<String>),
}

/// Removes parameters from the space.
///
/// # Examples
///
/// ```
/// use space_compression::step::{CompressionStep, DimensionSelection};
/// use space_compression::{Parameter, ParameterSpace};
///
/// let space = ParameterSpace::new([
///     Parameter::float("a", 0.0, 1.0),
///     Parameter::float("b", 0.0, 1.0),
///     Parameter::float("c", 0.0, 1.0),
/// ])
/// .unwrap();
///
/// // No history: the first K declared parameters survive.
/// let mut step = DimensionSelection::correlation(2);
/// let out = step.apply(&space, &[], None).unwrap();
/// assert_eq!(out.names(), vec!["a", "b"]);
/// ```
#[derive(Debug)]
pub struct DimensionSelection {
    name: String,
    method: Method,
    selected: Option<Vec<String>>,
    scores: Option<ImportanceScores>,
}

impl DimensionSelection {
    /// Keeps the `k` most important parameters according to `provider`.
    #[must_use]
    pub fn top_k(provider: impl ImportanceProvider + 'static, k: usize) -> Self {
        Self {
            name: format!("topk_{}", provider.name()),
            method: Method::TopK {
                provider: Box::new(provider),
                combiner: Box::new(WeightedAverage::new()),
                k,
            },
            selected: None,
            scores: None,
        }
    }

    /// Top-K by absolute Spearman correlation.
    #[must_use]
    pub fn correlation(k: usize) -> Self {
        Self::top_k(CorrelationImportance::spearman(), k)
    }

    /// Top-K by random-forest main effects.
    #[must_use]
    pub fn fanova(k: usize) -> Self {
        Self::top_k(FanovaImportance::default(), k)
    }

    /// Keeps exactly the listed parameters that exist in the input.
    ///
    /// When none of them exist, the input passes through unchanged.
    #[must_use]
    pub fn include<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: "expert_include".to_owned(),
            method: Method::Include(names.into_iter().map(Into::into).collect()),
            selected: None,
            scores: None,
        }
    }

    /// Drops the listed parameters. If that would leave nothing, the input passes through.
    #[must_use]
    pub fn exclude<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: "expert_exclude".to_owned(),
            method: Method::Exclude(names.into_iter().map(Into::into).collect()),
            selected: None,
            scores: None,
        }
    }

    /// Replaces the multi-source combination rule of a top-K selection.
    #[must_use]
    pub fn combiner(mut self, combiner: impl ImportanceCombiner + 'static) -> Self {
        if let Method::TopK { combiner: c, .. } = &mut self.method {
            *c = Box::new(combiner);
        }
        self
    }

    /// Names kept by the last `apply`, in declaration order.
    #[must_use]
    pub fn selected(&self) -> Option<&[String]> {
        self.selected.as_deref()
    }

    /// Combined importance scores of the last top-K `apply`.
    #[must_use]
    pub fn scores(&self) -> Option<&ImportanceScores> {
        self.scores.as_ref()
    }

    fn rank(
        input: &ParameterSpace,
        provider: &dyn ImportanceProvider,
        combiner: &dyn ImportanceCombiner,
        histories: &[History],
        similarities: Option<&SourceSimilarities>,
    ) -> ImportanceScores {
        let zeros = || input.iter().map(|p| (p.name().to_owned(), 0.0)).collect();
        if histories.iter().all(History::is_empty) {
            trace_debug!(provider = provider.name(), "no history, importance defaults to zero");
            return zeros();
        }
        match combined_importance(provider, combiner, input, histories, similarities) {
            Ok(scores) => scores,
            Err(_) => {
                trace_warn!(provider = provider.name(), "importance estimation failed, keeping declaration order");
                zeros()
            }
        }
    }
}

/// Indices of the `k` best-scored parameters; ties keep declaration order.
fn top_indices(input: &ParameterSpace, scores: &ImportanceScores, k: usize) -> Vec<usize> {
    let score_of = |i: usize| {
        let s = scores.get(input.params()[i].name()).copied().unwrap_or(0.0);
        if s.is_nan() { 0.0 } else { s }
    };
    let mut order: Vec<usize> = (0..input.len()).collect();
    order.sort_by(|&a, &b| score_of(b).total_cmp(&score_of(a)).then(a.cmp(&b)));
    order.truncate(k);
    order.sort_unstable();
    order
}

impl CompressionStep for DimensionSelection {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StepKind {
        StepKind::Dimension
    }

    fn apply(
        &mut self,
        input: &ParameterSpace,
        histories: &[History],
        similarities: Option<&SourceSimilarities>,
    ) -> Result<ParameterSpace> {
        let names: Vec<String> = match &self.method {
            Method::TopK { provider, combiner, k } => {
                let scores = Self::rank(input, provider.as_ref(), combiner.as_ref(), histories, similarities);
                let k = (*k).clamp(1, input.len().max(1));
                let kept = top_indices(input, &scores, k)
                    .into_iter()
                    .map(|i| input.params()[i].name().to_owned())
                    .collect();
                self.scores = Some(scores);
                kept
            }
            Method::Include(list) => {
                let kept: Vec<String> = input
                    .iter()
                    .filter(|p| list.iter().any(|n| n == p.name()))
                    .map(|p| p.name().to_owned())
                    .collect();
                if kept.is_empty() {
                    trace_warn!(step = %self.name, "no listed parameter exists, keeping all");
                    input.names().into_iter().map(str::to_owned).collect()
                } else {
                    kept
                }
            }
            Method::Exclude(list) => {
                let kept: Vec<String> = input
                    .iter()
                    .filter(|p| !list.iter().any(|n| n == p.name()))
                    .map(|p| p.name().to_owned())
                    .collect();
                if kept.is_empty() {
                    trace_warn!(step = %self.name, "exclusion would remove every parameter, keeping all");
                    input.names().into_iter().map(str::to_owned).collect()
                } else {
                    kept
                }
            }
        };

        let output = input.subset(&names)?;
        trace_info!(
            step = %self.name,
            input_dims = input.len(),
            output_dims = output.len(),
            selected = ?names,
            "dimension selection applied"
        );
        self.selected = Some(names);
        Ok(output)
    }

    fn project_point(&self, point: &Configuration) -> Result<Configuration> {
        let selected = self.selected.as_ref().ok_or(Error::NotCompressed)?;
        Ok(point
            .iter()
            .filter(|(name, _)| selected.contains(name))
            .map(|(name, value)| (name.clone(), *value))
            .collect())
    }

    fn target_dimensions(&self) -> Option<usize> {
        match &self.method {
            Method::TopK { k, .. } => Some(*k),
            Method::Include(_) | Method::Exclude(_) => None,
        }
    }

    fn set_target_dimensions(&mut self, target: usize) {
        if let Method::TopK { k, .. } = &mut self.method {
            *k = target.max(1);
        }
    }

    fn validate(&self, _original: &ParameterSpace) -> Result<()> {
        match &self.method {
            Method::TopK { k: 0, .. } => Err(Error::InvalidCardinality { name: "topk", value: 0 }),
            _ => Ok(()),
        }
    }
}
