//! The compression pipeline: ordered steps, named spaces and point mapping.
//!
//! A pipeline owns the original space and a list of steps ordered
//! dimension → range → projection. [`CompressionPipeline::compress_space`]
//! threads the original space through every step and keeps each intermediate
//! space ("stage"):
//!
//! ```text
//! stage 0 (original) ─step 0→ stage 1 ─step 1→ … ─step n-1→ stage n (surrogate)
//! ```
//!
//! The sample space is the stage after the last step that affects sampling.
//! The unprojected space is the input stage of the first step that needs
//! unprojection, or the sample space if there is none. Every stage is derived
//! again from the original on each run, so repeated runs with the same inputs
//! and seed produce the same spaces.

use core::slice;
use std::sync::Arc;

use crate::audit::{AuditTrail, CompressionEvent, CompressionSummary};
use crate::controller::UpdateController;
use crate::error::{Error, Result};
use crate::filling::{DefaultValueFilling, FillingStrategy};
use crate::history::{History, SourceSimilarities};
use crate::sampling::{SamplingStrategy, StandardSampling};
use crate::space::{Configuration, ParameterSpace};
use crate::step::{CompressionStep, StepDescriptor, StepKind};

/// Default pipeline seed.
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug)]
struct State {
    stages: Vec<ParameterSpace>,
    dimension_idx: usize,
    range_idx: usize,
    sample_idx: usize,
    unprojected_idx: usize,
    sampling: Arc<dyn SamplingStrategy>,
}

/// Builder for [`CompressionPipeline`].
///
/// Created via [`CompressionPipeline::builder()`].
///
/// # Defaults
///
/// - Steps: none (every space equals the original)
/// - Filling: [`DefaultValueFilling`]
/// - Update controller: none
/// - Seed: [`DEFAULT_SEED`]
pub struct PipelineBuilder {
    space: ParameterSpace,
    steps: Vec<Box<dyn CompressionStep>>,
    filling: Option<Box<dyn FillingStrategy>>,
    controller: Option<UpdateController>,
    seed: u64,
}

impl PipelineBuilder {
    fn new(space: ParameterSpace) -> Self {
        Self {
            space,
            steps: Vec::new(),
            filling: None,
            controller: None,
            seed: DEFAULT_SEED,
        }
    }

    /// Appends a step.
    #[must_use]
    pub fn step(mut self, step: impl CompressionStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Appends an already boxed step.
    #[must_use]
    pub fn boxed_step(mut self, step: Box<dyn CompressionStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Sets the strategy used to complete partial points.
    #[must_use]
    pub fn filling(mut self, filling: impl FillingStrategy + 'static) -> Self {
        self.filling = Some(Box::new(filling));
        self
    }

    /// As [`filling`](Self::filling), from a boxed strategy.
    #[must_use]
    pub fn boxed_filling(mut self, filling: Box<dyn FillingStrategy>) -> Self {
        self.filling = Some(filling);
        self
    }

    /// Attaches an update controller. Requires a top-K dimension step.
    #[must_use]
    pub fn controller(mut self, controller: UpdateController) -> Self {
        self.controller = Some(controller);
        self
    }

    /// Sets the seed handed to every randomized step.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates the configuration and builds the pipeline.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptySpace`] for a space without parameters.
    /// - [`Error::IncompatibleStep`] for steps out of dimension → range →
    ///   projection order, a surrogate-only step that is not last, or a
    ///   controller without a top-K step.
    /// - Any configuration error reported by a step or the controller.
    pub fn build(self) -> Result<CompressionPipeline> {
        let Self {
            space,
            mut steps,
            filling,
            mut controller,
            seed,
        } = self;
        if space.is_empty() {
            return Err(Error::EmptySpace);
        }

        for pair in steps.windows(2) {
            if pair[1].kind() < pair[0].kind() {
                return Err(Error::IncompatibleStep {
                    step: pair[1].name().to_owned(),
                    reason: format!("a {:?} step cannot follow a {:?} step", pair[1].kind(), pair[0].kind()),
                });
            }
        }
        let last = steps.len().saturating_sub(1);
        if let Some((_, step)) = steps
            .iter()
            .enumerate()
            .find(|(i, s)| !s.affects_sampling_space() && *i != last)
        {
            return Err(Error::IncompatibleStep {
                step: step.name().to_owned(),
                reason: "a surrogate-only step must be the last step".to_owned(),
            });
        }
        for step in &steps {
            step.validate(&space)?;
        }

        if let Some(controller) = controller.as_mut() {
            controller.validate()?;
            let target = steps
                .iter_mut()
                .find(|s| s.target_dimensions().is_some())
                .ok_or_else(|| Error::IncompatibleStep {
                    step: "update_controller".to_owned(),
                    reason: "requires a top-K dimension selection step".to_owned(),
                })?;
            controller.bind_initial(target.target_dimensions().unwrap_or_default());
            target.set_target_dimensions(controller.current_dimensions());
        }

        for step in &mut steps {
            step.bind_seed(seed);
        }

        trace_debug!(steps = steps.len(), seed, "compression pipeline built");
        Ok(CompressionPipeline {
            original: space,
            steps,
            filling: filling.unwrap_or_else(|| Box::new(DefaultValueFilling::new())),
            controller,
            seed,
            state: None,
            descriptors: Vec::new(),
            audit: AuditTrail::new(),
        })
    }
}

/// Maps a configuration space to compressed sample and surrogate spaces and
/// moves points between them.
///
/// # Examples
///
/// ```
/// use space_compression::step::RangeCompression;
/// use space_compression::{CompressionPipeline, Configuration, Direction, History, ParamValue, Parameter, ParameterSpace};
///
/// let space = ParameterSpace::new([Parameter::float("x", 0.0, 100.0)]).unwrap();
/// let mut history = History::new(Direction::Minimize);
/// for x in [38.0, 40.0, 42.0, 39.0, 41.0] {
///     let mut cfg = Configuration::new();
///     cfg.insert("x".into(), ParamValue::Float(x));
///     history.push(cfg, (x - 40.0_f64).abs());
/// }
///
/// let mut pipeline = CompressionPipeline::builder(space)
///     .step(RangeCompression::boundary(1.0, 2.0))
///     .build()
///     .unwrap();
/// let (surrogate, sample) = pipeline.compress_space(&[history], None).unwrap();
/// assert_eq!(surrogate, sample);
///
/// let (low, high) = sample.get("x").unwrap().domain().bounds().unwrap();
/// assert!(low > 30.0 && high < 50.0);
/// ```
#[derive(Debug)]
pub struct CompressionPipeline {
    original: ParameterSpace,
    steps: Vec<Box<dyn CompressionStep>>,
    filling: Box<dyn FillingStrategy>,
    controller: Option<UpdateController>,
    seed: u64,
    state: Option<State>,
    descriptors: Vec<StepDescriptor>,
    audit: AuditTrail,
}

impl CompressionPipeline {
    /// Starts building a pipeline over `space`.
    #[must_use]
    pub fn builder(space: ParameterSpace) -> PipelineBuilder {
        PipelineBuilder::new(space)
    }

    /// Runs every step against `histories` and returns `(surrogate, sample)`.
    ///
    /// With no history every step degrades to its no-op path, so the result is
    /// always usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSimilarity`] for a weight outside `[0, 1]`,
    /// [`Error::ValueKindMismatch`] for a history value of the wrong kind, or
    /// an error raised by a step.
    pub fn compress_space(
        &mut self,
        histories: &[History],
        similarities: Option<&SourceSimilarities>,
    ) -> Result<(ParameterSpace, ParameterSpace)> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("compress_space", sources = histories.len(), steps = self.steps.len()).entered();

        if let Some(similarities) = similarities {
            similarities.validate()?;
        }
        for history in histories {
            history.validate_against(&self.original)?;
        }
        self.run(histories, similarities, CompressionEvent::InitialCompression)?;
        Ok((self.surrogate_space()?.clone(), self.sample_space()?.clone()))
    }

    /// Folds `history` into the update controller and recompresses if it
    /// picks a new target. Returns whether the spaces changed.
    ///
    /// The rerun starts from the original space and uses `history` alone.
    /// Without a controller this always returns `false`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueKindMismatch`] for a history value of the wrong
    /// kind, or an error raised by a step during the rerun.
    pub fn update_compression(&mut self, history: &History) -> Result<bool> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("update_compression", observations = history.len()).entered();

        history.validate_against(&self.original)?;
        let Some(controller) = self.controller.as_mut() else {
            return Ok(false);
        };
        let Some(target) = controller.observe(history) else {
            return Ok(false);
        };
        if let Some(step) = self.steps.iter_mut().find(|s| s.target_dimensions().is_some()) {
            step.set_target_dimensions(target);
        }
        trace_info!(target, "recompressing with new dimension target");
        self.run(slice::from_ref(history), None, CompressionEvent::AdaptiveUpdate)?;
        Ok(true)
    }

    fn run(
        &mut self,
        histories: &[History],
        similarities: Option<&SourceSimilarities>,
        event: CompressionEvent,
    ) -> Result<()> {
        let mut stages = Vec::with_capacity(self.steps.len() + 1);
        stages.push(self.original.clone());
        let mut descriptors = Vec::with_capacity(self.steps.len());
        let mut reexpressed: Option<Vec<History>> = None;

        for step in &mut self.steps {
            let input = stages.last().ok_or(Error::Internal("pipeline has no input stage"))?;
            let current = reexpressed.as_deref().unwrap_or(histories);
            let output = step.apply(input, current, similarities)?;
            trace_info!(
                step = step.name(),
                input_dims = input.len(),
                output_dims = output.len(),
                "compression step applied"
            );
            descriptors.push(StepDescriptor {
                step: step.name().to_owned(),
                kind: step.kind(),
                input_dims: input.len(),
                output_dims: output.len(),
                records: step.records(input, &output),
            });
            if step.needs_unprojection() || !step.affects_sampling_space() {
                let mapped = current
                    .iter()
                    .map(|h| {
                        map_history(h, |config| {
                            let projected = step.project_point(config)?;
                            Ok(self.filling.fill_missing_parameters(&projected, &output))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                reexpressed = Some(mapped);
            }
            stages.push(output);
        }

        let dimension_idx = self.steps.iter().filter(|s| s.kind() == StepKind::Dimension).count();
        let range_idx = dimension_idx + self.steps.iter().filter(|s| s.kind() == StepKind::Range).count();
        let sample_idx = self
            .steps
            .iter()
            .rposition(|s| s.affects_sampling_space())
            .map_or(0, |i| i + 1);
        let unprojected_idx = self.steps[..sample_idx]
            .iter()
            .position(|s| s.needs_unprojection())
            .unwrap_or(sample_idx);

        let sampling = self.build_sampling_strategy(&stages[sample_idx]);
        let state = State {
            stages,
            dimension_idx,
            range_idx,
            sample_idx,
            unprojected_idx,
            sampling,
        };
        let summary = CompressionSummary::new(
            &self.original,
            &state.stages[sample_idx],
            state.stages.last().unwrap_or(&self.original),
            &descriptors,
        );
        trace_info!(
            event = event.as_str(),
            original_dims = summary.original_dims,
            sample_dims = summary.sample_dims,
            surrogate_dims = summary.surrogate_dims,
            "compression finished"
        );
        self.descriptors.extend(descriptors);
        self.state = Some(state);
        let target = self.target_dimensions();
        self.audit.record(event, target, summary);
        Ok(())
    }

    /// The last step offering a strategy wins, as long as no later step changes
    /// the sample space. Otherwise uniform sampling over the sample space.
    fn build_sampling_strategy(&self, sample_space: &ParameterSpace) -> Arc<dyn SamplingStrategy> {
        for step in self.steps.iter().rev() {
            if let Some(strategy) = step.sampling_strategy(self.seed) {
                trace_debug!(step = step.name(), "using step sampling strategy");
                return Arc::from(strategy);
            }
            if step.affects_sampling_space() {
                break;
            }
        }
        Arc::new(StandardSampling::new(sample_space.clone(), self.seed))
    }

    fn state(&self) -> Result<&State> {
        self.state.as_ref().ok_or(Error::NotCompressed)
    }

    /// Maps `point` through steps `from..to`, completing each intermediate point.
    fn forward(&self, state: &State, point: &Configuration, from: usize, to: usize) -> Result<Configuration> {
        let mut current = point.clone();
        for (i, step) in self.steps.iter().enumerate().take(to).skip(from) {
            let projected = step.project_point(&current)?;
            current = self.filling.fill_missing_parameters(&projected, &state.stages[i + 1]);
        }
        Ok(current)
    }

    /// Identifies the stage `point` lives in: the original space or the sample space.
    fn starting_stage(&self, state: &State, point: &Configuration) -> Result<usize> {
        match self.original.check_shape(point) {
            Ok(()) => Ok(0),
            Err(err) => state.stages[state.sample_idx]
                .check_shape(point)
                .map(|()| state.sample_idx)
                .map_err(|_| err),
        }
    }

    /// Maps a point of the original or the sample space into the surrogate space.
    ///
    /// Only the steps between the point's space and the surrogate space run, so
    /// a sample-space point only passes through surrogate-only steps.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCompressed`] before the first compression, or a shape
    /// error if `point` belongs to neither space.
    pub fn convert_config_to_surrogate_space(&self, point: &Configuration) -> Result<Configuration> {
        let state = self.state()?;
        let from = self.starting_stage(state, point)?;
        self.forward(state, point, from, self.steps.len())
    }

    /// Maps a point of the original space into the sample space.
    ///
    /// A point already in the sample space is returned as is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCompressed`] before the first compression, or a shape
    /// error if `point` belongs to neither space.
    pub fn convert_config_to_sample_space(&self, point: &Configuration) -> Result<Configuration> {
        let state = self.state()?;
        let from = self.starting_stage(state, point)?;
        self.forward(state, point, from, state.sample_idx)
    }

    /// Maps a sample-space point back into the unprojected space.
    ///
    /// The unprojection chain runs in reverse. After each inverse the point is
    /// clipped into the previous stage and completed by the filling strategy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCompressed`] before the first compression, or
    /// [`Error::ShapeMismatch`], [`Error::UnknownParameter`] or
    /// [`Error::ValueKindMismatch`] if `point` does not have the sample space's shape.
    pub fn unproject_point(&self, point: &Configuration) -> Result<Configuration> {
        let state = self.state()?;
        state.stages[state.sample_idx].check_shape(point)?;
        let mut current = point.clone();
        for i in (state.unprojected_idx..state.sample_idx).rev() {
            let step = &self.steps[i];
            if step.needs_unprojection() {
                current = step.unproject_point(&current)?;
            }
            let clipped = state.stages[i].clip_config(&current);
            trace_debug!(step = step.name(), stage = i, "point clipped into previous stage");
            current = self.filling.fill_missing_parameters(&clipped, &state.stages[i]);
        }
        Ok(current)
    }

    /// Completes an unprojected point into a full original-space configuration.
    #[must_use]
    pub fn complete_config(&self, point: &Configuration) -> Configuration {
        self.filling.fill_missing_parameters(point, &self.original)
    }

    /// Re-expresses every source record in the surrogate space, keeping objectives.
    ///
    /// Parameters the original space does not declare are dropped and missing
    /// ones filled before the forward chain runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCompressed`] before the first compression, or an
    /// error raised by a step's projection.
    pub fn transform_source_data(&self, histories: &[History]) -> Result<Vec<History>> {
        if histories.is_empty() {
            return Ok(Vec::new());
        }
        let state = self.state()?;
        histories
            .iter()
            .map(|h| {
                map_history(h, |config| {
                    let complete = self.filling.fill_missing_parameters(config, &self.original);
                    self.forward(state, &complete, 0, self.steps.len())
                })
            })
            .collect()
    }

    /// The strategy the optimizer should draw candidates with.
    ///
    /// Built once per compression and shared: every call returns the same
    /// instance, so draws continue one random stream and sampling feedback
    /// persists until the next compression.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCompressed`] before the first compression.
    pub fn get_sampling_strategy(&self) -> Result<Arc<dyn SamplingStrategy>> {
        Ok(Arc::clone(&self.state()?.sampling))
    }

    /// The space the pipeline was built over.
    #[must_use]
    pub fn original_space(&self) -> &ParameterSpace {
        &self.original
    }

    /// The space after the last dimension selection step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCompressed`] before the first compression.
    pub fn dimension_reduced_space(&self) -> Result<&ParameterSpace> {
        self.state().map(|s| &s.stages[s.dimension_idx])
    }

    /// The space after the last range compression step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCompressed`] before the first compression.
    pub fn range_compressed_space(&self) -> Result<&ParameterSpace> {
        self.state().map(|s| &s.stages[s.range_idx])
    }

    /// The space candidates are drawn from.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCompressed`] before the first compression.
    pub fn sample_space(&self) -> Result<&ParameterSpace> {
        self.state().map(|s| &s.stages[s.sample_idx])
    }

    /// The space the surrogate model trains in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCompressed`] before the first compression.
    pub fn surrogate_space(&self) -> Result<&ParameterSpace> {
        let state = self.state()?;
        state.stages.last().ok_or(Error::Internal("pipeline has no stages"))
    }

    /// The shape evaluation-time configurations take after [`unproject_point`](Self::unproject_point).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCompressed`] before the first compression.
    pub fn get_unprojected_space(&self) -> Result<&ParameterSpace> {
        self.state().map(|s| &s.stages[s.unprojected_idx])
    }

    /// `true` when sampled points must be unprojected before evaluation.
    #[must_use]
    pub fn needs_unprojection(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| s.unprojected_idx < s.sample_idx)
    }

    /// Summary of the latest compression.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCompressed`] before the first compression.
    pub fn summary(&self) -> Result<CompressionSummary> {
        let state = self.state()?;
        let run = &self.descriptors[self.descriptors.len() - self.steps.len()..];
        Ok(CompressionSummary::new(
            &self.original,
            &state.stages[state.sample_idx],
            self.surrogate_space()?,
            run,
        ))
    }

    /// Every step descriptor recorded so far, oldest first.
    #[must_use]
    pub fn descriptors(&self) -> &[StepDescriptor] {
        &self.descriptors
    }

    /// One entry per compression.
    #[must_use]
    pub fn audit_trail(&self) -> &AuditTrail {
        &self.audit
    }

    /// The update controller, if any.
    #[must_use]
    pub fn controller(&self) -> Option<&UpdateController> {
        self.controller.as_ref()
    }

    /// Resets the controller and restores the top-K step's initial target.
    ///
    /// The spaces stay as they are until the next compression.
    pub fn reset_controller(&mut self) {
        if let Some(controller) = self.controller.as_mut() {
            controller.reset();
            let initial = controller.current_dimensions();
            if let Some(step) = self.steps.iter_mut().find(|s| s.target_dimensions().is_some()) {
                step.set_target_dimensions(initial);
            }
        }
    }

    /// The top-K target of the dimension selection step, if any.
    #[must_use]
    pub fn target_dimensions(&self) -> Option<usize> {
        self.steps.iter().find_map(|s| s.target_dimensions())
    }

    /// Names of the configured steps, in order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// The seed handed to randomized steps.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

fn map_history(
    history: &History,
    mut f: impl FnMut(&Configuration) -> Result<Configuration>,
) -> Result<History> {
    let mut out = History::new(history.direction());
    if let Some(id) = history.task_id() {
        out = out.with_task_id(id);
    }
    for obs in history.observations() {
        out.push(f(&obs.config)?, obs.objective);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamValue;
    use crate::parameter::Parameter;
    use crate::step::{DimensionSelection, KernelPca, Quantization, RangeCompression};
    use crate::types::Direction;

    fn space() -> ParameterSpace {
        ParameterSpace::new([
            Parameter::float("a", 0.0, 10.0),
            Parameter::int("b", 0, 1000),
            Parameter::float("c", 0.0, 1.0),
        ])
        .unwrap()
    }

    fn history() -> History {
        let mut rng = fastrand::Rng::with_seed(3);
        let mut h = History::new(Direction::Minimize);
        for _ in 0..40 {
            let cfg = space().sample(&mut rng);
            let y = cfg["a"].as_f64() + cfg["b"].as_f64() / 100.0;
            h.push(cfg, y);
        }
        h
    }

    #[test]
    fn empty_pipeline_is_identity() {
        let mut pipeline = CompressionPipeline::builder(space()).build().unwrap();
        let (surrogate, sample) = pipeline.compress_space(&[], None).unwrap();
        assert_eq!(surrogate, space());
        assert_eq!(sample, space());
        assert!(!pipeline.needs_unprojection());
        let p = space().default_config();
        assert_eq!(pipeline.unproject_point(&p).unwrap(), p);
    }

    #[test]
    fn requires_compression_first() {
        let pipeline = CompressionPipeline::builder(space()).build().unwrap();
        assert!(matches!(pipeline.sample_space(), Err(Error::NotCompressed)));
        assert!(pipeline.transform_source_data(&[]).unwrap().is_empty());
    }

    #[test]
    fn quantization_joins_the_chain() {
        let mut pipeline = CompressionPipeline::builder(space())
            .step(DimensionSelection::correlation(2))
            .step(Quantization::new(20))
            .build()
            .unwrap();
        let (_, sample) = pipeline.compress_space(&[history()], None).unwrap();
        assert_eq!(sample.names(), vec!["a", "b|q"]);
        assert_eq!(pipeline.get_unprojected_space().unwrap().names(), vec!["a", "b"]);
        assert!(pipeline.needs_unprojection());

        let mut point = Configuration::new();
        point.insert("a".into(), ParamValue::Float(2.0));
        point.insert("b|q".into(), ParamValue::Int(20));
        let back = pipeline.unproject_point(&point).unwrap();
        assert_eq!(back["b"], ParamValue::Int(1000));
        let full = pipeline.complete_config(&back);
        assert_eq!(full.len(), 3);
    }

    #[test]
    fn kernel_pca_splits_sample_and_surrogate() {
        let mut pipeline = CompressionPipeline::builder(space())
            .step(RangeCompression::boundary(0.5, 2.0))
            .step(KernelPca::new(2))
            .build()
            .unwrap();
        let (surrogate, sample) = pipeline.compress_space(&[history()], None).unwrap();
        assert_eq!(sample.len(), 3);
        assert_eq!(surrogate.names(), vec!["kpca_0", "kpca_1"]);
        let z = pipeline.convert_config_to_surrogate_space(&sample.default_config()).unwrap();
        assert!(surrogate.contains(&z));
        assert!(!pipeline.needs_unprojection());
    }

    #[test]
    fn rejects_out_of_order_steps() {
        let err = CompressionPipeline::builder(space())
            .step(Quantization::new(5))
            .step(DimensionSelection::correlation(2))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::IncompatibleStep { .. }));
    }

    #[test]
    fn descriptors_accumulate() {
        let mut pipeline = CompressionPipeline::builder(space())
            .step(DimensionSelection::correlation(2))
            .build()
            .unwrap();
        pipeline.compress_space(&[history()], None).unwrap();
        pipeline.compress_space(&[history()], None).unwrap();
        assert_eq!(pipeline.descriptors().len(), 2);
        assert_eq!(pipeline.audit_trail().len(), 2);
        assert_eq!(pipeline.summary().unwrap().steps.len(), 1);
    }
}
