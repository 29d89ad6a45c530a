//! Adaptive control of the dimension-selection target.
//!
//! Once per [`CompressionPipeline::update_compression`](crate::CompressionPipeline::update_compression)
//! call the [`UpdateController`] folds the new history into its [`Progress`],
//! asks its [`UpdateStrategy`] whether to act, and if so computes a new top-K
//! target clamped to `[min_dimensions, max_dimensions]`.
//!
//! | Strategy | Fires when | Action |
//! |----------|------------|--------|
//! | [`PeriodicUpdate`] | every `period` calls | shrink |
//! | [`StagnationUpdate`] | `threshold` calls without improvement | grow |
//! | [`ImprovementUpdate`] | `threshold` improving calls in a row | shrink |
//! | [`HybridUpdate`] | stagnation, then improvement, then periodic | first that fires |
//! | [`CompositeUpdate`] | first listed strategy that fires | that strategy's |
//!
//! Shrinking removes `floor(current × reduction_ratio)` dimensions; growing
//! adds `ceil(current × reduction_ratio)`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::history::History;
use crate::types::Direction;

/// Direction of recent best values over a window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Trend {
    /// The best value got better.
    Improving,
    /// The best value got worse.
    Degrading,
    /// No change, or not enough data.
    Stable,
}

/// Optimization progress as seen by the controller.
///
/// Updated once per observed history: the iteration counter always advances,
/// and from the second observation on exactly one of the two streaks grows
/// while the other resets.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Progress {
    iteration: usize,
    best: Option<f64>,
    best_values: Vec<f64>,
    improvement_streak: usize,
    stagnation_streak: usize,
    direction: Direction,
}

impl Progress {
    /// Empty progress for the given direction.
    #[must_use]
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }

    /// Folds in the incumbent of a new history.
    ///
    /// A history without a finite objective counts as a call without improvement.
    pub fn update(&mut self, history: &History) {
        self.direction = history.direction();
        self.record(history.best_value());
    }

    fn record(&mut self, current: Option<f64>) {
        self.iteration += 1;
        match (self.best, current) {
            (Some(best), Some(value)) if self.direction.is_better(value, best) => {
                self.improvement_streak += 1;
                self.stagnation_streak = 0;
            }
            (Some(_), _) => {
                self.stagnation_streak += 1;
                self.improvement_streak = 0;
            }
            (None, _) => {}
        }
        if let Some(value) = current {
            if self.best.is_none_or(|best| self.direction.is_better(value, best)) {
                self.best = Some(value);
            }
            self.best_values.push(value);
        }
    }

    /// Number of observed histories.
    #[must_use]
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// The best objective seen so far.
    #[must_use]
    pub fn best(&self) -> Option<f64> {
        self.best
    }

    /// Consecutive improving calls.
    #[must_use]
    pub fn improvement_streak(&self) -> usize {
        self.improvement_streak
    }

    /// Consecutive calls without improvement.
    #[must_use]
    pub fn stagnation_streak(&self) -> usize {
        self.stagnation_streak
    }

    /// `true` on every `period`-th call.
    #[must_use]
    pub fn is_periodic(&self, period: usize) -> bool {
        period > 0 && self.iteration > 0 && self.iteration % period == 0
    }

    /// `true` once `threshold` calls in a row brought no improvement.
    #[must_use]
    pub fn is_stagnant(&self, threshold: usize) -> bool {
        self.stagnation_streak >= threshold
    }

    /// `true` once `threshold` calls in a row improved.
    #[must_use]
    pub fn has_improvement(&self, threshold: usize) -> bool {
        self.improvement_streak >= threshold
    }

    /// Compares the first and last per-call incumbent of the last `window` records.
    #[must_use]
    pub fn trend(&self, window: usize) -> Trend {
        if window < 2 || self.best_values.len() < window {
            return Trend::Stable;
        }
        let recent = &self.best_values[self.best_values.len() - window..];
        let (first, last) = (recent[0], recent[window - 1]);
        if self.direction.is_better(last, first) {
            Trend::Improving
        } else if self.direction.is_better(first, last) {
            Trend::Degrading
        } else {
            Trend::Stable
        }
    }

    fn restart_streaks(&mut self) {
        self.improvement_streak = 0;
        self.stagnation_streak = 0;
    }
}

/// What an update strategy asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UpdateAction {
    /// Keep fewer dimensions.
    Shrink,
    /// Keep more dimensions.
    Grow,
}

/// Decides, from progress alone, whether the target should change.
pub trait UpdateStrategy: Send + Sync + core::fmt::Debug {
    /// Human-readable description used in logs and the audit trail.
    fn name(&self) -> String;

    /// The action to take now, if any.
    fn decide(&self, progress: &Progress) -> Option<UpdateAction>;

    /// Construction-time check of the strategy's settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCardinality`] for a zero period or threshold.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

fn positive(name: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        Err(Error::InvalidCardinality { name, value })
    } else {
        Ok(())
    }
}

/// Shrinks every `period` calls.
#[derive(Clone, Copy, Debug)]
pub struct PeriodicUpdate {
    /// Calls between shrinks.
    pub period: usize,
}

impl UpdateStrategy for PeriodicUpdate {
    fn name(&self) -> String {
        format!("periodic(every {} iterations)", self.period)
    }

    fn decide(&self, progress: &Progress) -> Option<UpdateAction> {
        progress.is_periodic(self.period).then_some(UpdateAction::Shrink)
    }

    fn validate(&self) -> Result<()> {
        positive("period", self.period)
    }
}

/// Grows after `threshold` calls without improvement.
#[derive(Clone, Copy, Debug)]
pub struct StagnationUpdate {
    /// Non-improving calls before growing.
    pub threshold: usize,
}

impl UpdateStrategy for StagnationUpdate {
    fn name(&self) -> String {
        format!("stagnation(threshold={})", self.threshold)
    }

    fn decide(&self, progress: &Progress) -> Option<UpdateAction> {
        progress.is_stagnant(self.threshold).then_some(UpdateAction::Grow)
    }

    fn validate(&self) -> Result<()> {
        positive("stagnation_threshold", self.threshold)
    }
}

/// Shrinks after `threshold` improving calls in a row.
#[derive(Clone, Copy, Debug)]
pub struct ImprovementUpdate {
    /// Improving calls before shrinking.
    pub threshold: usize,
}

impl UpdateStrategy for ImprovementUpdate {
    fn name(&self) -> String {
        format!("improvement(threshold={})", self.threshold)
    }

    fn decide(&self, progress: &Progress) -> Option<UpdateAction> {
        progress.has_improvement(self.threshold).then_some(UpdateAction::Shrink)
    }

    fn validate(&self) -> Result<()> {
        positive("improvement_threshold", self.threshold)
    }
}

/// Periodic shrinking with optional stagnation and improvement triggers.
///
/// Priority: stagnation, then improvement, then periodic. At most one action per call.
#[derive(Clone, Copy, Debug)]
pub struct HybridUpdate {
    /// Calls between periodic shrinks.
    pub period: usize,
    /// Optional stagnation trigger.
    pub stagnation_threshold: Option<usize>,
    /// Optional improvement trigger.
    pub improvement_threshold: Option<usize>,
}

impl HybridUpdate {
    /// Periodic only; add triggers with the setters.
    #[must_use]
    pub fn new(period: usize) -> Self {
        Self {
            period,
            stagnation_threshold: None,
            improvement_threshold: None,
        }
    }

    /// Enables the stagnation trigger.
    #[must_use]
    pub fn stagnation(mut self, threshold: usize) -> Self {
        self.stagnation_threshold = Some(threshold);
        self
    }

    /// Enables the improvement trigger.
    #[must_use]
    pub fn improvement(mut self, threshold: usize) -> Self {
        self.improvement_threshold = Some(threshold);
        self
    }
}

impl UpdateStrategy for HybridUpdate {
    fn name(&self) -> String {
        let mut parts = vec![format!("periodic({})", self.period)];
        if let Some(t) = self.stagnation_threshold {
            parts.push(format!("stagnant({t})"));
        }
        if let Some(t) = self.improvement_threshold {
            parts.push(format!("improve({t})"));
        }
        parts.join(" OR ")
    }

    fn decide(&self, progress: &Progress) -> Option<UpdateAction> {
        self.stagnation_threshold
            .and_then(|threshold| StagnationUpdate { threshold }.decide(progress))
            .or_else(|| {
                self.improvement_threshold
                    .and_then(|threshold| ImprovementUpdate { threshold }.decide(progress))
            })
            .or_else(|| PeriodicUpdate { period: self.period }.decide(progress))
    }

    fn validate(&self) -> Result<()> {
        positive("period", self.period)?;
        if let Some(t) = self.stagnation_threshold {
            positive("stagnation_threshold", t)?;
        }
        if let Some(t) = self.improvement_threshold {
            positive("improvement_threshold", t)?;
        }
        Ok(())
    }
}

/// Caller-ordered list of strategies; the first one that fires wins.
#[derive(Debug, Default)]
pub struct CompositeUpdate {
    strategies: Vec<Box<dyn UpdateStrategy>>,
}

impl CompositeUpdate {
    /// An empty composite that never fires.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a strategy.
    #[must_use]
    pub fn with(mut self, strategy: impl UpdateStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Appends an already boxed strategy.
    #[must_use]
    pub fn with_boxed(mut self, strategy: Box<dyn UpdateStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }
}

impl UpdateStrategy for CompositeUpdate {
    fn name(&self) -> String {
        let names: Vec<String> = self.strategies.iter().map(|s| s.name()).collect();
        format!("composite({})", names.join(" OR "))
    }

    fn decide(&self, progress: &Progress) -> Option<UpdateAction> {
        self.strategies.iter().find_map(|s| s.decide(progress))
    }

    fn validate(&self) -> Result<()> {
        self.strategies.iter().try_for_each(|s| s.validate())
    }
}

/// Drives the top-K target of a dimension-selection step.
///
/// # Examples
///
/// ```
/// use space_compression::controller::{PeriodicUpdate, UpdateController};
/// use space_compression::{Direction, History};
///
/// let mut controller = UpdateController::new(PeriodicUpdate { period: 10 })
///     .reduction_ratio(0.2)
///     .initial_dimensions(30);
/// let mut history = History::new(Direction::Minimize);
/// history.push(Default::default(), 1.0);
///
/// for _ in 0..9 {
///     assert_eq!(controller.observe(&history), None);
/// }
/// assert_eq!(controller.observe(&history), Some(24));
/// ```
#[derive(Debug)]
pub struct UpdateController {
    strategy: Box<dyn UpdateStrategy>,
    reduction_ratio: f64,
    min_dimensions: usize,
    max_dimensions: Option<usize>,
    initial: usize,
    current: usize,
    progress: Progress,
}

impl UpdateController {
    /// Creates a controller with ratio 0.2, floor 5, no ceiling and initial target 30.
    #[must_use]
    pub fn new(strategy: impl UpdateStrategy + 'static) -> Self {
        Self::from_boxed(Box::new(strategy))
    }

    /// As [`new`](Self::new), from a boxed strategy.
    #[must_use]
    pub fn from_boxed(strategy: Box<dyn UpdateStrategy>) -> Self {
        Self {
            strategy,
            reduction_ratio: 0.2,
            min_dimensions: 5,
            max_dimensions: None,
            initial: 30,
            current: 30,
            progress: Progress::default(),
        }
    }

    /// Fraction of the current target added or removed per action.
    #[must_use]
    pub fn reduction_ratio(mut self, ratio: f64) -> Self {
        self.reduction_ratio = ratio;
        self
    }

    /// Hard floor of the target.
    #[must_use]
    pub fn min_dimensions(mut self, min: usize) -> Self {
        self.min_dimensions = min;
        self.current = self.clamp(self.initial);
        self
    }

    /// Hard ceiling of the target.
    #[must_use]
    pub fn max_dimensions(mut self, max: usize) -> Self {
        self.max_dimensions = Some(max);
        self.current = self.clamp(self.initial);
        self
    }

    /// Starting target.
    #[must_use]
    pub fn initial_dimensions(mut self, initial: usize) -> Self {
        self.initial = initial;
        self.current = self.clamp(initial);
        self
    }

    /// Current target.
    #[must_use]
    pub fn current_dimensions(&self) -> usize {
        self.current
    }

    /// Progress folded in so far.
    #[must_use]
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// The strategy's description.
    #[must_use]
    pub fn strategy_name(&self) -> String {
        self.strategy.name()
    }

    /// Returns to the initial target with empty progress.
    pub fn reset(&mut self) {
        self.current = self.clamp(self.initial);
        self.progress = Progress::default();
    }

    /// Checks ratio, bounds and strategy settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRatio`] for a ratio outside `(0, 1)`, or
    /// [`Error::InvalidCardinality`] for inverted bounds or a bad strategy.
    pub fn validate(&self) -> Result<()> {
        if !(self.reduction_ratio > 0.0 && self.reduction_ratio < 1.0) {
            return Err(Error::InvalidRatio {
                name: "reduction_ratio",
                value: self.reduction_ratio,
            });
        }
        positive("min_dimensions", self.min_dimensions)?;
        if let Some(max) = self.max_dimensions
            && max < self.min_dimensions
        {
            return Err(Error::InvalidCardinality {
                name: "max_dimensions",
                value: max,
            });
        }
        self.strategy.validate()
    }

    /// Folds `history` into the progress and returns the new target if it changed.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn observe(&mut self, history: &History) -> Option<usize> {
        self.progress.update(history);
        let action = self.strategy.decide(&self.progress)?;
        self.progress.restart_streaks();

        let delta = self.current as f64 * self.reduction_ratio;
        let proposed = match action {
            UpdateAction::Shrink => self.current.saturating_sub(delta.floor() as usize),
            UpdateAction::Grow => self.current + delta.ceil() as usize,
        };
        let target = self.clamp(proposed);
        trace_info!(
            iteration = self.progress.iteration(),
            action = ?action,
            from = self.current,
            to = target,
            "update strategy fired"
        );
        if target == self.current {
            return None;
        }
        self.current = target;
        Some(target)
    }

    /// Takes over the step's configured target as the initial one.
    pub(crate) fn bind_initial(&mut self, initial: usize) {
        self.initial = initial;
        self.current = self.clamp(initial);
    }

    fn clamp(&self, value: usize) -> usize {
        let value = value.max(self.min_dimensions);
        self.max_dimensions.map_or(value, |max| value.min(max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::Configuration;

    fn history(best: f64) -> History {
        let mut h = History::new(Direction::Minimize);
        h.push(Configuration::new(), best);
        h
    }

    #[test]
    fn progress_streaks() {
        let mut p = Progress::new(Direction::Minimize);
        p.update(&history(10.0));
        assert_eq!((p.improvement_streak(), p.stagnation_streak()), (0, 0));
        p.update(&history(9.0));
        p.update(&history(8.0));
        assert_eq!(p.improvement_streak(), 2);
        p.update(&history(8.0));
        assert_eq!((p.improvement_streak(), p.stagnation_streak()), (0, 1));
        assert_eq!(p.iteration(), 4);
    }

    #[test]
    fn empty_history_counts_as_stagnation() {
        let mut p = Progress::new(Direction::Minimize);
        p.update(&history(1.0));
        p.update(&History::new(Direction::Minimize));
        assert_eq!(p.stagnation_streak(), 1);
        assert_eq!(p.best(), Some(1.0));
    }

    #[test]
    fn worse_incumbent_keeps_the_best() {
        let mut p = Progress::new(Direction::Minimize);
        p.update(&history(1.0));
        p.update(&history(5.0));
        p.update(&history(3.0));
        assert_eq!(p.best(), Some(1.0));
        assert_eq!((p.improvement_streak(), p.stagnation_streak()), (0, 2));
    }

    #[test]
    fn trend_follows_direction() {
        let mut p = Progress::new(Direction::Maximize);
        for v in [1.0, 2.0, 3.0] {
            let mut h = History::new(Direction::Maximize);
            h.push(Configuration::new(), v);
            p.update(&h);
        }
        assert_eq!(p.trend(3), Trend::Improving);
        assert_eq!(p.trend(5), Trend::Stable);
    }

    #[test]
    fn stagnation_grows_with_ceiling() {
        let mut c = UpdateController::new(StagnationUpdate { threshold: 2 })
            .initial_dimensions(10)
            .max_dimensions(12);
        assert_eq!(c.observe(&history(1.0)), None);
        assert_eq!(c.observe(&history(1.0)), None);
        assert_eq!(c.observe(&history(1.0)), Some(12));
        assert_eq!(c.progress().stagnation_streak(), 0);
    }

    #[test]
    fn hybrid_prefers_stagnation() {
        let hybrid = HybridUpdate::new(2).stagnation(1);
        let mut p = Progress::new(Direction::Minimize);
        p.update(&history(1.0));
        p.update(&history(1.0));
        assert_eq!(hybrid.decide(&p), Some(UpdateAction::Grow));
    }

    #[test]
    fn composite_first_match_wins() {
        let composite = CompositeUpdate::new()
            .with(ImprovementUpdate { threshold: 1 })
            .with(PeriodicUpdate { period: 1 });
        let mut p = Progress::new(Direction::Minimize);
        p.update(&history(2.0));
        assert_eq!(composite.decide(&p), Some(UpdateAction::Shrink));
        p.update(&history(1.0));
        assert_eq!(composite.decide(&p), Some(UpdateAction::Shrink));
        assert!(composite.name().starts_with("composite("));
    }

    #[test]
    fn validation() {
        assert!(UpdateController::new(PeriodicUpdate { period: 0 }).validate().is_err());
        assert!(UpdateController::new(PeriodicUpdate { period: 1 }).reduction_ratio(1.5).validate().is_err());
        assert!(
            UpdateController::new(PeriodicUpdate { period: 1 })
                .min_dimensions(5)
                .max_dimensions(3)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn reset_restores_initial() {
        let mut c = UpdateController::new(PeriodicUpdate { period: 1 }).initial_dimensions(20);
        assert_eq!(c.observe(&history(1.0)), Some(16));
        c.reset();
        assert_eq!(c.current_dimensions(), 20);
        assert_eq!(c.progress().iteration(), 0);
    }
}
