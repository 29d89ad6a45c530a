//! Evaluation histories and transfer-learning similarity weights.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::space::{Configuration, ParameterSpace};
use crate::types::Direction;

/// One evaluated configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Observation {
    /// The evaluated point.
    pub config: Configuration,
    /// The objective value obtained.
    pub objective: f64,
}

/// An ordered list of observations from one task.
///
/// Observations with non-finite objectives are kept but ignored by every estimator.
///
/// # Examples
///
/// ```
/// use space_compression::{Configuration, Direction, History, ParamValue};
///
/// let mut history = History::new(Direction::Minimize).with_task_id("source-a");
/// for (x, y) in [(1.0, 3.0), (2.0, 1.0), (3.0, 2.0)] {
///     let mut cfg = Configuration::new();
///     cfg.insert("x".into(), ParamValue::Float(x));
///     history.push(cfg, y);
/// }
/// assert_eq!(history.best_value(), Some(1.0));
/// assert_eq!(history.top_fraction(0.5).len(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct History {
    task_id: Option<String>,
    direction: Direction,
    observations: Vec<Observation>,
}

impl History {
    /// Creates an empty history.
    #[must_use]
    pub fn new(direction: Direction) -> Self {
        Self {
            task_id: None,
            direction,
            observations: Vec::new(),
        }
    }

    /// Tags the history with a source task identifier.
    #[must_use]
    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Appends an observation.
    pub fn push(&mut self, config: Configuration, objective: f64) {
        self.observations.push(Observation { config, objective });
    }

    /// The source task identifier, if any.
    #[must_use]
    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    /// The optimization direction of the objective.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// All observations in insertion order.
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Returns `true` if there are no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Observations with a finite objective.
    pub fn valid(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter().filter(|o| o.objective.is_finite())
    }

    /// Valid observations sorted best-first. Ties keep insertion order.
    #[must_use]
    pub fn sorted_best_first(&self) -> Vec<&Observation> {
        let mut sorted: Vec<&Observation> = self.valid().collect();
        sorted.sort_by(|a, b| self.direction.best_first(a.objective, b.objective));
        sorted
    }

    /// The best `max(1, floor(n * ratio))` valid observations, best-first.
    ///
    /// Empty when there are no valid observations.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn top_fraction(&self, ratio: f64) -> Vec<&Observation> {
        let mut sorted = self.sorted_best_first();
        if sorted.is_empty() {
            return sorted;
        }
        let keep = ((sorted.len() as f64 * ratio.clamp(0.0, 1.0)).floor() as usize).max(1);
        sorted.truncate(keep);
        sorted
    }

    /// The best finite objective value.
    #[must_use]
    pub fn best_value(&self) -> Option<f64> {
        self.valid()
            .map(|o| o.objective)
            .reduce(|best, v| if self.direction.is_better(v, best) { v } else { best })
    }

    /// Checks that every value stored under a name of `space` has that parameter's kind.
    ///
    /// Names absent from `space` are ignored: related tasks may carry extra parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueKindMismatch`] for the first offending value.
    pub fn validate_against(&self, space: &ParameterSpace) -> Result<()> {
        for obs in &self.observations {
            for (name, value) in &obs.config {
                if let Some(param) = space.get(name)
                    && !param.domain().matches_kind(value)
                {
                    return Err(Error::ValueKindMismatch(name.clone()));
                }
            }
        }
        Ok(())
    }
}

/// Similarity weights of source histories, keyed by their index in the history list.
///
/// A missing index means weight `1.0`. A weight of `0.0` excludes the source from
/// every estimate while it is still validated.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceSimilarities {
    weights: BTreeMap<usize, f64>,
}

impl SourceSimilarities {
    /// No explicit weights: every source counts fully.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One weight per history, in order.
    #[must_use]
    pub fn from_weights(weights: &[f64]) -> Self {
        Self {
            weights: weights.iter().copied().enumerate().collect(),
        }
    }

    /// Sets the weight of one source.
    #[must_use]
    pub fn with(mut self, source: usize, weight: f64) -> Self {
        self.weights.insert(source, weight);
        self
    }

    /// The weight of `source`, defaulting to `1.0`.
    #[must_use]
    pub fn weight(&self, source: usize) -> f64 {
        self.weights.get(&source).copied().unwrap_or(1.0)
    }

    /// Checks every explicit weight lies in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSimilarity`] for the first offending weight.
    pub fn validate(&self) -> Result<()> {
        for (&index, &value) in &self.weights {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidSimilarity { index, value });
            }
        }
        Ok(())
    }
}

/// Weight of source `i` given optional similarities.
pub(crate) fn source_weight(similarities: Option<&SourceSimilarities>, i: usize) -> f64 {
    similarities.map_or(1.0, |s| s.weight(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamValue;

    fn history(values: &[f64], direction: Direction) -> History {
        let mut h = History::new(direction);
        for (i, &v) in values.iter().enumerate() {
            let mut cfg = Configuration::new();
            #[allow(clippy::cast_possible_wrap)]
            cfg.insert("i".into(), ParamValue::Int(i as i64));
            h.push(cfg, v);
        }
        h
    }

    #[test]
    fn top_fraction_keeps_at_least_one() {
        let h = history(&[5.0, 1.0, 3.0], Direction::Minimize);
        let top = h.top_fraction(0.1);
        assert_eq!(top.len(), 1);
        assert!((top[0].objective - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn top_fraction_respects_maximize() {
        let h = history(&[5.0, 1.0, 3.0, 4.0], Direction::Maximize);
        let top: Vec<f64> = h.top_fraction(0.5).iter().map(|o| o.objective).collect();
        assert_eq!(top, vec![5.0, 4.0]);
    }

    #[test]
    fn non_finite_objectives_ignored() {
        let h = history(&[f64::NAN, 2.0, f64::INFINITY], Direction::Minimize);
        assert_eq!(h.valid().count(), 1);
        assert_eq!(h.best_value(), Some(2.0));
    }

    #[test]
    fn similarity_defaults_and_validation() {
        let s = SourceSimilarities::new().with(1, 0.3);
        assert!((s.weight(0) - 1.0).abs() < f64::EPSILON);
        assert!((s.weight(1) - 0.3).abs() < f64::EPSILON);
        assert!(s.validate().is_ok());
        let bad = SourceSimilarities::from_weights(&[0.5, 1.5]);
        assert!(matches!(
            bad.validate(),
            Err(Error::InvalidSimilarity { index: 1, .. })
        ));
    }
}
