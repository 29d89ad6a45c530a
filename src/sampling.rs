//! How candidate points are drawn from the compressed space.

use parking_lot::Mutex;

use crate::space::{Configuration, ParameterSpace};
use crate::types::Direction;

/// Which region a sampled point was drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleOrigin {
    /// The compressed (narrow) space.
    Compressed,
    /// The uncompressed (wide) space the compression started from.
    Wide,
}

/// Draws candidate configurations for the optimizer.
///
/// Implementations use interior mutability for their RNG, so sampling takes `&self`.
pub trait SamplingStrategy: Send + Sync + core::fmt::Debug {
    /// Draws `n` points together with the region each came from.
    fn sample_tagged(&self, n: usize) -> Vec<(Configuration, SampleOrigin)>;

    /// Draws `n` points.
    fn sample(&self, n: usize) -> Vec<Configuration> {
        self.sample_tagged(n).into_iter().map(|(c, _)| c).collect()
    }

    /// The primary space and, for mixed strategies, the wide space.
    fn spaces(&self) -> (&ParameterSpace, Option<&ParameterSpace>);

    /// Probability of drawing from the primary space.
    fn compressed_probability(&self) -> f64 {
        1.0
    }

    /// Feeds back objective values of earlier samples. No-op by default.
    fn update_probabilities(&self, _results: &[(SampleOrigin, f64)], _direction: Direction) {}
}

/// Uniform sampling from a single space.
#[derive(Debug)]
pub struct StandardSampling {
    space: ParameterSpace,
    rng: Mutex<fastrand::Rng>,
}

impl StandardSampling {
    /// Creates a seeded uniform sampler over `space`.
    #[must_use]
    pub fn new(space: ParameterSpace, seed: u64) -> Self {
        Self {
            space,
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl SamplingStrategy for StandardSampling {
    fn sample_tagged(&self, n: usize) -> Vec<(Configuration, SampleOrigin)> {
        let mut rng = self.rng.lock();
        (0..n)
            .map(|_| (self.space.sample(&mut rng), SampleOrigin::Compressed))
            .collect()
    }

    fn spaces(&self) -> (&ParameterSpace, Option<&ParameterSpace>) {
        (&self.space, None)
    }
}

const MIN_PROBABILITY: f64 = 0.5;
const MAX_PROBABILITY: f64 = 0.95;
const DECREASE_STEP: f64 = 0.1;
const INCREASE_STEP: f64 = 0.05;

#[derive(Debug)]
struct MixedState {
    probability: f64,
    compressed_results: Vec<f64>,
    wide_results: Vec<f64>,
}

/// Samples the compressed space with probability `p`, the wide space otherwise.
///
/// `p` adapts from feedback: when a batch shows the wide region doing better
/// on average, `p` drops by 0.1 (floor 0.5); otherwise it rises by 0.05 (cap 0.95).
///
/// # Examples
///
/// ```
/// use space_compression::sampling::{MixedRangeSampling, SampleOrigin, SamplingStrategy};
/// use space_compression::{Direction, Parameter, ParameterSpace};
///
/// let wide = ParameterSpace::new([Parameter::float("x", 0.0, 100.0)]).unwrap();
/// let narrow = wide.with_bounds("x", 40.0, 60.0).unwrap();
/// let sampler = MixedRangeSampling::new(narrow, wide, 0.9, 7);
///
/// sampler.update_probabilities(
///     &[(SampleOrigin::Compressed, 5.0), (SampleOrigin::Wide, 1.0)],
///     Direction::Minimize,
/// );
/// assert!((sampler.probability() - 0.8).abs() < 1e-12);
/// ```
#[derive(Debug)]
pub struct MixedRangeSampling {
    compressed: ParameterSpace,
    wide: ParameterSpace,
    rng: Mutex<fastrand::Rng>,
    state: Mutex<MixedState>,
}

impl MixedRangeSampling {
    /// Creates a mixed sampler starting at `initial_prob` for the compressed space.
    #[must_use]
    pub fn new(compressed: ParameterSpace, wide: ParameterSpace, initial_prob: f64, seed: u64) -> Self {
        Self {
            compressed,
            wide,
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
            state: Mutex::new(MixedState {
                probability: initial_prob.clamp(0.0, 1.0),
                compressed_results: Vec::new(),
                wide_results: Vec::new(),
            }),
        }
    }

    /// Current probability of drawing from the compressed space.
    #[must_use]
    pub fn probability(&self) -> f64 {
        self.state.lock().probability
    }

    /// Number of results fed back so far, `(compressed, wide)`.
    #[must_use]
    pub fn feedback_counts(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.compressed_results.len(), state.wide_results.len())
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

impl SamplingStrategy for MixedRangeSampling {
    fn sample_tagged(&self, n: usize) -> Vec<(Configuration, SampleOrigin)> {
        let p = self.probability();
        let mut rng = self.rng.lock();
        (0..n)
            .map(|_| {
                if rng.f64() < p {
                    (self.compressed.sample(&mut rng), SampleOrigin::Compressed)
                } else {
                    (self.wide.sample(&mut rng), SampleOrigin::Wide)
                }
            })
            .collect()
    }

    fn spaces(&self) -> (&ParameterSpace, Option<&ParameterSpace>) {
        (&self.compressed, Some(&self.wide))
    }

    fn compressed_probability(&self) -> f64 {
        self.probability()
    }

    fn update_probabilities(&self, results: &[(SampleOrigin, f64)], direction: Direction) {
        let compressed: Vec<f64> = results
            .iter()
            .filter(|(o, v)| *o == SampleOrigin::Compressed && v.is_finite())
            .map(|(_, v)| *v)
            .collect();
        let wide: Vec<f64> = results
            .iter()
            .filter(|(o, v)| *o == SampleOrigin::Wide && v.is_finite())
            .map(|(_, v)| *v)
            .collect();

        let mut state = self.state.lock();
        state.compressed_results.extend_from_slice(&compressed);
        state.wide_results.extend_from_slice(&wide);

        if compressed.is_empty() || wide.is_empty() {
            return;
        }
        if direction.is_better(mean(&wide), mean(&compressed)) {
            state.probability = (state.probability - DECREASE_STEP).max(MIN_PROBABILITY);
        } else {
            state.probability = (state.probability + INCREASE_STEP).min(MAX_PROBABILITY);
        }
        trace_debug!(probability = state.probability, "mixed sampling probability updated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::Parameter;

    fn spaces() -> (ParameterSpace, ParameterSpace) {
        let wide = ParameterSpace::new([Parameter::float("x", 0.0, 100.0)]).unwrap();
        let narrow = wide.with_bounds("x", 40.0, 60.0).unwrap();
        (narrow, wide)
    }

    #[test]
    fn standard_sampling_is_seeded() {
        let (narrow, _) = spaces();
        let a = StandardSampling::new(narrow.clone(), 3).sample(5);
        let b = StandardSampling::new(narrow.clone(), 3).sample(5);
        assert_eq!(a, b);
        assert!(a.iter().all(|c| narrow.contains(c)));
    }

    #[test]
    fn mixed_sampling_respects_probability() {
        let (narrow, wide) = spaces();
        let sampler = MixedRangeSampling::new(narrow.clone(), wide, 1.0, 1);
        assert!(sampler.sample(50).iter().all(|c| narrow.contains(c)));
    }

    #[test]
    fn probability_is_bounded() {
        let (narrow, wide) = spaces();
        let sampler = MixedRangeSampling::new(narrow, wide, 0.9, 1);
        let wide_wins = [(SampleOrigin::Compressed, 10.0), (SampleOrigin::Wide, 1.0)];
        for _ in 0..10 {
            sampler.update_probabilities(&wide_wins, Direction::Minimize);
        }
        assert!((sampler.probability() - MIN_PROBABILITY).abs() < 1e-12);

        let narrow_wins = [(SampleOrigin::Compressed, 1.0), (SampleOrigin::Wide, 10.0)];
        for _ in 0..20 {
            sampler.update_probabilities(&narrow_wins, Direction::Minimize);
        }
        assert!((sampler.probability() - MAX_PROBABILITY).abs() < 1e-12);
        assert_eq!(sampler.feedback_counts(), (30, 30));
    }

    #[test]
    fn one_sided_feedback_keeps_probability() {
        let (narrow, wide) = spaces();
        let sampler = MixedRangeSampling::new(narrow, wide, 0.9, 1);
        sampler.update_probabilities(&[(SampleOrigin::Compressed, 1.0)], Direction::Minimize);
        assert!((sampler.probability() - 0.9).abs() < 1e-12);
    }
}
