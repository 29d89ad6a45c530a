//! The append-only record of what the pipeline did.
//!
//! Every `compress_space` and `update_compression` call that changes the
//! spaces appends one [`AuditEntry`]. The [`CompressionSummary`] inside it is
//! derived from the step descriptors and the named spaces alone.

use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::space::ParameterSpace;
use crate::step::{CompressionRecord, StepDescriptor, StepKind};

/// What triggered an audit entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CompressionEvent {
    /// A caller-initiated `compress_space`.
    InitialCompression,
    /// A controller-initiated recompression.
    AdaptiveUpdate,
}

impl CompressionEvent {
    /// The event's wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InitialCompression => "initial_compression",
            Self::AdaptiveUpdate => "adaptive_update",
        }
    }
}

impl core::fmt::Display for CompressionEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dimension counts and ratio of one step execution.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepSummary {
    /// The step's name.
    pub step: String,
    /// The step's family.
    pub kind: StepKind,
    /// Parameters going in.
    pub input_dims: usize,
    /// Parameters coming out.
    pub output_dims: usize,
    /// `output_dims / input_dims`.
    pub dimension_ratio: f64,
    /// Mean per-parameter range ratio.
    pub mean_compression_ratio: f64,
}

impl From<&StepDescriptor> for StepSummary {
    fn from(d: &StepDescriptor) -> Self {
        Self {
            step: d.step.clone(),
            kind: d.kind,
            input_dims: d.input_dims,
            output_dims: d.output_dims,
            dimension_ratio: d.dimension_ratio(),
            mean_compression_ratio: d.mean_compression_ratio(),
        }
    }
}

/// Snapshot of a compression result for reporting.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompressionSummary {
    /// Parameters in the original space.
    pub original_dims: usize,
    /// Parameters in the sample space.
    pub sample_dims: usize,
    /// Parameters in the surrogate space.
    pub surrogate_dims: usize,
    /// One entry per step of the last run.
    pub steps: Vec<StepSummary>,
    /// Sample-space parameters against their original ranges.
    pub parameters: Vec<CompressionRecord>,
}

impl CompressionSummary {
    /// Builds the summary of one pipeline run.
    #[must_use]
    pub fn new(
        original: &ParameterSpace,
        sample: &ParameterSpace,
        surrogate: &ParameterSpace,
        descriptors: &[StepDescriptor],
    ) -> Self {
        Self {
            original_dims: original.len(),
            sample_dims: sample.len(),
            surrogate_dims: surrogate.len(),
            steps: descriptors.iter().map(StepSummary::from).collect(),
            parameters: sample
                .iter()
                .map(|p| CompressionRecord::between(original.get(p.name()), p))
                .collect(),
        }
    }

    /// `sample_dims / original_dims`, `1.0` for an empty original.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn dimension_ratio(&self) -> f64 {
        if self.original_dims == 0 {
            1.0
        } else {
            self.sample_dims as f64 / self.original_dims as f64
        }
    }
}

/// One audited pipeline call.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AuditEntry {
    /// When the call finished.
    pub timestamp: DateTime<Utc>,
    /// What triggered it.
    pub event: CompressionEvent,
    /// Top-K target after the call, if the pipeline has one.
    pub target_dimensions: Option<usize>,
    /// The resulting compression.
    pub summary: CompressionSummary,
}

/// Append-only list of [`AuditEntry`] values.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
}

impl AuditTrail {
    /// An empty trail.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(
        &mut self,
        event: CompressionEvent,
        target_dimensions: Option<usize>,
        summary: CompressionSummary,
    ) {
        self.entries.push(AuditEntry {
            timestamp: Utc::now(),
            event,
            target_dimensions,
            summary,
        });
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// The most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<&AuditEntry> {
        self.entries.last()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` before the first compression.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one event kind.
    pub fn of_kind(&self, event: CompressionEvent) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(move |e| e.event == event)
    }

    /// Pretty-printed JSON of the whole trail.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`](crate::Error::Serialization) if encoding fails.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| crate::Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::Parameter;

    fn spaces() -> (ParameterSpace, ParameterSpace) {
        let original = ParameterSpace::new([Parameter::float("a", 0.0, 10.0), Parameter::int("b", 0, 9)]).unwrap();
        let sample = ParameterSpace::new([Parameter::float("a", 2.0, 7.0)]).unwrap();
        (original, sample)
    }

    #[test]
    fn summary_tracks_ranges() {
        let (original, sample) = spaces();
        let summary = CompressionSummary::new(&original, &sample, &sample, &[]);
        assert_eq!((summary.original_dims, summary.sample_dims), (2, 1));
        assert!((summary.parameters[0].compression_ratio - 0.5).abs() < 1e-12);
        assert!((summary.dimension_ratio() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn trail_is_append_only() {
        let (original, sample) = spaces();
        let mut trail = AuditTrail::new();
        assert!(trail.is_empty());
        let summary = CompressionSummary::new(&original, &sample, &sample, &[]);
        trail.record(CompressionEvent::InitialCompression, None, summary.clone());
        trail.record(CompressionEvent::AdaptiveUpdate, Some(4), summary);
        assert_eq!(trail.len(), 2);
        assert_eq!(trail.of_kind(CompressionEvent::AdaptiveUpdate).count(), 1);
        assert!(trail.entries()[0].timestamp <= trail.entries()[1].timestamp);
        assert_eq!(trail.last().unwrap().event.to_string(), "adaptive_update");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_uses_event_names() {
        let (original, sample) = spaces();
        let mut trail = AuditTrail::new();
        trail.record(
            CompressionEvent::InitialCompression,
            None,
            CompressionSummary::new(&original, &sample, &sample, &[]),
        );
        assert!(trail.to_json().unwrap().contains("\"initial_compression\""));
    }
}
