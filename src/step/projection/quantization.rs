//! Integer re-quantization.
//!
//! An integer parameter `x` on `[low, high]` whose cardinality exceeds
//! `max_num_values` is replaced by `x|q` on `[1, max_num_values]`. Level `l`
//! maps back to `round(low + (l - 1) * (high - low) / (max - 1))`; a value
//! maps forward to the nearest level. Every other parameter passes through.

use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::history::{History, SourceSimilarities};
use crate::param::ParamValue;
use crate::parameter::Parameter;
use crate::space::{Configuration, ParameterSpace};
use crate::step::{CompressionRecord, CompressionStep, StepKind};

/// Separator between the original name and the quantized suffix.
const SUFFIX: &str = "|q";

#[derive(Clone, Debug)]
struct Scaler {
    original: String,
    quantized: String,
    low: i64,
    high: i64,
    levels: i64,
}

impl Scaler {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn to_level(&self, value: f64) -> i64 {
        let width = (self.high - self.low) as f64;
        let level = ((value - self.low as f64) / width * (self.levels - 1) as f64 + 1.0).round();
        (level as i64).clamp(1, self.levels)
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn to_value(&self, level: f64) -> i64 {
        let step = (self.high - self.low) as f64 / (self.levels - 1) as f64;
        let value = (self.low as f64 + (level - 1.0) * step).round();
        (value as i64).clamp(self.low, self.high)
    }
}

/// Bounds the cardinality of large integer parameters.
///
/// # Examples
///
/// ```
/// use space_compression::step::{CompressionStep, Quantization};
/// use space_compression::{Parameter, ParameterSpace};
///
/// let space = ParameterSpace::new([Parameter::int("x", 1000, 5000)]).unwrap();
/// let mut step = Quantization::new(50);
/// let out = step.apply(&space, &[], None).unwrap();
/// assert_eq!(out.get("x|q").unwrap().domain().cardinality(), Some(50));
/// ```
#[derive(Clone, Debug)]
pub struct Quantization {
    max_num_values: usize,
    scalers: Option<Vec<Scaler>>,
}

impl Quantization {
    /// Re-quantizes integers with more than `max_num_values` values.
    #[must_use]
    pub fn new(max_num_values: usize) -> Self {
        Self {
            max_num_values,
            scalers: None,
        }
    }

    /// The level count of quantized parameters.
    #[must_use]
    pub fn max_num_values(&self) -> usize {
        self.max_num_values
    }

    fn scalers(&self) -> Result<&[Scaler]> {
        self.scalers.as_deref().ok_or(Error::NotCompressed)
    }
}

impl CompressionStep for Quantization {
    fn name(&self) -> &str {
        "quantization"
    }

    fn kind(&self) -> StepKind {
        StepKind::Projection
    }

    #[allow(clippy::cast_possible_wrap)]
    fn apply(
        &mut self,
        input: &ParameterSpace,
        _histories: &[History],
        _similarities: Option<&SourceSimilarities>,
    ) -> Result<ParameterSpace> {
        let levels = self.max_num_values as i64;
        let mut scalers = Vec::new();
        let mut params = Vec::with_capacity(input.len());
        for param in input {
            match param.domain() {
                Domain::Int(d) if param.domain().cardinality().is_some_and(|c| c > self.max_num_values as u64) => {
                    let scaler = Scaler {
                        original: param.name().to_owned(),
                        quantized: format!("{}{SUFFIX}", param.name()),
                        low: d.low,
                        high: d.high,
                        levels,
                    };
                    let mut quantized = Parameter::int(scaler.quantized.clone(), 1, levels);
                    if let Some(default) = param.default() {
                        quantized = quantized.default_value(scaler.to_level(default.as_f64()));
                    }
                    trace_debug!(parameter = param.name(), levels, "integer parameter quantized");
                    params.push(quantized);
                    scalers.push(scaler);
                }
                _ => params.push(param.clone()),
            }
        }
        let output = ParameterSpace::new(params)?;
        trace_info!(quantized = scalers.len(), "quantization applied");
        self.scalers = Some(scalers);
        Ok(output)
    }

    fn needs_unprojection(&self) -> bool {
        true
    }

    fn project_point(&self, point: &Configuration) -> Result<Configuration> {
        let scalers = self.scalers()?;
        Ok(point
            .iter()
            .map(|(name, value)| match scalers.iter().find(|s| &s.original == name) {
                Some(s) => (s.quantized.clone(), ParamValue::Int(s.to_level(value.as_f64()))),
                None => (name.clone(), *value),
            })
            .collect())
    }

    fn unproject_point(&self, point: &Configuration) -> Result<Configuration> {
        let scalers = self.scalers()?;
        Ok(point
            .iter()
            .map(|(name, value)| match scalers.iter().find(|s| &s.quantized == name) {
                Some(s) => (s.original.clone(), ParamValue::Int(s.to_value(value.as_f64()))),
                None => (name.clone(), *value),
            })
            .collect())
    }

    #[allow(clippy::cast_precision_loss)]
    fn records(&self, input: &ParameterSpace, output: &ParameterSpace) -> Vec<CompressionRecord> {
        let scalers = self.scalers.as_deref().unwrap_or_default();
        output
            .iter()
            .map(|p| {
                let source = scalers.iter().find(|s| s.quantized == p.name());
                let original = input.get(source.map_or(p.name(), |s| s.original.as_str()));
                let mut record = CompressionRecord::between(original, p);
                if let Some(orig) = original.filter(|_| source.is_some()) {
                    record.cardinality = p.domain().cardinality();
                    if let (Some(new), Some(old)) = (p.domain().cardinality(), orig.domain().cardinality()) {
                        record.compression_ratio = new as f64 / old as f64;
                    }
                }
                record
            })
            .collect()
    }

    fn validate(&self, _original: &ParameterSpace) -> Result<()> {
        if self.max_num_values < 2 {
            return Err(Error::InvalidCardinality {
                name: "max_num_values",
                value: self.max_num_values,
            });
        }
        Ok(())
    }
}
