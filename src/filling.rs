//! Completing partial configurations when mapping into a larger space.
//!
//! Every strategy is total over the target space: the result holds exactly
//! the target's parameters. Names outside the target are dropped. Both
//! strategies accept caller-fixed values that override whatever the point
//! carries.

use crate::param::ParamValue;
use crate::space::{Configuration, ParameterSpace};

/// Reconstructs values for parameters a step dropped.
pub trait FillingStrategy: Send + Sync + core::fmt::Debug {
    /// Returns a configuration holding exactly `target`'s parameters.
    fn fill_missing_parameters(&self, partial: &Configuration, target: &ParameterSpace) -> Configuration;
}

/// Caller-fixed overrides shared by both strategies.
fn apply_fixed(mut config: Configuration, fixed: &Configuration, target: &ParameterSpace) -> Configuration {
    for (name, value) in fixed {
        match target.get(name).and_then(|p| p.domain().clip(value)) {
            Some(v) => {
                config.insert(name.clone(), v);
            }
            None => {
                trace_debug!(parameter = %name, "fixed value does not apply to target space");
            }
        }
    }
    config
}

/// Keeps supplied values and fills gaps with each parameter's declared
/// default, or its midpoint when none is declared.
///
/// # Examples
///
/// ```
/// use space_compression::filling::{DefaultValueFilling, FillingStrategy};
/// use space_compression::{Configuration, ParamValue, Parameter, ParameterSpace};
///
/// let target = ParameterSpace::new([
///     Parameter::float("a", 0.0, 10.0),
///     Parameter::int("b", 0, 4).default_value(1_i64),
/// ])
/// .unwrap();
/// let filled = DefaultValueFilling::new().fill_missing_parameters(&Configuration::new(), &target);
/// assert_eq!(filled["a"], ParamValue::Float(5.0));
/// assert_eq!(filled["b"], ParamValue::Int(1));
/// ```
#[derive(Clone, Debug, Default)]
pub struct DefaultValueFilling {
    fixed_values: Configuration,
}

impl DefaultValueFilling {
    /// Creates a filling strategy without fixed values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins `name` to `value` whenever it belongs to the target space.
    #[must_use]
    pub fn fixed(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.fixed_values.insert(name.into(), value.into());
        self
    }
}

impl FillingStrategy for DefaultValueFilling {
    fn fill_missing_parameters(&self, partial: &Configuration, target: &ParameterSpace) -> Configuration {
        let filled = target
            .iter()
            .map(|p| {
                let value = partial
                    .get(p.name())
                    .filter(|v| p.domain().matches_kind(v))
                    .copied()
                    .unwrap_or_else(|| p.fallback_value());
                (p.name().to_owned(), value)
            })
            .collect();
        apply_fixed(filled, &self.fixed_values, target)
    }
}

/// Clips supplied "last known" values into the target bounds instead of
/// replacing them; gaps fall back to the parameter default.
#[derive(Clone, Debug, Default)]
pub struct ClippingFilling {
    fixed_values: Configuration,
}

impl ClippingFilling {
    /// Creates a clipping strategy without fixed values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins `name` to `value` whenever it belongs to the target space.
    #[must_use]
    pub fn fixed(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.fixed_values.insert(name.into(), value.into());
        self
    }
}

impl FillingStrategy for ClippingFilling {
    fn fill_missing_parameters(&self, partial: &Configuration, target: &ParameterSpace) -> Configuration {
        let mut filled = target.clip_config(partial);
        for p in target {
            if !filled.contains_key(p.name()) {
                filled.insert(p.name().to_owned(), p.fallback_value());
            }
        }
        apply_fixed(filled, &self.fixed_values, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::Parameter;

    fn target() -> ParameterSpace {
        ParameterSpace::new([
            Parameter::float("a", 0.0, 1.0),
            Parameter::int("b", 10, 20),
            Parameter::categorical("c", ["x", "y", "z"]).default_value(ParamValue::Categorical(2)),
        ])
        .unwrap()
    }

    fn partial() -> Configuration {
        let mut cfg = Configuration::new();
        cfg.insert("a".into(), ParamValue::Float(3.0));
        cfg.insert("gone".into(), ParamValue::Int(1));
        cfg
    }

    #[test]
    fn default_filling_is_total_and_drops_foreign() {
        let out = DefaultValueFilling::new().fill_missing_parameters(&partial(), &target());
        assert_eq!(out.len(), 3);
        assert!(!out.contains_key("gone"));
        assert_eq!(out["a"], ParamValue::Float(3.0));
        assert_eq!(out["b"], ParamValue::Int(15));
        assert_eq!(out["c"], ParamValue::Categorical(2));
    }

    #[test]
    fn clipping_filling_clips_supplied_values() {
        let out = ClippingFilling::new().fill_missing_parameters(&partial(), &target());
        assert_eq!(out["a"], ParamValue::Float(1.0));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn fixed_values_override() {
        let out = DefaultValueFilling::new()
            .fixed("b", 12_i64)
            .fixed("unknown", 1.0)
            .fill_missing_parameters(&partial(), &target());
        assert_eq!(out["b"], ParamValue::Int(12));
        assert!(!out.contains_key("unknown"));
    }
}
