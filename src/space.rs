//! Ordered, validated parameter spaces and the configurations that live in them.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::param::ParamValue;
use crate::parameter::Parameter;

/// A point in a parameter space: parameter name to value.
pub type Configuration = BTreeMap<String, ParamValue>;

/// An ordered set of uniquely named parameters.
///
/// Immutable: every transformation returns a new space. Declaration order is
/// significant, it breaks ties during dimension selection.
///
/// # Examples
///
/// ```
/// use space_compression::{Parameter, ParameterSpace};
///
/// let space = ParameterSpace::new([
///     Parameter::float("x1", 1.0, 100.0),
///     Parameter::int("x2", -5, 1028),
/// ])
/// .unwrap();
/// assert_eq!(space.names(), vec!["x1", "x2"]);
///
/// let narrowed = space.with_bounds("x1", 10.0, 20.0).unwrap();
/// assert_eq!(narrowed.get("x1").unwrap().domain().bounds(), Some((10.0, 20.0)));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParameterSpace {
    params: Vec<Parameter>,
}

impl ParameterSpace {
    /// Builds a space, validating every parameter and name uniqueness.
    ///
    /// # Errors
    ///
    /// Returns the first parameter validation error, or
    /// [`Error::DuplicateParameter`] for a repeated name.
    pub fn new(params: impl IntoIterator<Item = Parameter>) -> Result<Self> {
        let params: Vec<Parameter> = params.into_iter().collect();
        for (i, p) in params.iter().enumerate() {
            p.validate()?;
            if params[..i].iter().any(|q| q.name() == p.name()) {
                return Err(Error::DuplicateParameter(p.name().to_owned()));
            }
        }
        Ok(Self { params })
    }

    /// Wraps parameters that are already known to be valid and unique.
    pub(crate) fn from_validated(params: Vec<Parameter>) -> Self {
        Self { params }
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` if the space has no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Iterates parameters in declaration order.
    pub fn iter(&self) -> core::slice::Iter<'_, Parameter> {
        self.params.iter()
    }

    /// Parameter names in declaration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(Parameter::name).collect()
    }

    /// Looks a parameter up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name() == name)
    }

    /// Declaration index of a parameter.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name() == name)
    }

    /// Restricts the space to `names`, keeping this space's declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownParameter`] if a name is not in the space.
    pub fn subset<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        for name in names {
            if self.get(name.as_ref()).is_none() {
                return Err(Error::UnknownParameter(name.as_ref().to_owned()));
            }
        }
        let params = self
            .params
            .iter()
            .filter(|p| names.iter().any(|n| n.as_ref() == p.name()))
            .cloned()
            .collect();
        Ok(Self { params })
    }

    /// Derives a space where `name` is narrowed to `[low, high]` intersected with its bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownParameter`] for an unknown name, or
    /// [`Error::InvalidBounds`] if `low > high`.
    pub fn with_bounds(&self, name: &str, low: f64, high: f64) -> Result<Self> {
        if low.is_nan() || high.is_nan() || low > high {
            return Err(Error::InvalidBounds {
                name: name.to_owned(),
                low,
                high,
            });
        }
        let idx = self
            .index_of(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_owned()))?;
        let mut params = self.params.clone();
        let narrowed = params[idx].domain().narrowed(low, high);
        params[idx] = params[idx].with_domain(narrowed);
        Ok(Self { params })
    }

    /// Checks that `config` has exactly this space's parameters with matching value kinds.
    ///
    /// Bounds are not checked; see [`contains`](Self::contains).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`], [`Error::UnknownParameter`] or
    /// [`Error::ValueKindMismatch`].
    pub fn check_shape(&self, config: &Configuration) -> Result<()> {
        if config.len() != self.params.len() {
            return Err(Error::ShapeMismatch {
                expected: self.params.len(),
                got: config.len(),
            });
        }
        for (name, value) in config {
            let param = self
                .get(name)
                .ok_or_else(|| Error::UnknownParameter(name.clone()))?;
            if !param.domain().matches_kind(value) {
                return Err(Error::ValueKindMismatch(name.clone()));
            }
        }
        Ok(())
    }

    /// Returns `true` if `config` has this space's shape and every value lies inside its domain.
    #[must_use]
    pub fn contains(&self, config: &Configuration) -> bool {
        config.len() == self.params.len()
            && self
                .params
                .iter()
                .all(|p| config.get(p.name()).is_some_and(|v| p.domain().contains(v)))
    }

    /// Projects `config` onto this space: drops foreign names and clips values into bounds.
    ///
    /// Values that cannot be clipped (e.g. an out-of-range category) are replaced by the
    /// parameter's fallback. Missing parameters stay missing.
    #[must_use]
    pub fn clip_config(&self, config: &Configuration) -> Configuration {
        self.params
            .iter()
            .filter_map(|p| {
                let value = config.get(p.name())?;
                let clipped = p
                    .domain()
                    .clip(value)
                    .unwrap_or_else(|| p.fallback_value());
                Some((p.name().to_owned(), clipped))
            })
            .collect()
    }

    /// The configuration made of every parameter's fallback value.
    #[must_use]
    pub fn default_config(&self) -> Configuration {
        self.params
            .iter()
            .map(|p| (p.name().to_owned(), p.fallback_value()))
            .collect()
    }

    /// Draws a uniform configuration.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Configuration {
        self.params
            .iter()
            .map(|p| (p.name().to_owned(), p.domain().sample(rng)))
            .collect()
    }

    /// Maps `config` into the unit cube, in declaration order.
    ///
    /// Missing parameters use their fallback value.
    #[must_use]
    pub fn to_unit(&self, config: &Configuration) -> Vec<f64> {
        self.params
            .iter()
            .map(|p| {
                let value = config.get(p.name()).copied().unwrap_or_else(|| p.fallback_value());
                p.domain().normalize(&value)
            })
            .collect()
    }

    /// Maps a unit-cube vector back to a configuration. Extra coordinates are ignored.
    #[must_use]
    pub fn from_unit(&self, unit: &[f64]) -> Configuration {
        self.params
            .iter()
            .zip(unit)
            .map(|(p, &u)| (p.name().to_owned(), p.domain().denormalize(u)))
            .collect()
    }
}

impl<'a> IntoIterator for &'a ParameterSpace {
    type Item = &'a Parameter;
    type IntoIter = core::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> ParameterSpace {
        ParameterSpace::new([
            Parameter::float("a", 0.0, 1.0),
            Parameter::int("b", 0, 10),
            Parameter::categorical("c", ["x", "y"]),
        ])
        .unwrap()
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = ParameterSpace::new([Parameter::float("a", 0.0, 1.0), Parameter::int("a", 0, 1)]);
        assert!(matches!(err, Err(Error::DuplicateParameter(n)) if n == "a"));
    }

    #[test]
    fn subset_keeps_declaration_order() {
        let s = space().subset(&["c", "a"]).unwrap();
        assert_eq!(s.names(), vec!["a", "c"]);
        assert!(matches!(space().subset(&["z"]), Err(Error::UnknownParameter(_))));
    }

    #[test]
    fn check_shape_reports_counts() {
        let mut cfg = Configuration::new();
        cfg.insert("a".into(), ParamValue::Float(0.5));
        assert!(matches!(
            space().check_shape(&cfg),
            Err(Error::ShapeMismatch { expected: 3, got: 1 })
        ));
    }

    #[test]
    fn clip_config_drops_and_clips() {
        let mut cfg = Configuration::new();
        cfg.insert("a".into(), ParamValue::Float(2.0));
        cfg.insert("c".into(), ParamValue::Categorical(9));
        cfg.insert("zzz".into(), ParamValue::Int(1));
        let clipped = space().clip_config(&cfg);
        assert_eq!(clipped.len(), 2);
        assert_eq!(clipped["a"], ParamValue::Float(1.0));
        assert_eq!(clipped["c"], ParamValue::Categorical(0));
    }

    #[test]
    fn unit_round_trip() {
        let s = space();
        let mut rng = fastrand::Rng::with_seed(3);
        for _ in 0..20 {
            let cfg = s.sample(&mut rng);
            let back = s.from_unit(&s.to_unit(&cfg));
            assert_eq!(back["b"], cfg["b"]);
            assert_eq!(back["c"], cfg["c"]);
            assert!((back["a"].as_f64() - cfg["a"].as_f64()).abs() < 1e-12);
        }
    }
}
