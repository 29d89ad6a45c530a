//! Named parameters: a domain plus an optional default.
//!
//! # Example
//!
//! ```
//! use space_compression::parameter::Parameter;
//!
//! let lr = Parameter::float("learning_rate", 1e-4, 1e-1).default_value(1e-2);
//! let layers = Parameter::int("layers", 1, 8);
//! let act = Parameter::categorical("activation", ["relu", "tanh"]);
//!
//! assert!(lr.validate().is_ok());
//! assert_eq!(layers.domain().cardinality(), Some(8));
//! assert_eq!(act.fallback_value(), space_compression::ParamValue::Categorical(0));
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::domain::{CategoricalDomain, Domain, FloatDomain, IntDomain};
use crate::error::{Error, Result};
use crate::param::ParamValue;

/// A named parameter of a configuration space.
///
/// Immutable once constructed; transformations derive new parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Parameter {
    name: String,
    domain: Domain,
    default: Option<ParamValue>,
}

impl Parameter {
    /// Creates a continuous parameter on `[low, high]`.
    #[must_use]
    pub fn float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            domain: Domain::Float(FloatDomain { low, high }),
            default: None,
        }
    }

    /// Creates an integer parameter on `[low, high]`.
    #[must_use]
    pub fn int(name: impl Into<String>, low: i64, high: i64) -> Self {
        Self {
            name: name.into(),
            domain: Domain::Int(IntDomain { low, high }),
            default: None,
        }
    }

    /// Creates a categorical parameter over the given choice labels.
    #[must_use]
    pub fn categorical<I, S>(name: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            domain: Domain::Categorical(CategoricalDomain {
                choices: choices.into_iter().map(Into::into).collect(),
            }),
            default: None,
        }
    }

    /// Sets the declared default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<ParamValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// The parameter's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter's domain.
    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// The declared default, if any.
    #[must_use]
    pub fn default(&self) -> Option<&ParamValue> {
        self.default.as_ref()
    }

    /// The declared default, else the domain midpoint, else the first choice.
    #[must_use]
    pub fn fallback_value(&self) -> ParamValue {
        self.default.unwrap_or_else(|| self.domain.midpoint())
    }

    /// Validates bounds, choices, and the default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyName`], [`Error::InvalidBounds`],
    /// [`Error::EmptyChoices`] or [`Error::InvalidDefault`].
    #[allow(clippy::cast_precision_loss)]
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::EmptyName);
        }
        match &self.domain {
            Domain::Float(d) => {
                if !d.low.is_finite() || !d.high.is_finite() || d.low > d.high {
                    return Err(Error::InvalidBounds {
                        name: self.name.clone(),
                        low: d.low,
                        high: d.high,
                    });
                }
            }
            Domain::Int(d) => {
                if d.low > d.high {
                    return Err(Error::InvalidBounds {
                        name: self.name.clone(),
                        low: d.low as f64,
                        high: d.high as f64,
                    });
                }
            }
            Domain::Categorical(d) => {
                if d.choices.is_empty() {
                    return Err(Error::EmptyChoices(self.name.clone()));
                }
            }
        }
        if let Some(default) = &self.default {
            if !self.domain.contains(default) {
                return Err(Error::InvalidDefault(self.name.clone()));
            }
        }
        Ok(())
    }

    /// Derives a parameter with a new domain, keeping the default when it is still valid.
    pub(crate) fn with_domain(&self, domain: Domain) -> Self {
        let default = self.default.and_then(|v| domain.clip(&v));
        Self {
            name: self.name.clone(),
            domain,
            default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_bounds() {
        let p = Parameter::float("x", 2.0, 1.0);
        assert!(matches!(p.validate(), Err(Error::InvalidBounds { .. })));
        let p = Parameter::int("n", 5, 4);
        assert!(matches!(p.validate(), Err(Error::InvalidBounds { .. })));
    }

    #[test]
    fn rejects_empty_choices() {
        let p = Parameter::categorical("c", Vec::<String>::new());
        assert!(matches!(p.validate(), Err(Error::EmptyChoices(_))));
    }

    #[test]
    fn rejects_default_outside_domain() {
        let p = Parameter::int("n", 0, 10).default_value(11_i64);
        assert!(matches!(p.validate(), Err(Error::InvalidDefault(_))));
        let p = Parameter::int("n", 0, 10).default_value(1.5);
        assert!(matches!(p.validate(), Err(Error::InvalidDefault(_))));
    }

    #[test]
    fn fallback_prefers_default() {
        let p = Parameter::float("x", 0.0, 10.0);
        assert_eq!(p.fallback_value(), ParamValue::Float(5.0));
        let p = p.default_value(2.0);
        assert_eq!(p.fallback_value(), ParamValue::Float(2.0));
    }

    #[test]
    fn with_domain_clips_default() {
        let p = Parameter::float("x", 0.0, 10.0).default_value(9.0);
        let q = p.with_domain(p.domain().narrowed(2.0, 4.0));
        assert_eq!(q.default(), Some(&ParamValue::Float(4.0)));
    }
}
