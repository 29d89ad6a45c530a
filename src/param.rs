//! Parameter value storage types.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents a parameter value inside a configuration.
///
/// For categorical parameters, the `Categorical` variant stores
/// the index into the choices array.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParamValue {
    /// A floating-point parameter value.
    Float(f64),
    /// An integer parameter value.
    Int(i64),
    /// A categorical parameter value, stored as an index into the choices array.
    Categorical(usize),
}

impl ParamValue {
    /// Numeric view of the value. Categorical indices map to their position.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Float(v) => v,
            Self::Int(v) => v as f64,
            Self::Categorical(i) => i as f64,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl core::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Categorical(i) => write!(f, "#{i}"),
        }
    }
}
