//! Parameter domain types.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::param::ParamValue;

/// Domain for floating-point parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FloatDomain {
    /// Lower bound (inclusive).
    pub low: f64,
    /// Upper bound (inclusive).
    pub high: f64,
}

/// Domain for integer parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntDomain {
    /// Lower bound (inclusive).
    pub low: i64,
    /// Upper bound (inclusive).
    pub high: i64,
}

/// Domain for categorical parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CategoricalDomain {
    /// Labels of the available choices. Values refer to them by index.
    pub choices: Vec<String>,
}

/// Enum wrapping all parameter domain types.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Domain {
    /// A continuous interval.
    Float(FloatDomain),
    /// An integer interval.
    Int(IntDomain),
    /// A finite set of labelled choices.
    Categorical(CategoricalDomain),
}

impl Domain {
    /// Returns `true` for float and integer domains.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Categorical(_))
    }

    /// Numeric bounds as `f64`, `None` for categoricals.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match self {
            Self::Float(d) => Some((d.low, d.high)),
            Self::Int(d) => Some((d.low as f64, d.high as f64)),
            Self::Categorical(_) => None,
        }
    }

    /// Number of distinct values, `None` for continuous domains.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn cardinality(&self) -> Option<u64> {
        match self {
            Self::Float(_) => None,
            Self::Int(d) => Some((d.high - d.low) as u64 + 1),
            Self::Categorical(d) => Some(d.choices.len() as u64),
        }
    }

    /// Returns `true` if `value` has this domain's kind.
    #[must_use]
    pub fn matches_kind(&self, value: &ParamValue) -> bool {
        matches!(
            (self, value),
            (Self::Float(_), ParamValue::Float(_))
                | (Self::Int(_), ParamValue::Int(_))
                | (Self::Categorical(_), ParamValue::Categorical(_))
        )
    }

    /// Returns `true` if `value` has this domain's kind and lies inside it.
    #[must_use]
    pub fn contains(&self, value: &ParamValue) -> bool {
        match (self, value) {
            (Self::Float(d), ParamValue::Float(v)) => *v >= d.low && *v <= d.high,
            (Self::Int(d), ParamValue::Int(v)) => *v >= d.low && *v <= d.high,
            (Self::Categorical(d), ParamValue::Categorical(i)) => *i < d.choices.len(),
            _ => false,
        }
    }

    /// Clips a value into the domain.
    ///
    /// Integer domains accept floats (rounded), float domains accept integers.
    /// Returns `None` for an invalid categorical index or a kind that cannot be coerced.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss
    )]
    pub fn clip(&self, value: &ParamValue) -> Option<ParamValue> {
        match (self, value) {
            (Self::Float(d), ParamValue::Float(v)) => Some(ParamValue::Float(v.clamp(d.low, d.high))),
            (Self::Float(d), ParamValue::Int(v)) => {
                Some(ParamValue::Float((*v as f64).clamp(d.low, d.high)))
            }
            (Self::Int(d), ParamValue::Int(v)) => Some(ParamValue::Int((*v).clamp(d.low, d.high))),
            (Self::Int(d), ParamValue::Float(v)) if v.is_finite() => Some(ParamValue::Int(
                (v.round() as i64).clamp(d.low, d.high),
            )),
            (Self::Categorical(d), ParamValue::Categorical(i)) if *i < d.choices.len() => {
                Some(ParamValue::Categorical(*i))
            }
            _ => None,
        }
    }

    /// Centre of the domain: the interval midpoint, or the first choice.
    #[must_use]
    pub fn midpoint(&self) -> ParamValue {
        match self {
            Self::Float(d) => ParamValue::Float(f64::midpoint(d.low, d.high)),
            Self::Int(d) => ParamValue::Int(d.low + (d.high - d.low) / 2),
            Self::Categorical(_) => ParamValue::Categorical(0),
        }
    }

    /// Maps a value into `[0, 1]`.
    ///
    /// Categorical index `i` of `n` maps to the centre of its cell, `(i + 0.5) / n`.
    /// Degenerate numeric intervals map to `0.5`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn normalize(&self, value: &ParamValue) -> f64 {
        match self {
            Self::Float(_) | Self::Int(_) => {
                let Some((low, high)) = self.bounds() else {
                    return 0.5;
                };
                let width = high - low;
                if width <= 0.0 {
                    return 0.5;
                }
                ((value.as_f64() - low) / width).clamp(0.0, 1.0)
            }
            Self::Categorical(d) => {
                let n = d.choices.len().max(1) as f64;
                ((value.as_f64() + 0.5) / n).clamp(0.0, 1.0)
            }
        }
    }

    /// Inverse of [`normalize`](Self::normalize); `u` is clamped to `[0, 1]` first.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn denormalize(&self, u: f64) -> ParamValue {
        let u = if u.is_nan() { 0.5 } else { u.clamp(0.0, 1.0) };
        match self {
            Self::Float(d) => ParamValue::Float((d.low + u * (d.high - d.low)).clamp(d.low, d.high)),
            Self::Int(d) => {
                let v = (d.low as f64 + u * (d.high - d.low) as f64).round() as i64;
                ParamValue::Int(v.clamp(d.low, d.high))
            }
            Self::Categorical(d) => {
                let n = d.choices.len().max(1);
                let idx = ((u * n as f64).floor() as usize).min(n - 1);
                ParamValue::Categorical(idx)
            }
        }
    }

    /// Draws a uniform value from the domain.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> ParamValue {
        match self {
            Self::Float(d) => {
                if d.high > d.low {
                    ParamValue::Float(d.low + rng.f64() * (d.high - d.low))
                } else {
                    ParamValue::Float(d.low)
                }
            }
            Self::Int(d) => ParamValue::Int(rng.i64(d.low..=d.high)),
            Self::Categorical(d) => ParamValue::Categorical(rng.usize(0..d.choices.len().max(1))),
        }
    }

    /// Narrows a numeric domain to `[low, high]` intersected with its current bounds.
    ///
    /// Integer bounds round outward. Categorical domains are returned unchanged.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn narrowed(&self, low: f64, high: f64) -> Self {
        match self {
            Self::Float(d) => Self::Float(FloatDomain {
                low: low.max(d.low).min(d.high),
                high: high.min(d.high).max(d.low),
            }),
            Self::Int(d) => {
                let lo = (low.floor() as i64).clamp(d.low, d.high);
                let hi = (high.ceil() as i64).clamp(d.low, d.high);
                Self::Int(IntDomain {
                    low: lo.min(hi),
                    high: hi.max(lo),
                })
            }
            Self::Categorical(_) => self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(n: usize) -> Domain {
        Domain::Categorical(CategoricalDomain {
            choices: (0..n).map(|i| format!("c{i}")).collect(),
        })
    }

    #[test]
    fn int_cardinality() {
        let d = Domain::Int(IntDomain { low: 1000, high: 5000 });
        assert_eq!(d.cardinality(), Some(4001));
        assert_eq!(cat(3).cardinality(), Some(3));
        assert_eq!(Domain::Float(FloatDomain { low: 0.0, high: 1.0 }).cardinality(), None);
    }

    #[test]
    fn normalize_round_trips_categorical() {
        let d = cat(4);
        for i in 0..4 {
            let u = d.normalize(&ParamValue::Categorical(i));
            assert_eq!(d.denormalize(u), ParamValue::Categorical(i));
        }
    }

    #[test]
    fn clip_coerces_and_bounds() {
        let d = Domain::Int(IntDomain { low: 0, high: 10 });
        assert_eq!(d.clip(&ParamValue::Float(11.7)), Some(ParamValue::Int(10)));
        assert_eq!(d.clip(&ParamValue::Int(-3)), Some(ParamValue::Int(0)));
        assert_eq!(cat(2).clip(&ParamValue::Categorical(5)), None);
    }

    #[test]
    fn narrowed_int_rounds_outward() {
        let d = Domain::Int(IntDomain { low: 0, high: 100 });
        assert_eq!(
            d.narrowed(10.4, 20.2),
            Domain::Int(IntDomain { low: 10, high: 21 })
        );
        assert_eq!(
            d.narrowed(-5.0, 500.0),
            Domain::Int(IntDomain { low: 0, high: 100 })
        );
    }

    #[test]
    fn sample_stays_inside() {
        let mut rng = fastrand::Rng::with_seed(1);
        let d = Domain::Float(FloatDomain { low: -2.0, high: 3.0 });
        for _ in 0..100 {
            assert!(d.contains(&d.sample(&mut rng)));
        }
    }
}
