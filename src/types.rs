//! Core types shared across the crate.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The direction of optimization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Minimize the objective value.
    #[default]
    Minimize,
    /// Maximize the objective value.
    Maximize,
}

impl Direction {
    /// Returns `true` if `candidate` is strictly better than `incumbent`.
    #[must_use]
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Minimize => candidate < incumbent,
            Self::Maximize => candidate > incumbent,
        }
    }

    /// Orders two objective values best-first.
    pub(crate) fn best_first(self, a: f64, b: f64) -> core::cmp::Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(core::cmp::Ordering::Equal);
        match self {
            Self::Minimize => ord,
            Self::Maximize => ord.reverse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn better_respects_direction() {
        assert!(Direction::Minimize.is_better(1.0, 2.0));
        assert!(!Direction::Minimize.is_better(2.0, 2.0));
        assert!(Direction::Maximize.is_better(3.0, 2.0));
    }

    #[test]
    fn best_first_sorts() {
        let mut v = vec![3.0, 1.0, 2.0];
        v.sort_by(|a, b| Direction::Maximize.best_first(*a, *b));
        assert_eq!(v, vec![3.0, 2.0, 1.0]);
    }
}
