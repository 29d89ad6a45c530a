#![allow(
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

mod dimension;
mod projection;
mod range;

use space_compression::{Configuration, Direction, History, ParamValue};

/// One history over a single float parameter `x`.
pub(crate) fn history_of(points: &[(f64, f64)], direction: Direction) -> History {
    let mut history = History::new(direction);
    for &(x, y) in points {
        let mut cfg = Configuration::new();
        cfg.insert("x".into(), ParamValue::Float(x));
        history.push(cfg, y);
    }
    history
}
