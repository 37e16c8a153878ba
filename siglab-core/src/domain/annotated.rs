//! AnnotatedBar — a bar plus everything a signal engine derived from it.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Direction};

/// One bar of signal-engine output.
///
/// Produced in a parallel structure to the input series (same length, same
/// order) and consumed read-only by the simulator. Indicator fields a given
/// engine does not compute are NaN, never silently zero: `momentum` is NaN
/// under the range engine and `range_ratio` under the momentum engine.
///
/// `raw_buy`/`raw_sell` are the per-bar entry conditions before
/// de-duplication; `buy`/`sell` are the final flags after edge triggering
/// and conflict resolution. At most one of `buy`/`sell` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedBar {
    pub bar: Bar,
    /// Close-to-close change (zero on the first bar).
    pub price_move: f64,
    pub atr: f64,
    /// Momentum oscillator in [0, 100].
    pub momentum: f64,
    /// Trend moving average the trend flags compare against.
    pub trend_ma: f64,
    /// Rolling extreme range relative to the window low.
    pub range_ratio: f64,
    pub uptrend: bool,
    pub downtrend: bool,
    pub raw_buy: bool,
    pub raw_sell: bool,
    pub buy: bool,
    pub sell: bool,
}

impl AnnotatedBar {
    /// The direction this bar signals, if any.
    pub fn signal(&self) -> Option<Direction> {
        match (self.buy, self.sell) {
            (true, false) => Some(Direction::Long),
            (false, true) => Some(Direction::Short),
            _ => None,
        }
    }
}
