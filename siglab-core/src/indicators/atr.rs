//! Average True Range (ATR).
//!
//! True range smoothed either by Wilder recursion (EMA, alpha = 1/period)
//! or by a plain rolling mean, per the configured smoothing. Defined from
//! the first bar on: TR[0] is high-low, and the smoothers carry the
//! minimum-period-of-one semantics of the rolling primitives.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::indicators::rolling::{rolling_mean, true_range, wilder_smooth};

/// How the true-range series is averaged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Smoothing {
    /// Wilder recursion, the classic ATR.
    #[default]
    Wilder,
    /// Rolling mean of the true range.
    Simple,
}

/// ATR over `period` bars with the given smoothing.
pub fn atr(bars: &[Bar], period: usize, smoothing: Smoothing) -> Vec<f64> {
    let tr = true_range(bars);
    match smoothing {
        Smoothing::Wilder => wilder_smooth(&tr, period),
        Smoothing::Simple => rolling_mean(&tr, period),
    }
}
