//! Signal engines — indicator computation and entry-flag generation.
//!
//! A signal engine turns a bar series into the same-length series of
//! [`AnnotatedBar`]s the simulator consumes. Engines differ only in which
//! indicators they compute and how the raw entry conjunction is formed;
//! de-duplication and conflict resolution are shared and applied last.

pub mod atr_momentum;
pub mod range_breakout;

pub use atr_momentum::AtrMomentum;
pub use range_breakout::RangeBreakout;

use crate::config::StrategyConfig;
use crate::domain::{AnnotatedBar, Bar};

/// Indicator computation as a replaceable strategy.
///
/// `annotate` is total: it never fails, never panics on short input, and
/// returns exactly one annotated bar per input bar in input order. Bars with
/// non-finite fields produce non-finite indicator values and never signal.
pub trait SignalEngine: Send + Sync {
    fn name(&self) -> &str;
    fn annotate(&self, bars: &[Bar], config: &StrategyConfig) -> Vec<AnnotatedBar>;
}

/// Close-to-close changes. The first bar has no predecessor and reads 0.0;
/// a non-finite close makes the change NaN for the bars it touches.
pub fn price_moves(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut moves = vec![f64::NAN; n];
    if n == 0 {
        return moves;
    }
    if bars[0].close.is_finite() {
        moves[0] = 0.0;
    }
    for i in 1..n {
        let curr = bars[i].close;
        let prev = bars[i - 1].close;
        if curr.is_finite() && prev.is_finite() {
            moves[i] = curr - prev;
        }
    }
    moves
}

/// Turn raw per-bar conditions into final signals.
///
/// Edge-triggered de-duplication: a final flag fires only on the first bar
/// of a raw streak. A raw condition that holds across consecutive bars is
/// one trading decision, not one per bar. If both directions survive on the
/// same bar they cancel, so at most one of buy/sell is ever set.
pub fn finalize_signals(annotated: &mut [AnnotatedBar]) {
    let mut prev_raw_buy = false;
    let mut prev_raw_sell = false;
    for ab in annotated.iter_mut() {
        let mut buy = ab.raw_buy && !prev_raw_buy;
        let mut sell = ab.raw_sell && !prev_raw_sell;
        if buy && sell {
            buy = false;
            sell = false;
        }
        ab.buy = buy;
        ab.sell = sell;
        prev_raw_buy = ab.raw_buy;
        prev_raw_sell = ab.raw_sell;
    }
}
