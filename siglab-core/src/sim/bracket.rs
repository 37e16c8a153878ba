//! Bracket construction and exit detection.
//!
//! Every trade carries a stop and a target fixed at entry. Exits fill at
//! the exact bracket price, never at the bar extreme that pierced it.

use crate::config::{BracketMode, FillPolicy, StrategyConfig};
use crate::domain::{Bar, Direction, ExitReason, Trade};

/// Stop and target prices for a prospective entry at `entry`.
///
/// `AtrMultiple` offsets by multiples of the entry bar's ATR;
/// `FixedFraction` offsets by fractions of the entry price itself. Either
/// way the stop sits on the losing side and the target on the winning
/// side of the entry.
pub fn bracket_prices(
    direction: Direction,
    entry: f64,
    atr: f64,
    config: &StrategyConfig,
    mode: BracketMode,
) -> (f64, f64) {
    let (stop_offset, target_offset) = match mode {
        BracketMode::AtrMultiple => (config.stop_multiplier * atr, config.target_multiplier * atr),
        BracketMode::FixedFraction => {
            (config.stop_multiplier * entry, config.target_multiplier * entry)
        }
    };
    match direction {
        Direction::Long => (entry - stop_offset, entry + target_offset),
        Direction::Short => (entry + stop_offset, entry - target_offset),
    }
}

/// Whether `bar` fills one of the trade's bracket legs, and at what price.
///
/// A long takes profit when the high reaches the target and stops out when
/// the low reaches the stop; a short mirrors both. When a single bar
/// straddles both legs the fill policy breaks the tie. Bars with NaN
/// extremes touch nothing.
pub fn check_exit(trade: &Trade, bar: &Bar, policy: FillPolicy) -> Option<(f64, ExitReason)> {
    let target_hit = match trade.direction {
        Direction::Long => bar.high >= trade.target_price,
        Direction::Short => bar.low <= trade.target_price,
    };
    let stop_hit = match trade.direction {
        Direction::Long => bar.low <= trade.stop_price,
        Direction::Short => bar.high >= trade.stop_price,
    };
    match (target_hit, stop_hit) {
        (false, false) => None,
        (true, false) => Some((trade.target_price, ExitReason::TakeProfit)),
        (false, true) => Some((trade.stop_price, ExitReason::StopLoss)),
        (true, true) => match policy {
            FillPolicy::TakeProfitFirst => Some((trade.target_price, ExitReason::TakeProfit)),
            FillPolicy::StopLossFirst => Some((trade.stop_price, ExitReason::StopLoss)),
        },
    }
}
