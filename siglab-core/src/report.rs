//! Aggregate performance summary over a simulated trade ledger.

use serde::{Deserialize, Serialize};

use crate::domain::Trade;

/// Headline numbers for one simulation.
///
/// Ratios that average over closed trades are `None` when nothing closed,
/// keeping "no trades" distinct from "break-even trades" in serialized
/// reports. `total_return` is `None` when starting capital was not
/// positive, since a return relative to zero is meaningless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub closed_trades: usize,
    pub open_trades: usize,
    pub total_profit: f64,
    pub win_rate: Option<f64>,
    pub mean_profit: Option<f64>,
    pub final_equity: f64,
    pub total_return: Option<f64>,
}

impl Summary {
    /// Fold a finished ledger into headline numbers.
    ///
    /// Open trades are counted but contribute nothing to profit or the
    /// ratios. A winner is a closed trade with strictly positive profit.
    pub fn compute(trades: &[Trade], initial_capital: f64, final_equity: f64) -> Self {
        let mut closed = 0usize;
        let mut winners = 0usize;
        let mut total_profit = 0.0;
        for trade in trades {
            if let Some(profit) = trade.profit() {
                closed += 1;
                total_profit += profit;
                if profit > 0.0 {
                    winners += 1;
                }
            }
        }
        let win_rate = (closed > 0).then(|| winners as f64 / closed as f64);
        let mean_profit = (closed > 0).then(|| total_profit / closed as f64);
        let total_return =
            (initial_capital > 0.0).then(|| (final_equity - initial_capital) / initial_capital);
        Summary {
            closed_trades: closed,
            open_trades: trades.len() - closed,
            total_profit,
            win_rate,
            mean_profit,
            final_equity,
            total_return,
        }
    }
}
