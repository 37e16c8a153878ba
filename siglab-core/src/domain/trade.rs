//! Trade — one ledger entry, open until its bracket resolves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which way a trade is positioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

/// Which bracket leg closed a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "take_profit",
            ExitReason::StopLoss => "stop_loss",
        }
    }
}

/// Exit side of a trade. Present once the bracket resolves, never mutated after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeExit {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub reason: ExitReason,
    /// Realized profit: `(exit - entry) * size` long, `(entry - exit) * size` short.
    pub profit: f64,
}

/// A single trade in the ledger.
///
/// Created at entry with its full bracket (stop and target fixed for life).
/// `exit` is `None` while the trade is open. The ledger keeps every trade in
/// creation order, open or closed; exits never reorder it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: Direction,
    pub entry_bar: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: f64,
    /// Position size in instrument units (fractional).
    pub size: f64,
    pub exit: Option<TradeExit>,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.exit.is_none()
    }

    /// Realized profit, `None` while open.
    pub fn profit(&self) -> Option<f64> {
        self.exit.as_ref().map(|e| e.profit)
    }

    /// Closed with positive profit.
    pub fn is_winner(&self) -> bool {
        matches!(&self.exit, Some(e) if e.profit > 0.0)
    }

    /// Bars between entry and exit, `None` while open.
    pub fn bars_held(&self) -> Option<usize> {
        self.exit.as_ref().map(|e| e.bar_index - self.entry_bar)
    }

    /// Record the exit. A trade closes exactly once.
    pub(crate) fn close(&mut self, exit: TradeExit) {
        debug_assert!(self.exit.is_none(), "trade closed twice");
        self.exit = Some(exit);
    }
}
