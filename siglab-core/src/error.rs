//! Typed errors for series-shape and configuration violations.
//!
//! Degenerate numerics (NaN inputs, zero-width stops, non-positive peaks)
//! are deliberately NOT errors; they are handled by documented policy where
//! they occur. Errors here are for inputs the engine refuses to compute on.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Shape violation in an input bar series. Checked up front, before any
/// indicator or simulation work.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("bar {index} is out of order: {current} does not follow {previous}")]
    OutOfOrder {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("bar {index} duplicates timestamp {timestamp}")]
    DuplicateTimestamp {
        index: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A strategy parameter outside its numeric domain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be >= 1 (got {value})")]
    WindowTooSmall { field: &'static str, value: usize },

    #[error("{field} must be positive and finite (got {value})")]
    NonPositiveMultiplier { field: &'static str, value: f64 },

    #[error("momentum thresholds must satisfy 0 <= oversold < overbought <= 100 (got oversold={oversold}, overbought={overbought})")]
    BadMomentumZones { oversold: f64, overbought: f64 },

    #[error("max_drawdown must be in (-1, 0) (got {value})")]
    BadMaxDrawdown { value: f64 },

    #[error("risk_per_trade must be in (0, 1] (got {value})")]
    BadRiskFraction { value: f64 },

    #[error("max_trades must be >= 1")]
    ZeroTradeCapacity,

    #[error("entry_threshold must be positive and finite (got {value})")]
    BadEntryThreshold { value: f64 },
}
