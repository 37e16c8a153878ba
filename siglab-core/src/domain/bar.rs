//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SeriesError;

/// OHLCV bar for a single instrument over a single interval (typically one
/// minute). The series the engine consumes holds exactly one instrument, so
/// the symbol lives on the run configuration, not on every bar.
///
/// Price and volume fields may carry NaN: upstream ingest turns non-numeric
/// source fields into NaN sentinels instead of failing, and every computation
/// downstream is defined over them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLC field is non-finite (void bar).
    pub fn is_void(&self) -> bool {
        !self.open.is_finite()
            || !self.high.is_finite()
            || !self.low.is_finite()
            || !self.close.is_finite()
    }

    /// Basic OHLC sanity check: finite prices, high/low bracket open and close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// High minus low.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Check the series shape contract: timestamps strictly increasing.
///
/// The engine assumes its input is chronologically ordered with no duplicate
/// timestamps. Ingest produces such a series by construction; this check is
/// for callers that bring their own bars, so a shape violation surfaces as a
/// typed error before any computation instead of as silent garbage.
pub fn validate_series(bars: &[Bar]) -> Result<(), SeriesError> {
    for (i, pair) in bars.windows(2).enumerate() {
        let prev = pair[0].timestamp;
        let curr = pair[1].timestamp;
        if curr == prev {
            return Err(SeriesError::DuplicateTimestamp {
                index: i + 1,
                timestamp: curr,
            });
        }
        if curr < prev {
            return Err(SeriesError::OutOfOrder {
                index: i + 1,
                previous: prev,
                current: curr,
            });
        }
    }
    Ok(())
}
