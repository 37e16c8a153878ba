//! Strategy configuration — flat named numeric parameters with baseline
//! defaults, partial override merging, and domain validation.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Every tunable number the signal engines and the simulator read.
///
/// `Default` is the documented baseline. Callers tweak it either directly or
/// through [`StrategyOverrides`] + [`StrategyConfig::merged`], which is how
/// partial config files and sweep grids apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// True-range smoothing window.
    pub atr_period: usize,
    /// Momentum oscillator window.
    pub momentum_period: usize,
    /// Trend MA window (momentum engine).
    pub trend_period: usize,
    /// Fast MA window (range engine).
    pub fast_period: usize,
    /// Slow MA window (range engine).
    pub slow_period: usize,
    /// Rolling extreme-range window (range engine).
    pub range_period: usize,
    /// The directional move must exceed `entry_threshold * ATR`
    /// (or `entry_threshold *` the relative volatility, range engine).
    pub entry_threshold: f64,
    /// Oscillator extreme zones: buy confirms above `overbought`,
    /// sell below `oversold`. Strict comparisons.
    pub overbought: f64,
    pub oversold: f64,
    /// Stop offset, as an ATR multiple or an entry-price fraction
    /// depending on the bracket mode.
    pub stop_multiplier: f64,
    /// Target offset, same unit as `stop_multiplier`.
    pub target_multiplier: f64,
    /// Max concurrently open trades.
    pub max_trades: usize,
    /// Equity drawdown from peak that halts the run. Negative fraction,
    /// e.g. -0.05 halts below 5% under peak.
    pub max_drawdown: f64,
    /// Equity fraction risked between entry and stop on each trade.
    pub risk_per_trade: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            momentum_period: 14,
            trend_period: 50,
            fast_period: 13,
            slow_period: 120,
            range_period: 240,
            entry_threshold: 1.5,
            overbought: 70.0,
            oversold: 30.0,
            stop_multiplier: 1.5,
            target_multiplier: 2.0,
            max_trades: 3,
            max_drawdown: -0.05,
            risk_per_trade: 0.01,
        }
    }
}

impl StrategyConfig {
    /// Apply a partial override on top of this config, returning the merged
    /// result. Neither input is touched.
    pub fn merged(&self, overrides: &StrategyOverrides) -> StrategyConfig {
        StrategyConfig {
            atr_period: overrides.atr_period.unwrap_or(self.atr_period),
            momentum_period: overrides.momentum_period.unwrap_or(self.momentum_period),
            trend_period: overrides.trend_period.unwrap_or(self.trend_period),
            fast_period: overrides.fast_period.unwrap_or(self.fast_period),
            slow_period: overrides.slow_period.unwrap_or(self.slow_period),
            range_period: overrides.range_period.unwrap_or(self.range_period),
            entry_threshold: overrides.entry_threshold.unwrap_or(self.entry_threshold),
            overbought: overrides.overbought.unwrap_or(self.overbought),
            oversold: overrides.oversold.unwrap_or(self.oversold),
            stop_multiplier: overrides.stop_multiplier.unwrap_or(self.stop_multiplier),
            target_multiplier: overrides.target_multiplier.unwrap_or(self.target_multiplier),
            max_trades: overrides.max_trades.unwrap_or(self.max_trades),
            max_drawdown: overrides.max_drawdown.unwrap_or(self.max_drawdown),
            risk_per_trade: overrides.risk_per_trade.unwrap_or(self.risk_per_trade),
        }
    }

    /// Check every parameter against its numeric domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("atr_period", self.atr_period),
            ("momentum_period", self.momentum_period),
            ("trend_period", self.trend_period),
            ("fast_period", self.fast_period),
            ("slow_period", self.slow_period),
            ("range_period", self.range_period),
        ] {
            if value < 1 {
                return Err(ConfigError::WindowTooSmall { field, value });
            }
        }

        if !(self.entry_threshold > 0.0 && self.entry_threshold.is_finite()) {
            return Err(ConfigError::BadEntryThreshold {
                value: self.entry_threshold,
            });
        }

        let zones_ok = self.oversold >= 0.0
            && self.oversold < self.overbought
            && self.overbought <= 100.0;
        if !zones_ok {
            return Err(ConfigError::BadMomentumZones {
                oversold: self.oversold,
                overbought: self.overbought,
            });
        }

        for (field, value) in [
            ("stop_multiplier", self.stop_multiplier),
            ("target_multiplier", self.target_multiplier),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::NonPositiveMultiplier { field, value });
            }
        }

        if !(self.max_drawdown > -1.0 && self.max_drawdown < 0.0) {
            return Err(ConfigError::BadMaxDrawdown {
                value: self.max_drawdown,
            });
        }

        if !(self.risk_per_trade > 0.0 && self.risk_per_trade <= 1.0) {
            return Err(ConfigError::BadRiskFraction {
                value: self.risk_per_trade,
            });
        }

        if self.max_trades < 1 {
            return Err(ConfigError::ZeroTradeCapacity);
        }

        Ok(())
    }
}

/// Partial strategy config: every field optional. Deserializes from a
/// partial TOML/JSON table; unset fields fall through to the base config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyOverrides {
    pub atr_period: Option<usize>,
    pub momentum_period: Option<usize>,
    pub trend_period: Option<usize>,
    pub fast_period: Option<usize>,
    pub slow_period: Option<usize>,
    pub range_period: Option<usize>,
    pub entry_threshold: Option<f64>,
    pub overbought: Option<f64>,
    pub oversold: Option<f64>,
    pub stop_multiplier: Option<f64>,
    pub target_multiplier: Option<f64>,
    pub max_trades: Option<usize>,
    pub max_drawdown: Option<f64>,
    pub risk_per_trade: Option<f64>,
}

// ─── Simulator policies ─────────────────────────────────────────────

/// When one bar's range touches both bracket prices, which fill wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Optimistic: the target is checked first.
    #[default]
    TakeProfitFirst,
    /// Pessimistic: the stop is checked first.
    StopLossFirst,
}

impl FillPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            FillPolicy::TakeProfitFirst => "take_profit_first",
            FillPolicy::StopLossFirst => "stop_loss_first",
        }
    }
}

/// Whether entries or exits are evaluated first within one bar.
///
/// Under `EntriesThenExits` a trade opened at this bar's close can already
/// be closed by this bar's high/low; under `ExitsThenEntries` it lives to
/// the next bar at least.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarOrdering {
    #[default]
    EntriesThenExits,
    ExitsThenEntries,
}

impl BarOrdering {
    pub fn name(&self) -> &'static str {
        match self {
            BarOrdering::EntriesThenExits => "entries_then_exits",
            BarOrdering::ExitsThenEntries => "exits_then_entries",
        }
    }
}

/// How stop and target offsets are derived from the multipliers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketMode {
    /// Offsets are `multiplier * ATR` at entry.
    #[default]
    AtrMultiple,
    /// Offsets are `multiplier * entry_price`; the multipliers then read as
    /// fractions (e.g. 0.015 for 1.5%).
    FixedFraction,
}

impl BracketMode {
    pub fn name(&self) -> &'static str {
        match self {
            BracketMode::AtrMultiple => "atr_multiple",
            BracketMode::FixedFraction => "fixed_fraction",
        }
    }
}

/// The simulator's behavioral switches, bundled for config files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimPolicy {
    pub fill_policy: FillPolicy,
    pub ordering: BarOrdering,
    pub bracket: BracketMode,
}
