//! Serializable run configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use siglab_core::config::{SimPolicy, StrategyConfig, StrategyOverrides};

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Errors from reading a config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Which signal engine annotates the series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    #[default]
    AtrMomentum,
    RangeBreakout,
}

impl EngineKind {
    pub fn name(&self) -> &'static str {
        match self {
            EngineKind::AtrMomentum => "atr_momentum",
            EngineKind::RangeBreakout => "range_breakout",
        }
    }
}

/// Everything needed to reproduce a single backtest run.
///
/// Deserializes from a TOML file where every field except `symbol` is
/// optional. Strategy parameters arrive as a partial `[strategy]` table
/// and are resolved against the baseline at run time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Instrument label, carried into reports and artifact names.
    pub symbol: String,

    /// Starting equity.
    #[serde(default = "default_capital")]
    pub initial_capital: f64,

    /// Signal engine choice.
    #[serde(default)]
    pub engine: EngineKind,

    /// Bar CSV to load. Absent means synthetic bars.
    #[serde(default)]
    pub data: Option<PathBuf>,

    /// Synthetic series length when no data file is given.
    #[serde(default = "default_synthetic_bars")]
    pub synthetic_bars: usize,

    /// Partial strategy parameter overrides.
    #[serde(default)]
    pub strategy: StrategyOverrides,

    /// Simulation policy knobs.
    #[serde(default)]
    pub sim: SimPolicy,
}

fn default_capital() -> f64 {
    10_000.0
}

/// One trading day of minute bars.
fn default_synthetic_bars() -> usize {
    390
}

impl RunConfig {
    pub fn new(symbol: impl Into<String>) -> Self {
        RunConfig {
            symbol: symbol.into(),
            initial_capital: default_capital(),
            engine: EngineKind::default(),
            data: None,
            synthetic_bars: default_synthetic_bars(),
            strategy: StrategyOverrides::default(),
            sim: SimPolicy::default(),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigFileError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigFileError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// The baseline strategy with this run's overrides applied.
    pub fn resolved_strategy(&self) -> StrategyConfig {
        StrategyConfig::default().merged(&self.strategy)
    }

    /// Deterministic content hash of this configuration.
    ///
    /// Two runs with identical configs share a RunId, which names their
    /// artifacts and deduplicates sweep grid points.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
