//! Backtest runner — wires config, data, signal engine, and simulator.
//!
//! Two entry points:
//! - `execute_run()`: resolves bars from the run config (CSV path, or a
//!   synthetic series when none is set), then runs. Used by the CLI.
//! - `run_backtest()`: takes pre-loaded bars. Used by sweeps to load the
//!   dataset once and run many parameter sets against it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use siglab_core::config::{SimPolicy, StrategyConfig};
use siglab_core::domain::{validate_series, Bar, Trade};
use siglab_core::error::{ConfigError, SeriesError};
use siglab_core::report::Summary;
use siglab_core::signal::{AtrMomentum, RangeBreakout, SignalEngine};
use siglab_core::sim;

use crate::config::{EngineKind, RunConfig, RunId};
use crate::data_loader::{self, LoadError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("series error: {0}")]
    Series(#[from] SeriesError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub symbol: String,
    pub engine: String,
    /// Strategy parameters after overrides, as the run actually used them.
    pub strategy: StrategyConfig,
    pub sim: SimPolicy,
    pub initial_capital: f64,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub bar_count: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub dataset_hash: String,
    pub synthetic: bool,
    pub summary: Summary,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
    /// Index of the bar that tripped the drawdown halt, if any.
    pub halted_at: Option<usize>,
    pub warnings: Vec<String>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Instantiate the engine named by the config.
pub fn build_engine(kind: EngineKind) -> Box<dyn SignalEngine> {
    match kind {
        EngineKind::AtrMomentum => Box::new(AtrMomentum::default()),
        EngineKind::RangeBreakout => Box::new(RangeBreakout::default()),
    }
}

/// Run a backtest from a RunConfig, resolving its data source.
///
/// This is the high-level entry point used by the CLI. A config with a
/// `data` path loads and canonicalizes that CSV; without one it falls back
/// to a synthetic series seeded by the symbol.
pub fn execute_run(config: &RunConfig) -> Result<BacktestReport, RunError> {
    let (bars, warnings, synthetic) = match &config.data {
        Some(path) => {
            let loaded = data_loader::load_bar_csv(path)?;
            (loaded.bars, loaded.warnings, false)
        }
        None => {
            let bars =
                data_loader::generate_synthetic_bars(&config.symbol, config.synthetic_bars);
            (bars, Vec::new(), true)
        }
    };
    run_backtest_from_data(config, &bars, synthetic, warnings)
}

/// Run a backtest over pre-loaded bars — no I/O.
pub fn run_backtest(config: &RunConfig, bars: &[Bar]) -> Result<BacktestReport, RunError> {
    run_backtest_from_data(config, bars, false, Vec::new())
}

/// Run a backtest over pre-loaded bars with explicit provenance.
///
/// Used by sweeps to avoid re-reading the dataset on every parameter set.
/// `warnings` carries ingest diagnostics into the report; a drawdown halt
/// appends its own entry.
pub fn run_backtest_from_data(
    config: &RunConfig,
    bars: &[Bar],
    synthetic: bool,
    mut warnings: Vec<String>,
) -> Result<BacktestReport, RunError> {
    let strategy = config.resolved_strategy();
    strategy.validate()?;
    validate_series(bars)?;

    let engine = build_engine(config.engine);
    let annotated = engine.annotate(bars, &strategy);
    let buy_signals = annotated.iter().filter(|a| a.buy).count();
    let sell_signals = annotated.iter().filter(|a| a.sell).count();

    let sim_report = sim::run(&annotated, &strategy, config.sim, config.initial_capital);
    if let Some(index) = sim_report.halted_at {
        warnings.push(format!(
            "simulation halted at bar {index} on the drawdown limit; {} of {} bars processed",
            sim_report.equity_curve.len(),
            bars.len()
        ));
    }

    Ok(BacktestReport {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        symbol: config.symbol.clone(),
        engine: engine.name().to_string(),
        strategy,
        sim: config.sim,
        initial_capital: config.initial_capital,
        first_timestamp: bars.first().map(|b| b.timestamp),
        last_timestamp: bars.last().map(|b| b.timestamp),
        bar_count: bars.len(),
        buy_signals,
        sell_signals,
        dataset_hash: data_loader::dataset_hash(bars),
        synthetic,
        summary: sim_report.summary,
        trades: sim_report.trades,
        equity_curve: sim_report.equity_curve,
        halted_at: sim_report.halted_at,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use siglab_core::config::StrategyOverrides;

    fn demo_config() -> RunConfig {
        RunConfig::new("DEMO")
    }

    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let open = if i == 0 { close } else { closes[i - 1] };
                Bar {
                    timestamp: start + Duration::minutes(i as i64),
                    open,
                    high: open.max(close) + 1.0,
                    low: open.min(close) - 1.0,
                    close,
                    volume: 1_000.0,
                }
            })
            .collect()
    }

    #[test]
    fn synthetic_run_end_to_end() {
        let report = execute_run(&demo_config()).unwrap();
        assert_eq!(report.schema_version, SCHEMA_VERSION);
        assert_eq!(report.engine, "atr_momentum");
        assert_eq!(report.bar_count, 390);
        assert!(report.synthetic);
        assert_eq!(report.run_id.len(), 64);
        assert_eq!(report.dataset_hash.len(), 64);
        let first = report.first_timestamp.unwrap();
        let last = report.last_timestamp.unwrap();
        assert!(first < last);
        // Curve covers every bar up to a halt, all 390 otherwise.
        assert_eq!(report.equity_curve.len(), report.halted_at.unwrap_or(390));
    }

    #[test]
    fn runs_are_deterministic() {
        let config = demo_config();
        let a = execute_run(&config).unwrap();
        let b = execute_run(&config).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn rejects_invalid_strategy() {
        let mut config = demo_config();
        config.strategy.risk_per_trade = Some(0.0);
        let err = run_backtest(&config, &bars_from_closes(&[100.0, 101.0])).unwrap_err();
        assert!(matches!(err, RunError::Config(_)));
    }

    #[test]
    fn rejects_disordered_series() {
        let mut bars = bars_from_closes(&[100.0, 101.0, 102.0]);
        bars.swap(1, 2);
        let err = run_backtest(&demo_config(), &bars).unwrap_err();
        assert!(matches!(err, RunError::Series(_)));
    }

    #[test]
    fn signal_counts_match_annotation() {
        let config = demo_config();
        let bars = data_loader::generate_synthetic_bars(&config.symbol, config.synthetic_bars);
        let report = run_backtest(&config, &bars).unwrap();

        let annotated = build_engine(config.engine).annotate(&bars, &config.resolved_strategy());
        assert_eq!(report.buy_signals, annotated.iter().filter(|a| a.buy).count());
        assert_eq!(report.sell_signals, annotated.iter().filter(|a| a.sell).count());
    }

    #[test]
    fn ingest_warnings_carry_into_report() {
        let bars = bars_from_closes(&[100.0, 101.0]);
        let report =
            run_backtest_from_data(&demo_config(), &bars, false, vec!["two rows dropped".into()])
                .unwrap();
        assert_eq!(report.warnings, vec!["two rows dropped".to_string()]);
    }

    #[test]
    fn drawdown_halt_is_reported() {
        // A breakdown bar signals a short whose stop sits inside the same
        // bar's range. The stop-out loses 1% of equity and the next bar
        // trips the tightened drawdown limit.
        let mut closes = vec![100.0; 10];
        closes.push(95.0);
        closes.push(95.0);
        let bars = bars_from_closes(&closes);

        let mut config = demo_config();
        config.engine = EngineKind::RangeBreakout;
        config.strategy = StrategyOverrides {
            atr_period: Some(5),
            fast_period: Some(3),
            slow_period: Some(8),
            range_period: Some(10),
            max_drawdown: Some(-0.005),
            ..Default::default()
        };

        let report = run_backtest(&config, &bars).unwrap();
        assert_eq!(report.halted_at, Some(11));
        assert_eq!(report.equity_curve.len(), 11);
        assert!(report.warnings.iter().any(|w| w.contains("halted at bar 11")));
        assert_eq!(report.trades.len(), 1);
        assert!(report.trades[0].exit.is_some());
        assert_eq!(report.sell_signals, 1);
    }

    #[test]
    fn schema_version_defaults_when_absent() {
        let report = execute_run(&demo_config()).unwrap();
        let mut value = serde_json::to_value(&report).unwrap();
        value.as_object_mut().unwrap().remove("schema_version");
        let restored: BacktestReport = serde_json::from_value(value).unwrap();
        assert_eq!(restored.schema_version, SCHEMA_VERSION);
    }
}
