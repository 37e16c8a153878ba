//! Siglab Runner — backtest orchestration, data ingest, export, sweeps.
//!
//! This crate builds on `siglab-core` to provide:
//! - Bar/tick CSV ingest with canonicalization and a synthetic fallback
//! - Run configuration files with blake3 run ids
//! - Single-backtest orchestration into a versioned report
//! - JSON/CSV/Markdown artifact export
//! - Parallel parameter sweeps over strategy overrides

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod sweep;

pub use config::{ConfigFileError, EngineKind, RunConfig, RunId};
pub use data_loader::{
    aggregate_ticks, canonicalize, dataset_hash, generate_synthetic_bars, load_bar_csv,
    load_tick_csv, write_bar_csv, LoadError, LoadedBars, LoadedTicks, Tick,
};
pub use export::{
    export_equity_csv, export_json, export_trades_csv, generate_report, import_json,
    load_artifacts, save_artifacts,
};
pub use runner::{
    execute_run, run_backtest, run_backtest_from_data, BacktestReport, RunError, SCHEMA_VERSION,
};
pub use sweep::{run_sweep, ParamGrid, SweepResults};
