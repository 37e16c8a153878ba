//! Siglab CLI — backtest runs, tick cleaning, and parameter sweeps.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config and/or flag overrides
//! - `clean` — aggregate a tick CSV into a canonical bar CSV
//! - `sweep` — run the built-in parameter grid and rank results by return

use anyhow::{bail, Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use siglab_runner::{
    aggregate_ticks, canonicalize, execute_run, generate_synthetic_bars, load_bar_csv,
    load_tick_csv, run_sweep, save_artifacts, write_bar_csv, BacktestReport, EngineKind,
    ParamGrid, RunConfig,
};

#[derive(Parser)]
#[command(name = "siglab", about = "Siglab CLI — intraday signal backtesting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config and/or flag overrides.
    Run {
        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Instrument symbol. Overrides the config file.
        #[arg(long)]
        symbol: Option<String>,

        /// Starting capital. Overrides the config file.
        #[arg(long)]
        capital: Option<f64>,

        /// Bar CSV to backtest. Overrides the config file.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Ignore any data file and run on synthetic bars.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Synthetic series length in bars.
        #[arg(long)]
        bars: Option<usize>,

        /// Signal engine: atr_momentum or range_breakout. Overrides the config file.
        #[arg(long)]
        engine: Option<String>,

        /// Write manifest.json, trades.csv, and equity.csv under this directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Aggregate a tick CSV into a canonical bar CSV.
    Clean {
        /// Tick CSV with timestamp, price, size columns.
        ticks: PathBuf,

        /// Output bar CSV path.
        #[arg(long)]
        out: PathBuf,

        /// Bar interval in seconds.
        #[arg(long, default_value_t = 60)]
        interval: u32,
    },
    /// Run the built-in parameter grid over a base config and rank by return.
    Sweep {
        /// Path to a TOML run config supplying the base parameters.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Instrument symbol. Overrides the config file.
        #[arg(long)]
        symbol: Option<String>,

        /// Bar CSV to sweep over. Overrides the config file.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Rows to show in the ranking.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Print the ranking as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            symbol,
            capital,
            data,
            synthetic,
            bars,
            engine,
            out,
        } => run_backtest_cmd(config, symbol, capital, data, synthetic, bars, engine, out),
        Commands::Clean { ticks, out, interval } => run_clean(&ticks, &out, interval),
        Commands::Sweep {
            config,
            symbol,
            data,
            top,
            json,
        } => run_sweep_cmd(config, symbol, data, top, json),
    }
}

/// Resolve the base config from an optional file plus the overrides both
/// `run` and `sweep` share. Without a file the defaults (synthetic SPY)
/// apply, so `siglab run` works out of the box.
fn load_base_config(
    config_path: Option<&Path>,
    symbol: Option<String>,
    data: Option<PathBuf>,
) -> Result<RunConfig> {
    let mut config = match config_path {
        Some(path) => RunConfig::from_path(path)
            .with_context(|| format!("loading config '{}'", path.display()))?,
        None => RunConfig::new("SPY"),
    };
    if let Some(symbol) = symbol {
        config.symbol = symbol;
    }
    if let Some(data) = data {
        config.data = Some(data);
    }
    Ok(config)
}

fn parse_engine(name: &str) -> Result<EngineKind> {
    match name {
        "atr_momentum" => Ok(EngineKind::AtrMomentum),
        "range_breakout" => Ok(EngineKind::RangeBreakout),
        _ => bail!("unknown engine '{name}'. Valid: atr_momentum, range_breakout"),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_backtest_cmd(
    config_path: Option<PathBuf>,
    symbol: Option<String>,
    capital: Option<f64>,
    data: Option<PathBuf>,
    synthetic: bool,
    bars: Option<usize>,
    engine: Option<String>,
    out: Option<PathBuf>,
) -> Result<()> {
    if data.is_some() && synthetic {
        bail!("--data and --synthetic are mutually exclusive");
    }

    let mut config = load_base_config(config_path.as_deref(), symbol, data)?;
    if let Some(capital) = capital {
        config.initial_capital = capital;
    }
    if let Some(engine) = engine {
        config.engine = parse_engine(&engine)?;
    }
    if synthetic {
        config.data = None;
    }
    if let Some(bars) = bars {
        config.synthetic_bars = bars;
    }

    let report = execute_run(&config)?;
    print_summary(&report);

    if let Some(out) = out {
        let run_dir = save_artifacts(&report, &out)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }

    Ok(())
}

fn run_clean(ticks_path: &Path, out: &Path, interval_secs: u32) -> Result<()> {
    let loaded = load_tick_csv(ticks_path)
        .with_context(|| format!("loading ticks from '{}'", ticks_path.display()))?;
    let aggregated = aggregate_ticks(&loaded.ticks, Duration::seconds(interval_secs.into()));
    let (bars, canon_warnings) = canonicalize(aggregated);
    write_bar_csv(out, &bars)
        .with_context(|| format!("writing bars to '{}'", out.display()))?;

    println!("Ticks read:     {}", loaded.ticks.len());
    println!("Bars written:   {}", bars.len());
    println!(
        "Warnings:       {}",
        loaded.warnings.len() + canon_warnings.len()
    );
    for warn in loaded.warnings.iter().chain(&canon_warnings) {
        println!("WARNING: {warn}");
    }
    println!("Bar CSV saved to: {}", out.display());

    Ok(())
}

fn run_sweep_cmd(
    config_path: Option<PathBuf>,
    symbol: Option<String>,
    data: Option<PathBuf>,
    top: usize,
    json: bool,
) -> Result<()> {
    let base = load_base_config(config_path.as_deref(), symbol, data)?;

    let bars = match &base.data {
        Some(path) => {
            let loaded = load_bar_csv(path)
                .with_context(|| format!("loading bars from '{}'", path.display()))?;
            for warn in &loaded.warnings {
                eprintln!("WARNING: {warn}");
            }
            loaded.bars
        }
        None => generate_synthetic_bars(&base.symbol, base.synthetic_bars),
    };

    let grid = ParamGrid::baseline();
    let results = run_sweep(&grid, &base, &bars)?;
    let ranked = results.top_n(top);

    if json {
        let rows: Vec<serde_json::Value> = ranked
            .iter()
            .map(|report| {
                serde_json::json!({
                    "run_id": report.run_id,
                    "risk_per_trade": report.strategy.risk_per_trade,
                    "entry_threshold": report.strategy.entry_threshold,
                    "stop_multiplier": report.strategy.stop_multiplier,
                    "target_multiplier": report.strategy.target_multiplier,
                    "total_return": report.summary.total_return,
                    "closed_trades": report.summary.closed_trades,
                    "win_rate": report.summary.win_rate,
                    "final_equity": report.summary.final_equity,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "Sweep: top {} of {} grid cells on {} ({} bars{})",
        ranked.len(),
        results.len(),
        base.symbol,
        bars.len(),
        if base.data.is_none() { ", synthetic" } else { "" },
    );
    println!();
    println!(
        "{:<5} {:<10} {:>7} {:>10} {:>6} {:>8} {:>9} {:>8} {:>12}",
        "Rank", "Run Id", "Risk", "Threshold", "Stop", "Target", "Return", "Trades", "Equity"
    );
    println!("{}", "-".repeat(83));
    for (rank, report) in ranked.iter().enumerate() {
        println!(
            "{:<5} {:<10} {:>7.3} {:>10.2} {:>6.2} {:>8.2} {:>9} {:>8} {:>12.2}",
            rank + 1,
            short_id(&report.run_id),
            report.strategy.risk_per_trade,
            report.strategy.entry_threshold,
            report.strategy.stop_multiplier,
            report.strategy.target_multiplier,
            pct_or_na(report.summary.total_return),
            report.summary.closed_trades,
            report.summary.final_equity,
        );
    }

    Ok(())
}

fn print_summary(report: &BacktestReport) {
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", report.symbol);
    println!("Engine:         {}", report.engine);
    println!("Run id:         {}", report.run_id);
    println!("Period:         {}", period(report));
    println!("Bars:           {}", report.bar_count);
    println!(
        "Signals:        {} buy / {} sell",
        report.buy_signals, report.sell_signals
    );
    println!(
        "Policy:         {} fills, {} ordering, {} brackets",
        report.sim.fill_policy.name(),
        report.sim.ordering.name(),
        report.sim.bracket.name(),
    );
    println!();
    println!("--- Performance ---");
    println!("Initial Capital:${:.2}", report.initial_capital);
    println!("Final Equity:   ${:.2}", report.summary.final_equity);
    println!("Total Profit:   ${:.2}", report.summary.total_profit);
    println!("Total Return:   {}", pct_or_na(report.summary.total_return));
    println!(
        "Trades:         {} closed / {} open",
        report.summary.closed_trades, report.summary.open_trades
    );
    println!("Win Rate:       {}", pct_or_na(report.summary.win_rate));
    println!("Mean Profit:    {}", money_or_na(report.summary.mean_profit));
    if report.synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    for warn in &report.warnings {
        println!("WARNING: {warn}");
    }
    println!();
}

fn period(report: &BacktestReport) -> String {
    match (&report.first_timestamp, &report.last_timestamp) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "n/a".to_string(),
    }
}

fn short_id(run_id: &str) -> &str {
    run_id.get(..8).unwrap_or(run_id)
}

fn pct_or_na(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".into(), |v| format!("{:.2}%", v * 100.0))
}

fn money_or_na(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".into(), |v| format!("${v:.2}"))
}
