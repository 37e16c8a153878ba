//! Export — JSON, CSV, and Markdown artifact generation.
//!
//! Three formats:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade tape and equity curve for external analysis tools
//! - **Markdown**: human-readable single-run report
//!
//! All persisted artifacts include a `schema_version` field. Unknown
//! versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use siglab_core::domain::Trade;

use crate::runner::{BacktestReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestReport` to pretty JSON.
pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a `BacktestReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the trade ledger as CSV.
///
/// Columns: direction, entry_bar, entry_time, entry_price, stop_price,
/// target_price, size, exit_bar, exit_time, exit_price, exit_reason,
/// profit, bars_held. Open trades leave the exit columns empty.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "direction",
        "entry_bar",
        "entry_time",
        "entry_price",
        "stop_price",
        "target_price",
        "size",
        "exit_bar",
        "exit_time",
        "exit_price",
        "exit_reason",
        "profit",
        "bars_held",
    ])?;

    for trade in trades {
        let exit = trade.exit.as_ref();
        wtr.write_record([
            trade.direction.as_str().to_string(),
            trade.entry_bar.to_string(),
            trade.entry_time.to_rfc3339(),
            format!("{:.6}", trade.entry_price),
            format!("{:.6}", trade.stop_price),
            format!("{:.6}", trade.target_price),
            format!("{:.6}", trade.size),
            exit.map(|e| e.bar_index.to_string()).unwrap_or_default(),
            exit.map(|e| e.timestamp.to_rfc3339()).unwrap_or_default(),
            exit.map(|e| format!("{:.6}", e.price)).unwrap_or_default(),
            exit.map(|e| e.reason.as_str().to_string()).unwrap_or_default(),
            exit.map(|e| format!("{:.2}", e.profit)).unwrap_or_default(),
            trade.bars_held().map(|b| b.to_string()).unwrap_or_default(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV with bar_index and equity columns.
pub fn export_equity_csv(equity_curve: &[f64]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "equity"])?;
    for (i, eq) in equity_curve.iter().enumerate() {
        wtr.write_record([i.to_string(), format!("{:.2}", eq)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates a directory named `{symbol}_{run_id8}/` under `output_dir`
/// containing:
/// - `manifest.json` — the full `BacktestReport`
/// - `trades.csv` — the trade tape
/// - `equity.csv` — the bar-by-bar equity curve
///
/// Returns the path to the created directory. The run-id prefix makes the
/// name deterministic, so re-running the same config overwrites in place.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<PathBuf> {
    let short_id = report.run_id.get(..8).unwrap_or(report.run_id.as_str());
    let run_dir = output_dir.join(format!("{}_{}", report.symbol, short_id));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(report)?;
    std::fs::write(run_dir.join("manifest.json"), &json)?;

    let trades_csv = export_trades_csv(&report.trades)?;
    std::fs::write(run_dir.join("trades.csv"), &trades_csv)?;

    let equity_csv = export_equity_csv(&report.equity_curve)?;
    std::fs::write(run_dir.join("equity.csv"), &equity_csv)?;

    Ok(run_dir)
}

/// Load a `BacktestReport` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestReport> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(report: &BacktestReport) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbol | {} |\n", report.symbol));
    md.push_str(&format!("| Engine | {} |\n", report.engine));
    md.push_str(&format!("| Run Id | {} |\n", report.run_id));
    let period = match (report.first_timestamp, report.last_timestamp) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "n/a".to_string(),
    };
    md.push_str(&format!("| Period | {period} |\n"));
    md.push_str(&format!("| Bars | {} |\n", report.bar_count));
    md.push_str(&format!(
        "| Signals | {} buy / {} sell |\n",
        report.buy_signals, report.sell_signals
    ));
    md.push_str(&format!(
        "| Initial Capital | ${:.2} |\n",
        report.initial_capital
    ));
    md.push_str(&format!("| Dataset Hash | {} |\n", report.dataset_hash));
    if report.synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    if let Some(index) = report.halted_at {
        md.push_str(&format!("| Halted | bar {index} (drawdown limit) |\n"));
    }
    md.push('\n');

    let s = &report.strategy;
    md.push_str("## Strategy\n\n");
    md.push_str("| Parameter | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| ATR Period | {} |\n", s.atr_period));
    md.push_str(&format!("| Entry Threshold | {} |\n", s.entry_threshold));
    md.push_str(&format!(
        "| Bracket | {} stop x{} target x{} |\n",
        report.sim.bracket.name(),
        s.stop_multiplier,
        s.target_multiplier
    ));
    md.push_str(&format!("| Risk Per Trade | {:.2}% |\n", s.risk_per_trade * 100.0));
    md.push_str(&format!("| Max Trades | {} |\n", s.max_trades));
    md.push_str(&format!("| Max Drawdown | {:.2}% |\n", s.max_drawdown * 100.0));
    md.push_str(&format!("| Fill Policy | {} |\n", report.sim.fill_policy.name()));
    md.push_str(&format!("| Bar Ordering | {} |\n", report.sim.ordering.name()));
    md.push('\n');

    let summary = &report.summary;
    md.push_str("## Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Total Return | {} |\n", pct_or_na(summary.total_return)));
    md.push_str(&format!("| Final Equity | ${:.2} |\n", summary.final_equity));
    md.push_str(&format!("| Total Profit | {:.2} |\n", summary.total_profit));
    md.push_str(&format!("| Closed Trades | {} |\n", summary.closed_trades));
    md.push_str(&format!("| Open Trades | {} |\n", summary.open_trades));
    md.push_str(&format!("| Win Rate | {} |\n", pct_or_na(summary.win_rate)));
    md.push_str(&format!("| Mean Profit | {} |\n", f2_or_na(summary.mean_profit)));
    md.push('\n');

    if !report.warnings.is_empty() {
        md.push_str("## Warnings\n\n");
        for warn in &report.warnings {
            md.push_str(&format!("- {warn}\n"));
        }
        md.push('\n');
    }

    md
}

fn pct_or_na(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}%", v * 100.0))
        .unwrap_or_else(|| "n/a".into())
}

fn f2_or_na(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "n/a".into())
}
