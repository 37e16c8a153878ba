//! Parameter sweep — grid search over strategy overrides.

use std::collections::HashSet;

use rayon::prelude::*;

use siglab_core::domain::Bar;

use crate::config::RunConfig;
use crate::runner::{run_backtest, BacktestReport, RunError};

/// Parameter grid specification.
///
/// Each list holds the values to try for one strategy field; the sweep runs
/// their cartesian product against a base config. An empty list keeps the
/// base value for that field. Combinations whose merged strategy fails
/// validation are dropped; a stop multiplier at or above the target is
/// legal (just aggressive) and stays in.
#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    pub risk_per_trade: Vec<f64>,
    pub entry_threshold: Vec<f64>,
    pub stop_multiplier: Vec<f64>,
    pub target_multiplier: Vec<f64>,
}

impl ParamGrid {
    /// A small general-purpose grid around the baseline strategy.
    pub fn baseline() -> Self {
        Self {
            risk_per_trade: vec![0.005, 0.01, 0.02],
            entry_threshold: vec![1.0, 1.5, 2.0],
            stop_multiplier: vec![1.0, 1.5],
            target_multiplier: vec![2.0, 3.0],
        }
    }

    /// Total number of grid cells before validation and dedup.
    pub fn size(&self) -> usize {
        self.risk_per_trade.len().max(1)
            * self.entry_threshold.len().max(1)
            * self.stop_multiplier.len().max(1)
            * self.target_multiplier.len().max(1)
    }

    /// Generate the runnable configs, in grid order.
    ///
    /// Identical cells (repeated axis values) are dropped by run id, so
    /// every returned config is unique.
    pub fn generate_configs(&self, base: &RunConfig) -> Vec<RunConfig> {
        let mut configs = Vec::with_capacity(self.size());
        let mut seen = HashSet::new();

        for &risk in &axis(&self.risk_per_trade) {
            for &threshold in &axis(&self.entry_threshold) {
                for &stop in &axis(&self.stop_multiplier) {
                    for &target in &axis(&self.target_multiplier) {
                        let mut config = base.clone();
                        if let Some(v) = risk {
                            config.strategy.risk_per_trade = Some(v);
                        }
                        if let Some(v) = threshold {
                            config.strategy.entry_threshold = Some(v);
                        }
                        if let Some(v) = stop {
                            config.strategy.stop_multiplier = Some(v);
                        }
                        if let Some(v) = target {
                            config.strategy.target_multiplier = Some(v);
                        }

                        if config.resolved_strategy().validate().is_err() {
                            continue;
                        }
                        if !seen.insert(config.run_id()) {
                            continue;
                        }
                        configs.push(config);
                    }
                }
            }
        }

        configs
    }
}

/// An empty axis still contributes one cell: the base value, untouched.
fn axis(values: &[f64]) -> Vec<Option<f64>> {
    if values.is_empty() {
        vec![None]
    } else {
        values.iter().copied().map(Some).collect()
    }
}

/// Run every grid cell against the same pre-loaded bars.
///
/// Cells run in parallel; the results come back in grid order regardless,
/// so the same grid and data always produce the same result sequence.
pub fn run_sweep(
    grid: &ParamGrid,
    base: &RunConfig,
    bars: &[Bar],
) -> Result<SweepResults, RunError> {
    let configs = grid.generate_configs(base);
    let results: Vec<BacktestReport> = configs
        .par_iter()
        .map(|config| run_backtest(config, bars))
        .collect::<Result<Vec<_>, RunError>>()?;
    Ok(SweepResults::new(results))
}

/// Results from a parameter sweep, in grid order.
#[derive(Debug)]
pub struct SweepResults {
    results: Vec<BacktestReport>,
}

impl SweepResults {
    fn new(results: Vec<BacktestReport>) -> Self {
        Self { results }
    }

    pub fn all(&self) -> &[BacktestReport] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Look up one cell's report by run id.
    pub fn get(&self, run_id: &str) -> Option<&BacktestReport> {
        self.results.iter().find(|r| r.run_id == run_id)
    }

    /// All reports, best total return first. Runs with no computable
    /// return sort last; ties keep grid order.
    pub fn sorted_by_return(&self) -> Vec<&BacktestReport> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by(|a, b| {
            return_key(b)
                .partial_cmp(&return_key(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    /// The top N reports by total return.
    pub fn top_n(&self, n: usize) -> Vec<&BacktestReport> {
        self.sorted_by_return().into_iter().take(n).collect()
    }

    /// The single best report by total return.
    pub fn best_by_return(&self) -> Option<&BacktestReport> {
        self.sorted_by_return().into_iter().next()
    }
}

fn return_key(report: &BacktestReport) -> f64 {
    report.summary.total_return.unwrap_or(f64::NEG_INFINITY)
}
