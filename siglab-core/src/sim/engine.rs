//! Stateful per-bar trade simulator.
//!
//! The simulator folds an annotated series into a trade ledger and an
//! equity curve. Each bar runs through a fixed sequence:
//!
//! 1. drawdown check against the running peak (may halt the simulation)
//! 2. peak update
//! 3. entry evaluation, then exit evaluation (or the reverse, per
//!    [`BarOrdering`])
//!
//! Equity changes only when a trade closes. Under `EntriesThenExits` a
//! trade opened on a bar is already eligible to exit on that same bar;
//! `ExitsThenEntries` defers its first exit check to the next bar. The
//! peak updates before the bar's fills, so a gain made on bar `t` raises
//! the peak at bar `t + 1`.

use serde::{Deserialize, Serialize};

use crate::config::{BarOrdering, SimPolicy, StrategyConfig};
use crate::domain::{AnnotatedBar, Direction, Trade, TradeExit};
use crate::report::Summary;
use crate::sim::bracket::{bracket_prices, check_exit};
use crate::sim::sizing::risk_size;

/// What a single step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarOutcome {
    /// The simulation is halted; nothing on this bar was processed.
    pub halted: bool,
    /// A trade was opened on this bar.
    pub opened: bool,
    /// Number of trades closed on this bar.
    pub closed: usize,
}

/// Everything a finished simulation produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimReport {
    pub trades: Vec<Trade>,
    pub summary: Summary,
    /// Equity after each processed bar. Shorter than the input series when
    /// the simulation halted.
    pub equity_curve: Vec<f64>,
    /// Index of the bar whose drawdown check tripped, if any.
    pub halted_at: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Simulator {
    config: StrategyConfig,
    policy: SimPolicy,
    initial_capital: f64,
    equity: f64,
    peak_equity: f64,
    trades: Vec<Trade>,
    /// Indices into `trades` for positions not yet closed, in entry order.
    open: Vec<usize>,
    equity_curve: Vec<f64>,
    halted_at: Option<usize>,
}

impl Simulator {
    pub fn new(config: &StrategyConfig, policy: SimPolicy, initial_capital: f64) -> Self {
        Simulator {
            config: config.clone(),
            policy,
            initial_capital,
            equity: initial_capital,
            peak_equity: initial_capital,
            trades: Vec::new(),
            open: Vec::new(),
            equity_curve: Vec::new(),
            halted_at: None,
        }
    }

    /// Process one bar. Steps on an already-halted simulator are inert.
    pub fn step(&mut self, index: usize, annotated: &AnnotatedBar) -> BarOutcome {
        if self.halted_at.is_some() {
            return BarOutcome { halted: true, opened: false, closed: 0 };
        }

        if self.peak_equity > 0.0 {
            let drawdown = (self.equity - self.peak_equity) / self.peak_equity;
            if drawdown < self.config.max_drawdown {
                self.halted_at = Some(index);
                return BarOutcome { halted: true, opened: false, closed: 0 };
            }
        }

        if self.equity > self.peak_equity {
            self.peak_equity = self.equity;
        }

        let (opened, closed) = match self.policy.ordering {
            BarOrdering::EntriesThenExits => {
                let opened = self.try_enter(index, annotated);
                (opened, self.run_exits(index, annotated))
            }
            BarOrdering::ExitsThenEntries => {
                let closed = self.run_exits(index, annotated);
                (self.try_enter(index, annotated), closed)
            }
        };

        self.equity_curve.push(self.equity);
        BarOutcome { halted: false, opened, closed }
    }

    /// Open a trade if the bar signals one and capacity allows.
    ///
    /// Entries whose price, stop, or target would be non-finite are
    /// skipped outright rather than carried as unfillable brackets.
    fn try_enter(&mut self, index: usize, annotated: &AnnotatedBar) -> bool {
        if self.open.len() >= self.config.max_trades {
            return false;
        }
        let Some(direction) = annotated.signal() else {
            return false;
        };
        let entry = annotated.bar.close;
        let (stop, target) =
            bracket_prices(direction, entry, annotated.atr, &self.config, self.policy.bracket);
        if !entry.is_finite() || !stop.is_finite() || !target.is_finite() {
            return false;
        }
        let size = risk_size(self.equity, self.config.risk_per_trade, entry, stop);
        self.open.push(self.trades.len());
        self.trades.push(Trade {
            direction,
            entry_bar: index,
            entry_time: annotated.bar.timestamp,
            entry_price: entry,
            stop_price: stop,
            target_price: target,
            size,
            exit: None,
        });
        true
    }

    /// Check every open trade against the bar, oldest first.
    fn run_exits(&mut self, index: usize, annotated: &AnnotatedBar) -> usize {
        let mut closed = 0;
        let mut still_open = Vec::with_capacity(self.open.len());
        for &trade_idx in &self.open {
            let trade = &mut self.trades[trade_idx];
            match check_exit(trade, &annotated.bar, self.policy.fill_policy) {
                Some((price, reason)) => {
                    let profit = match trade.direction {
                        Direction::Long => (price - trade.entry_price) * trade.size,
                        Direction::Short => (trade.entry_price - price) * trade.size,
                    };
                    trade.close(TradeExit {
                        bar_index: index,
                        timestamp: annotated.bar.timestamp,
                        price,
                        reason,
                        profit,
                    });
                    self.equity += profit;
                    closed += 1;
                }
                None => still_open.push(trade_idx),
            }
        }
        self.open = still_open;
        closed
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn peak_equity(&self) -> f64 {
        self.peak_equity
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn halted_at(&self) -> Option<usize> {
        self.halted_at
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn into_report(self) -> SimReport {
        let summary = Summary::compute(&self.trades, self.initial_capital, self.equity);
        SimReport {
            trades: self.trades,
            summary,
            equity_curve: self.equity_curve,
            halted_at: self.halted_at,
        }
    }
}

/// Fold a whole annotated series into a report.
pub fn run(
    annotated: &[AnnotatedBar],
    config: &StrategyConfig,
    policy: SimPolicy,
    initial_capital: f64,
) -> SimReport {
    let mut sim = Simulator::new(config, policy, initial_capital);
    for (index, bar) in annotated.iter().enumerate() {
        if sim.step(index, bar).halted {
            break;
        }
    }
    sim.into_report()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BracketMode, FillPolicy};
    use crate::domain::{Bar, ExitReason};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    const CAPITAL: f64 = 10_000.0;

    fn ts(index: usize) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap() + Duration::minutes(index as i64)
    }

    fn abar(index: usize, open: f64, high: f64, low: f64, close: f64) -> AnnotatedBar {
        AnnotatedBar {
            bar: Bar { timestamp: ts(index), open, high, low, close, volume: 1000.0 },
            price_move: 0.0,
            atr: 2.0,
            momentum: f64::NAN,
            trend_ma: f64::NAN,
            range_ratio: f64::NAN,
            uptrend: false,
            downtrend: false,
            raw_buy: false,
            raw_sell: false,
            buy: false,
            sell: false,
        }
    }

    fn buy(mut annotated: AnnotatedBar) -> AnnotatedBar {
        annotated.raw_buy = true;
        annotated.buy = true;
        annotated
    }

    fn sell(mut annotated: AnnotatedBar) -> AnnotatedBar {
        annotated.raw_sell = true;
        annotated.sell = true;
        annotated
    }

    fn with_atr(mut annotated: AnnotatedBar, atr: f64) -> AnnotatedBar {
        annotated.atr = atr;
        annotated
    }

    fn quiet(index: usize) -> AnnotatedBar {
        abar(index, 100.0, 100.5, 99.5, 100.0)
    }

    // ── round trips ──

    #[test]
    fn long_round_trip_take_profit() {
        // ATR 2 with default multipliers: stop 97, target 104.
        // Size is 1% of 10_000 over a 3-point stop = 100/3 units.
        let series = vec![buy(abar(0, 100.0, 101.0, 99.0, 100.0)), abar(1, 100.0, 105.0, 99.0, 104.0)];
        let config = StrategyConfig::default();
        let mut sim = Simulator::new(&config, SimPolicy::default(), CAPITAL);

        let first = sim.step(0, &series[0]);
        assert!(first.opened);
        assert_eq!(first.closed, 0);
        assert_eq!(sim.open_count(), 1);

        let second = sim.step(1, &series[1]);
        assert_eq!(second.closed, 1);
        assert_eq!(sim.open_count(), 0);

        let expected_profit = 4.0 * (100.0 / 3.0);
        assert!((sim.equity() - (CAPITAL + expected_profit)).abs() < 1e-9);

        let trade = &sim.trades()[0];
        assert!((trade.size - 100.0 / 3.0).abs() < 1e-12);
        let exit = trade.exit.as_ref().unwrap();
        assert_eq!(exit.reason, ExitReason::TakeProfit);
        assert_eq!(exit.price, 104.0);
        assert_eq!(exit.bar_index, 1);

        let report = sim.into_report();
        assert_eq!(report.equity_curve.len(), 2);
        assert!((report.equity_curve[1] - (CAPITAL + expected_profit)).abs() < 1e-9);
        assert_eq!(report.halted_at, None);
    }

    #[test]
    fn short_entry_places_mirrored_brackets() {
        let series = vec![sell(abar(0, 100.0, 101.0, 99.0, 100.0))];
        let config = StrategyConfig::default();
        let mut sim = Simulator::new(&config, SimPolicy::default(), CAPITAL);
        sim.step(0, &series[0]);

        let trade = &sim.trades()[0];
        assert_eq!(trade.direction, Direction::Short);
        assert!((trade.stop_price - 103.0).abs() < 1e-12);
        assert!((trade.target_price - 96.0).abs() < 1e-12);
    }

    // ── intra-bar ordering ──

    #[test]
    fn entry_bar_can_fill_under_entries_then_exits() {
        let series = vec![buy(abar(0, 100.0, 105.0, 99.0, 100.0))];
        let config = StrategyConfig::default();

        let mut sim = Simulator::new(&config, SimPolicy::default(), CAPITAL);
        let outcome = sim.step(0, &series[0]);
        assert!(outcome.opened);
        assert_eq!(outcome.closed, 1);
        assert_eq!(sim.open_count(), 0);

        let deferred = SimPolicy { ordering: BarOrdering::ExitsThenEntries, ..SimPolicy::default() };
        let mut sim = Simulator::new(&config, deferred, CAPITAL);
        let outcome = sim.step(0, &series[0]);
        assert!(outcome.opened);
        assert_eq!(outcome.closed, 0);
        assert_eq!(sim.open_count(), 1);
    }

    // ── capacity ──

    #[test]
    fn capacity_blocks_further_entries() {
        let config = StrategyConfig::default();
        let mut sim = Simulator::new(&config, SimPolicy::default(), CAPITAL);
        for index in 0..4 {
            let outcome = sim.step(index, &buy(quiet(index)));
            assert_eq!(outcome.opened, index < config.max_trades);
        }
        assert_eq!(sim.trades().len(), 3);
        assert_eq!(sim.open_count(), 3);
    }

    // ── drawdown halt ──

    #[test]
    fn drawdown_halts_at_bar_start() {
        let mut config = StrategyConfig::default();
        config.max_drawdown = -0.005;
        let mut sim = Simulator::new(&config, SimPolicy::default(), CAPITAL);

        // Lose exactly 1% of capital: stop at 97 on a 100/3 position.
        sim.step(0, &buy(abar(0, 100.0, 101.0, 99.0, 100.0)));
        let loss_bar = sim.step(1, &abar(1, 100.0, 100.5, 96.0, 97.0));
        assert_eq!(loss_bar.closed, 1);
        assert!((sim.equity() - 9_900.0).abs() < 1e-9);

        let halted = sim.step(2, &quiet(2));
        assert!(halted.halted);
        assert_eq!(sim.halted_at(), Some(2));

        // Further steps stay inert and do not extend the curve.
        let inert = sim.step(3, &buy(quiet(3)));
        assert!(inert.halted);
        assert!(!inert.opened);
        assert_eq!(sim.halted_at(), Some(2));

        let report = sim.into_report();
        assert_eq!(report.equity_curve.len(), 2);
        assert_eq!(report.equity_curve[0], 10_000.0);
        assert!((report.equity_curve[1] - 9_900.0).abs() < 1e-9);
        assert_eq!(report.halted_at, Some(2));
    }

    #[test]
    fn halt_leaves_unclosed_trades_open() {
        let mut config = StrategyConfig::default();
        config.max_drawdown = -0.005;
        let mut sim = Simulator::new(&config, SimPolicy::default(), CAPITAL);

        // Trade A: brackets far away (ATR 50), never touched.
        sim.step(0, &buy(with_atr(abar(0, 100.0, 100.5, 99.5, 100.0), 50.0)));
        // Trade B: normal brackets, stopped out on the next bar for -1%.
        sim.step(1, &buy(abar(1, 100.0, 100.5, 99.5, 100.0)));
        sim.step(2, &abar(2, 100.0, 100.5, 96.0, 97.0));
        assert!((sim.equity() - 9_900.0).abs() < 1e-6);

        sim.step(3, &quiet(3));
        assert_eq!(sim.halted_at(), Some(3));

        let report = sim.into_report();
        assert_eq!(report.summary.closed_trades, 1);
        assert_eq!(report.summary.open_trades, 1);
        assert!(report.trades[0].is_open());
    }

    // ── degenerate entries ──

    #[test]
    fn zero_atr_opens_zero_size_trade() {
        // Stop distance collapses to zero, so the position sizes to zero
        // and the entry bar itself straddles both (equal) brackets.
        let config = StrategyConfig::default();
        let mut sim = Simulator::new(&config, SimPolicy::default(), CAPITAL);
        let outcome = sim.step(0, &buy(with_atr(abar(0, 100.0, 101.0, 99.0, 100.0), 0.0)));
        assert!(outcome.opened);
        assert_eq!(outcome.closed, 1);

        let trade = &sim.trades()[0];
        assert_eq!(trade.size, 0.0);
        assert_eq!(trade.profit(), Some(0.0));
        assert_eq!(sim.equity(), CAPITAL);
    }

    #[test]
    fn non_finite_bracket_skips_entry() {
        let config = StrategyConfig::default();
        let mut sim = Simulator::new(&config, SimPolicy::default(), CAPITAL);
        let outcome = sim.step(0, &buy(with_atr(abar(0, 100.0, 101.0, 99.0, 100.0), f64::NAN)));
        assert!(!outcome.opened);
        assert!(sim.trades().is_empty());

        // Fixed-fraction brackets ignore the ATR, so the same bar enters.
        let fraction = SimPolicy { bracket: BracketMode::FixedFraction, ..SimPolicy::default() };
        let mut sim = Simulator::new(&config, fraction, CAPITAL);
        let outcome = sim.step(0, &buy(with_atr(abar(0, 100.0, 101.0, 99.0, 100.0), f64::NAN)));
        assert!(outcome.opened);
    }

    // ── peak tracking ──

    #[test]
    fn peak_updates_on_the_bar_after_a_gain() {
        let config = StrategyConfig::default();
        let mut sim = Simulator::new(&config, SimPolicy::default(), CAPITAL);

        sim.step(0, &buy(abar(0, 100.0, 101.0, 99.0, 100.0)));
        sim.step(1, &abar(1, 100.0, 105.0, 99.0, 104.0));
        let gained = sim.equity();
        assert!(gained > CAPITAL);
        // The win lands mid-bar, after this bar's peak update.
        assert_eq!(sim.peak_equity(), CAPITAL);

        sim.step(2, &quiet(2));
        assert_eq!(sim.peak_equity(), gained);

        // A later loss never lowers the peak.
        sim.step(3, &buy(quiet(3)));
        sim.step(4, &abar(4, 100.0, 100.5, 96.0, 97.0));
        sim.step(5, &quiet(5));
        assert!(sim.equity() < gained);
        assert_eq!(sim.peak_equity(), gained);
    }

    // ── fill policy ──

    #[test]
    fn straddling_bar_follows_fill_policy() {
        let config = StrategyConfig::default();
        let series = vec![buy(abar(0, 100.0, 100.5, 99.5, 100.0)), abar(1, 100.0, 105.0, 96.0, 100.0)];

        let mut sim = Simulator::new(&config, SimPolicy::default(), CAPITAL);
        sim.step(0, &series[0]);
        sim.step(1, &series[1]);
        let exit = sim.trades()[0].exit.as_ref().unwrap();
        assert_eq!(exit.reason, ExitReason::TakeProfit);

        let pessimistic = SimPolicy { fill_policy: FillPolicy::StopLossFirst, ..SimPolicy::default() };
        let mut sim = Simulator::new(&config, pessimistic, CAPITAL);
        sim.step(0, &series[0]);
        sim.step(1, &series[1]);
        let exit = sim.trades()[0].exit.as_ref().unwrap();
        assert_eq!(exit.reason, ExitReason::StopLoss);
    }

    // ── whole-series runs ──

    #[test]
    fn quiet_series_produces_flat_curve() {
        let series: Vec<AnnotatedBar> = (0..3).map(quiet).collect();
        let report = run(&series, &StrategyConfig::default(), SimPolicy::default(), CAPITAL);
        assert_eq!(report.equity_curve, vec![CAPITAL; 3]);
        assert!(report.trades.is_empty());
        assert_eq!(report.summary.closed_trades, 0);
        assert_eq!(report.summary.win_rate, None);
        assert_eq!(report.summary.total_return, Some(0.0));
        assert_eq!(report.halted_at, None);
    }

    #[test]
    fn report_serializes_round_trip() {
        let series = vec![buy(abar(0, 100.0, 101.0, 99.0, 100.0)), abar(1, 100.0, 105.0, 99.0, 104.0)];
        let report = run(&series, &StrategyConfig::default(), SimPolicy::default(), CAPITAL);
        let json = serde_json::to_string(&report).unwrap();
        let back: SimReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.trades, report.trades);
        assert_eq!(back.equity_curve, report.equity_curve);
        assert_eq!(back.halted_at, report.halted_at);
    }
}
