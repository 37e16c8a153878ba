//! ATR + momentum + trend-MA signal engine.
//!
//! Entry is a three-way conjunction, evaluated per bar:
//! 1. volatility gate — the close-to-close move exceeds
//!    `entry_threshold * ATR` in magnitude;
//! 2. momentum confirmation — the oscillator sits in the extreme zone on
//!    the move's side (above `overbought` for buys, below `oversold` for
//!    sells, strict comparisons);
//! 3. trend agreement — close above the trend MA for buys, below for sells,
//!    with exact equality counting as neither.

use crate::config::StrategyConfig;
use crate::domain::{AnnotatedBar, Bar};
use crate::indicators::{atr, rolling_mean, rsi, Smoothing};
use crate::signal::{finalize_signals, price_moves, SignalEngine};

/// The ATR/momentum engine. The true-range smoothing is the only knob that
/// is not part of the shared numeric config.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtrMomentum {
    smoothing: Smoothing,
}

impl AtrMomentum {
    pub fn new(smoothing: Smoothing) -> Self {
        Self { smoothing }
    }
}

impl SignalEngine for AtrMomentum {
    fn name(&self) -> &str {
        "atr_momentum"
    }

    fn annotate(&self, bars: &[Bar], config: &StrategyConfig) -> Vec<AnnotatedBar> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let moves = price_moves(bars);
        let atr_series = atr(bars, config.atr_period, self.smoothing);
        let momentum = rsi(&closes, config.momentum_period);
        let trend_ma = rolling_mean(&closes, config.trend_period);

        let mut annotated: Vec<AnnotatedBar> = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                // NaN on either side of any comparison reads false, so bars
                // with non-finite inputs fail the gates instead of aborting.
                let uptrend = bar.close > trend_ma[i];
                let downtrend = bar.close < trend_ma[i];
                let gate = moves[i].abs() > config.entry_threshold * atr_series[i];
                let raw_buy =
                    gate && moves[i] > 0.0 && momentum[i] > config.overbought && uptrend;
                let raw_sell =
                    gate && moves[i] < 0.0 && momentum[i] < config.oversold && downtrend;

                AnnotatedBar {
                    bar: bar.clone(),
                    price_move: moves[i],
                    atr: atr_series[i],
                    momentum: momentum[i],
                    trend_ma: trend_ma[i],
                    range_ratio: f64::NAN,
                    uptrend,
                    downtrend,
                    raw_buy,
                    raw_sell,
                    buy: false,
                    sell: false,
                }
            })
            .collect();

        finalize_signals(&mut annotated);
        annotated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn test_config() -> StrategyConfig {
        StrategyConfig {
            atr_period: 5,
            momentum_period: 5,
            trend_period: 5,
            entry_threshold: 1.5,
            overbought: 70.0,
            oversold: 30.0,
            ..Default::default()
        }
    }

    fn flat_then_jump(flat_bars: usize, jump_to: f64) -> Vec<f64> {
        let mut closes = vec![100.0; flat_bars];
        closes.push(jump_to);
        closes
    }

    #[test]
    fn output_matches_input_length() {
        let engine = AtrMomentum::default();
        let config = test_config();
        for n in [0usize, 1, 2, 7, 40] {
            let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
            let out = engine.annotate(&make_bars(&closes), &config);
            assert_eq!(out.len(), n);
        }
    }

    #[test]
    fn short_input_still_annotates() {
        let engine = AtrMomentum::default();
        let out = engine.annotate(&make_bars(&[100.0, 101.0]), &test_config());
        // Windows larger than the series still yield defined values.
        assert!(!out[0].atr.is_nan());
        assert!(!out[1].atr.is_nan());
        assert!(!out[1].trend_ma.is_nan());
    }

    #[test]
    fn flat_market_never_signals() {
        let engine = AtrMomentum::default();
        let out = engine.annotate(&make_bars(&[100.0; 30]), &test_config());
        for ab in &out {
            // Close equals the MA exactly: neither trend flag, no signals.
            assert!(!ab.uptrend);
            assert!(!ab.downtrend);
            assert!(!ab.raw_buy && !ab.raw_sell);
            assert!(!ab.buy && !ab.sell);
        }
    }

    #[test]
    fn upward_burst_fires_buy_once() {
        // A violent up-bar out of a quiet base: big move vs ATR, oscillator
        // pinned high, close above the MA.
        let engine = AtrMomentum::default();
        let closes = flat_then_jump(8, 112.0);
        let out = engine.annotate(&make_bars(&closes), &test_config());

        let jump = out.last().unwrap();
        assert!(jump.raw_buy, "gate should pass: move={} atr={}", jump.price_move, jump.atr);
        assert!(jump.buy);
        assert!(!jump.sell);
        assert!(out[..out.len() - 1].iter().all(|ab| !ab.buy && !ab.sell));
    }

    #[test]
    fn downward_burst_fires_sell() {
        let engine = AtrMomentum::default();
        let closes = flat_then_jump(8, 88.0);
        let out = engine.annotate(&make_bars(&closes), &test_config());

        let jump = out.last().unwrap();
        assert!(jump.downtrend);
        assert!(jump.sell);
        assert!(!jump.buy);
    }

    #[test]
    fn held_condition_fires_only_at_the_edge() {
        // Two qualifying up-bars in a row: the second is the same streak.
        let engine = AtrMomentum::default();
        let mut closes = vec![100.0; 8];
        closes.push(112.0);
        closes.push(124.0);
        let out = engine.annotate(&make_bars(&closes), &test_config());

        let n = out.len();
        assert!(out[n - 2].raw_buy);
        assert!(out[n - 1].raw_buy, "second bar should still qualify raw");
        assert!(out[n - 2].buy);
        assert!(!out[n - 1].buy, "streak must not fire twice");
    }

    #[test]
    fn momentum_boundary_is_strict() {
        // With overbought at 100 even a pure up-move (oscillator exactly
        // 100) cannot confirm: the comparison is strict.
        let engine = AtrMomentum::default();
        let config = StrategyConfig {
            overbought: 100.0,
            oversold: 0.0,
            ..test_config()
        };
        let closes = flat_then_jump(8, 112.0);
        let out = engine.annotate(&make_bars(&closes), &config);
        assert!((out.last().unwrap().momentum - 100.0).abs() < 1e-9);
        assert!(!out.last().unwrap().buy);
    }

    #[test]
    fn nan_close_produces_no_signal_and_no_abort() {
        let engine = AtrMomentum::default();
        let mut closes = flat_then_jump(8, 112.0);
        closes[7] = f64::NAN; // poison the bar before the jump
        let mut bars = make_bars(&closes);
        bars[7].close = f64::NAN;
        let out = engine.annotate(&bars, &test_config());

        assert_eq!(out.len(), bars.len());
        // The poisoned bar and the jump bar (whose move needs the poisoned
        // close) stay silent.
        assert!(!out[7].raw_buy && !out[7].raw_sell);
        assert!(!out[8].raw_buy && !out[8].raw_sell);
    }

    #[test]
    fn range_ratio_is_not_applicable_here() {
        let engine = AtrMomentum::default();
        let out = engine.annotate(&make_bars(&[100.0, 101.0]), &test_config());
        assert!(out.iter().all(|ab| ab.range_ratio.is_nan()));
    }
}
