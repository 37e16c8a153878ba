//! Range-volatility + dual-MA signal engine.
//!
//! Entry gate compares the rolling extreme range (window high minus window
//! low, relative to the window low) against the bar's own volatility (ATR
//! relative to close, scaled by the entry threshold). Direction comes from
//! a fast/slow MA pair plus the sign of the bar's close-to-close move. The
//! momentum oscillator plays no part here; its annotated field stays NaN.

use crate::config::StrategyConfig;
use crate::domain::{AnnotatedBar, Bar};
use crate::indicators::{atr, rolling_max, rolling_mean, rolling_min, Smoothing};
use crate::signal::{finalize_signals, price_moves, SignalEngine};

/// The range-breakout engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeBreakout {
    smoothing: Smoothing,
}

impl RangeBreakout {
    pub fn new(smoothing: Smoothing) -> Self {
        Self { smoothing }
    }
}

impl SignalEngine for RangeBreakout {
    fn name(&self) -> &str {
        "range_breakout"
    }

    fn annotate(&self, bars: &[Bar], config: &StrategyConfig) -> Vec<AnnotatedBar> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

        let moves = price_moves(bars);
        let range_max = rolling_max(&highs, config.range_period);
        let range_min = rolling_min(&lows, config.range_period);
        let atr_series = atr(bars, config.atr_period, self.smoothing);
        let fast_ma = rolling_mean(&closes, config.fast_period);
        let slow_ma = rolling_mean(&closes, config.slow_period);

        let mut annotated: Vec<AnnotatedBar> = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                let range_ratio = if range_min[i] > 0.0 {
                    (range_max[i] - range_min[i]) / range_min[i]
                } else {
                    f64::NAN
                };
                let rel_vol = if bar.close > 0.0 {
                    atr_series[i] / bar.close
                } else {
                    f64::NAN
                };

                let uptrend = fast_ma[i] > slow_ma[i];
                let downtrend = fast_ma[i] < slow_ma[i];
                let gate = range_ratio > config.entry_threshold * rel_vol;
                let raw_buy = gate && uptrend && moves[i] > 0.0;
                let raw_sell = gate && downtrend && moves[i] < 0.0;

                AnnotatedBar {
                    bar: bar.clone(),
                    price_move: moves[i],
                    atr: atr_series[i],
                    momentum: f64::NAN,
                    trend_ma: slow_ma[i],
                    range_ratio,
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
