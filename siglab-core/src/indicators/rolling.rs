//! Rolling-window primitives.
//!
//! Every statistic here uses a minimum period of one: before a full window
//! has accumulated, the value is computed over however much history exists.
//! Early values are reduced-confidence output, not NaN gaps. NaN appears
//! only where an input inside the window is itself non-finite.

use crate::domain::Bar;

/// Rolling mean over the trailing `period` values.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |window| {
        window.iter().sum::<f64>() / window.len() as f64
    })
}

/// Rolling maximum over the trailing `period` values.
pub fn rolling_max(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |window| {
        window.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    })
}

/// Rolling minimum over the trailing `period` values.
pub fn rolling_min(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |window| {
        window.iter().copied().fold(f64::INFINITY, f64::min)
    })
}

fn rolling(values: &[f64], period: usize, stat: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    assert!(period >= 1, "rolling period must be >= 1");
    let mut out = vec![f64::NAN; values.len()];
    for i in 0..values.len() {
        let start = (i + 1).saturating_sub(period);
        let window = &values[start..=i];
        if window.iter().all(|v| v.is_finite()) {
            out[i] = stat(window);
        }
    }
    out
}

/// True Range series.
///
/// TR[0] = high[0] - low[0] (no previous close exists).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];

    if n == 0 {
        return tr;
    }

    let h = bars[0].high;
    let l = bars[0].low;
    if h.is_finite() && l.is_finite() {
        tr[0] = h - l;
    }

    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if h.is_finite() && l.is_finite() && pc.is_finite() {
            tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
        }
    }

    tr
}

/// Wilder smoothing (EMA with alpha = 1/period), defined from the first
/// finite input on.
///
/// Seeds with the expanding mean until `period` finite samples have been
/// absorbed, then recurses. A non-finite input yields NaN for that bar only;
/// the smoothing state resumes from the last finite value at the next finite
/// input, so one bad bar does not poison the rest of the series.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "smoothing period must be >= 1");
    let alpha = 1.0 / period as f64;
    let mut out = vec![f64::NAN; values.len()];
    let mut state: Option<f64> = None;
    let mut seen = 0usize;

    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        seen += 1;
        let next = match state {
            None => v,
            Some(prev) if seen <= period => prev + (v - prev) / seen as f64,
            Some(prev) => alpha * v + (1.0 - alpha) * prev,
        };
        out[i] = next;
        state = Some(next);
    }

    out
}
