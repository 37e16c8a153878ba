//! Relative Strength Index (RSI).
//!
//! Wilder smoothing of average gains and losses over close-to-close changes.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss), hard-bounded [0, 100].
//! Defined from the first bar on: the first finite close reads 50 (no
//! movement observed yet), and the gain/loss averages seed with expanding
//! means until a full period has accumulated.
//! Edge cases: both averages zero → 50; avg_loss == 0 → 100; avg_gain == 0 → 0.

/// RSI over close prices.
///
/// A non-finite close yields NaN for that bar; the averages resume from the
/// last finite state, pairing the next finite close against the last one seen.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "RSI period must be >= 1");
    let alpha = 1.0 / period as f64;
    let mut out = vec![f64::NAN; closes.len()];

    let mut prev_close: Option<f64> = None;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    let mut seen = 0usize;

    for (i, &close) in closes.iter().enumerate() {
        if !close.is_finite() {
            continue;
        }
        match prev_close {
            None => out[i] = 50.0,
            Some(pc) => {
                let change = close - pc;
                let gain = change.max(0.0);
                let loss = (-change).max(0.0);
                seen += 1;
                if seen <= period {
                    avg_gain += (gain - avg_gain) / seen as f64;
                    avg_loss += (loss - avg_loss) / seen as f64;
                } else {
                    avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
                    avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
                }
                out[i] = compute_rsi(avg_gain, avg_loss);
            }
        }
        prev_close = Some(close);
    }

    out
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
