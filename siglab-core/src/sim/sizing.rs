//! Position sizing — fixed fractional risk against the stop distance.
//!
//! risk_amount = equity * risk_fraction
//! size = risk_amount / |entry - stop|
//!
//! Degenerate inputs (zero-width stop, non-finite distance, non-positive
//! equity) size to 0.0. A zero-size trade is a valid ledger entry; a
//! division error is not.

/// Units to hold for one trade.
pub fn risk_size(equity: f64, risk_fraction: f64, entry: f64, stop: f64) -> f64 {
    if equity <= 0.0 {
        return 0.0;
    }
    let distance = (entry - stop).abs();
    if !distance.is_finite() || distance == 0.0 {
        return 0.0;
    }
    equity * risk_fraction / distance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textbook_size() {
        // 1% of 10_000 risked over a 5-point stop: 100 / 5 = 20 units.
        let size = risk_size(10_000.0, 0.01, 100.0, 95.0);
        assert!((size - 20.0).abs() < 1e-12);
    }

    #[test]
    fn short_side_uses_absolute_distance() {
        let size = risk_size(10_000.0, 0.01, 100.0, 105.0);
        assert!((size - 20.0).abs() < 1e-12);
    }

    #[test]
    fn zero_distance_sizes_zero() {
        assert_eq!(risk_size(10_000.0, 0.01, 100.0, 100.0), 0.0);
    }

    #[test]
    fn non_finite_distance_sizes_zero() {
        assert_eq!(risk_size(10_000.0, 0.01, 100.0, f64::NAN), 0.0);
        assert_eq!(risk_size(10_000.0, 0.01, f64::INFINITY, 95.0), 0.0);
    }

    #[test]
    fn non_positive_equity_sizes_zero() {
        assert_eq!(risk_size(0.0, 0.01, 100.0, 95.0), 0.0);
        assert_eq!(risk_size(-500.0, 0.01, 100.0, 95.0), 0.0);
    }

    #[test]
    fn size_scales_linearly_with_equity() {
        let small = risk_size(10_000.0, 0.01, 100.0, 95.0);
        let large = risk_size(20_000.0, 0.01, 100.0, 95.0);
        assert!((large - 2.0 * small).abs() < 1e-12);
    }
}
