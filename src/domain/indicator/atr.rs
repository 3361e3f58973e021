//! True range and Average True Range.
//!
//! TR[0] = high - low, TR[i] = max(high - low, |high - prev_close|, |low - prev_close|).
//! ATR is Wilder smoothing of TR: ewm with alpha = 1/period, seeded by TR[0].

use super::ema::ewm;

pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len());
    (0..n)
        .map(|i| {
            let hl = high[i] - low[i];
            if i == 0 {
                hl
            } else {
                let prev_close = close[i - 1];
                hl.max((high[i] - prev_close).abs())
                    .max((low[i] - prev_close).abs())
            }
        })
        .collect()
}

pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let tr = true_range(high, low, close);
    if period == 0 {
        return vec![f64::NAN; tr.len()];
    }
    ewm(&tr, 1.0 / period as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn true_range_first_bar_is_high_low() {
        let tr = true_range(&[110.0], &[100.0], &[105.0]);
        assert_eq!(tr, vec![10.0]);
    }

    #[test]
    fn true_range_handles_gaps() {
        // prev close 105, bar 130/120 → |130-105| = 25
        let tr = true_range(&[110.0, 130.0], &[100.0, 120.0], &[105.0, 125.0]);
        assert_relative_eq!(tr[1], 25.0);
    }

    #[test]
    fn atr_wilder_smoothing() {
        let high = [110.0, 115.0, 120.0];
        let low = [100.0, 105.0, 110.0];
        let close = [105.0, 110.0, 115.0];
        let out = atr(&high, &low, &close, 3);
        // TR = [10, 10, 10], constant → ATR constant
        for v in &out {
            assert_relative_eq!(*v, 10.0);
        }
    }

    #[test]
    fn atr_reacts_to_wide_bar() {
        let high = [110.0, 140.0];
        let low = [100.0, 100.0];
        let close = [105.0, 120.0];
        let out = atr(&high, &low, &close, 2);
        // TR = [10, 40], alpha 0.5 → 25
        assert_relative_eq!(out[1], 25.0);
    }

    #[test]
    fn atr_zero_period() {
        let out = atr(&[1.0], &[0.5], &[0.8], 0);
        assert!(out[0].is_nan());
    }
}
