//! MACD (Moving Average Convergence Divergence).
//!
//! DIF = EMA(fast) - EMA(slow)
//! DEA = EMA(DIF, signal)
//! Histogram = DIF - DEA
//!
//! Default parameters: fast=12, slow=26, signal=9

use super::ema::ema;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(series: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let ema_fast = ema(series, fast);
    let ema_slow = ema(series, slow);
    let dif: Vec<f64> = ema_fast.iter().zip(&ema_slow).map(|(f, s)| f - s).collect();
    let dea = ema(&dif, signal);
    let histogram = dif.iter().zip(&dea).map(|(d, e)| d - e).collect();

    MacdSeries {
        dif,
        dea,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn macd_flat_series_is_zero() {
        let out = macd(&[50.0; 40], DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);
        assert_eq!(out.dif.len(), 40);
        for i in 0..40 {
            assert_relative_eq!(out.dif[i], 0.0);
            assert_relative_eq!(out.dea[i], 0.0);
            assert_relative_eq!(out.histogram[i], 0.0);
        }
    }

    #[test]
    fn macd_uptrend_positive_dif() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let out = macd(&closes, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);
        assert!(out.dif[59] > 0.0);
        assert!(out.histogram[59] > 0.0);
    }

    #[test]
    fn macd_histogram_is_dif_minus_dea() {
        let closes = [10.0, 11.0, 9.5, 12.0, 12.5, 11.0, 13.0];
        let out = macd(&closes, 2, 4, 3);
        for i in 0..closes.len() {
            assert_relative_eq!(out.histogram[i], out.dif[i] - out.dea[i]);
        }
    }

    #[test]
    fn macd_first_bar_is_zero() {
        // Both EMAs are seeded by the same first close.
        let out = macd(&[10.0, 12.0], 2, 4, 3);
        assert_relative_eq!(out.dif[0], 0.0);
    }
}
