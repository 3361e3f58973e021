//! Technical indicator library.
//!
//! Every function is stateless and works on a date-aligned `&[f64]`. Series
//! outputs have the same length as the input, with `f64::NAN` wherever there
//! is not enough history yet:
//! - `ema`, `ewm`: exponential smoothing seeded by the first observation
//! - `sma`: simple rolling mean
//! - `rsi`: Wilder RSI
//! - `macd`: DIF / DEA / histogram
//! - `true_range`, `atr`: Wilder ATR
//! - `rolling_max`, `rolling_min`: windowed extremes
//! - `n_day_breakout`, `gap_percent`, `percent_distance`: point-in-time helpers

pub mod ema;
pub mod sma;
pub mod rsi;
pub mod macd;
pub mod atr;
pub mod rolling;
pub mod breakout;

pub use atr::{atr, true_range};
pub use breakout::{gap_percent, n_day_breakout, percent_distance};
pub use ema::{ema, ewm};
pub use macd::{macd, MacdSeries};
pub use rolling::{rolling_max, rolling_min};
pub use rsi::rsi;
pub use sma::sma;

/// The final value of a series, if it exists and is finite.
pub fn last_valid(series: &[f64]) -> Option<f64> {
    series.last().copied().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_valid_finite() {
        assert_eq!(last_valid(&[1.0, 2.0, 3.0]), Some(3.0));
    }

    #[test]
    fn last_valid_nan_tail() {
        assert_eq!(last_valid(&[1.0, f64::NAN]), None);
    }

    #[test]
    fn last_valid_empty() {
        assert_eq!(last_valid(&[]), None);
    }
}
