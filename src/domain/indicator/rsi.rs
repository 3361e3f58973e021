//! RSI (Relative Strength Index), Wilder style.
//!
//! gain/loss are the positive/negative parts of the close-to-close change
//! (0 on the first bar). Both are smoothed with `ewm(alpha = 1/period)`.
//!
//! rs = avg_gain / (avg_loss + 1e-12), RSI = 100 - 100 / (1 + rs)
//!
//! The first bar has no change and is NaN.

use super::ema::ewm;

const EPSILON: f64 = 1e-12;

pub fn rsi(series: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || series.is_empty() {
        return vec![f64::NAN; series.len()];
    }

    let mut gains = Vec::with_capacity(series.len());
    let mut losses = Vec::with_capacity(series.len());
    gains.push(0.0);
    losses.push(0.0);
    for w in series.windows(2) {
        let change = w[1] - w[0];
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    let alpha = 1.0 / period as f64;
    let avg_gain = ewm(&gains, alpha);
    let avg_loss = ewm(&losses, alpha);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .enumerate()
        .map(|(i, (&g, &l))| {
            if i == 0 {
                f64::NAN
            } else {
                let rs = g / (l + EPSILON);
                100.0 - 100.0 / (1.0 + rs)
            }
        })
        .collect()
}
