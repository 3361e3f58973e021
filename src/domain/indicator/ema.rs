//! Exponential moving average.
//!
//! Plain exponential smoothing without initial-bias correction:
//! EMA[0] = x[0], EMA[i] = alpha * x[i] + (1 - alpha) * EMA[i-1].
//! `ema` uses alpha = 2/(span+1); Wilder-style callers pass alpha = 1/period to `ewm`.

/// Exponentially weighted mean with smoothing factor `alpha`.
///
/// Leading non-finite values stay NaN; a non-finite value after the seed
/// carries the previous mean forward.
pub fn ewm(series: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(series.len());
    let mut prev: Option<f64> = None;

    for &x in series {
        let next = match (prev, x.is_finite()) {
            (None, true) => Some(x),
            (None, false) => None,
            (Some(p), true) => Some(alpha * x + (1.0 - alpha) * p),
            (Some(p), false) => Some(p),
        };
        out.push(next.unwrap_or(f64::NAN));
        prev = next;
    }

    out
}

pub fn ema(series: &[f64], span: usize) -> Vec<f64> {
    if span == 0 {
        return vec![f64::NAN; series.len()];
    }
    ewm(series, 2.0 / (span as f64 + 1.0))
}
