//! Point-in-time price helpers evaluated on the latest bar.

/// True iff at least n+1 observations exist and the latest close is at least
/// the highest high of the preceding n bars (today excluded) scaled by
/// `1 + min_break_pct/100`.
pub fn n_day_breakout(high: &[f64], close: &[f64], n: usize, min_break_pct: f64) -> bool {
    let len = close.len();
    if n == 0 || len < n + 1 || high.len() < len {
        return false;
    }
    let prev_high = high[len - 1 - n..len - 1]
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    close[len - 1] >= prev_high * (1.0 + min_break_pct / 100.0)
}

/// (open - prev_close) / prev_close * 100, or 0 when prev_close is 0 or undefined.
pub fn gap_percent(open: f64, prev_close: f64) -> f64 {
    if prev_close == 0.0 || !prev_close.is_finite() {
        return 0.0;
    }
    (open - prev_close) / prev_close * 100.0
}

/// (a - b) / b * 100, NaN where b is 0.
pub fn percent_distance(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| if y == 0.0 { f64::NAN } else { (x - y) / y * 100.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn breakout_above_prior_highs() {
        let high = [10.0, 11.0, 12.0, 12.5];
        let close = [9.5, 10.5, 11.5, 12.2];
        assert!(n_day_breakout(&high, &close, 3, 0.0));
    }

    #[test]
    fn breakout_excludes_today_high() {
        // today's own high (20) must not count against it
        let high = [10.0, 10.0, 20.0];
        let close = [9.0, 9.0, 10.0];
        assert!(n_day_breakout(&high, &close, 2, 0.0));
    }

    #[test]
    fn breakout_requires_min_pct() {
        let high = [10.0, 10.0, 10.4];
        let close = [9.0, 9.0, 10.4];
        assert!(n_day_breakout(&high, &close, 2, 3.0));
        assert!(!n_day_breakout(&high, &close, 2, 5.0));
    }

    #[test]
    fn breakout_needs_n_plus_one_bars() {
        let high = [10.0, 11.0];
        let close = [10.0, 12.0];
        assert!(!n_day_breakout(&high, &close, 2, 0.0));
        assert!(n_day_breakout(&high, &close, 1, 0.0));
    }

    #[test]
    fn gap_percent_basic() {
        assert_relative_eq!(gap_percent(10.5, 10.0), 5.0);
        assert_relative_eq!(gap_percent(9.0, 10.0), -10.0);
    }

    #[test]
    fn gap_percent_zero_or_undefined_prev_close() {
        assert_eq!(gap_percent(10.0, 0.0), 0.0);
        assert_eq!(gap_percent(10.0, f64::NAN), 0.0);
    }

    #[test]
    fn percent_distance_handles_zero() {
        let out = percent_distance(&[11.0, 5.0], &[10.0, 0.0]);
        assert_relative_eq!(out[0], 10.0);
        assert!(out[1].is_nan());
    }
}
