//! Return statistics over a backtest's trade records.
//!
//! The equity curve is serial compounding of fee-adjusted returns in record
//! order, seeded with 1.0. Overlapping holdings are treated as consecutive
//! single-position bets, not a concurrent portfolio. Drawdown ignores the
//! seed: the running peak starts at the first trade's equity.

/// Round half away from zero to `dp` decimals.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    let factor = 10f64.powi(dp as i32);
    (value * factor).round() / factor
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// `[1.0, e1, e2, ...]` where `e_k = e_{k-1} * (1 + r_k / 100)`.
pub fn equity_curve(returns_pct: &[f64]) -> Vec<f64> {
    std::iter::once(1.0)
        .chain(returns_pct.iter().scan(1.0, |equity, r| {
            *equity *= 1.0 + r / 100.0;
            Some(*equity)
        }))
        .collect()
}

/// Worst `(equity / running_max - 1) * 100`, 0 for a never-declining curve.
pub fn max_drawdown_pct(curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &equity in curve {
        peak = peak.max(equity);
        if peak > 0.0 {
            worst = worst.min((equity / peak - 1.0) * 100.0);
        }
    }
    worst
}

/// Aggregate statistics; every field is 0 when there are no trades.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct ReturnStats {
    pub count: usize,
    pub win_rate: f64,
    pub avg_return: f64,
    pub median_return: f64,
    pub avg_return_after_fee: f64,
    pub max_drawdown_pct: f64,
}

impl ReturnStats {
    /// `raw` and `after_fee` are per-record returns in percent, in record order.
    /// `curve` is the seeded curve from [`equity_curve`].
    pub fn compute(raw: &[f64], after_fee: &[f64], curve: &[f64]) -> Self {
        if raw.is_empty() {
            return ReturnStats::default();
        }
        let traded = curve.get(1..).unwrap_or(&[]);
        let wins = after_fee.iter().filter(|r| **r > 0.0).count();
        ReturnStats {
            count: raw.len(),
            win_rate: round_dp(wins as f64 / after_fee.len() as f64 * 100.0, 2),
            avg_return: round_dp(mean(raw), 3),
            median_return: round_dp(median(raw), 3),
            avg_return_after_fee: round_dp(mean(after_fee), 3),
            max_drawdown_pct: round_dp(max_drawdown_pct(traded), 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn round_dp_basic() {
        assert_eq!(round_dp(4.39999999, 4), 4.4);
        assert_eq!(round_dp(1.23456, 3), 1.235);
        assert_eq!(round_dp(-2.5, 0), -3.0);
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn equity_curve_seeded() {
        assert_eq!(equity_curve(&[]), vec![1.0]);
        let curve = equity_curve(&[10.0, -10.0]);
        assert_eq!(curve.len(), 3);
        assert_relative_eq!(curve[1], 1.1);
        assert_relative_eq!(curve[2], 0.99);
    }

    #[test]
    fn drawdown_monotonic_is_zero() {
        assert_eq!(max_drawdown_pct(&equity_curve(&[1.0, 2.0, 0.5])), 0.0);
        assert_eq!(max_drawdown_pct(&[1.0]), 0.0);
    }

    #[test]
    fn drawdown_peak_to_trough() {
        // 1.0 -> 1.2 -> 0.9 -> 1.5
        let dd = max_drawdown_pct(&[1.0, 1.2, 0.9, 1.5]);
        assert_relative_eq!(dd, -25.0, epsilon = 1e-9);
    }

    #[test]
    fn stats_drawdown_starts_at_first_trade() {
        let single = [-5.0];
        let stats = ReturnStats::compute(&single, &single, &equity_curve(&single));
        assert_eq!(stats.max_drawdown_pct, 0.0);

        // 0.944444 -> 0.888889
        let losses = [-5.5556, -5.8824];
        let stats = ReturnStats::compute(&losses, &losses, &equity_curve(&losses));
        assert_eq!(stats.max_drawdown_pct, -5.88);
    }

    #[test]
    fn empty_stats_are_zero() {
        let stats = ReturnStats::compute(&[], &[], &[1.0]);
        assert_eq!(stats, ReturnStats::default());
        assert_eq!(stats.win_rate, 0.0);
    }

    #[test]
    fn stats_from_returns() {
        let raw = [5.0, -1.0, 0.5];
        let after_fee = [4.4, -1.6, -0.1];
        let curve = equity_curve(&after_fee);
        let stats = ReturnStats::compute(&raw, &after_fee, &curve);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.win_rate, 33.33);
        assert_eq!(stats.avg_return, 1.5);
        assert_eq!(stats.median_return, 0.5);
        assert_eq!(stats.avg_return_after_fee, 0.9);
        assert!(stats.max_drawdown_pct < 0.0);
    }
}
