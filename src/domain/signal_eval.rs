//! Signal evaluation: one instrument's bar window against a [`StrategyConfig`].
//!
//! # Evaluation Semantics
//!
//! - Fewer than [`MIN_EVAL_BARS`] bars: not passed, failure `insufficient_data`
//! - Each enabled block yields one check; disabled blocks yield nothing
//! - `passed` is the AND of all checks (vacuously true with no blocks)
//! - `score` is earned weight / enabled weight * 100 over weighted categories,
//!   rounded to 3 decimals, 0 when nothing weighted is enabled

use crate::domain::bar::{closes, highs, lows, Bar};
use crate::domain::indicator::{atr, last_valid, macd, n_day_breakout, rsi, sma};
use crate::domain::metrics::round_dp;
use crate::domain::pattern::detect_patterns;
use crate::domain::strategy::{
    Alignment, AtrRule, BreakoutRule, Category, MaRule, MacdRule, MacdSignal, PatternRule,
    RangeRule, RsiRule, StrategyConfig, VolumeRule,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

pub const MIN_EVAL_BARS: usize = 3;

/// Bars a window over `lookback` prior trading days must hold: `lookback + 1`
/// when the full lookback is required, otherwise [`MIN_EVAL_BARS`].
pub fn min_window_bars(lookback: usize, require_full_lookback: bool) -> usize {
    if require_full_lookback {
        (lookback + 1).max(MIN_EVAL_BARS)
    } else {
        MIN_EVAL_BARS
    }
}

/// Distance from a moving average that still counts as touching it.
const TOUCH_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalFailure {
    InsufficientData { bars: usize, minimum: usize },
}

impl fmt::Display for EvalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalFailure::InsufficientData { .. } => f.write_str("insufficient_data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub code: String,
    pub as_of: Option<NaiveDate>,
    pub passed: bool,
    pub checks: BTreeMap<Category, bool>,
    pub score: f64,
    pub failure: Option<EvalFailure>,
}

impl Evaluation {
    fn insufficient(code: &str, bars: &[Bar]) -> Self {
        Evaluation {
            code: code.to_string(),
            as_of: bars.last().map(|b| b.date),
            passed: false,
            checks: BTreeMap::new(),
            score: 0.0,
            failure: Some(EvalFailure::InsufficientData {
                bars: bars.len(),
                minimum: MIN_EVAL_BARS,
            }),
        }
    }

    /// `volume:pass ma:fail ...` in category order.
    pub fn summary_line(&self) -> String {
        if let Some(failure) = &self.failure {
            return failure.to_string();
        }
        if self.checks.is_empty() {
            return "-".to_string();
        }
        self.checks
            .iter()
            .map(|(c, ok)| format!("{}:{}", c, if *ok { "pass" } else { "fail" }))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One row of the scoring table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryOutcome {
    pub category: Category,
    pub passed: bool,
    pub weight: Option<f64>,
}

/// Normalised weighted score over the enabled categories.
///
/// Categories without a weight, or with a non-positive one, are left out of
/// the denominator.
pub fn score(outcomes: &[CategoryOutcome]) -> f64 {
    let (earned, total) = outcomes
        .iter()
        .filter_map(|o| o.weight.filter(|w| *w > 0.0).map(|w| (o.passed, w)))
        .fold((0.0, 0.0), |(earned, total), (passed, w)| {
            (if passed { earned + w } else { earned }, total + w)
        });
    if total <= 0.0 {
        return 0.0;
    }
    round_dp(earned / total * 100.0, 3)
}

pub fn evaluate(code: &str, bars: &[Bar], config: &StrategyConfig) -> Evaluation {
    if bars.len() < MIN_EVAL_BARS {
        return Evaluation::insufficient(code, bars);
    }

    let outcomes: Vec<CategoryOutcome> = [
        config.range.as_ref().map(|r| (Category::Range, check_range(bars, r))),
        config.volume.as_ref().map(|r| (Category::Volume, check_volume(bars, r))),
        config.ma.as_ref().map(|r| (Category::Ma, check_ma(bars, r))),
        config.pattern.as_ref().map(|r| (Category::Pattern, check_pattern(bars, r))),
        config.breakout.as_ref().map(|r| (Category::Breakout, check_breakout(bars, r))),
        config.atr.as_ref().map(|r| (Category::Atr, check_atr(bars, r))),
        config.macd.as_ref().map(|r| (Category::Macd, check_macd(bars, r))),
        config.rsi.as_ref().map(|r| (Category::Rsi, check_rsi(bars, r))),
    ]
    .into_iter()
    .flatten()
    .map(|(category, passed)| CategoryOutcome {
        category,
        passed,
        weight: config.weights.weight(category),
    })
    .collect();

    Evaluation {
        code: code.to_string(),
        as_of: bars.last().map(|b| b.date),
        passed: outcomes.iter().all(|o| o.passed),
        checks: outcomes.iter().map(|o| (o.category, o.passed)).collect(),
        score: score(&outcomes),
        failure: None,
    }
}

fn check_range(bars: &[Bar], rule: &RangeRule) -> bool {
    let n = bars.len();
    let last = &bars[n - 1];

    // the base close must be `days` bars back, not the oldest bar available
    let cumulative_ok = rule.cumulative.is_none_or(|c| {
        let Some(base) = n.checked_sub(c.days + 1).map(|i| bars[i].close) else {
            return false;
        };
        base > 0.0 && (last.close / base - 1.0) * 100.0 >= c.min_pct
    });

    let single_day_ok = rule.single_day.is_none_or(|s| {
        bars[n.saturating_sub(s.within_days)..]
            .iter()
            .any(|b| b.pct_chg >= s.min_pct)
    });

    cumulative_ok && single_day_ok
}

/// Today's volume over the mean volume of the preceding `ma_days` bars.
///
/// `None` when fewer than `ma_days` bars precede today.
fn volume_ratio(bars: &[Bar], ma_days: usize) -> Option<f64> {
    let (today, prior) = bars.split_last()?;
    let prior = &prior[prior.len().checked_sub(ma_days)?..];
    if prior.is_empty() {
        return None;
    }
    let avg = prior.iter().map(|b| b.volume).sum::<f64>() / prior.len() as f64;
    (avg > 0.0).then(|| today.volume / avg)
}

fn touches_ma(bars: &[Bar], period: usize) -> bool {
    let Some(ma) = last_valid(&sma(&closes(bars), period)) else {
        return false;
    };
    let today = &bars[bars.len() - 1];
    (today.low <= ma && ma <= today.high)
        || (ma != 0.0 && ((today.close - ma) / ma).abs() < TOUCH_TOLERANCE)
}

fn check_volume(bars: &[Bar], rule: &VolumeRule) -> bool {
    let Some(ratio) = volume_ratio(bars, rule.ma_days()) else {
        return false;
    };
    match rule {
        VolumeRule::Breakout { ratio_min, .. } => ratio >= *ratio_min,
        VolumeRule::Pullback {
            ratio_max,
            require_red,
            touch_ma,
            ..
        } => {
            let today = &bars[bars.len() - 1];
            ratio <= *ratio_max
                && (!require_red || today.is_bearish())
                && touch_ma.is_none_or(|p| touches_ma(bars, p))
        }
    }
}

fn check_ma(bars: &[Bar], rule: &MaRule) -> bool {
    let close = closes(bars);
    let ma_value = |period: usize| last_valid(&sma(&close, period));

    let above_ok = rule.price_above.is_none_or(|p| {
        ma_value(p).is_some_and(|ma| close[close.len() - 1] > ma)
    });

    let aligned_ok = rule.alignment.is_none_or(|alignment| {
        let mut periods = rule.periods.clone();
        periods.sort_unstable();
        periods.dedup();
        let values: Option<Vec<f64>> = periods.iter().map(|&p| ma_value(p)).collect();
        values.is_some_and(|v| {
            v.windows(2).all(|w| match alignment {
                Alignment::Bullish => w[0] >= w[1],
                Alignment::Bearish => w[0] <= w[1],
            })
        })
    });

    above_ok && aligned_ok
}

fn check_pattern(bars: &[Bar], rule: &PatternRule) -> bool {
    detect_patterns(bars, &rule.patterns, rule.window, &rule.params)
        .values()
        .any(|hits| !hits.is_empty())
}

fn check_breakout(bars: &[Bar], rule: &BreakoutRule) -> bool {
    n_day_breakout(&highs(bars), &closes(bars), rule.n, rule.min_break_pct)
}

fn check_atr(bars: &[Bar], rule: &AtrRule) -> bool {
    let close = closes(bars);
    let last_close = close[close.len() - 1];
    if last_close <= 0.0 {
        return false;
    }
    last_valid(&atr(&highs(bars), &lows(bars), &close, rule.period))
        .is_some_and(|a| a / last_close * 100.0 <= rule.max_pct_of_price)
}

fn check_macd(bars: &[Bar], rule: &MacdRule) -> bool {
    let m = macd(&closes(bars), rule.fast, rule.slow, rule.signal);
    let n = m.dif.len();
    match rule.rule {
        MacdSignal::HistogramPositive => m.histogram[n - 1] > 0.0,
        MacdSignal::DifAboveDea => m.dif[n - 1] > m.dea[n - 1],
        MacdSignal::GoldenCross => {
            n >= 2 && m.dif[n - 2] <= m.dea[n - 2] && m.dif[n - 1] > m.dea[n - 1]
        }
    }
}

fn check_rsi(bars: &[Bar], rule: &RsiRule) -> bool {
    last_valid(&rsi(&closes(bars), rule.period)).is_some_and(|v| {
        rule.min.is_none_or(|lo| v >= lo) && rule.max.is_none_or(|hi| v <= hi)
    })
}
