//! Strategy configuration: independently optional rule blocks plus scoring weights.
//!
//! Each block is an `Option`. `None` means disabled: the block neither affects
//! the pass decision nor the score denominator.

use crate::domain::error::ScreenerError;
use crate::domain::indicator::macd::{DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};
use crate::domain::pattern::{Pattern, PatternParams};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyConfig {
    pub range: Option<RangeRule>,
    pub volume: Option<VolumeRule>,
    pub ma: Option<MaRule>,
    pub pattern: Option<PatternRule>,
    pub breakout: Option<BreakoutRule>,
    pub atr: Option<AtrRule>,
    pub macd: Option<MacdRule>,
    pub rsi: Option<RsiRule>,
    pub weights: CategoryWeights,
}

/// Range/momentum block. Enabled when at least one half is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeRule {
    pub cumulative: Option<CumulativeIncrease>,
    pub single_day: Option<SingleDayIncrease>,
}

/// Close-to-close change over the last `days` bars must reach `min_pct`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CumulativeIncrease {
    pub days: usize,
    pub min_pct: f64,
}

/// Some bar within the last `within_days` has `pct_chg >= min_pct`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SingleDayIncrease {
    pub within_days: usize,
    pub min_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VolumeRule {
    /// today's volume / average volume >= ratio_min
    Breakout { ma_days: usize, ratio_min: f64 },
    /// today's volume / average volume <= ratio_max
    Pullback {
        ma_days: usize,
        ratio_max: f64,
        require_red: bool,
        touch_ma: Option<usize>,
    },
}

impl VolumeRule {
    pub fn ma_days(&self) -> usize {
        match self {
            VolumeRule::Breakout { ma_days, .. } | VolumeRule::Pullback { ma_days, .. } => *ma_days,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Short MAs above long MAs.
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaRule {
    pub periods: Vec<usize>,
    pub alignment: Option<Alignment>,
    pub price_above: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternRule {
    pub patterns: Vec<Pattern>,
    pub window: usize,
    pub params: PatternParams,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakoutRule {
    pub n: usize,
    pub min_break_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtrRule {
    pub period: usize,
    /// ATR / close * 100 must not exceed this.
    pub max_pct_of_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdSignal {
    HistogramPositive,
    DifAboveDea,
    GoldenCross,
}

impl MacdSignal {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hist>0" | "histogram" => Some(MacdSignal::HistogramPositive),
            "dif>dea" => Some(MacdSignal::DifAboveDea),
            "golden_cross" | "cross" => Some(MacdSignal::GoldenCross),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdRule {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
    pub rule: MacdSignal,
}

impl MacdRule {
    pub fn with_rule(rule: MacdSignal) -> Self {
        Self {
            fast: DEFAULT_FAST,
            slow: DEFAULT_SLOW,
            signal: DEFAULT_SIGNAL,
            rule,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiRule {
    pub period: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Rule categories reported in an evaluation's check map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Range,
    Volume,
    Ma,
    Pattern,
    Breakout,
    Atr,
    Macd,
    Rsi,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Range => "range",
            Category::Volume => "volume",
            Category::Ma => "ma",
            Category::Pattern => "pattern",
            Category::Breakout => "breakout",
            Category::Atr => "atr",
            Category::Macd => "macd",
            Category::Rsi => "rsi",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scoring weight per category. Range and ATR filter without scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryWeights {
    pub volume: f64,
    pub ma: f64,
    pub breakout: f64,
    pub pattern: f64,
    pub macd: f64,
    pub rsi: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            volume: 30.0,
            ma: 20.0,
            breakout: 25.0,
            pattern: 15.0,
            macd: 5.0,
            rsi: 5.0,
        }
    }
}

impl CategoryWeights {
    pub fn weight(&self, category: Category) -> Option<f64> {
        match category {
            Category::Volume => Some(self.volume),
            Category::Ma => Some(self.ma),
            Category::Breakout => Some(self.breakout),
            Category::Pattern => Some(self.pattern),
            Category::Macd => Some(self.macd),
            Category::Rsi => Some(self.rsi),
            Category::Range | Category::Atr => None,
        }
    }
}

impl StrategyConfig {
    /// Categories whose block is enabled, in check-map order.
    pub fn enabled_categories(&self) -> Vec<Category> {
        let flags = [
            (Category::Range, self.range.is_some()),
            (Category::Volume, self.volume.is_some()),
            (Category::Ma, self.ma.is_some()),
            (Category::Pattern, self.pattern.is_some()),
            (Category::Breakout, self.breakout.is_some()),
            (Category::Atr, self.atr.is_some()),
            (Category::Macd, self.macd.is_some()),
            (Category::Rsi, self.rsi.is_some()),
        ];
        flags
            .into_iter()
            .filter_map(|(c, on)| on.then_some(c))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ScreenerError> {
        if let Some(range) = &self.range {
            if range.cumulative.is_none() && range.single_day.is_none() {
                return Err(ScreenerError::configuration(
                    "range block needs a cumulative or single-day condition",
                ));
            }
            if range.cumulative.is_some_and(|c| c.days == 0) {
                return Err(ScreenerError::configuration("range_days must be at least 1"));
            }
            if range.single_day.is_some_and(|s| s.within_days == 0) {
                return Err(ScreenerError::configuration(
                    "single_day_within must be at least 1",
                ));
            }
        }

        if let Some(volume) = &self.volume {
            if volume.ma_days() == 0 {
                return Err(ScreenerError::configuration("volume_ma_days must be at least 1"));
            }
            if let VolumeRule::Pullback {
                touch_ma: Some(0), ..
            } = volume
            {
                return Err(ScreenerError::configuration(
                    "pullback_touch_ma must be at least 1",
                ));
            }
        }

        if let Some(ma) = &self.ma {
            if ma.alignment.is_none() && ma.price_above.is_none() {
                return Err(ScreenerError::configuration(
                    "moving-average block needs an alignment or price_above_ma",
                ));
            }
            if ma.periods.iter().any(|&p| p == 0) {
                return Err(ScreenerError::configuration("ma_days entries must be positive"));
            }
            if ma.alignment.is_some() && ma.periods.len() < 2 {
                return Err(ScreenerError::configuration(
                    "ma_alignment needs at least two ma_days",
                ));
            }
            if let Some(p) = ma.price_above {
                if !ma.periods.contains(&p) {
                    return Err(ScreenerError::configuration(format!(
                        "price_above_ma references MA{} which is not in ma_days",
                        p
                    )));
                }
            }
        }

        if let Some(pattern) = &self.pattern {
            if pattern.patterns.is_empty() {
                return Err(ScreenerError::configuration("pattern block lists no patterns"));
            }
            if pattern.window == 0 {
                return Err(ScreenerError::configuration("pattern_window must be at least 1"));
            }
        }

        if self.breakout.is_some_and(|b| b.n == 0) {
            return Err(ScreenerError::configuration("breakout_n must be at least 1"));
        }

        if let Some(atr) = &self.atr {
            if atr.period == 0 {
                return Err(ScreenerError::configuration("atr_period must be at least 1"));
            }
            if atr.max_pct_of_price <= 0.0 {
                return Err(ScreenerError::configuration("atr_max_pct must be positive"));
            }
        }

        if let Some(macd) = &self.macd {
            if macd.fast == 0 || macd.slow == 0 || macd.signal == 0 {
                return Err(ScreenerError::configuration("MACD periods must be positive"));
            }
        }

        if let Some(rsi) = &self.rsi {
            if rsi.period == 0 {
                return Err(ScreenerError::configuration("rsi_period must be at least 1"));
            }
            if let (Some(lo), Some(hi)) = (rsi.min, rsi.max) {
                if lo > hi {
                    return Err(ScreenerError::configuration("rsi_min exceeds rsi_max"));
                }
            }
        }

        let w = &self.weights;
        if [w.volume, w.ma, w.breakout, w.pattern, w.macd, w.rsi]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(ScreenerError::configuration(
                "category weights must be finite and non-negative",
            ));
        }

        Ok(())
    }
}
