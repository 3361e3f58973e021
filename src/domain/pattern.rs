//! Candlestick pattern detection.
//!
//! Each predicate inspects the bar at index `i` (and `i-1`, `i-2` for
//! multi-bar formations) and returns false when the index is out of range or
//! there is not enough prior history. Geometry follows [`Bar`]: body is
//! |close - open|, range is high - low, shadows are measured from the body
//! edges.

use crate::domain::bar::Bar;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pattern {
    BullishEngulfing,
    BearishEngulfing,
    Hammer,
    ShootingStar,
    Doji,
    MorningStar,
    EveningStar,
    BullishHarami,
    BearishHarami,
    PiercingLine,
    DarkCloudCover,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
}

impl Pattern {
    pub const ALL: [Pattern; 13] = [
        Pattern::BullishEngulfing,
        Pattern::BearishEngulfing,
        Pattern::Hammer,
        Pattern::ShootingStar,
        Pattern::Doji,
        Pattern::MorningStar,
        Pattern::EveningStar,
        Pattern::BullishHarami,
        Pattern::BearishHarami,
        Pattern::PiercingLine,
        Pattern::DarkCloudCover,
        Pattern::ThreeWhiteSoldiers,
        Pattern::ThreeBlackCrows,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Pattern::BullishEngulfing => "bullish_engulfing",
            Pattern::BearishEngulfing => "bearish_engulfing",
            Pattern::Hammer => "hammer",
            Pattern::ShootingStar => "shooting_star",
            Pattern::Doji => "doji",
            Pattern::MorningStar => "morning_star",
            Pattern::EveningStar => "evening_star",
            Pattern::BullishHarami => "bullish_harami",
            Pattern::BearishHarami => "bearish_harami",
            Pattern::PiercingLine => "piercing_line",
            Pattern::DarkCloudCover => "dark_cloud_cover",
            Pattern::ThreeWhiteSoldiers => "three_white_soldiers",
            Pattern::ThreeBlackCrows => "three_black_crows",
        }
    }

    pub fn detect(self, bars: &[Bar], i: usize, params: &PatternParams) -> bool {
        match self {
            Pattern::BullishEngulfing => is_bullish_engulfing(bars, i),
            Pattern::BearishEngulfing => is_bearish_engulfing(bars, i),
            Pattern::Hammer => is_hammer(bars, i, &params.hammer),
            Pattern::ShootingStar => is_shooting_star(bars, i, &params.shooting_star),
            Pattern::Doji => is_doji(bars, i, params.doji_threshold),
            Pattern::MorningStar => is_morning_star(bars, i, params.star_body_min_ratio),
            Pattern::EveningStar => is_evening_star(bars, i, params.star_body_min_ratio),
            Pattern::BullishHarami => is_bullish_harami(bars, i),
            Pattern::BearishHarami => is_bearish_harami(bars, i),
            Pattern::PiercingLine => is_piercing_line(bars, i),
            Pattern::DarkCloudCover => is_dark_cloud_cover(bars, i),
            Pattern::ThreeWhiteSoldiers => is_three_white_soldiers(bars, i),
            Pattern::ThreeBlackCrows => is_three_black_crows(bars, i),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pattern: {0}")]
pub struct UnknownPattern(pub String);

impl FromStr for Pattern {
    type Err = UnknownPattern;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Pattern::ALL
            .iter()
            .copied()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| UnknownPattern(s.trim().to_string()))
    }
}

/// Small-body / long-shadow thresholds shared by hammer and shooting star.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowParams {
    pub body_ratio_max: f64,
    /// Dominant shadow must be at least this multiple of the body.
    pub shadow_min: f64,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            body_ratio_max: 0.35,
            shadow_min: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternParams {
    pub hammer: ShadowParams,
    pub shooting_star: ShadowParams,
    pub doji_threshold: f64,
    pub star_body_min_ratio: f64,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            hammer: ShadowParams::default(),
            shooting_star: ShadowParams::default(),
            doji_threshold: 0.001,
            star_body_min_ratio: 0.5,
        }
    }
}

fn pair(bars: &[Bar], i: usize) -> Option<(&Bar, &Bar)> {
    if i == 0 || i >= bars.len() {
        return None;
    }
    Some((&bars[i - 1], &bars[i]))
}

fn triple(bars: &[Bar], i: usize) -> Option<(&Bar, &Bar, &Bar)> {
    if i < 2 || i >= bars.len() {
        return None;
    }
    Some((&bars[i - 2], &bars[i - 1], &bars[i]))
}

pub fn is_bullish_engulfing(bars: &[Bar], i: usize) -> bool {
    pair(bars, i).is_some_and(|(prev, cur)| {
        prev.is_bearish() && cur.is_bullish() && cur.open < prev.close && cur.close > prev.open
    })
}

pub fn is_bearish_engulfing(bars: &[Bar], i: usize) -> bool {
    pair(bars, i).is_some_and(|(prev, cur)| {
        prev.is_bullish() && cur.is_bearish() && cur.open > prev.close && cur.close < prev.open
    })
}

pub fn is_hammer(bars: &[Bar], i: usize, params: &ShadowParams) -> bool {
    let Some(bar) = bars.get(i) else {
        return false;
    };
    let range = bar.range();
    if range <= 0.0 {
        return false;
    }
    let body = bar.body();
    body / range <= params.body_ratio_max
        && bar.lower_shadow() >= params.shadow_min * body
        && bar.upper_shadow() <= body
}

pub fn is_shooting_star(bars: &[Bar], i: usize, params: &ShadowParams) -> bool {
    let Some(bar) = bars.get(i) else {
        return false;
    };
    let range = bar.range();
    if range <= 0.0 {
        return false;
    }
    let body = bar.body();
    body / range <= params.body_ratio_max
        && bar.upper_shadow() >= params.shadow_min * body
        && bar.lower_shadow() <= body
}

pub fn is_doji(bars: &[Bar], i: usize, threshold: f64) -> bool {
    let Some(bar) = bars.get(i) else {
        return false;
    };
    if bar.open == 0.0 {
        return false;
    }
    bar.body() / bar.open.abs().max(1e-6) <= threshold
}

fn small_middle_body(bar: &Bar) -> bool {
    let range = bar.range();
    range > 0.0 && bar.body() / range < 0.4
}

pub fn is_morning_star(bars: &[Bar], i: usize, body_min_ratio: f64) -> bool {
    triple(bars, i).is_some_and(|(first, middle, last)| {
        first.is_bearish()
            && small_middle_body(middle)
            && last.is_bullish()
            && last.close - first.body_bottom() >= body_min_ratio * first.body()
    })
}

pub fn is_evening_star(bars: &[Bar], i: usize, body_min_ratio: f64) -> bool {
    triple(bars, i).is_some_and(|(first, middle, last)| {
        first.is_bullish()
            && small_middle_body(middle)
            && last.is_bearish()
            && first.body_top() - last.close >= body_min_ratio * first.body()
    })
}

fn body_inside(inner: &Bar, outer: &Bar) -> bool {
    inner.body_bottom() > outer.body_bottom() && inner.body_top() < outer.body_top()
}

pub fn is_bullish_harami(bars: &[Bar], i: usize) -> bool {
    pair(bars, i).is_some_and(|(prev, cur)| {
        prev.is_bearish() && cur.is_bullish() && body_inside(cur, prev)
    })
}

pub fn is_bearish_harami(bars: &[Bar], i: usize) -> bool {
    pair(bars, i).is_some_and(|(prev, cur)| {
        prev.is_bullish() && cur.is_bearish() && body_inside(cur, prev)
    })
}

pub fn is_piercing_line(bars: &[Bar], i: usize) -> bool {
    pair(bars, i).is_some_and(|(prev, cur)| {
        let mid = (prev.open + prev.close) / 2.0;
        prev.is_bearish() && cur.is_bullish() && cur.close > mid && cur.open < prev.close
    })
}

pub fn is_dark_cloud_cover(bars: &[Bar], i: usize) -> bool {
    pair(bars, i).is_some_and(|(prev, cur)| {
        let mid = (prev.open + prev.close) / 2.0;
        prev.is_bullish() && cur.is_bearish() && cur.close < mid && cur.open > prev.close
    })
}

pub fn is_three_white_soldiers(bars: &[Bar], i: usize) -> bool {
    triple(bars, i).is_some_and(|(a, b, c)| {
        a.is_bullish()
            && b.is_bullish()
            && c.is_bullish()
            && b.close >= a.close
            && c.close >= b.close
    })
}

pub fn is_three_black_crows(bars: &[Bar], i: usize) -> bool {
    triple(bars, i).is_some_and(|(a, b, c)| {
        a.is_bearish()
            && b.is_bearish()
            && c.is_bearish()
            && b.close <= a.close
            && c.close <= b.close
    })
}

/// For each wanted pattern, the indices within the last `window` bars where it fired.
///
/// Every wanted pattern has an entry, empty when it never fired.
pub fn detect_patterns(
    bars: &[Bar],
    wanted: &[Pattern],
    window: usize,
    params: &PatternParams,
) -> BTreeMap<Pattern, Vec<usize>> {
    let start = bars.len().saturating_sub(window);
    wanted
        .iter()
        .map(|&pattern| {
            let hits = (start..bars.len())
                .filter(|&i| pattern.detect(bars, i, params))
                .collect();
            (pattern, hits)
        })
        .collect()
}
