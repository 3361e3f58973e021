//! Per-instrument bar history with a date index.

use crate::domain::bar::Bar;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct InstrumentData {
    pub code: String,
    /// Ascending by date, one bar per date.
    pub bars: Vec<Bar>,
    pub date_index: HashMap<NaiveDate, usize>,
}

impl InstrumentData {
    /// Sorts by date and drops repeated dates, keeping the first occurrence.
    pub fn new(code: String, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Self {
            code,
            bars,
            date_index,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&Bar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }

    pub fn get_bar_index(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    /// Bars dated within `[start, end]`.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> &[Bar] {
        let lo = self.bars.partition_point(|b| b.date < start);
        let hi = self.bars.partition_point(|b| b.date <= end);
        if lo >= hi { &[] } else { &self.bars[lo..hi] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bar(code: &str, date: &str, close: f64) -> Bar {
        Bar {
            code: code.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1000.0,
            pct_chg: 0.0,
        }
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn new_builds_date_index() {
        let data = InstrumentData::new(
            "600000".into(),
            vec![
                make_bar("600000", "2024-01-01", 100.0),
                make_bar("600000", "2024-01-02", 101.0),
                make_bar("600000", "2024-01-03", 102.0),
            ],
        );

        assert_eq!(data.bar_count(), 3);
        assert_eq!(data.get_bar_index(d("2024-01-02")), Some(1));
        assert!((data.get_bar(d("2024-01-03")).unwrap().close - 102.0).abs() < f64::EPSILON);
        assert!(data.get_bar(d("2024-01-05")).is_none());
    }

    #[test]
    fn new_sorts_and_dedups() {
        let data = InstrumentData::new(
            "X".into(),
            vec![
                make_bar("X", "2024-01-03", 3.0),
                make_bar("X", "2024-01-01", 1.0),
                make_bar("X", "2024-01-03", 9.0),
            ],
        );
        assert_eq!(data.bar_count(), 2);
        assert_eq!(data.bars[0].date, d("2024-01-01"));
        assert_eq!(data.get_bar_index(d("2024-01-03")), Some(1));
    }

    #[test]
    fn window_is_inclusive() {
        let data = InstrumentData::new(
            "X".into(),
            vec![
                make_bar("X", "2024-01-01", 1.0),
                make_bar("X", "2024-01-02", 2.0),
                make_bar("X", "2024-01-04", 4.0),
                make_bar("X", "2024-01-05", 5.0),
            ],
        );
        let w = data.window(d("2024-01-02"), d("2024-01-04"));
        assert_eq!(w.len(), 2);
        assert!((w[1].close - 4.0).abs() < f64::EPSILON);
        assert!(data.window(d("2024-01-06"), d("2024-01-09")).is_empty());
        assert!(data.window(d("2024-01-05"), d("2024-01-01")).is_empty());
    }
}
