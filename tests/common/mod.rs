#![allow(dead_code)]

use chrono::NaiveDate;
use screener::domain::backtest::BacktestConfig;
use screener::domain::error::ScreenerError;
pub use screener::domain::bar::Bar;
use screener::ports::data_port::PriceStore;
use std::collections::HashMap;

pub struct MockPriceStore {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockPriceStore {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl PriceStore for MockPriceStore {
    fn get_bars(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, ScreenerError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(ScreenerError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, ScreenerError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day(start: NaiveDate, offset: usize) -> NaiveDate {
    start + chrono::Duration::days(offset as i64)
}

pub fn make_bar(code: &str, date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        code: code.to_string(),
        date,
        open,
        high,
        low,
        close,
        volume: 1000.0,
        pct_chg: 0.0,
    }
}

/// Flat-ish bars whose open equals close, one per calendar day.
pub fn bars_from_closes(code: &str, start: NaiveDate, closes: &[f64]) -> Vec<Bar> {
    let mut prev: Option<f64> = None;
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let pct_chg = prev.map_or(0.0, |p| (c / p - 1.0) * 100.0);
            prev = Some(c);
            Bar {
                pct_chg,
                ..make_bar(code, day(start, i), c, c + 0.5, c - 0.5, c)
            }
        })
        .collect()
}

/// `count` bars rising by `step` from `start_price`.
pub fn generate_bars(code: &str, start: NaiveDate, count: usize, start_price: f64, step: f64) -> Vec<Bar> {
    let closes: Vec<f64> = (0..count).map(|i| start_price + step * i as f64).collect();
    bars_from_closes(code, start, &closes)
}

pub fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

pub fn config(start: NaiveDate, end: NaiveDate, lookback: usize, forward: usize) -> BacktestConfig {
    BacktestConfig {
        lookback,
        forward,
        ..BacktestConfig::new(start, end)
    }
}
