//! Entry/exit price resolution and the flat round-trip fee.
//!
//! Entry is the signal day's close or the open of the instrument's first bar
//! after the signal day. Exit is the close or open of the bar exactly
//! `forward` bars after entry, counted on the instrument's own bars. A missing
//! or non-positive price yields [`ScreenerError::MissingPrice`], which excludes
//! the candidate.

use crate::domain::error::ScreenerError;
use crate::domain::instrument_data::InstrumentData;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMode {
    #[default]
    Close,
    NextOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitMode {
    #[default]
    Close,
    Open,
}

impl EntryMode {
    pub fn name(self) -> &'static str {
        match self {
            EntryMode::Close => "close",
            EntryMode::NextOpen => "next_open",
        }
    }
}

impl ExitMode {
    pub fn name(self) -> &'static str {
        match self {
            ExitMode::Close => "close",
            ExitMode::Open => "open",
        }
    }
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for ExitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "close" => Ok(EntryMode::Close),
            "next_open" | "next-open" => Ok(EntryMode::NextOpen),
            other => Err(format!("unknown entry mode '{}', expected close or next_open", other)),
        }
    }
}

impl FromStr for ExitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "close" => Ok(ExitMode::Close),
            "open" => Ok(ExitMode::Open),
            other => Err(format!("unknown exit mode '{}', expected close or open", other)),
        }
    }
}

/// Round-trip fee in percent: `fee_bps` is per side, in per-mille.
pub fn round_trip_fee_pct(fee_bps: f64) -> f64 {
    2.0 * fee_bps / 10.0
}

pub fn raw_return_pct(entry_price: f64, exit_price: f64) -> f64 {
    (exit_price - entry_price) / entry_price * 100.0
}

pub fn fee_adjusted_return_pct(raw_return_pct: f64, fee_bps: f64) -> f64 {
    raw_return_pct - round_trip_fee_pct(fee_bps)
}

/// A resolved fill: the bar index in the instrument's history, its date and price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub index: usize,
    pub date: NaiveDate,
    pub price: f64,
}

fn fill_at(
    data: &InstrumentData,
    index: usize,
    after: NaiveDate,
    field: &'static str,
) -> Result<Fill, ScreenerError> {
    let missing = || ScreenerError::MissingPrice {
        code: data.code.clone(),
        date: after,
        field,
    };
    let bar = data.bars.get(index).ok_or_else(missing)?;
    let price = if field == "open" { bar.open } else { bar.close };
    if !price.is_finite() || price <= 0.0 {
        return Err(missing());
    }
    Ok(Fill {
        index,
        date: bar.date,
        price,
    })
}

pub fn resolve_entry(
    data: &InstrumentData,
    signal_date: NaiveDate,
    mode: EntryMode,
) -> Result<Fill, ScreenerError> {
    match mode {
        EntryMode::Close => {
            let signal_index = data.get_bar_index(signal_date).ok_or_else(|| {
                ScreenerError::MissingPrice {
                    code: data.code.clone(),
                    date: signal_date,
                    field: "close",
                }
            })?;
            fill_at(data, signal_index, signal_date, "close")
        }
        // first bar strictly after the signal date, whether or not it traded that day
        EntryMode::NextOpen => {
            let next = data.bars.partition_point(|b| b.date <= signal_date);
            fill_at(data, next, signal_date, "open")
        }
    }
}

pub fn resolve_exit(
    data: &InstrumentData,
    entry: &Fill,
    forward: usize,
    mode: ExitMode,
) -> Result<Fill, ScreenerError> {
    let field = match mode {
        ExitMode::Close => "close",
        ExitMode::Open => "open",
    };
    fill_at(data, entry.index + forward, entry.date, field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::Bar;
    use approx::assert_relative_eq;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn make_data(days: &[u32]) -> InstrumentData {
        let bars = days
            .iter()
            .enumerate()
            .map(|(i, &day)| {
                let close = 10.0 + i as f64;
                Bar {
                    code: "000001".into(),
                    date: date(day),
                    open: close - 0.5,
                    high: close + 0.5,
                    low: close - 1.0,
                    close,
                    volume: 1000.0,
                    pct_chg: 0.0,
                }
            })
            .collect();
        InstrumentData::new("000001".into(), bars)
    }

    #[test]
    fn fee_three_bps_on_five_percent() {
        assert_relative_eq!(fee_adjusted_return_pct(5.0, 3.0), 4.4, epsilon = 1e-12);
        assert_relative_eq!(round_trip_fee_pct(3.0), 0.6);
    }

    #[test]
    fn zero_fee_leaves_return_unchanged() {
        assert_eq!(fee_adjusted_return_pct(-2.5, 0.0), -2.5);
    }

    #[test]
    fn raw_return_basic() {
        assert_relative_eq!(raw_return_pct(10.0, 10.5), 5.0);
        assert_relative_eq!(raw_return_pct(10.0, 9.0), -10.0);
    }

    #[test]
    fn entry_same_day_close() {
        let data = make_data(&[1, 4, 5]);
        let fill = resolve_entry(&data, date(4), EntryMode::Close).unwrap();
        assert_eq!(fill.index, 1);
        assert_eq!(fill.date, date(4));
        assert_relative_eq!(fill.price, 11.0);
    }

    #[test]
    fn entry_next_open_uses_next_bar() {
        let data = make_data(&[1, 4, 5]);
        let fill = resolve_entry(&data, date(4), EntryMode::NextOpen).unwrap();
        assert_eq!(fill.date, date(5));
        assert_relative_eq!(fill.price, 11.5);
    }

    #[test]
    fn entry_next_open_missing_on_last_bar() {
        let data = make_data(&[1, 4, 5]);
        let err = resolve_entry(&data, date(5), EntryMode::NextOpen).unwrap_err();
        assert!(matches!(err, ScreenerError::MissingPrice { field: "open", .. }));
    }

    #[test]
    fn entry_next_open_without_signal_bar() {
        let data = make_data(&[1, 4, 5]);
        let fill = resolve_entry(&data, date(2), EntryMode::NextOpen).unwrap();
        assert_eq!(fill.index, 1);
        assert_eq!(fill.date, date(4));
        assert_relative_eq!(fill.price, 10.5);
    }

    #[test]
    fn entry_missing_signal_bar() {
        let data = make_data(&[1, 4, 5]);
        assert!(resolve_entry(&data, date(2), EntryMode::Close).is_err());
    }

    #[test]
    fn exit_counts_instrument_bars() {
        let data = make_data(&[1, 4, 5, 8, 11]);
        let entry = resolve_entry(&data, date(1), EntryMode::Close).unwrap();
        let exit = resolve_exit(&data, &entry, 3, ExitMode::Close).unwrap();
        assert_eq!(exit.date, date(8));
        assert_relative_eq!(exit.price, 13.0);

        let exit_open = resolve_exit(&data, &entry, 3, ExitMode::Open).unwrap();
        assert_relative_eq!(exit_open.price, 12.5);
    }

    #[test]
    fn exit_incomplete_horizon() {
        let data = make_data(&[1, 4, 5]);
        let entry = resolve_entry(&data, date(4), EntryMode::Close).unwrap();
        let err = resolve_exit(&data, &entry, 2, ExitMode::Close).unwrap_err();
        assert!(matches!(
            err,
            ScreenerError::MissingPrice { field: "close", .. }
        ));
    }

    #[test]
    fn non_positive_price_is_missing() {
        let mut data = make_data(&[1, 4]);
        data.bars[1].close = 0.0;
        let entry = resolve_entry(&data, date(1), EntryMode::Close).unwrap();
        assert!(resolve_exit(&data, &entry, 1, ExitMode::Close).is_err());
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("next_open".parse::<EntryMode>(), Ok(EntryMode::NextOpen));
        assert_eq!(" CLOSE ".parse::<EntryMode>(), Ok(EntryMode::Close));
        assert_eq!("open".parse::<ExitMode>(), Ok(ExitMode::Open));
        assert!("vwap".parse::<ExitMode>().is_err());
    }
}
