//! Instrument universe: code-list parsing and loading bars per code.
//!
//! A code that fails to load is skipped with a warning. Loading fails only
//! when every code was skipped.

use crate::domain::error::ScreenerError;
use crate::domain::instrument_data::InstrumentData;
use crate::ports::data_port::PriceStore;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    FetchFailed(String),
    NoData,
}

#[derive(Debug, Clone)]
pub struct LoadedUniverse {
    /// In the order the codes were given.
    pub instruments: Vec<InstrumentData>,
    pub skipped: Vec<SkippedCode>,
}

impl LoadedUniverse {
    /// Distinct bar dates within `[start, end]` across the loaded instruments, ascending.
    pub fn trading_dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let dates: BTreeSet<NaiveDate> = self
            .instruments
            .iter()
            .flat_map(|data| data.window(start, end))
            .map(|bar| bar.date)
            .collect();
        dates.into_iter().collect()
    }
}

/// Fetch each code's bars from `start` onward.
///
/// There is no upper date bound: exits may fall after the backtest period.
pub fn load_universe(
    store: &dyn PriceStore,
    codes: &[String],
    start: NaiveDate,
) -> Result<LoadedUniverse, ScreenerError> {
    let mut instruments = Vec::new();
    let mut skipped = Vec::new();

    for code in codes {
        match store.get_bars(code, start, NaiveDate::MAX) {
            Ok(bars) if bars.is_empty() => {
                warn!(code = %code, "skipping instrument: no data found");
                skipped.push(SkippedCode {
                    code: code.clone(),
                    reason: SkipReason::NoData,
                });
            }
            Ok(bars) => {
                let data = InstrumentData::new(code.clone(), bars);
                debug!(code = %code, bars = data.bar_count(), "instrument loaded");
                instruments.push(data);
            }
            Err(e) => {
                warn!(code = %code, error = %e, "skipping instrument: fetch failed");
                skipped.push(SkippedCode {
                    code: code.clone(),
                    reason: SkipReason::FetchFailed(e.to_string()),
                });
            }
        }
    }

    if instruments.is_empty() {
        return Err(ScreenerError::NoData {
            code: if codes.is_empty() {
                "universe".to_string()
            } else {
                codes.join(",")
            },
        });
    }

    if !skipped.is_empty() {
        info!(
            loaded = instruments.len(),
            requested = codes.len(),
            "universe partially loaded"
        );
    }

    Ok(LoadedUniverse {
        instruments,
        skipped,
    })
}
