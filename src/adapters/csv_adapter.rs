//! CSV price store: one `<CODE>.csv` file per instrument in a directory.
//!
//! Header: `date,open,high,low,close,volume[,pct_chg]`. Dates are
//! `YYYY-MM-DD` or `YYYYMMDD`. A missing or blank `pct_chg` is derived from
//! the previous close in the file (0 for the first row).

use crate::domain::bar::Bar;
use crate::domain::error::ScreenerError;
use crate::ports::data_port::PriceStore;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvPriceStore {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(default)]
    pct_chg: Option<f64>,
}

fn parse_date(s: &str) -> Result<NaiveDate, ScreenerError> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .map_err(|e| ScreenerError::DataSource {
            reason: format!("invalid date '{}': {}", s, e),
        })
}

impl CsvPriceStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }

    fn read_all(&self, code: &str) -> Result<Vec<Bar>, ScreenerError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| ScreenerError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut bars = Vec::new();
        for row in rdr.deserialize::<PriceRow>() {
            let row = row?;
            bars.push(Bar {
                code: code.to_string(),
                date: parse_date(&row.date)?,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
                pct_chg: row.pct_chg.unwrap_or(f64::NAN),
            });
        }

        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);

        let mut prev_close: Option<f64> = None;
        for bar in &mut bars {
            if bar.pct_chg.is_nan() {
                bar.pct_chg = match prev_close {
                    Some(prev) if prev != 0.0 => (bar.close / prev - 1.0) * 100.0,
                    _ => 0.0,
                };
            }
            prev_close = Some(bar.close);
        }

        debug!(code, rows = bars.len(), path = %path.display(), "loaded price file");
        Ok(bars)
    }
}

impl PriceStore for CsvPriceStore {
    fn get_bars(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, ScreenerError> {
        let mut bars = self.read_all(code)?;
        bars.retain(|b| b.date >= start && b.date <= end);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, ScreenerError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| ScreenerError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let with_pct = "date,open,high,low,close,volume,pct_chg\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000,1.5\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000,4.7619\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000,4.5455\n";
        fs::write(path.join("600000.csv"), with_pct).unwrap();

        let derived = "date,open,high,low,close,volume\n\
            20240103,10.0,10.5,9.5,10.0,1000\n\
            20240102,9.0,9.5,8.5,8.0,1000\n\
            20240104,10.0,11.5,9.5,11.0,1200\n";
        fs::write(path.join("000001.csv"), derived).unwrap();

        fs::write(path.join("notes.txt"), "ignore me").unwrap();

        (dir, path)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn get_bars_returns_correct_data() {
        let (_dir, path) = setup_test_data();
        let store = CsvPriceStore::new(path);

        let bars = store
            .get_bars("600000", d(2024, 1, 15), d(2024, 1, 17))
            .unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].code, "600000");
        assert_eq!(bars[0].date, d(2024, 1, 15));
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000.0);
        assert_eq!(bars[0].pct_chg, 1.5);
    }

    #[test]
    fn get_bars_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let store = CsvPriceStore::new(path);

        let bars = store
            .get_bars("600000", d(2024, 1, 16), d(2024, 1, 16))
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, d(2024, 1, 16));
    }

    #[test]
    fn pct_chg_derived_when_column_missing() {
        let (_dir, path) = setup_test_data();
        let store = CsvPriceStore::new(path);

        let bars = store
            .get_bars("000001", d(2024, 1, 3), NaiveDate::MAX)
            .unwrap();
        // sorted before deriving: 8.0 -> 10.0 -> 11.0
        assert_eq!(bars.len(), 2);
        assert!((bars[0].pct_chg - 25.0).abs() < 1e-9);
        assert!((bars[1].pct_chg - 10.0).abs() < 1e-9);
    }

    #[test]
    fn missing_file_is_data_source_error() {
        let (_dir, path) = setup_test_data();
        let store = CsvPriceStore::new(path);

        let result = store.get_bars("XYZ", d(2024, 1, 1), d(2024, 1, 31));
        assert!(matches!(result, Err(ScreenerError::DataSource { .. })));
    }

    #[test]
    fn malformed_row_is_csv_error() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("BAD.csv"),
            "date,open,high,low,close,volume\n2024-01-02,abc,1,1,1,1\n",
        )
        .unwrap();
        let store = CsvPriceStore::new(path);
        let result = store.get_bars("BAD", d(2024, 1, 1), d(2024, 1, 31));
        assert!(matches!(result, Err(ScreenerError::Csv(_))));
    }

    #[test]
    fn list_symbols_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let store = CsvPriceStore::new(path);
        assert_eq!(store.list_symbols().unwrap(), vec!["000001", "600000"]);
    }
}
