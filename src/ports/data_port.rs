//! Price store port: the external collaborator that supplies bars.

use crate::domain::bar::Bar;
use crate::domain::error::ScreenerError;
use chrono::NaiveDate;

pub trait PriceStore: Sync {
    /// Bars for `code` dated within `[start, end]`, ascending and unique per date.
    fn get_bars(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, ScreenerError>;

    fn list_symbols(&self) -> Result<Vec<String>, ScreenerError>;
}
