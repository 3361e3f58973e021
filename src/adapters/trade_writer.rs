//! CSV export of a backtest's trade records.

use crate::domain::backtest::TradeRecord;
use crate::domain::error::ScreenerError;
use std::io::Write;
use std::path::Path;

/// Write `records` with a header row to any writer.
pub fn write_trades_to<W: Write>(writer: W, records: &[TradeRecord]) -> Result<(), ScreenerError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_trades(path: &Path, records: &[TradeRecord]) -> Result<(), ScreenerError> {
    let file = std::fs::File::create(path)?;
    write_trades_to(file, records)
}
