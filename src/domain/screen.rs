//! Single-date selection: which instruments pass the strategy as of one day.

use crate::domain::error::ScreenerError;
use crate::domain::instrument_data::InstrumentData;
use crate::domain::signal_eval::{evaluate, min_window_bars, Evaluation};
use crate::domain::strategy::StrategyConfig;
use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::debug;

/// Evaluate every instrument on its last `lookback + 1` bars ending at `as_of`.
///
/// Instruments without a bar on `as_of` are left out, as are those with a
/// window shorter than a backtest with the same settings would accept.
/// Passing evaluations are returned by descending score, equal scores in
/// universe order.
pub fn screen(
    instruments: &[InstrumentData],
    as_of: NaiveDate,
    lookback: usize,
    require_full_lookback: bool,
    strategy: &StrategyConfig,
) -> Result<Vec<Evaluation>, ScreenerError> {
    strategy.validate()?;
    let minimum = min_window_bars(lookback, require_full_lookback);

    let mut passing: Vec<Evaluation> = instruments
        .par_iter()
        .filter_map(|data| {
            let Some(end) = data.get_bar_index(as_of) else {
                debug!(code = %data.code, %as_of, "screen: no bar on date");
                return None;
            };
            let window = &data.bars[end.saturating_sub(lookback)..=end];
            if window.len() < minimum {
                debug!(
                    code = %data.code,
                    %as_of,
                    bars = window.len(),
                    minimum,
                    "screen: insufficient_data"
                );
                return None;
            }
            let eval = evaluate(&data.code, window, strategy);
            eval.passed.then_some(eval)
        })
        .collect();

    passing.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(passing)
}
