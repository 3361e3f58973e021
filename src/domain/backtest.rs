//! Backtest engine: walks the trading calendar, evaluates every instrument per
//! day, ranks and caps the day's candidates, then prices entry and exit.
//!
//! Per day the instrument evaluations run in parallel. Top-K selection waits
//! for all of them, and records are appended in (day, universe order), so the
//! output does not depend on thread scheduling.

use crate::domain::bar::Bar;
use crate::domain::error::ScreenerError;
use crate::domain::execution::{
    fee_adjusted_return_pct, raw_return_pct, resolve_entry, resolve_exit, EntryMode, ExitMode,
    Fill,
};
use crate::domain::instrument_data::InstrumentData;
use crate::domain::metrics::{equity_curve, round_dp, ReturnStats};
use crate::domain::signal_eval::{self, evaluate};
use crate::domain::strategy::{Category, StrategyConfig};
use crate::domain::universe::load_universe;
use crate::ports::data_port::PriceStore;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const DEFAULT_LOOKBACK: usize = 60;
pub const DEFAULT_FORWARD: usize = 5;
pub const DEFAULT_FEE_BPS: f64 = 3.0;
pub const DEFAULT_LIMIT_UP_THRESHOLD: f64 = 9.8;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Trading dates of history before the signal date.
    pub lookback: usize,
    /// Bars held before exit.
    pub forward: usize,
    /// Per side, per-mille.
    pub fee_bps: f64,
    /// Per-day candidate cap; 0 keeps everything.
    pub top_k: usize,
    pub entry_mode: EntryMode,
    pub exit_mode: ExitMode,
    pub exclude_limit_up: bool,
    pub limit_up_threshold: f64,
    /// Require `lookback + 1` bars in the window instead of the evaluator minimum.
    pub require_full_lookback: bool,
}

impl BacktestConfig {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            lookback: DEFAULT_LOOKBACK,
            forward: DEFAULT_FORWARD,
            fee_bps: DEFAULT_FEE_BPS,
            top_k: 0,
            entry_mode: EntryMode::Close,
            exit_mode: ExitMode::Close,
            exclude_limit_up: false,
            limit_up_threshold: DEFAULT_LIMIT_UP_THRESHOLD,
            require_full_lookback: true,
        }
    }

    pub fn validate(&self) -> Result<(), ScreenerError> {
        if self.start_date > self.end_date {
            return Err(ScreenerError::configuration(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        if self.lookback == 0 {
            return Err(ScreenerError::configuration("lookback_days must be at least 1"));
        }
        if self.forward == 0 {
            return Err(ScreenerError::configuration("forward_days must be at least 1"));
        }
        if !self.fee_bps.is_finite() || self.fee_bps < 0.0 {
            return Err(ScreenerError::configuration(
                "fee_bps must be finite and non-negative",
            ));
        }
        if self.exclude_limit_up && !self.limit_up_threshold.is_finite() {
            return Err(ScreenerError::configuration("limit_up_threshold must be finite"));
        }
        Ok(())
    }

    /// Bars an evaluation window must hold.
    pub fn min_window_bars(&self) -> usize {
        signal_eval::min_window_bars(self.lookback, self.require_full_lookback)
    }
}

/// A passing (day, instrument) evaluation with its resolved entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Position in the universe.
    pub rank: usize,
    pub code: String,
    pub signal_date: NaiveDate,
    pub entry: Fill,
    pub score: f64,
    pub checks: BTreeMap<Category, bool>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TradeRecord {
    pub signal_date: NaiveDate,
    pub code: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub raw_return_pct: f64,
    pub fee_adjusted_return_pct: f64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BacktestSummary {
    pub count: usize,
    pub win_rate: f64,
    pub avg_return: f64,
    pub median_return: f64,
    pub avg_return_after_fee: f64,
    pub max_drawdown_pct: f64,
    pub period: (NaiveDate, NaiveDate),
    pub lookback: usize,
    pub forward_horizon: usize,
    pub fee_bps: f64,
    pub top_k: usize,
    pub entry_mode: EntryMode,
    pub exit_mode: ExitMode,
    pub exclude_limit_up: bool,
    pub limit_up_threshold: f64,
}

impl BacktestSummary {
    fn new(stats: ReturnStats, config: &BacktestConfig) -> Self {
        Self {
            count: stats.count,
            win_rate: stats.win_rate,
            avg_return: stats.avg_return,
            median_return: stats.median_return,
            avg_return_after_fee: stats.avg_return_after_fee,
            max_drawdown_pct: stats.max_drawdown_pct,
            period: (config.start_date, config.end_date),
            lookback: config.lookback,
            forward_horizon: config.forward,
            fee_bps: config.fee_bps,
            top_k: config.top_k,
            entry_mode: config.entry_mode,
            exit_mode: config.exit_mode,
            exclude_limit_up: config.exclude_limit_up,
            limit_up_threshold: config.limit_up_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub records: Vec<TradeRecord>,
    pub summary: BacktestSummary,
    /// `[1.0, ...]`, one point per record after the seed.
    pub equity_curve: Vec<f64>,
}

/// Keep the `top_k` highest scores when the day has more candidates.
///
/// Equal scores keep universe order. The retained set is returned in
/// universe order.
pub fn select_top_k(mut candidates: Vec<Candidate>, top_k: usize) -> Vec<Candidate> {
    if top_k == 0 || candidates.len() <= top_k {
        return candidates;
    }
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.rank.cmp(&b.rank)));
    candidates.truncate(top_k);
    candidates.sort_by_key(|c| c.rank);
    candidates
}

/// `Ok(None)` when the pair is filtered out. Errors are local to the pair
/// and only skip it.
fn consider(
    rank: usize,
    data: &InstrumentData,
    signal_date: NaiveDate,
    window_start: NaiveDate,
    strategy: &StrategyConfig,
    config: &BacktestConfig,
) -> Result<Option<Candidate>, ScreenerError> {
    let code = data.code.as_str();
    let today = data.get_bar(signal_date);
    if today.is_none() && config.entry_mode == EntryMode::Close {
        debug!(%signal_date, code, "skip: no bar on signal date");
        return Ok(None);
    }
    if config.exclude_limit_up {
        if let Some(bar) = today.filter(|b| b.pct_chg >= config.limit_up_threshold) {
            debug!(%signal_date, code, pct_chg = bar.pct_chg, "skip: limit up");
            return Ok(None);
        }
    }

    let window: &[Bar] = data.window(window_start, signal_date);
    let minimum = config.min_window_bars();
    if window.len() < minimum {
        return Err(ScreenerError::InsufficientData {
            code: code.to_string(),
            bars: window.len(),
            minimum,
        });
    }

    let eval = evaluate(code, window, strategy);
    if !eval.passed {
        debug!(%signal_date, code, checks = %eval.summary_line(), "skip: rules not met");
        return Ok(None);
    }

    let entry = resolve_entry(data, signal_date, config.entry_mode)?;
    Ok(Some(Candidate {
        rank,
        code: code.to_string(),
        signal_date,
        entry,
        score: eval.score,
        checks: eval.checks,
    }))
}

fn to_record(
    candidate: &Candidate,
    data: &InstrumentData,
    config: &BacktestConfig,
) -> Result<TradeRecord, ScreenerError> {
    let exit = resolve_exit(data, &candidate.entry, config.forward, config.exit_mode)?;
    let raw = raw_return_pct(candidate.entry.price, exit.price);
    Ok(TradeRecord {
        signal_date: candidate.signal_date,
        code: candidate.code.clone(),
        entry_date: candidate.entry.date,
        entry_price: round_dp(candidate.entry.price, 4),
        exit_date: exit.date,
        exit_price: round_dp(exit.price, 4),
        raw_return_pct: round_dp(raw, 4),
        fee_adjusted_return_pct: round_dp(fee_adjusted_return_pct(raw, config.fee_bps), 4),
        score: round_dp(candidate.score, 3),
    })
}

/// Replay `strategy` over the trading dates in `[start_date, end_date]`.
///
/// Configuration errors surface before any day is processed. Per-instrument
/// data problems only skip that instrument or (day, instrument).
pub fn run_backtest(
    store: &dyn PriceStore,
    codes: &[String],
    strategy: &StrategyConfig,
    config: &BacktestConfig,
) -> Result<BacktestResult, ScreenerError> {
    strategy.validate()?;
    config.validate()?;

    info!(
        instruments = codes.len(),
        start = %config.start_date,
        end = %config.end_date,
        lookback = config.lookback,
        forward = config.forward,
        "starting backtest"
    );

    let universe = load_universe(store, codes, config.start_date)?;
    let dates = universe.trading_dates(config.start_date, config.end_date);
    let instruments = universe.instruments;

    let records: Vec<TradeRecord> = dates
        .iter()
        .enumerate()
        .skip(1)
        .flat_map(|(i, &signal_date)| {
            let window_start = dates[i.saturating_sub(config.lookback)];
            let candidates: Vec<Candidate> = instruments
                .par_iter()
                .enumerate()
                .filter_map(|(rank, data)| {
                    consider(rank, data, signal_date, window_start, strategy, config)
                        .unwrap_or_else(|e| {
                            debug!(%signal_date, code = %data.code, error = %e, "skip");
                            None
                        })
                })
                .collect();

            select_top_k(candidates, config.top_k)
                .into_iter()
                .filter_map(|c| match to_record(&c, &instruments[c.rank], config) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        debug!(%signal_date, code = %c.code, error = %e, "skip: incomplete horizon");
                        None
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let raw: Vec<f64> = records.iter().map(|r| r.raw_return_pct).collect();
    let after_fee: Vec<f64> = records.iter().map(|r| r.fee_adjusted_return_pct).collect();
    let curve = equity_curve(&after_fee);
    let summary = BacktestSummary::new(ReturnStats::compute(&raw, &after_fee, &curve), config);

    info!(
        trading_days = dates.len(),
        trades = summary.count,
        win_rate = summary.win_rate,
        max_drawdown_pct = summary.max_drawdown_pct,
        "backtest complete"
    );

    Ok(BacktestResult {
        records,
        summary,
        equity_curve: curve,
    })
}
