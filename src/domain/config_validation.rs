//! Configuration key validation.
//!
//! Checks formats, ranges and required companions before any domain value is
//! built. Absent optional keys are fine; present keys must parse.

use crate::domain::error::ScreenerError;
use crate::domain::execution::{EntryMode, ExitMode};
use crate::domain::pattern::Pattern;
use crate::domain::strategy::MacdSignal;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

const STRATEGY: &str = "strategy";
const BACKTEST: &str = "backtest";

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    validate_dates(config)?;
    validate_int(config, BACKTEST, "lookback_days", 1)?;
    validate_int(config, BACKTEST, "forward_days", 1)?;
    validate_int(config, BACKTEST, "top_k", 0)?;
    validate_number(config, BACKTEST, "fee_bps", Some(0.0))?;
    validate_number(config, BACKTEST, "limit_up_threshold", None)?;
    validate_bool(config, BACKTEST, "exclude_limit_up")?;
    validate_bool(config, BACKTEST, "require_full_lookback")?;
    validate_parse::<EntryMode>(config, BACKTEST, "entry_mode")?;
    validate_parse::<ExitMode>(config, BACKTEST, "exit_mode")?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    validate_range(config)?;
    validate_volume(config)?;
    validate_ma(config)?;
    validate_patterns(config)?;

    validate_int(config, STRATEGY, "breakout_n", 1)?;
    validate_number(config, STRATEGY, "breakout_min_pct", None)?;

    validate_int(config, STRATEGY, "atr_period", 1)?;
    validate_number(config, STRATEGY, "atr_max_pct", None)?;
    if config.has_key(STRATEGY, "atr_max_pct") && config.get_double(STRATEGY, "atr_max_pct", 0.0) <= 0.0 {
        return Err(invalid(STRATEGY, "atr_max_pct", "atr_max_pct must be positive"));
    }

    if let Some(rule) = config.get_string(STRATEGY, "macd_rule") {
        if MacdSignal::parse(&rule).is_none() {
            return Err(invalid(
                STRATEGY,
                "macd_rule",
                format!("unknown MACD rule '{}', expected hist>0, dif>dea or golden_cross", rule),
            ));
        }
    }
    for key in ["macd_fast", "macd_slow", "macd_signal"] {
        validate_int(config, STRATEGY, key, 1)?;
    }

    validate_int(config, STRATEGY, "rsi_period", 1)?;
    validate_number(config, STRATEGY, "rsi_min", Some(0.0))?;
    validate_number(config, STRATEGY, "rsi_max", Some(0.0))?;
    if config.has_key(STRATEGY, "rsi_min")
        && config.has_key(STRATEGY, "rsi_max")
        && config.get_double(STRATEGY, "rsi_min", 0.0) > config.get_double(STRATEGY, "rsi_max", 100.0)
    {
        return Err(invalid(STRATEGY, "rsi_min", "rsi_min must not exceed rsi_max"));
    }

    for key in [
        "hammer_body_ratio_max",
        "hammer_shadow_min",
        "shooting_star_body_ratio_max",
        "shooting_star_shadow_min",
        "doji_threshold",
        "star_body_min_ratio",
    ] {
        validate_number(config, "patterns", key, Some(0.0))?;
    }

    for key in ["volume", "ma", "breakout", "pattern", "macd", "rsi"] {
        validate_number(config, "weights", key, Some(0.0))?;
    }

    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> ScreenerError {
    ScreenerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> ScreenerError {
    ScreenerError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), ScreenerError> {
    if config.has_key(section, key) {
        Ok(())
    } else {
        Err(missing(section, key))
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    let start_str = config.get_string(BACKTEST, "start_date");
    let end_str = config.get_string(BACKTEST, "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date > end_date {
        return Err(invalid(
            BACKTEST,
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, ScreenerError> {
    match value {
        None => Err(missing(BACKTEST, field)),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                BACKTEST,
                field,
                format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn validate_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    min: i64,
) -> Result<(), ScreenerError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(());
    };
    match raw.trim().parse::<i64>() {
        Ok(v) if v >= min => Ok(()),
        Ok(_) => Err(invalid(section, key, format!("{} must be at least {}", key, min))),
        Err(_) => Err(invalid(section, key, format!("{} must be an integer", key))),
    }
}

fn validate_number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    min: Option<f64>,
) -> Result<(), ScreenerError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(());
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if !v.is_finite() => Err(invalid(section, key, format!("{} must be finite", key))),
        Ok(v) if min.is_some_and(|m| v < m) => Err(invalid(
            section,
            key,
            format!("{} must be non-negative", key),
        )),
        Ok(_) => Ok(()),
        Err(_) => Err(invalid(section, key, format!("{} must be a number", key))),
    }
}

fn validate_bool(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), ScreenerError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(());
    };
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "false" | "no" | "0" => Ok(()),
        _ => Err(invalid(section, key, format!("{} must be true or false", key))),
    }
}

fn validate_parse<T>(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), ScreenerError>
where
    T: std::str::FromStr<Err = String>,
{
    match config.get_string(section, key) {
        Some(raw) => raw.parse::<T>().map(|_| ()).map_err(|e| invalid(section, key, e)),
        None => Ok(()),
    }
}

fn validate_range(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    validate_int(config, STRATEGY, "range_days", 1)?;
    validate_number(config, STRATEGY, "range_min_pct", None)?;
    if config.has_key(STRATEGY, "range_days") {
        require(config, STRATEGY, "range_min_pct")?;
    }

    validate_int(config, STRATEGY, "single_day_within", 1)?;
    validate_number(config, STRATEGY, "single_day_min_pct", None)?;
    if config.has_key(STRATEGY, "single_day_within") {
        require(config, STRATEGY, "single_day_min_pct")?;
    }
    Ok(())
}

fn validate_volume(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    validate_int(config, STRATEGY, "volume_ma_days", 1)?;
    validate_number(config, STRATEGY, "volume_ratio_min", Some(0.0))?;
    validate_number(config, STRATEGY, "volume_ratio_max", Some(0.0))?;
    validate_bool(config, STRATEGY, "pullback_require_red")?;
    validate_int(config, STRATEGY, "pullback_touch_ma", 1)?;

    match config
        .get_string(STRATEGY, "volume_mode")
        .map(|m| m.trim().to_lowercase())
        .as_deref()
    {
        None => Ok(()),
        Some("breakout") => require(config, STRATEGY, "volume_ratio_min"),
        Some("pullback") => require(config, STRATEGY, "volume_ratio_max"),
        Some(other) => Err(invalid(
            STRATEGY,
            "volume_mode",
            format!("unknown volume mode '{}', expected breakout or pullback", other),
        )),
    }
}

/// Comma-separated positive periods, e.g. `5,10,20`.
pub fn parse_periods(raw: &str) -> Result<Vec<usize>, String> {
    raw.split(',')
        .map(|t| match t.trim().parse::<usize>() {
            Ok(p) if p > 0 => Ok(p),
            _ => Err(format!("'{}' is not a positive period", t.trim())),
        })
        .collect()
}

fn validate_ma(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    if let Some(raw) = config.get_string(STRATEGY, "ma_days") {
        parse_periods(&raw).map_err(|e| invalid(STRATEGY, "ma_days", e))?;
    }
    validate_int(config, STRATEGY, "price_above_ma", 1)?;
    match config
        .get_string(STRATEGY, "ma_alignment")
        .map(|m| m.trim().to_lowercase())
        .as_deref()
    {
        None | Some("long") | Some("short") => Ok(()),
        Some(other) => Err(invalid(
            STRATEGY,
            "ma_alignment",
            format!("unknown alignment '{}', expected long or short", other),
        )),
    }
}

fn validate_patterns(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    validate_int(config, STRATEGY, "pattern_window", 1)?;
    let Some(raw) = config.get_string(STRATEGY, "patterns") else {
        return Ok(());
    };
    for token in raw.split(',') {
        token
            .parse::<Pattern>()
            .map_err(|e| invalid(STRATEGY, "patterns", e.to_string()))?;
    }
    Ok(())
}
