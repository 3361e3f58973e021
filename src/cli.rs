//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvPriceStore;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::trade_writer::{write_trades, write_trades_to};
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{
    parse_date, parse_periods, validate_backtest_config, validate_strategy_config,
};
use crate::domain::error::ScreenerError;
use crate::domain::indicator::macd::{DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};
use crate::domain::pattern::{Pattern, PatternParams, ShadowParams};
use crate::domain::screen::screen;
use crate::domain::strategy::{
    Alignment, AtrRule, BreakoutRule, CategoryWeights, CumulativeIncrease, MaRule, MacdRule,
    MacdSignal, PatternRule, RangeRule, RsiRule, SingleDayIncrease, StrategyConfig, VolumeRule,
};
use crate::domain::universe::{load_universe, parse_codes};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceStore;

const DEFAULT_VOLUME_MA_DAYS: i64 = 5;
const DEFAULT_MA_DAYS: &str = "5,10,20";
const DEFAULT_PATTERN_WINDOW: i64 = 5;
const DEFAULT_ATR_PERIOD: i64 = 14;
const DEFAULT_RSI_PERIOD: i64 = 14;

#[derive(Parser, Debug)]
#[command(name = "screener", about = "Technical-rule stock screener and signal backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay the strategy over the configured period
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated codes, overriding [backtest] codes
        #[arg(long)]
        codes: Option<String>,
        /// Write trade records here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Select instruments passing the strategy on one date
    Screen {
        #[arg(short, long)]
        config: PathBuf,
        /// YYYY-MM-DD
        #[arg(long)]
        date: String,
        #[arg(long)]
        codes: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List instruments available in the price store
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            codes,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, codes.as_deref())
            } else {
                run_backtest(&config, codes.as_deref(), output.as_ref())
            }
        }
        Command::Screen {
            config,
            date,
            codes,
        } => run_screen(&config, &date, codes.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ScreenerError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> ScreenerError {
    ScreenerError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: reason.into(),
    }
}

fn get_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<usize, ScreenerError> {
    let value = config.get_int(section, key, default);
    usize::try_from(value).map_err(|_| invalid(section, key, format!("{} must be non-negative", key)))
}

fn get_opt_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<usize>, ScreenerError> {
    if config.has_key(section, key) {
        get_usize(config, section, key, 0).map(Some)
    } else {
        Ok(None)
    }
}

fn get_opt_double(config: &dyn ConfigPort, section: &str, key: &str) -> Option<f64> {
    config
        .has_key(section, key)
        .then(|| config.get_double(section, key, 0.0))
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, ScreenerError> {
    let start_date = parse_date(config.get_string("backtest", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;
    let defaults = BacktestConfig::new(start_date, end_date);

    let entry_mode = match config.get_string("backtest", "entry_mode") {
        Some(s) => s.parse().map_err(|e: String| invalid("backtest", "entry_mode", e))?,
        None => defaults.entry_mode,
    };
    let exit_mode = match config.get_string("backtest", "exit_mode") {
        Some(s) => s.parse().map_err(|e: String| invalid("backtest", "exit_mode", e))?,
        None => defaults.exit_mode,
    };

    let bt = BacktestConfig {
        lookback: get_usize(config, "backtest", "lookback_days", defaults.lookback as i64)?,
        forward: get_usize(config, "backtest", "forward_days", defaults.forward as i64)?,
        fee_bps: config.get_double("backtest", "fee_bps", defaults.fee_bps),
        top_k: get_usize(config, "backtest", "top_k", 0)?,
        entry_mode,
        exit_mode,
        exclude_limit_up: config.get_bool("backtest", "exclude_limit_up", false),
        limit_up_threshold: config.get_double(
            "backtest",
            "limit_up_threshold",
            defaults.limit_up_threshold,
        ),
        require_full_lookback: config.get_bool("backtest", "require_full_lookback", true),
        ..defaults
    };
    bt.validate()?;
    Ok(bt)
}

fn build_range(config: &dyn ConfigPort) -> Result<Option<RangeRule>, ScreenerError> {
    let cumulative = get_opt_usize(config, "strategy", "range_days")?.map(|days| CumulativeIncrease {
        days,
        min_pct: config.get_double("strategy", "range_min_pct", 0.0),
    });
    let single_day =
        get_opt_usize(config, "strategy", "single_day_within")?.map(|within_days| SingleDayIncrease {
            within_days,
            min_pct: config.get_double("strategy", "single_day_min_pct", 0.0),
        });
    Ok((cumulative.is_some() || single_day.is_some()).then_some(RangeRule {
        cumulative,
        single_day,
    }))
}

fn build_volume(config: &dyn ConfigPort) -> Result<Option<VolumeRule>, ScreenerError> {
    let Some(mode) = config.get_string("strategy", "volume_mode") else {
        return Ok(None);
    };
    let ma_days = get_usize(config, "strategy", "volume_ma_days", DEFAULT_VOLUME_MA_DAYS)?;
    match mode.to_lowercase().as_str() {
        "breakout" => Ok(Some(VolumeRule::Breakout {
            ma_days,
            ratio_min: config.get_double("strategy", "volume_ratio_min", 0.0),
        })),
        "pullback" => Ok(Some(VolumeRule::Pullback {
            ma_days,
            ratio_max: config.get_double("strategy", "volume_ratio_max", 0.0),
            require_red: config.get_bool("strategy", "pullback_require_red", false),
            touch_ma: get_opt_usize(config, "strategy", "pullback_touch_ma")?,
        })),
        other => Err(invalid(
            "strategy",
            "volume_mode",
            format!("unknown volume mode '{}'", other),
        )),
    }
}

fn build_ma(config: &dyn ConfigPort) -> Result<Option<MaRule>, ScreenerError> {
    let alignment = match config
        .get_string("strategy", "ma_alignment")
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        None => None,
        Some("long") => Some(Alignment::Bullish),
        Some("short") => Some(Alignment::Bearish),
        Some(other) => {
            return Err(invalid(
                "strategy",
                "ma_alignment",
                format!("unknown alignment '{}'", other),
            ))
        }
    };
    let price_above = get_opt_usize(config, "strategy", "price_above_ma")?;
    if alignment.is_none() && price_above.is_none() {
        return Ok(None);
    }

    let raw = config
        .get_string("strategy", "ma_days")
        .unwrap_or_else(|| DEFAULT_MA_DAYS.to_string());
    let periods = parse_periods(&raw).map_err(|e| invalid("strategy", "ma_days", e))?;
    Ok(Some(MaRule {
        periods,
        alignment,
        price_above,
    }))
}

fn build_pattern_params(config: &dyn ConfigPort) -> PatternParams {
    let d = PatternParams::default();
    PatternParams {
        hammer: ShadowParams {
            body_ratio_max: config.get_double("patterns", "hammer_body_ratio_max", d.hammer.body_ratio_max),
            shadow_min: config.get_double("patterns", "hammer_shadow_min", d.hammer.shadow_min),
        },
        shooting_star: ShadowParams {
            body_ratio_max: config.get_double(
                "patterns",
                "shooting_star_body_ratio_max",
                d.shooting_star.body_ratio_max,
            ),
            shadow_min: config.get_double(
                "patterns",
                "shooting_star_shadow_min",
                d.shooting_star.shadow_min,
            ),
        },
        doji_threshold: config.get_double("patterns", "doji_threshold", d.doji_threshold),
        star_body_min_ratio: config.get_double(
            "patterns",
            "star_body_min_ratio",
            d.star_body_min_ratio,
        ),
    }
}

fn build_pattern(config: &dyn ConfigPort) -> Result<Option<PatternRule>, ScreenerError> {
    let Some(raw) = config.get_string("strategy", "patterns") else {
        return Ok(None);
    };
    let patterns = raw
        .split(',')
        .map(|t| t.parse::<Pattern>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid("strategy", "patterns", e.to_string()))?;
    Ok(Some(PatternRule {
        patterns,
        window: get_usize(config, "strategy", "pattern_window", DEFAULT_PATTERN_WINDOW)?,
        params: build_pattern_params(config),
    }))
}

fn build_macd(config: &dyn ConfigPort) -> Result<Option<MacdRule>, ScreenerError> {
    let Some(raw) = config.get_string("strategy", "macd_rule") else {
        return Ok(None);
    };
    let rule = MacdSignal::parse(&raw)
        .ok_or_else(|| invalid("strategy", "macd_rule", format!("unknown MACD rule '{}'", raw)))?;
    Ok(Some(MacdRule {
        fast: get_usize(config, "strategy", "macd_fast", DEFAULT_FAST as i64)?,
        slow: get_usize(config, "strategy", "macd_slow", DEFAULT_SLOW as i64)?,
        signal: get_usize(config, "strategy", "macd_signal", DEFAULT_SIGNAL as i64)?,
        rule,
    }))
}

fn build_weights(config: &dyn ConfigPort) -> CategoryWeights {
    let d = CategoryWeights::default();
    CategoryWeights {
        volume: config.get_double("weights", "volume", d.volume),
        ma: config.get_double("weights", "ma", d.ma),
        breakout: config.get_double("weights", "breakout", d.breakout),
        pattern: config.get_double("weights", "pattern", d.pattern),
        macd: config.get_double("weights", "macd", d.macd),
        rsi: config.get_double("weights", "rsi", d.rsi),
    }
}

pub fn build_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, ScreenerError> {
    let breakout = get_opt_usize(config, "strategy", "breakout_n")?.map(|n| BreakoutRule {
        n,
        min_break_pct: config.get_double("strategy", "breakout_min_pct", 0.0),
    });

    let atr = match get_opt_double(config, "strategy", "atr_max_pct") {
        Some(max_pct_of_price) => Some(AtrRule {
            period: get_usize(config, "strategy", "atr_period", DEFAULT_ATR_PERIOD)?,
            max_pct_of_price,
        }),
        None => None,
    };

    let rsi_min = get_opt_double(config, "strategy", "rsi_min");
    let rsi_max = get_opt_double(config, "strategy", "rsi_max");
    let rsi = if rsi_min.is_some() || rsi_max.is_some() {
        Some(RsiRule {
            period: get_usize(config, "strategy", "rsi_period", DEFAULT_RSI_PERIOD)?,
            min: rsi_min,
            max: rsi_max,
        })
    } else {
        None
    };

    let strategy = StrategyConfig {
        range: build_range(config)?,
        volume: build_volume(config)?,
        ma: build_ma(config)?,
        pattern: build_pattern(config)?,
        breakout,
        atr,
        macd: build_macd(config)?,
        rsi,
        weights: build_weights(config),
    };
    strategy.validate()?;
    Ok(strategy)
}

/// `--codes` wins over `[backtest] codes`, which wins over `[backtest] code`.
pub fn resolve_codes(
    code_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, ScreenerError> {
    let (raw, key) = match code_override {
        Some(c) => (c.to_string(), "codes"),
        None => match config.get_string("backtest", "codes") {
            Some(c) => (c, "codes"),
            None => match config.get_string("backtest", "code") {
                Some(c) => (c, "code"),
                None => {
                    return Err(ScreenerError::ConfigMissing {
                        section: "backtest".into(),
                        key: "codes".into(),
                    })
                }
            },
        },
    };
    parse_codes(&raw).map_err(|e| invalid("backtest", key, e.to_string()))
}

pub fn build_price_store(config: &dyn ConfigPort) -> Result<CsvPriceStore, ScreenerError> {
    let dir = config
        .get_string("data", "csv_dir")
        .ok_or_else(|| ScreenerError::ConfigMissing {
            section: "data".into(),
            key: "csv_dir".into(),
        })?;
    Ok(CsvPriceStore::new(PathBuf::from(dir)))
}

fn load_validated(
    config_path: &Path,
) -> Result<(FileConfigAdapter, StrategyConfig), ScreenerError> {
    let adapter = load_config(config_path)?;
    validate_strategy_config(&adapter)?;
    let strategy = build_strategy_config(&adapter)?;
    Ok((adapter, strategy))
}

fn print_summary(result: &BacktestResult) {
    let s = &result.summary;
    eprintln!("\n=== Backtest Summary ===");
    eprintln!("Period:           {} to {}", s.period.0, s.period.1);
    eprintln!(
        "Lookback/Forward: {} / {} days, entry {}, exit {}",
        s.lookback, s.forward_horizon, s.entry_mode, s.exit_mode
    );
    eprintln!("Fee:              {} bps per side, top_k {}", s.fee_bps, s.top_k);
    if s.exclude_limit_up {
        eprintln!("Limit-up filter:  pct_chg >= {}", s.limit_up_threshold);
    }
    eprintln!("Trades:           {}", s.count);
    eprintln!("Win Rate:         {:.2}%", s.win_rate);
    eprintln!("Avg Return:       {:.3}%", s.avg_return);
    eprintln!("Median Return:    {:.3}%", s.median_return);
    eprintln!("Avg After Fee:    {:.3}%", s.avg_return_after_fee);
    eprintln!("Max Drawdown:     {:.2}%", s.max_drawdown_pct);
    if let Some(last) = result.equity_curve.last() {
        eprintln!("Final Equity:     {:.4}", last);
    }
}

/// Engine run plus reporting, separated from config loading so any store works.
pub fn run_backtest_pipeline(
    store: &dyn PriceStore,
    strategy: &StrategyConfig,
    bt_config: &BacktestConfig,
    codes: &[String],
    output_path: Option<&Path>,
) -> Result<BacktestResult, ScreenerError> {
    eprintln!(
        "Running backtest: {} codes, {} to {}",
        codes.len(),
        bt_config.start_date,
        bt_config.end_date
    );
    let result = backtest_engine::run_backtest(store, codes, strategy, bt_config)?;
    print_summary(&result);

    match output_path {
        Some(path) => {
            write_trades(path, &result.records)?;
            eprintln!("\nTrades written to: {}", path.display());
        }
        None => write_trades_to(std::io::stdout().lock(), &result.records)?,
    }
    Ok(result)
}

fn run_backtest(
    config_path: &Path,
    codes_override: Option<&str>,
    output_path: Option<&PathBuf>,
) -> Result<(), ScreenerError> {
    let (adapter, strategy) = load_validated(config_path)?;
    validate_backtest_config(&adapter)?;
    let bt_config = build_backtest_config(&adapter)?;
    let codes = resolve_codes(codes_override, &adapter)?;
    let store = build_price_store(&adapter)?;

    run_backtest_pipeline(
        &store,
        &strategy,
        &bt_config,
        &codes,
        output_path.map(PathBuf::as_path),
    )?;
    Ok(())
}

pub fn run_dry_run(config_path: &Path, codes_override: Option<&str>) -> Result<(), ScreenerError> {
    let (adapter, strategy) = load_validated(config_path)?;
    validate_backtest_config(&adapter)?;
    let bt_config = build_backtest_config(&adapter)?;
    let codes = resolve_codes(codes_override, &adapter)?;
    eprintln!("Config validated successfully");

    eprintln!("\nEnabled rule blocks:");
    for category in strategy.enabled_categories() {
        match strategy.weights.weight(category) {
            Some(w) => eprintln!("  {} (weight {})", category, w),
            None => eprintln!("  {} (filter)", category),
        }
    }

    eprintln!("\nBacktest:");
    eprintln!("  period: {} to {}", bt_config.start_date, bt_config.end_date);
    eprintln!(
        "  lookback {}, forward {}, fee {} bps, top_k {}",
        bt_config.lookback, bt_config.forward, bt_config.fee_bps, bt_config.top_k
    );
    eprintln!("\nUniverse:");
    eprintln!("  codes: {}", codes.join(", "));

    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_screen(
    config_path: &Path,
    date: &str,
    codes_override: Option<&str>,
) -> Result<(), ScreenerError> {
    let (adapter, strategy) = load_validated(config_path)?;
    let as_of = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
        ScreenerError::configuration(format!("invalid --date '{}', expected YYYY-MM-DD", date))
    })?;
    let lookback = get_usize(
        &adapter,
        "backtest",
        "lookback_days",
        backtest_engine::DEFAULT_LOOKBACK as i64,
    )?;
    let require_full_lookback = adapter.get_bool("backtest", "require_full_lookback", true);
    let codes = resolve_codes(codes_override, &adapter)?;
    let store = build_price_store(&adapter)?;

    let universe = load_universe(&store, &codes, NaiveDate::MIN)?;
    let selected = screen(
        &universe.instruments,
        as_of,
        lookback,
        require_full_lookback,
        &strategy,
    )?;

    for eval in &selected {
        println!("{}\t{:.3}\t{}", eval.code, eval.score, eval.summary_line());
    }
    eprintln!(
        "{} of {} instruments pass on {}",
        selected.len(),
        universe.instruments.len(),
        as_of
    );
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), ScreenerError> {
    let (adapter, strategy) = load_validated(config_path)?;

    if adapter.has_key("backtest", "start_date") || adapter.has_key("backtest", "end_date") {
        validate_backtest_config(&adapter)?;
        build_backtest_config(&adapter)?;
    }

    let enabled = strategy.enabled_categories();
    if enabled.is_empty() {
        eprintln!("No rule blocks enabled: every instrument passes");
    } else {
        let names: Vec<&str> = enabled.iter().map(|c| c.name()).collect();
        eprintln!("Rule blocks: {}", names.join(", "));
    }
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_list_symbols(config_path: &Path) -> Result<(), ScreenerError> {
    let adapter = load_config(config_path)?;
    let store = build_price_store(&adapter)?;
    let symbols = store.list_symbols()?;

    if symbols.is_empty() {
        eprintln!("No symbols found");
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}
