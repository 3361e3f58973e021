//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for screener.
#[derive(Debug, thiserror::Error)]
pub enum ScreenerError {
    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    /// A strategy or backtest configuration that cannot be run.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("insufficient data for {code}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error("missing {field} price for {code} on or after {date}")]
    MissingPrice {
        code: String,
        date: NaiveDate,
        field: &'static str,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScreenerError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        ScreenerError::Configuration {
            reason: reason.into(),
        }
    }
}

impl From<&ScreenerError> for std::process::ExitCode {
    fn from(err: &ScreenerError) -> Self {
        let code: u8 = match err {
            ScreenerError::Io(_) | ScreenerError::Csv(_) => 1,
            ScreenerError::ConfigParse { .. }
            | ScreenerError::ConfigMissing { .. }
            | ScreenerError::ConfigInvalid { .. }
            | ScreenerError::Configuration { .. } => 2,
            ScreenerError::DataSource { .. } => 3,
            ScreenerError::NoData { .. }
            | ScreenerError::InsufficientData { .. }
            | ScreenerError::MissingPrice { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
