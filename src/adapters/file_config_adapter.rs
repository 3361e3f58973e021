//! INI file configuration adapter.

use crate::domain::error::ScreenerError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScreenerError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| ScreenerError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, ScreenerError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| ScreenerError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    /// Blank values read as absent.
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.get_string(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.get_string(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.get_string(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_sections() {
        let content = r#"
[data]
csv_dir = /var/lib/prices

[backtest]
codes = 600000,000001
lookback_days = 60

[strategy]
macd_rule = dif>dea
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "csv_dir"),
            Some("/var/lib/prices".to_string())
        );
        assert_eq!(
            adapter.get_string("backtest", "codes"),
            Some("600000,000001".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "macd_rule"),
            Some("dif>dea".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_or_blank() {
        let adapter = FileConfigAdapter::from_string("[backtest]\ntop_k =\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "top_k"), None);
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ntop_k = 5\nforward_days = abc\n").unwrap();
        assert_eq!(adapter.get_int("backtest", "top_k", 0), 5);
        assert_eq!(adapter.get_int("backtest", "forward_days", 42), 42);
        assert_eq!(adapter.get_int("backtest", "missing", 7), 7);
    }

    #[test]
    fn get_double_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nfee_bps = 2.5\nlimit_up_threshold = x\n")
                .unwrap();
        assert_eq!(adapter.get_double("backtest", "fee_bps", 0.0), 2.5);
        assert_eq!(adapter.get_double("backtest", "limit_up_threshold", 9.8), 9.8);
    }

    #[test]
    fn get_bool_variants() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\na = true\nb = YES\nc = 0\nd = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("backtest", "a", false));
        assert!(adapter.get_bool("backtest", "b", false));
        assert!(!adapter.get_bool("backtest", "c", true));
        assert!(adapter.get_bool("backtest", "d", true));
        assert!(!adapter.get_bool("backtest", "missing", false));
    }

    #[test]
    fn has_key_follows_get_string() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nrsi_min = 30\n").unwrap();
        assert!(adapter.has_key("strategy", "rsi_min"));
        assert!(!adapter.has_key("strategy", "rsi_max"));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[data]\ncsv_dir = ./prices\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "csv_dir"),
            Some("./prices".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/screener.ini").unwrap_err();
        assert!(
            matches!(err, ScreenerError::ConfigParse { file, .. } if file.contains("screener.ini"))
        );
    }
}
