//! INI file configuration adapter.

use crate::domain::error::TraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| TraderError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    /// An adapter with no sections; every lookup falls back to its default.
    pub fn empty() -> Self {
        Self { config: Ini::new() }
    }

    /// Override a single value, as command-line flags do.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.config.set(section, key, Some(value.to_string()));
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
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
    fn from_string_parses_config() {
        let content = r#"
[data]
source = csv
data_dir = ./data

[backtest]
initial_capital = 10000.0

[elliott]
preset = v2.5
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(adapter.get_string("data", "source"), Some("csv".to_string()));
        assert_eq!(adapter.get_string("elliott", "preset"), Some("v2.5".to_string()));
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[backtest]\ninitial_capital = 100\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value_or_default() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nmax_open_positions = 5\nbad = abc\n")
            .unwrap();
        assert_eq!(adapter.get_int("backtest", "max_open_positions", 0), 5);
        assert_eq!(adapter.get_int("backtest", "missing", 42), 42);
        assert_eq!(adapter.get_int("backtest", "bad", 42), 42);
    }

    #[test]
    fn get_double_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[risk]\nreward_ratio = 2.5\nbad = not_a_number\n").unwrap();
        assert_eq!(adapter.get_double("risk", "reward_ratio", 0.0), 2.5);
        assert_eq!(adapter.get_double("risk", "missing", 99.9), 99.9);
        assert_eq!(adapter.get_double("risk", "bad", 99.9), 99.9);
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[elliott]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = off\n",
        )
        .unwrap();
        assert!(adapter.get_bool("elliott", "a", false));
        assert!(adapter.get_bool("elliott", "b", false));
        assert!(adapter.get_bool("elliott", "c", false));
        assert!(!adapter.get_bool("elliott", "d", true));
        assert!(!adapter.get_bool("elliott", "e", true));
        assert!(!adapter.get_bool("elliott", "f", true));
        assert!(adapter.get_bool("elliott", "missing", true));
    }

    #[test]
    fn get_list_splits_and_trims() {
        let adapter =
            FileConfigAdapter::from_string("[data]\nsymbols = BTCUSDT, ETHUSDT,,SOLUSDT \n").unwrap();
        assert_eq!(
            adapter.get_list("data", "symbols"),
            vec!["BTCUSDT", "ETHUSDT", "SOLUSDT"]
        );
        assert!(adapter.get_list("data", "missing").is_empty());
    }

    #[test]
    fn set_overrides_value() {
        let mut adapter = FileConfigAdapter::from_string("[data]\ninterval = 1h\n").unwrap();
        adapter.set("data", "interval", "4h");
        adapter.set("data", "symbols", "BTCUSDT");
        assert_eq!(adapter.get_string("data", "interval"), Some("4h".to_string()));
        assert_eq!(adapter.get_string("data", "symbols"), Some("BTCUSDT".to_string()));
    }

    #[test]
    fn empty_adapter_uses_defaults() {
        let adapter = FileConfigAdapter::empty();
        assert_eq!(adapter.get_int("backtest", "min_data_points", 200), 200);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[report]\noutput = /tmp/report.html\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("report", "output"),
            Some("/tmp/report.html".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(TraderError::ConfigParse { .. })));
    }
}
