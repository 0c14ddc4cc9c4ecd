//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive (configparser lower-cases them).

use crate::domain::error::TickerError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TickerError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| TickerError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, TickerError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| TickerError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
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

    fn sections(&self) -> Vec<String> {
        self.config.sections()
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
[sqlite]
path = /var/lib/tickerlens/bars.db
pool_size = 8

[providers]
order = alphavantage, yahoo
timeout_secs = 15
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("sqlite", "path"),
            Some("/var/lib/tickerlens/bars.db".to_string())
        );
        assert_eq!(adapter.get_int("sqlite", "pool_size", 4), 8);
        assert_eq!(
            adapter.get_string("providers", "order"),
            Some("alphavantage, yahoo".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_or_blank() {
        let adapter =
            FileConfigAdapter::from_string("[alphavantage]\napi_key =\nbase_url = x\n").unwrap();
        assert_eq!(adapter.get_string("alphavantage", "api_key"), None);
        assert_eq!(adapter.get_string("alphavantage", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_default_for_missing_or_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[analytics]\nmax_days = abc\n").unwrap();
        assert_eq!(adapter.get_int("analytics", "max_days", 365), 365);
        assert_eq!(adapter.get_int("analytics", "warmup_days", 60), 60);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter =
            FileConfigAdapter::from_string("[instrument:tcs]\nmarket_cap = 1.25e13\n").unwrap();
        assert_eq!(
            adapter.get_double("instrument:tcs", "market_cap", 0.0),
            1.25e13
        );
        assert_eq!(adapter.get_double("instrument:tcs", "missing", 9.5), 9.5);
    }

    #[test]
    fn sections_are_lowercased() {
        let adapter =
            FileConfigAdapter::from_string("[Catalog]\nsymbols = TCS\n[Instrument:TCS]\nname = Tata\n")
                .unwrap();
        let mut sections = adapter.sections();
        sections.sort();
        assert_eq!(sections, vec!["catalog", "instrument:tcs"]);
        assert_eq!(adapter.get_string("CATALOG", "SYMBOLS"), Some("TCS".into()));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[csv]\npath = /data/csv\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("csv", "path"), Some("/data/csv".to_string()));
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        match FileConfigAdapter::from_file("/nonexistent/path/config.ini") {
            Err(TickerError::ConfigParse { file, .. }) => {
                assert!(file.contains("config.ini"))
            }
            Err(other) => panic!("expected ConfigParse, got {other}"),
            Ok(_) => panic!("expected error"),
        }
    }
}
