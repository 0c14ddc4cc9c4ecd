//! Typed, validated configuration.
//!
//! Every value is read and checked once, up front, so that a bad config
//! file fails at startup rather than halfway through a request.

use crate::domain::acquisition::FreshnessPolicy;
use crate::domain::error::TickerError;
use crate::domain::instrument::{normalize_symbol, Instrument};
use crate::ports::config_port::ConfigPort;

pub const ALPHA_VANTAGE_KEY_ENV: &str = "ALPHA_VANTAGE_API_KEY";
pub const DEFAULT_PROVIDER_ORDER: &str = "alphavantage,yahoo";
const INSTRUMENT_PREFIX: &str = "instrument:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    AlphaVantage,
    Yahoo,
    Csv,
}

impl ProviderKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "alphavantage" | "alpha_vantage" => Some(ProviderKind::AlphaVantage),
            "yahoo" => Some(ProviderKind::Yahoo),
            "csv" => Some(ProviderKind::Csv),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::AlphaVantage => "alphavantage",
            ProviderKind::Yahoo => "yahoo",
            ProviderKind::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlphaVantageSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub outputsize: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YahooSettings {
    pub base_url: String,
    /// Appended to symbols that carry no exchange suffix, e.g. `.NS`.
    pub symbol_suffix: Option<String>,
    pub range: String,
}

/// Windows and limits used by the exposed operations, all in calendar days
/// unless noted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticsSettings {
    pub summary_lookback_days: i64,
    pub technicals_lookback_days: i64,
    pub movers_lookback_days: i64,
    pub warmup_days: i64,
    pub max_days: i64,
    /// Maximum number of gainers (and of losers) returned.
    pub max_movers: usize,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            summary_lookback_days: 365,
            technicals_lookback_days: 180,
            movers_lookback_days: 14,
            warmup_days: 60,
            max_days: 365,
            max_movers: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub freshness: FreshnessPolicy,
    pub provider_order: Vec<ProviderKind>,
    pub timeout_secs: u64,
    pub alphavantage: AlphaVantageSettings,
    pub yahoo: YahooSettings,
    pub csv_path: Option<String>,
    pub analytics: AnalyticsSettings,
    pub catalog: Vec<Instrument>,
    pub listen: String,
    pub log_level: String,
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TickerError {
    TickerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn non_negative(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<i64, TickerError> {
    let value = config.get_int(section, key, default);
    if value < 0 {
        return Err(invalid(section, key, format!("{key} must be non-negative")));
    }
    Ok(value)
}

fn positive(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<i64, TickerError> {
    let value = config.get_int(section, key, default);
    if value <= 0 {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    Ok(value)
}

impl Settings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TickerError> {
        let freshness = FreshnessPolicy {
            max_staleness_days: non_negative(config, "freshness", "max_staleness_days", 1)?,
            coverage_slack_days: non_negative(config, "freshness", "coverage_slack_days", 5)?,
        };

        let provider_order = parse_provider_order(
            &config
                .get_string("providers", "order")
                .unwrap_or_else(|| DEFAULT_PROVIDER_ORDER.to_string()),
        )?;
        let timeout_secs = positive(config, "providers", "timeout_secs", 30)? as u64;

        let alphavantage = AlphaVantageSettings {
            api_key: config.get_string("alphavantage", "api_key").or_else(|| {
                std::env::var(ALPHA_VANTAGE_KEY_ENV)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            }),
            base_url: config
                .get_string("alphavantage", "base_url")
                .unwrap_or_else(|| "https://www.alphavantage.co/query".to_string()),
            outputsize: config
                .get_string("alphavantage", "outputsize")
                .unwrap_or_else(|| "compact".to_string()),
        };
        if !matches!(alphavantage.outputsize.as_str(), "compact" | "full") {
            return Err(invalid(
                "alphavantage",
                "outputsize",
                "outputsize must be compact or full",
            ));
        }

        let yahoo = YahooSettings {
            base_url: config
                .get_string("yahoo", "base_url")
                .unwrap_or_else(|| "https://query1.finance.yahoo.com/v8/finance/chart".to_string()),
            symbol_suffix: config.get_string("yahoo", "symbol_suffix"),
            range: config
                .get_string("yahoo", "range")
                .unwrap_or_else(|| "2y".to_string()),
        };

        let csv_path = config.get_string("csv", "path");
        if provider_order.contains(&ProviderKind::Csv) && csv_path.is_none() {
            return Err(TickerError::ConfigMissing {
                section: "csv".into(),
                key: "path".into(),
            });
        }

        let analytics = AnalyticsSettings {
            summary_lookback_days: positive(config, "analytics", "summary_lookback_days", 365)?,
            technicals_lookback_days: positive(config, "analytics", "technicals_lookback_days", 180)?,
            movers_lookback_days: positive(config, "analytics", "movers_lookback_days", 14)?,
            warmup_days: non_negative(config, "analytics", "warmup_days", 60)?,
            max_days: positive(config, "analytics", "max_days", 365)?,
            max_movers: positive(config, "analytics", "max_movers", 10)? as usize,
        };

        Ok(Settings {
            freshness,
            provider_order,
            timeout_secs,
            alphavantage,
            yahoo,
            csv_path,
            analytics,
            catalog: parse_catalog(config)?,
            listen: config
                .get_string("web", "listen")
                .unwrap_or_else(|| "127.0.0.1:8000".to_string()),
            log_level: config
                .get_string("logging", "level")
                .unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_provider_order(value: &str) -> Result<Vec<ProviderKind>, TickerError> {
    let mut order = Vec::new();
    for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let kind = ProviderKind::parse(name)
            .ok_or_else(|| invalid("providers", "order", format!("unknown provider {name:?}")))?;
        if order.contains(&kind) {
            return Err(invalid(
                "providers",
                "order",
                format!("provider {name:?} listed twice"),
            ));
        }
        order.push(kind);
    }
    Ok(order)
}

/// Symbols from `[catalog] symbols` in listed order, then any further
/// `[instrument:SYMBOL]` sections sorted by symbol.
fn parse_catalog(config: &dyn ConfigPort) -> Result<Vec<Instrument>, TickerError> {
    let mut symbols = Vec::new();
    if let Some(list) = config.get_string("catalog", "symbols") {
        for raw in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let symbol = normalize_symbol(raw)
                .map_err(|e| invalid("catalog", "symbols", e.to_string()))?;
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
    }

    let mut extra: Vec<String> = config
        .sections()
        .into_iter()
        .filter_map(|s| s.strip_prefix(INSTRUMENT_PREFIX).map(str::to_string))
        .filter_map(|s| normalize_symbol(&s).ok())
        .filter(|s| !symbols.contains(s))
        .collect();
    extra.sort();
    symbols.extend(extra);

    symbols
        .into_iter()
        .map(|symbol| instrument_from_section(config, symbol))
        .collect()
}

fn instrument_from_section(config: &dyn ConfigPort, symbol: String) -> Result<Instrument, TickerError> {
    let section = format!("{INSTRUMENT_PREFIX}{}", symbol.to_lowercase());
    let market_cap = match config.get_string(&section, "market_cap") {
        None => None,
        Some(raw) => Some(raw.parse::<f64>().map_err(|_| {
            invalid(&section, "market_cap", format!("not a number: {raw:?}"))
        })?),
    };

    Ok(Instrument {
        name: config
            .get_string(&section, "name")
            .unwrap_or_else(|| symbol.clone()),
        sector: config.get_string(&section, "sector"),
        industry: config.get_string(&section, "industry"),
        market_cap,
        symbol,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapConfig {
        values: HashMap<(String, String), String>,
    }

    impl MapConfig {
        fn with(mut self, section: &str, key: &str, value: &str) -> Self {
            self.values
                .insert((section.to_string(), key.to_string()), value.to_string());
            self
        }
    }

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.values
                .get(&(section.to_string(), key.to_string()))
                .cloned()
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
        fn sections(&self) -> Vec<String> {
            let mut sections: Vec<String> = self.values.keys().map(|(s, _)| s.clone()).collect();
            sections.sort();
            sections.dedup();
            sections
        }
    }

    #[test]
    fn defaults_from_empty_config() {
        let settings = Settings::from_config(&MapConfig::default()).unwrap();
        assert_eq!(settings.freshness, FreshnessPolicy::default());
        assert_eq!(
            settings.provider_order,
            vec![ProviderKind::AlphaVantage, ProviderKind::Yahoo]
        );
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(settings.analytics, AnalyticsSettings::default());
        assert_eq!(settings.alphavantage.outputsize, "compact");
        assert!(settings.catalog.is_empty());
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn provider_order_parsed() {
        let config = MapConfig::default()
            .with("providers", "order", "yahoo, csv")
            .with("csv", "path", "/tmp/csv");
        let settings = Settings::from_config(&config).unwrap();
        assert_eq!(
            settings.provider_order,
            vec![ProviderKind::Yahoo, ProviderKind::Csv]
        );
    }

    #[test]
    fn unknown_provider_rejected() {
        let config = MapConfig::default().with("providers", "order", "yahoo,bloomberg");
        match Settings::from_config(&config) {
            Err(TickerError::ConfigInvalid { section, key, reason }) => {
                assert_eq!(section, "providers");
                assert_eq!(key, "order");
                assert!(reason.contains("bloomberg"));
            }
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_provider_rejected() {
        let config = MapConfig::default().with("providers", "order", "yahoo,YAHOO");
        assert!(matches!(
            Settings::from_config(&config),
            Err(TickerError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn csv_provider_needs_path() {
        let config = MapConfig::default().with("providers", "order", "csv");
        assert!(matches!(
            Settings::from_config(&config),
            Err(TickerError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn negative_staleness_rejected() {
        let config = MapConfig::default().with("freshness", "max_staleness_days", "-1");
        assert!(matches!(
            Settings::from_config(&config),
            Err(TickerError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = MapConfig::default().with("providers", "timeout_secs", "0");
        assert!(matches!(
            Settings::from_config(&config),
            Err(TickerError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn bad_outputsize_rejected() {
        let config = MapConfig::default().with("alphavantage", "outputsize", "huge");
        assert!(Settings::from_config(&config).is_err());
    }

    #[test]
    fn catalog_from_sections() {
        let config = MapConfig::default()
            .with("catalog", "symbols", "tcs, INFY, tcs")
            .with("instrument:tcs", "name", "Tata Consultancy Services")
            .with("instrument:tcs", "sector", "IT")
            .with("instrument:tcs", "market_cap", "1.3e13")
            .with("instrument:wipro", "name", "Wipro");
        let settings = Settings::from_config(&config).unwrap();
        let symbols: Vec<&str> = settings.catalog.iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["TCS", "INFY", "WIPRO"]);
        assert_eq!(settings.catalog[0].name, "Tata Consultancy Services");
        assert_eq!(settings.catalog[0].sector.as_deref(), Some("IT"));
        assert_eq!(settings.catalog[0].market_cap, Some(1.3e13));
        assert_eq!(settings.catalog[1].name, "INFY");
        assert_eq!(settings.catalog[2].name, "Wipro");
    }

    #[test]
    fn catalog_bad_market_cap() {
        let config = MapConfig::default()
            .with("catalog", "symbols", "TCS")
            .with("instrument:tcs", "market_cap", "lots");
        assert!(matches!(
            Settings::from_config(&config),
            Err(TickerError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn catalog_bad_symbol() {
        let config = MapConfig::default().with("catalog", "symbols", "TCS, BAD SYMBOL");
        assert!(Settings::from_config(&config).is_err());
    }

    #[test]
    fn provider_kind_names() {
        assert_eq!(ProviderKind::parse("AlphaVantage"), Some(ProviderKind::AlphaVantage));
        assert_eq!(ProviderKind::parse("alpha_vantage"), Some(ProviderKind::AlphaVantage));
        assert_eq!(ProviderKind::Csv.as_str(), "csv");
        assert_eq!(ProviderKind::parse("bloomberg"), None);
    }
}
