//! Runtime configuration, read from `MARKETWATCH_*` environment variables.

use crate::{
    currency::{
        DEFAULT_LOCAL_CURRENCY, DEFAULT_USD_RATE,
        refresh::{DEFAULT_RATE_REFRESH, DEFAULT_RATE_URL},
    },
    error::MarketWatchError,
    exchange::{ExchangeGroup, TickStream},
    feed::FeedConfig,
    record::QuoteSeed,
};
use indexmap::IndexMap;
use std::{path::Path, path::PathBuf, str::FromStr, time::Duration};
use tracing::warn;

pub const DEFAULT_DIRECT_WS_URL: &str = "ws://127.0.0.1:8765/ws";
pub const DEFAULT_FX_WS_URL: &str = "ws://127.0.0.1:8766/ws";
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

const TABS: &str = "MARKETWATCH_TABS";
const DIRECT_WS_URL: &str = "MARKETWATCH_DIRECT_WS_URL";
const FX_WS_URL: &str = "MARKETWATCH_FX_WS_URL";
const RATE_URL: &str = "MARKETWATCH_RATE_URL";
const LOCAL_CURRENCY: &str = "MARKETWATCH_LOCAL_CURRENCY";
const RATE_REFRESH_SECS: &str = "MARKETWATCH_RATE_REFRESH_SECS";
const FALLBACK_RATE: &str = "MARKETWATCH_FALLBACK_RATE";
const RECONNECT_SECS: &str = "MARKETWATCH_RECONNECT_SECS";
const SEED_FILE: &str = "MARKETWATCH_SEED_FILE";

/// Snapshot seeds per tab, in file order.
pub type SeedBook = IndexMap<ExchangeGroup, Vec<QuoteSeed>>;

#[derive(Debug, Clone, PartialEq)]
pub struct MarketWatchConfig {
    pub tabs: Vec<ExchangeGroup>,
    pub direct_ws_url: String,
    pub fx_ws_url: String,
    pub rate_url: String,
    pub local_currency: String,
    pub rate_refresh: Duration,
    pub fallback_rate: f64,
    pub reconnect_delay: Duration,
    pub seed_file: Option<PathBuf>,
}

impl Default for MarketWatchConfig {
    fn default() -> Self {
        Self {
            tabs: ExchangeGroup::ALL.to_vec(),
            direct_ws_url: DEFAULT_DIRECT_WS_URL.to_string(),
            fx_ws_url: DEFAULT_FX_WS_URL.to_string(),
            rate_url: DEFAULT_RATE_URL.to_string(),
            local_currency: DEFAULT_LOCAL_CURRENCY.to_string(),
            rate_refresh: DEFAULT_RATE_REFRESH,
            fallback_rate: DEFAULT_USD_RATE,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            seed_file: None,
        }
    }
}

impl MarketWatchConfig {
    pub fn with_tabs(mut self, tabs: impl IntoIterator<Item = ExchangeGroup>) -> Self {
        self.tabs = tabs.into_iter().collect();
        self
    }

    pub fn with_direct_ws_url(mut self, url: impl Into<String>) -> Self {
        self.direct_ws_url = url.into();
        self
    }

    pub fn with_fx_ws_url(mut self, url: impl Into<String>) -> Self {
        self.fx_ws_url = url.into();
        self
    }

    pub fn with_rate_url(mut self, url: impl Into<String>) -> Self {
        self.rate_url = url.into();
        self
    }

    pub fn with_local_currency(mut self, currency: impl Into<String>) -> Self {
        self.local_currency = currency.into();
        self
    }

    /// Zero periods are ignored.
    pub fn with_rate_refresh(mut self, period: Duration) -> Self {
        if period.is_zero() {
            warn!(
                current = ?self.rate_refresh,
                "refresh period must be positive, keeping current"
            );
        } else {
            self.rate_refresh = period;
        }
        self
    }

    pub fn with_fallback_rate(mut self, rate: f64) -> Self {
        self.fallback_rate = rate;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_seed_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed_file = Some(path.into());
        self
    }

    pub fn from_env() -> Result<Self, MarketWatchError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from `lookup`, falling back to defaults for unset or
    /// invalid values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MarketWatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(raw) = lookup(TABS) {
            config.tabs = parse_tabs(&raw)?;
        }
        if let Some(url) = var(DIRECT_WS_URL) {
            config.direct_ws_url = url;
        }
        if let Some(url) = var(FX_WS_URL) {
            config.fx_ws_url = url;
        }
        if let Some(url) = var(RATE_URL) {
            config.rate_url = url;
        }
        if let Some(currency) = var(LOCAL_CURRENCY) {
            config.local_currency = currency.to_uppercase();
        }
        if let Some(secs) = parse_var::<u64>(RATE_REFRESH_SECS, var(RATE_REFRESH_SECS)) {
            match secs {
                0 => warn!(key = RATE_REFRESH_SECS, "refresh period must be positive, using default"),
                secs => config.rate_refresh = Duration::from_secs(secs),
            }
        }
        if let Some(rate) = parse_var::<f64>(FALLBACK_RATE, var(FALLBACK_RATE)) {
            if rate.is_finite() && rate > 0.0 {
                config.fallback_rate = rate;
            } else {
                warn!(key = FALLBACK_RATE, rate, "fallback rate must be positive, using default");
            }
        }
        if let Some(secs) = parse_var::<u64>(RECONNECT_SECS, var(RECONNECT_SECS)) {
            config.reconnect_delay = Duration::from_secs(secs);
        }
        config.seed_file = var(SEED_FILE).map(PathBuf::from);

        Ok(config)
    }

    /// Feed configuration for the socket serving `stream`.
    pub fn feed(&self, stream: TickStream) -> FeedConfig {
        let url = match stream {
            TickStream::Direct => &self.direct_ws_url,
            TickStream::OrderBook => &self.fx_ws_url,
        };

        FeedConfig {
            url: url.clone(),
            stream,
            reconnect_delay: self.reconnect_delay,
        }
    }

    /// Whether any configured tab is fed by `stream`.
    pub fn uses_stream(&self, stream: TickStream) -> bool {
        self.tabs.iter().any(|tab| tab.stream() == stream)
    }
}

fn parse_var<T: FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(%key, value = %raw, "invalid configuration value, using default");
            None
        }
    }
}

/// Parse a comma separated tab list, ignoring (and warning about) unknown names.
fn parse_tabs(raw: &str) -> Result<Vec<ExchangeGroup>, MarketWatchError> {
    let mut tabs = Vec::new();

    for name in raw.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        match name.parse::<ExchangeGroup>() {
            Ok(tab) if !tabs.contains(&tab) => tabs.push(tab),
            Ok(_) => {}
            Err(error) => warn!(%error, "ignoring unknown tab"),
        }
    }

    if tabs.is_empty() {
        return Err(MarketWatchError::Config(format!(
            "{TABS} names no known exchange group: {raw:?}"
        )));
    }

    Ok(tabs)
}

/// Read a seed file of the form `{ "<GROUP>": [QuoteSeed, ...] }`.
pub fn load_seed_file(path: impl AsRef<Path>) -> Result<SeedBook, MarketWatchError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|error| MarketWatchError::Seed(format!("{}: {error}", path.display())))?;
    parse_seeds(&raw)
}

pub fn parse_seeds(raw: &str) -> Result<SeedBook, MarketWatchError> {
    let groups = serde_json::from_str::<IndexMap<String, Vec<QuoteSeed>>>(raw)
        .map_err(|error| MarketWatchError::Seed(error.to_string()))?;

    let mut book = SeedBook::with_capacity(groups.len());
    for (name, seeds) in groups {
        let group = name
            .parse::<ExchangeGroup>()
            .map_err(|_| MarketWatchError::Seed(format!("unknown exchange group: {name}")))?;
        book.entry(group).or_default().extend(seeds);
    }

    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let actual = MarketWatchConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(actual, MarketWatchConfig::default());
        assert_eq!(actual.rate_refresh, Duration::from_secs(300));
        assert_eq!(actual.fallback_rate, 88.65);
        assert_eq!(actual.tabs.len(), 6);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let actual = MarketWatchConfig::from_lookup(lookup(&[
            ("MARKETWATCH_TABS", "mcx, CRYPTO,mcx"),
            ("MARKETWATCH_FX_WS_URL", "wss://fx.example/ws"),
            ("MARKETWATCH_LOCAL_CURRENCY", "aed"),
            ("MARKETWATCH_RATE_REFRESH_SECS", "60"),
            ("MARKETWATCH_FALLBACK_RATE", "83.1"),
            ("MARKETWATCH_RECONNECT_SECS", "1"),
            ("MARKETWATCH_SEED_FILE", "/tmp/seeds.json"),
        ]))
        .unwrap();

        let expected = MarketWatchConfig::default()
            .with_tabs([ExchangeGroup::Mcx, ExchangeGroup::Crypto])
            .with_fx_ws_url("wss://fx.example/ws")
            .with_local_currency("AED")
            .with_rate_refresh(Duration::from_secs(60))
            .with_fallback_rate(83.1)
            .with_reconnect_delay(Duration::from_secs(1))
            .with_seed_file("/tmp/seeds.json");

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_from_lookup_invalid_values_fall_back() {
        let actual = MarketWatchConfig::from_lookup(lookup(&[
            ("MARKETWATCH_RATE_REFRESH_SECS", "often"),
            ("MARKETWATCH_FALLBACK_RATE", "-1"),
            ("MARKETWATCH_RECONNECT_SECS", ""),
        ]))
        .unwrap();

        assert_eq!(actual, MarketWatchConfig::default());
    }

    #[test]
    fn test_with_rate_refresh_ignores_zero() {
        let config = MarketWatchConfig::default()
            .with_rate_refresh(Duration::from_secs(30))
            .with_rate_refresh(Duration::ZERO);
        assert_eq!(config.rate_refresh, Duration::from_secs(30));
    }

    #[test]
    fn test_from_lookup_empty_tabs() {
        let actual = MarketWatchConfig::from_lookup(lookup(&[("MARKETWATCH_TABS", "NYSE, ")]));
        assert!(matches!(actual, Err(MarketWatchError::Config(_))));
    }

    #[test]
    fn test_feed() {
        let config = MarketWatchConfig::default().with_tabs([ExchangeGroup::Forex]);
        assert_eq!(config.feed(TickStream::OrderBook).url, DEFAULT_FX_WS_URL);
        assert!(config.uses_stream(TickStream::OrderBook));
        assert!(!config.uses_stream(TickStream::Direct));
    }

    #[test]
    fn test_parse_seeds() {
        let input = r#"
            {
                "MCX": [{ "SymbolToken": 256265, "SymbolName": "GOLD_31DEC", "ltp": "71015" }],
                "crypto": [{ "SymbolToken": "BTC", "SymbolName": "BTC", "cls": 8800 }]
            }
        "#;

        let book = parse_seeds(input).unwrap();
        let groups = book.keys().copied().collect::<Vec<_>>();
        assert_eq!(groups, vec![ExchangeGroup::Mcx, ExchangeGroup::Crypto]);
        assert_eq!(book[&ExchangeGroup::Mcx][0].ltp, 71015.0);
        assert_eq!(book[&ExchangeGroup::Crypto][0].close, 8800.0);

        assert!(matches!(
            parse_seeds(r#"{ "NYSE": [] }"#),
            Err(MarketWatchError::Seed(_))
        ));
    }
}
