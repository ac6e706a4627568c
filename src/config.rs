//! Run configuration.
//!
//! `Settings` is built once at start-up from the environment (after loading
//! `.env`) and passed down explicitly; nothing below `app` reads env vars.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::ValueEnum;

pub const DEFAULT_CACHE_DIR: &str = "data_cache";
pub const DEFAULT_TICKERS: [&str; 6] = ["AAPL", "MSFT", "GOOGL", "NVDA", "META", "AMZN"];
pub const DEFAULT_AI_BASKET: [&str; 6] = ["NVDA", "META", "MSFT", "GOOGL", "AMD", "AVGO"];
pub const DEFAULT_LAGS: [usize; 3] = [1, 3, 6];
pub const DEFAULT_MIN_ROWS: usize = 24;
pub const DEFAULT_MAX_COVARIATES: usize = 20;
pub const DEFAULT_PACING_MS: u64 = 150;

/// Corrective instruction attached to the missing-FRED-key error.
pub const FRED_KEY_HINT: &str = "export FRED_API_KEY=YOUR_KEY (or add it to .env)";

/// Which price provider(s) to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderMode {
    /// Polygon when a key is configured, then Yahoo.
    Auto,
    /// Polygon only; the key is validated before any download.
    Polygon,
    /// Yahoo chart endpoint only.
    Yahoo,
}

/// A benchmark proxy: the traded ticker and the column stem it feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Benchmark {
    pub ticker: String,
    /// Column stem (`ixic` gives `ixic_ret` and `ixic_rets.csv`).
    pub name: String,
}

impl Benchmark {
    pub fn new(ticker: &str, name: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            name: name.to_string(),
        }
    }

    pub fn return_column(&self) -> String {
        format!("{}_ret", self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub fred_api_key: Option<String>,
    pub polygon_api_key: Option<String>,
    pub finnhub_api_key: Option<String>,
    pub enable_news: bool,
    pub enable_earnings: bool,
    pub force_refresh: bool,

    pub cache_dir: PathBuf,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub tickers: Vec<String>,
    pub ai_basket: Vec<String>,
    pub benchmarks: Vec<Benchmark>,
    pub lags: Vec<usize>,
    pub min_rows: usize,
    pub max_covariates: usize,
    pub pacing: Duration,
    pub provider: ProviderMode,
}

impl Settings {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let key = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let flag = |name: &str| key(name).is_some_and(|v| parse_flag(&v));

        Self {
            fred_api_key: key("FRED_API_KEY"),
            polygon_api_key: key("POLYGON_API_KEY"),
            finnhub_api_key: key("FINNHUB_API_KEY"),
            enable_news: flag("ENABLE_NEWS"),
            enable_earnings: flag("ENABLE_EARNINGS"),
            force_refresh: flag("FORCE_REFRESH"),
            ..Self::default()
        }
    }

    /// Monthly outputs (`tech_features_combined.csv`, per-ticker features, ...).
    pub fn monthly_dir(&self) -> PathBuf {
        self.cache_dir.join("Monthly")
    }

    /// Daily price caches.
    pub fn raw_dir(&self) -> PathBuf {
        self.cache_dir.join("raw")
    }

    pub fn max_lag(&self) -> usize {
        self.lags.iter().copied().max().unwrap_or(0)
    }

    /// One-line presence report for configured keys (values never shown).
    pub fn key_summary(&self) -> String {
        let mark = |k: &Option<String>| if k.is_some() { "set" } else { "missing" };
        format!(
            "keys: FRED={} POLYGON={} FINNHUB={} | news={} earnings={} force_refresh={}",
            mark(&self.fred_api_key),
            mark(&self.polygon_api_key),
            mark(&self.finnhub_api_key),
            self.enable_news,
            self.enable_earnings,
            self.force_refresh,
        )
    }

    /// Every ticker whose prices a full build needs, in first-seen order.
    pub fn all_price_tickers(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let candidates = self
            .benchmarks
            .iter()
            .map(|b| &b.ticker)
            .chain(&self.ai_basket)
            .chain(&self.tickers);
        for t in candidates {
            if !out.contains(t) {
                out.push(t.clone());
            }
        }
        out
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fred_api_key: None,
            polygon_api_key: None,
            finnhub_api_key: None,
            enable_news: false,
            enable_earnings: false,
            force_refresh: false,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            start: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or(NaiveDate::MIN),
            end: chrono::Utc::now().date_naive(),
            tickers: DEFAULT_TICKERS.iter().map(|s| s.to_string()).collect(),
            ai_basket: DEFAULT_AI_BASKET.iter().map(|s| s.to_string()).collect(),
            benchmarks: vec![Benchmark::new("QQQ", "ixic"), Benchmark::new("XLK", "xlk")],
            lags: DEFAULT_LAGS.to_vec(),
            min_rows: DEFAULT_MIN_ROWS,
            max_covariates: DEFAULT_MAX_COVARIATES,
            pacing: Duration::from_millis(DEFAULT_PACING_MS),
            provider: ProviderMode::Auto,
        }
    }
}

/// `1`, `true`, `yes` (any case) enable a flag.
pub fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn flags_and_keys() {
        let s = settings(&[
            ("FRED_API_KEY", " abc "),
            ("POLYGON_API_KEY", ""),
            ("FORCE_REFRESH", "YES"),
            ("ENABLE_NEWS", "0"),
        ]);
        assert_eq!(s.fred_api_key.as_deref(), Some("abc"));
        assert_eq!(s.polygon_api_key, None);
        assert!(s.force_refresh);
        assert!(!s.enable_news);
        assert_eq!(s.max_lag(), 6);
    }

    #[test]
    fn key_summary_never_shows_values() {
        let s = settings(&[("POLYGON_API_KEY", "secret123")]);
        let summary = s.key_summary();
        assert!(summary.contains("POLYGON=set"));
        assert!(summary.contains("FRED=missing"));
        assert!(!summary.contains("secret123"));
    }

    #[test]
    fn price_tickers_are_deduplicated() {
        let s = settings(&[]);
        let all = s.all_price_tickers();
        assert_eq!(&all[..2], &["QQQ".to_string(), "XLK".to_string()]);
        assert_eq!(all.iter().filter(|t| t.as_str() == "MSFT").count(), 1);
        assert!(all.contains(&"AMZN".to_string()));
    }
}
