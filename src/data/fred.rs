//! FRED observations endpoint.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::{FRED_KEY_HINT, Settings};
use crate::data::cache::{DatedSeries, DiskCache, Resolver, SeriesSource};
use crate::data::download::{DownloadSummary, resolve_all};
use crate::data::http::{HttpGet, RetryPolicy, get_json};
use crate::domain::parse_number;
use crate::error::AppError;

pub const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// Macro series pulled for the monthly build, with their column names.
pub const MACRO_SERIES: [(&str, &str); 4] = [
    ("FEDFUNDS", "fed_funds_rate"),
    ("CPIAUCSL", "cpi_index"),
    ("DGS10", "us10y"),
    ("UNRATE", "unemployment_rate"),
];

pub fn macro_series_ids() -> Vec<String> {
    MACRO_SERIES.iter().map(|(id, _)| id.to_string()).collect()
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

/// FRED as a `SeriesSource`. The key is checked only when a fetch is
/// actually needed, so a warm cache works without credentials.
pub struct FredSource<'a> {
    http: &'a dyn HttpGet,
    api_key: Option<String>,
    policy: RetryPolicy,
}

impl<'a> FredSource<'a> {
    pub fn new(http: &'a dyn HttpGet, api_key: Option<String>, policy: RetryPolicy) -> Self {
        Self {
            http,
            api_key,
            policy,
        }
    }

    fn api_key(&self) -> Result<&str, AppError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::config(format!("FRED_API_KEY is not set. {FRED_KEY_HINT}")))
    }
}

impl SeriesSource for FredSource<'_> {
    fn name(&self) -> &str {
        "fred"
    }

    fn fetch(&self, key: &str, start: NaiveDate, end: NaiveDate) -> Result<Option<DatedSeries>, AppError> {
        let api_key = self.api_key()?;
        let query = [
            ("series_id", key.to_string()),
            ("api_key", api_key.to_string()),
            ("file_type", "json".to_string()),
            ("observation_start", start.to_string()),
            ("observation_end", end.to_string()),
        ];

        let Some(body) = get_json::<ObservationsResponse>(self.http, BASE_URL, &query, self.policy) else {
            return Ok(None);
        };
        if body.observations.is_empty() {
            warn!(series = key, "FRED returned no observations");
            return Ok(None);
        }
        Ok(Some(DatedSeries::new(key, parse_observations(&body.observations))))
    }
}

/// Cache-first download of `series_ids` into `{cache_dir}/fred_{ID}.csv`.
///
/// The API key is only required for series that are not cached (or when
/// refreshing); its absence is then fatal.
pub fn download_series(
    settings: &Settings,
    http: &dyn HttpGet,
    series_ids: &[String],
) -> Result<(Vec<DatedSeries>, DownloadSummary), AppError> {
    let cache = DiskCache::fred(&settings.cache_dir);
    let resolver = Resolver::new(&cache, settings.force_refresh);
    let fred = FredSource::new(http, settings.fred_api_key.clone(), RetryPolicy::default());
    let (series, summary) = resolve_all(
        &resolver,
        series_ids,
        settings.start,
        settings.end,
        &[&fred],
        settings.pacing,
    )?;
    info!(summary = %summary.line(), "fred");
    Ok((series, summary))
}

/// FRED reports gaps as `"."`; those become NaN.
fn parse_observations(observations: &[Observation]) -> Vec<(NaiveDate, f64)> {
    observations
        .iter()
        .filter_map(|obs| {
            let date = NaiveDate::parse_from_str(obs.date.trim(), "%Y-%m-%d").ok()?;
            Some((date, parse_number(&obs.value).unwrap_or(f64::NAN)))
        })
        .collect()
}
