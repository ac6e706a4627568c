//! Daily closes per ticker (cache, then the configured providers) and their
//! month-end resampling.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::{ProviderMode, Settings};
use crate::data::cache::{DatedSeries, DiskCache, Resolver, SeriesSource};
use crate::data::download::{DownloadSummary, resolve_all};
use crate::data::http::{HttpGet, RetryPolicy};
use crate::data::polygon::{AGGS_POLICY, PolygonSource, VALIDATE_POLICY, validate_key};
use crate::data::yahoo::YahooSource;
use crate::domain::{MonthlyAgg, MonthlyFrame, resample_monthly};
use crate::error::AppError;

/// Loads daily closes through `raw/{TICKER}_daily.csv`.
pub struct PriceLoader<'a> {
    settings: &'a Settings,
    cache: DiskCache,
    polygon: Option<PolygonSource<'a>>,
    yahoo: Option<YahooSource<'a>>,
}

impl<'a> PriceLoader<'a> {
    /// Build the provider chain for `settings.provider`.
    ///
    /// In `polygon` mode the key is validated first; failure is fatal.
    pub fn new(settings: &'a Settings, http: &'a dyn HttpGet) -> Result<Self, AppError> {
        let polygon_key = settings.polygon_api_key.clone();

        let polygon = match settings.provider {
            ProviderMode::Yahoo => None,
            ProviderMode::Auto => polygon_key.map(|k| PolygonSource::new(http, k, AGGS_POLICY)),
            ProviderMode::Polygon => {
                validate_key(http, polygon_key.as_deref(), VALIDATE_POLICY).map_err(|reason| {
                    AppError::config(format!(
                        "Polygon aggregates unavailable: {reason} Check your POLYGON_API_KEY and plan; prices require aggregate access."
                    ))
                })?;
                polygon_key.map(|k| PolygonSource::new(http, k, AGGS_POLICY))
            }
        };
        let yahoo = match settings.provider {
            ProviderMode::Polygon => None,
            ProviderMode::Auto | ProviderMode::Yahoo => Some(YahooSource::new(http, RetryPolicy::default())),
        };

        Ok(Self {
            settings,
            cache: DiskCache::daily_prices(settings.raw_dir()),
            polygon,
            yahoo,
        })
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    fn sources(&self) -> Vec<&dyn SeriesSource> {
        let mut out: Vec<&dyn SeriesSource> = Vec::new();
        if let Some(p) = &self.polygon {
            out.push(p);
        }
        if let Some(y) = &self.yahoo {
            out.push(y);
        }
        out
    }

    /// Daily closes for every ticker that resolves, plus a summary.
    pub fn daily(&self, tickers: &[String]) -> Result<(Vec<DatedSeries>, DownloadSummary), AppError> {
        let resolver = Resolver::new(&self.cache, self.settings.force_refresh);
        let sources = self.sources();
        let (series, summary) = resolve_all(
            &resolver,
            tickers,
            self.settings.start,
            self.settings.end,
            &sources,
            self.settings.pacing,
        )?;
        info!(summary = %summary.line(), "prices");
        Ok((series, summary))
    }

    /// Month-end closes (last daily close in each month), one column per
    /// ticker that resolved. Tickers without data are absent.
    pub fn monthly_closes(&self, tickers: &[String]) -> Result<MonthlyFrame, AppError> {
        let (series, summary) = self.daily(tickers)?;
        if !summary.all_resolved() {
            warn!(missing = ?summary.missing, "some tickers have no price data");
        }
        Ok(monthly_close_frame(&series))
    }
}

/// Outer-join month-end closes of each series, one column per key.
pub fn monthly_close_frame(series: &[DatedSeries]) -> MonthlyFrame {
    let frames: Vec<MonthlyFrame> = series
        .iter()
        .map(|s| MonthlyFrame::from_series(&s.key, &resample_monthly(&s.points, MonthlyAgg::Last)))
        .collect();
    MonthlyFrame::outer_join(&frames)
}

/// Daily closes on the union of all dates; absent days are NaN.
pub fn align_daily(series: &[DatedSeries]) -> (Vec<NaiveDate>, Vec<Vec<f64>>) {
    let dates: Vec<NaiveDate> = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(d, _)| *d))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let columns = series
        .iter()
        .map(|s| {
            let lookup: HashMap<NaiveDate, f64> = s.points.iter().copied().collect();
            dates.iter().map(|d| lookup.get(d).copied().unwrap_or(f64::NAN)).collect()
        })
        .collect();
    (dates, columns)
}
