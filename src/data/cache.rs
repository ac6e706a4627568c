//! Flat-file series cache and the cache-then-network resolver.
//!
//! Layout: one CSV per key with a `date,value` header, e.g.
//! `{cache_dir}/fred_DGS10.csv` or `{cache_dir}/raw/AAPL_daily.csv`.
//! A present file is authoritative (no expiry) unless force-refresh is set.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::{format_float, parse_number};
use crate::error::AppError;
use crate::ingest::dates::parse_text_date;

/// Dated observations for one key, ascending by date.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedSeries {
    pub key: String,
    pub points: Vec<(NaiveDate, f64)>,
}

impl DatedSeries {
    /// Sorts by date; the last value wins for repeated dates.
    pub fn new(key: impl Into<String>, mut points: Vec<(NaiveDate, f64)>) -> Self {
        points.sort_by_key(|(d, _)| *d);
        let mut deduped: Vec<(NaiveDate, f64)> = Vec::with_capacity(points.len());
        for (d, v) in points {
            match deduped.last_mut() {
                Some(last) if last.0 == d => last.1 = v,
                _ => deduped.push((d, v)),
            }
        }
        Self {
            key: key.into(),
            points: deduped,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Observations within `[start, end]`.
    pub fn clipped(&self, start: NaiveDate, end: NaiveDate) -> DatedSeries {
        DatedSeries {
            key: self.key.clone(),
            points: self
                .points
                .iter()
                .filter(|(d, _)| *d >= start && *d <= end)
                .copied()
                .collect(),
        }
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|(d, _)| *d).collect()
    }
}

/// A network (or other) origin for series.
pub trait SeriesSource {
    fn name(&self) -> &str;

    /// `Ok(None)` means "no data, try the next source". `Err` is fatal
    /// (e.g. a missing mandatory credential).
    fn fetch(&self, key: &str, start: NaiveDate, end: NaiveDate) -> Result<Option<DatedSeries>, AppError>;
}

/// Directory of `date,value` CSV files named `{prefix}{key}{suffix}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskCache {
    dir: PathBuf,
    prefix: String,
    suffix: String,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>, prefix: &str, suffix: &str) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        }
    }

    /// `{dir}/fred_{SERIES}.csv`
    pub fn fred(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, "fred_", ".csv")
    }

    /// `{dir}/{TICKER}_daily.csv`
    pub fn daily_prices(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, "", "_daily.csv")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{key}{}", self.prefix, self.suffix))
    }

    /// Read a cached series. Missing, unreadable, or mis-shaped files are a
    /// miss, never an error.
    pub fn load(&self, key: &str) -> Option<DatedSeries> {
        let path = self.path(key);
        if !path.exists() {
            return None;
        }
        match read_series_csv(&path, key) {
            Ok(series) => Some(series),
            Err(reason) => {
                warn!(path = %path.display(), reason = %reason, "ignoring unusable cache file");
                None
            }
        }
    }

    pub fn store(&self, series: &DatedSeries) -> Result<PathBuf, AppError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::io(format!("Failed to create cache dir '{}': {e}", self.dir.display()))
        })?;
        let path = self.path(&series.key);
        let mut writer = csv::Writer::from_path(&path)
            .map_err(|e| AppError::io(format!("Failed to create cache file '{}': {e}", path.display())))?;

        writer
            .write_record(["date", "value"])
            .map_err(|e| write_error(&path, e))?;
        for (d, v) in &series.points {
            writer
                .write_record([d.format("%Y-%m-%d").to_string(), format_float(*v)])
                .map_err(|e| write_error(&path, e))?;
        }
        writer.flush().map_err(|e| write_error(&path, e))?;
        info!(path = %path.display(), rows = series.len(), "Saved");
        Ok(path)
    }
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::io(format!("Failed to write cache file '{}': {e}", path.display()))
}

fn read_series_csv(path: &Path, key: &str) -> Result<DatedSeries, String> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| e.to_string())?;
    let headers = reader.headers().map_err(|e| e.to_string())?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
    };
    let (Some(date_col), Some(value_col)) = (position("date"), position("value")) else {
        return Err("expected `date` and `value` columns".to_string());
    };

    let mut points = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        let Some(date) = record.get(date_col).and_then(parse_text_date) else {
            continue;
        };
        let value = record.get(value_col).and_then(parse_number).unwrap_or(f64::NAN);
        points.push((date.date(), value));
    }
    Ok(DatedSeries::new(key, points))
}

/// Where a resolved series came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Source(String),
}

/// Cache first, then each source in order; fetched data is persisted.
pub struct Resolver<'a> {
    pub cache: &'a DiskCache,
    pub force_refresh: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(cache: &'a DiskCache, force_refresh: bool) -> Self {
        Self {
            cache,
            force_refresh,
        }
    }

    /// Resolve `key` over `[start, end]`. `Ok(None)` means no data anywhere.
    pub fn resolve(
        &self,
        key: &str,
        start: NaiveDate,
        end: NaiveDate,
        sources: &[&dyn SeriesSource],
    ) -> Result<Option<(DatedSeries, Origin)>, AppError> {
        if !self.force_refresh {
            if let Some(cached) = self.cache.load(key) {
                let clipped = cached.clipped(start, end);
                if !clipped.is_empty() {
                    debug!(key, rows = clipped.len(), "cache hit");
                    return Ok(Some((clipped, Origin::Cache)));
                }
                debug!(key, "cache file has no rows in range");
            }
        }

        for source in sources {
            match source.fetch(key, start, end)? {
                Some(series) if !series.is_empty() => {
                    self.cache.store(&series)?;
                    return Ok(Some((series, Origin::Source(source.name().to_string()))));
                }
                _ => debug!(key, source = source.name(), "no data from source"),
            }
        }
        Ok(None)
    }
}
